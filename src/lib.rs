//! # EdgarLens - SEC filing ingestion and classification
//!
//! EdgarLens discovers recent SEC EDGAR filings for ticker symbols, downloads the
//! primary documents and turns each one into a structured [`FilingClassification`]:
//! what happened, who acted, how many shares and dollars were involved, and the
//! expected market impact.
//!
//! ## Features
//!
//! - **Rate-limited HTTP client** - Complies with SEC.gov fair access rules
//! - **Ticker resolution** - Ticker to CIK map with local persistence and a refresh interval
//! - **Filing discovery** - Recent 4, 144, 8-K and 10-K filings from the submissions API
//! - **Parse cascade** - Strict XML, salvaged XML fragments, HTML tables, loose tags and plain text
//! - **Form interpreters** - Insider transactions, proposed sales, current and annual reports
//! - **Versioned cache** - Classifications persisted atomically and evicted by processing time
//!
//! ## Requirements
//!
//! EdgarLens is async-first and needs a runtime such as [tokio](https://tokio.rs).
//! SEC.gov requires a `User-Agent` carrying real contact details; a missing or
//! placeholder value is rejected as a configuration error before any request.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use edgarlens::{Edgar, EdgarDiscovery, FilingCache, FilingOptions, FilingPipeline, Settings, TickerMap};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env();
//!     let edgar = Edgar::with_config(settings.edgar.clone())?;
//!
//!     let tickers = Arc::new(TickerMap::from_edgar(
//!         edgar.clone(),
//!         settings.pipeline.ticker_cache_path.clone(),
//!         settings.pipeline.ticker_cache_ttl,
//!     ));
//!     let discovery = EdgarDiscovery::new(edgar.clone(), tickers, FilingOptions::default());
//!     let cache = match settings.pipeline.cache_path.clone() {
//!         Some(path) => {
//!             FilingCache::open(
//!                 path,
//!                 settings.pipeline.cache_max_entries,
//!                 settings.pipeline.cache_version.clone(),
//!             )
//!             .await
//!         }
//!         None => FilingCache::in_memory(
//!             settings.pipeline.cache_max_entries,
//!             settings.pipeline.cache_version.clone(),
//!         ),
//!     };
//!
//!     let pipeline = FilingPipeline::new(
//!         Arc::new(edgar),
//!         Arc::new(discovery),
//!         Arc::new(cache),
//!         settings.pipeline,
//!     );
//!
//!     for record in pipeline.filings_stream(&["NVDA", "AMD"]).await? {
//!         println!("{} {} {}", record.ticker, record.form_type, record.summary);
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod classify;
mod config;
mod core;
mod error;
mod model;
mod options;
mod pipeline;
mod traits;

pub mod interpret;
pub mod parsing;

#[cfg(feature = "company")]
mod company;
#[cfg(feature = "filings")]
mod filings;

// Core functionality (always available)
pub use cache::FilingCache;
pub use classify::{TECHNICAL_ERROR, classify, error_record, summarize};
pub use config::{EdgarConfig, EdgarUrls, PipelineConfig, Settings, validate_user_agent};
pub use core::Edgar;
pub use error::{EdgarError, Result};
pub use model::{
    Dilutive, FilingClassification, FilingReference, FormFamily, Impact, InsiderAction,
    date_timestamp,
};
pub use options::{FilingOptions, TARGET_FORMS};
pub use pipeline::{FilingPipeline, assemble_stream};
pub use traits::{CikLookup, DocumentSource, FilingDiscovery};

#[cfg(feature = "company")]
pub use company::{CompanyTicker, TickerMap, pad_cik, parse_company_tickers};
#[cfg(feature = "filings")]
pub use filings::{EdgarDiscovery, FilingsData, RecentFilings, Submission};

#[cfg(feature = "company")]
pub use traits::CompanyOperations;
#[cfg(feature = "filings")]
pub use traits::FilingOperations;

/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
