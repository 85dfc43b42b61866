//! Document parsing: markup normalization, a minimal XML tree, and the
//! ordered fallback cascade that turns a raw filing into a structured shape.

/// Compiles a constant pattern once and returns `None` if it is invalid.
macro_rules! cached_regex {
    ($pattern:expr) => {{
        static CELL: std::sync::OnceLock<Option<::regex::Regex>> = std::sync::OnceLock::new();
        $crate::parsing::utils::compile_once(&CELL, $pattern)
    }};
}
pub(crate) use cached_regex;

pub mod cascade;
pub mod html;
pub mod utils;
pub mod xml;
