use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState,
    state::NotKeyed,
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::num::NonZeroU32;
use std::sync::Arc;

use super::config::{EdgarConfig, EdgarUrls, validate_user_agent};
use super::error::{EdgarError, Result};
use super::traits::DocumentSource;
use async_trait::async_trait;

/// Accept header sent when downloading filing documents.
const FILING_ACCEPT: &str = "text/html,application/xml,text/xml,text/plain";

/// Shown when SEC.gov refuses a request. The usual cause is a missing or fake contact string.
const REGULATOR_FORBIDDEN_GUIDANCE: &str = "SEC.gov returned 403 Forbidden; the SEC requires a User-Agent with a real contact email (set SEC_USER_AGENT or secUserAgent)";

type Governor = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

#[derive(Debug, Clone)]
pub struct Edgar {
    /// HTTP client for making requests
    pub(crate) client: reqwest::Client,

    /// Token bucket rate limiter for SEC compliance
    pub(crate) rate_limiter: Arc<Governor>,

    /// Identification string sent with every request
    pub(crate) user_agent: String,

    /// Base URL for EDGAR archives
    pub(crate) edgar_archives_url: String,

    /// Base URL for EDGAR data API
    pub(crate) edgar_data_url: String,

    /// Base URL for EDGAR files
    pub(crate) edgar_files_url: String,
}

/// HTTP client for SEC EDGAR with built-in rate limiting.
///
/// The `Edgar` client is the entry point for everything that touches the network:
/// ticker lookups, submission listings and the filing documents themselves. Every
/// request carries the configured identification string as `User-Agent`, waits on
/// a token bucket so the process stays within SEC.gov's fair access limit, and is
/// bounded by a fixed timeout.
///
/// # Rate Limiting
///
/// ```text
/// Token Bucket (capacity: 10 tokens)
/// ┌──────────────────────────┐
/// │ ████████████████████████ │  ← Tokens refill at 10/sec
/// └──────────────────────────┘
///      ↓ consume on request
/// ```
///
/// # Failures
///
/// Requests are not retried. A failure belongs to the single document or listing
/// that was requested; callers decide whether that aborts anything else. A 403 from
/// an SEC host is reported as [`EdgarError::ConfigError`] because SEC.gov uses it to
/// reject requests without a usable contact string.
///
/// # Examples
///
/// ```rust
/// # use edgarlens::Edgar;
/// let edgar = Edgar::new("my_app/1.0 (ops@mycompany.com)")?;
/// # Ok::<(), edgarlens::EdgarError>(())
/// ```
///
/// A missing contact string is rejected up front:
///
/// ```rust
/// # use edgarlens::Edgar;
/// assert!(Edgar::new("").unwrap_err().is_config());
/// ```
impl Edgar {
    /// Creates a new Edgar client with the default rate limit, timeout and SEC.gov URLs.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - A descriptive identifier with contact details, e.g.
    ///   "AppName/Version (contact@email.com)".
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::ConfigError` if the user agent is empty, a known placeholder,
    /// or not a valid header value.
    pub fn new(user_agent: &str) -> Result<Self> {
        let config = EdgarConfig {
            user_agent: user_agent.to_string(),
            ..EdgarConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates an Edgar client with custom configuration settings.
    ///
    /// Useful for pointing the client at a mock server or tuning the rate limit
    /// and timeout.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::ConfigError` if the user agent is missing or malformed, the
    /// rate limit is zero, or the HTTP client cannot be built.
    pub fn with_config(config: EdgarConfig) -> Result<Self> {
        validate_user_agent(&config.user_agent)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(config.user_agent.trim())
                .map_err(|e| EdgarError::ConfigError(format!("Invalid user agent: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| EdgarError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(config.rate_limit).ok_or_else(|| {
                EdgarError::ConfigError("Rate limit must be greater than zero".to_string())
            })?,
        )));

        let EdgarUrls {
            archives,
            data,
            files,
        } = config.base_urls;

        Ok(Edgar {
            client,
            rate_limiter,
            user_agent: config.user_agent.trim().to_string(),
            edgar_archives_url: archives,
            edgar_data_url: data,
            edgar_files_url: files,
        })
    }

    /// Whether a URL points at an SEC.gov host.
    pub(crate) fn is_regulator_url(url: &str) -> bool {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
            .map(|host| host == "sec.gov" || host.ends_with(".sec.gov"))
            .unwrap_or(false)
    }

    /// Fetches text content (JSON listings, ticker files) from a URL.
    ///
    /// # Content-Type Validation
    ///
    /// For URLs ending in `.json`, an HTML body is treated as an error page and returned as
    /// `UnexpectedContentType`. SEC.gov sometimes labels real JSON as `text/html`; such bodies
    /// are accepted when they start like JSON.
    ///
    /// # Errors
    ///
    /// * `EdgarError::ConfigError` - SEC.gov answered 403 (identification rejected)
    /// * `EdgarError::NotFound` - HTTP 404
    /// * `EdgarError::RateLimitExceeded` - HTTP 429
    /// * `EdgarError::RequestError` - Network failure or timeout
    /// * `EdgarError::InvalidResponse` - Any other unexpected status
    pub async fn get(&self, url: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if url.ends_with(".json") && status.is_success() {
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|val| val.to_str().ok())
                .map(|ct| ct.to_string());

            if let Some(ct) = content_type.filter(|ct| ct.to_lowercase().contains("text/html")) {
                let body_text = response.text().await?;
                if body_text.trim_start().starts_with('{') || body_text.trim_start().starts_with('[')
                {
                    tracing::warn!(
                        "Received text/html content-type for .json URL, but content appears to be JSON: {}",
                        url
                    );
                    return Ok(body_text);
                }
                return Err(EdgarError::UnexpectedContentType {
                    url: url.to_string(),
                    expected_pattern: "application/json".to_string(),
                    got_content_type: ct,
                    content_preview: body_text.chars().take(200).collect(),
                });
            }
        }

        match status {
            reqwest::StatusCode::OK => Ok(response.text().await?),
            reqwest::StatusCode::NOT_FOUND => Err(EdgarError::NotFound),
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("Rate limit hit (429) for {}", url);
                Err(EdgarError::RateLimitExceeded)
            }
            reqwest::StatusCode::FORBIDDEN if Self::is_regulator_url(url) => {
                Err(EdgarError::ConfigError(REGULATOR_FORBIDDEN_GUIDANCE.to_string()))
            }
            other_status => {
                let error_body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Failed to read error body".to_string());
                Err(EdgarError::InvalidResponse(format!(
                    "Unexpected status code: {} for URL: {}. Response preview: {}",
                    other_status,
                    url,
                    error_body.chars().take(200).collect::<String>()
                )))
            }
        }
    }

    /// Downloads a filing document and returns it as text.
    ///
    /// The body is decoded with the charset declared by the server, falling back to UTF-8
    /// with lossy replacement. Nothing is cached here; callers own caching.
    ///
    /// # Errors
    ///
    /// * `EdgarError::ConfigError` - identification string missing/placeholder, or SEC.gov
    ///   answered 403
    /// * `EdgarError::FetchError` - empty link, unexpected status, or empty body
    /// * `EdgarError::NotFound` - HTTP 404
    /// * `EdgarError::RequestError` - network failure or timeout
    pub async fn fetch_filing_payload(&self, link: &str) -> Result<String> {
        if link.trim().is_empty() {
            return Err(EdgarError::FetchError("missing filing URL".to_string()));
        }
        validate_user_agent(&self.user_agent)?;

        self.rate_limiter.until_ready().await;
        tracing::debug!("Fetching filing document {}", link);

        let response = self
            .client
            .get(link)
            .header(ACCEPT, FILING_ACCEPT)
            .send()
            .await?;

        if let Some(err) = payload_status_error(response.status(), link) {
            return Err(err);
        }

        let payload = response.text().await?;
        if payload.trim().is_empty() {
            return Err(EdgarError::FetchError(
                "empty or unreadable document".to_string(),
            ));
        }
        Ok(payload)
    }

    /// Returns the identification string sent as `User-Agent`.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the base URL for EDGAR archives.
    pub fn archives_url(&self) -> &str {
        &self.edgar_archives_url
    }

    /// Returns the base URL for EDGAR data.
    pub fn data_url(&self) -> &str {
        &self.edgar_data_url
    }

    /// Returns the base URL for EDGAR files.
    pub fn files_url(&self) -> &str {
        &self.edgar_files_url
    }
}

/// The error a filing download reports for `status`, or `None` on success.
///
/// A 403 from an SEC host means the identification string was refused, so it is a
/// configuration problem for the whole batch. A 403 from anywhere else is an
/// ordinary fetch failure.
fn payload_status_error(status: reqwest::StatusCode, url: &str) -> Option<EdgarError> {
    match status {
        status if status.is_success() => None,
        reqwest::StatusCode::FORBIDDEN if Edgar::is_regulator_url(url) => Some(
            EdgarError::ConfigError(REGULATOR_FORBIDDEN_GUIDANCE.to_string()),
        ),
        reqwest::StatusCode::NOT_FOUND => Some(EdgarError::NotFound),
        status => Some(EdgarError::FetchError(format!(
            "unexpected status code {} for {}",
            status, url
        ))),
    }
}

#[async_trait]
impl DocumentSource for Edgar {
    fn preflight(&self) -> Result<()> {
        validate_user_agent(&self.user_agent)
    }

    async fn fetch_filing_payload(&self, link: &str) -> Result<String> {
        Edgar::fetch_filing_payload(self, link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_rejects_missing_identification() {
        assert!(matches!(Edgar::new(""), Err(EdgarError::ConfigError(_))));
        assert!(matches!(
            Edgar::new("Dashboard you@example.com"),
            Err(EdgarError::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_rate_limit() {
        let config = EdgarConfig {
            user_agent: "test_agent tester@example.org".to_string(),
            rate_limit: 0,
            ..EdgarConfig::default()
        };
        assert!(matches!(
            Edgar::with_config(config),
            Err(EdgarError::ConfigError(_))
        ));
    }

    #[test]
    fn test_regulator_url_detection() {
        assert!(Edgar::is_regulator_url(
            "https://www.sec.gov/Archives/edgar/data/1045810/000104581024000123/form4.xml"
        ));
        assert!(Edgar::is_regulator_url("https://data.sec.gov/submissions/CIK0001045810.json"));
        assert!(!Edgar::is_regulator_url("https://notsec.gov.example.com/file"));
        assert!(!Edgar::is_regulator_url("not a url"));
    }

    /// Answers one request on a local port with a canned response and returns its URL.
    fn serve_once(status: &str, content_type: &str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        );
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{}/Archives/edgar/data/1/doc.htm", addr)
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;

        let sec = "https://www.sec.gov/Archives/edgar/data/1045810/000104581024000123/form4.xml";
        let other = "https://mirror.example.com/Archives/edgar/data/1045810/form4.xml";

        assert!(payload_status_error(StatusCode::OK, sec).is_none());
        match payload_status_error(StatusCode::FORBIDDEN, sec) {
            Some(EdgarError::ConfigError(message)) => {
                assert!(message.contains("User-Agent"), "{}", message);
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
        let err = payload_status_error(StatusCode::FORBIDDEN, other).unwrap();
        assert!(err.is_fetch() && !err.is_config(), "{:?}", err);
        assert!(matches!(
            payload_status_error(StatusCode::NOT_FOUND, sec),
            Some(EdgarError::NotFound)
        ));
        assert!(matches!(
            payload_status_error(StatusCode::SERVICE_UNAVAILABLE, sec),
            Some(EdgarError::FetchError(_))
        ));
    }

    #[tokio::test]
    async fn test_payload_uses_declared_charset() {
        let edgar = Edgar::new("test_agent tester@example.org").unwrap();
        // "Smith" in windows-1252 curly quotes
        let body = vec![0x93, b'S', b'm', b'i', b't', b'h', 0x94];
        let url = serve_once("200 OK", "text/html; charset=windows-1252", body);

        let payload = edgar.fetch_filing_payload(&url).await.unwrap();
        assert_eq!(payload, "\u{201c}Smith\u{201d}");
    }

    #[tokio::test]
    async fn test_payload_without_charset_is_lossy_utf8() {
        let edgar = Edgar::new("test_agent tester@example.org").unwrap();
        let body = vec![b'A', b'T', 0xff, b'T'];
        let url = serve_once("200 OK", "text/plain", body);

        let payload = edgar.fetch_filing_payload(&url).await.unwrap();
        assert_eq!(payload, "AT\u{fffd}T");
    }

    #[tokio::test]
    async fn test_forbidden_from_other_host_is_fetch_error() {
        let edgar = Edgar::new("test_agent tester@example.org").unwrap();
        let url = serve_once("403 Forbidden", "text/html", b"denied".to_vec());

        let err = edgar.fetch_filing_payload(&url).await.unwrap_err();
        assert!(matches!(err, EdgarError::FetchError(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_empty_link_is_fetch_error() {
        let edgar = Edgar::new("test_agent tester@example.org").unwrap();
        let err = edgar.fetch_filing_payload("  ").await.unwrap_err();
        assert!(err.is_fetch());
    }
}
