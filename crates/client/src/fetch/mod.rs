//! URL prober.
//!
//! ### Request strategy
//! - HEAD first; fall back once to GET when HEAD fails in transit or the
//!   server rejects the method (405, 501)
//! - A 200 needs the body, so a 200 HEAD is followed by a GET
//! - Every attempt gets its own deadline
//! - Redirects are followed up to the configured limit
//!
//! ### Classification
//! - 404/410: resource not found; 5xx: server error; other non-200: unexpected
//! - 200: body read up to `max_bytes` and handed to the content analyzer
//! - Transport failures become invalid results, never errors

pub mod url;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::Utc;
use reqwest::{Client, Method, Response, StatusCode, header};
use srcwatch_core::cache::hash::has_drifted;
use srcwatch_core::{AppConfig, Error, SourceValidationResult};
use std::time::{Duration, Instant};

use crate::analyze::{analyze, extract_title};

pub use url::{UrlError, canonicalize};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Configuration for the HTTP prober.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// User agent string (default: "srcwatch-validator/0.1 ...")
    pub user_agent: String,

    /// Deadline per HTTP attempt (default: 8s)
    pub timeout: Duration,

    /// Maximum body bytes read for analysis (default: 2MB)
    pub max_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ProbeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.probe_timeout(),
            max_bytes: config.max_bytes,
            max_redirects: config.max_redirects,
        }
    }
}

/// Checks one URL and reports what was found.
///
/// Implementations never fail: every outcome, including transport errors,
/// is expressed as a [`SourceValidationResult`].
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str, previous_hash: Option<&str>) -> SourceValidationResult;
}

/// reqwest-backed prober.
pub struct HttpProber {
    http: Client,
    config: ProbeConfig,
}

impl HttpProber {
    /// Create a new prober with the given configuration.
    pub fn new(config: ProbeConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpClient(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    async fn send(&self, method: Method, url: &str) -> Result<Response, reqwest::Error> {
        self.http
            .request(method, url)
            .timeout(self.config.timeout)
            .header(header::ACCEPT, ACCEPT_HTML)
            .send()
            .await
    }

    /// HEAD, then GET when HEAD is unusable or a body is needed.
    async fn fetch(&self, url: &str) -> Result<Response, reqwest::Error> {
        match self.send(Method::HEAD, url).await {
            Ok(head) if head.status() == StatusCode::OK => self.send(Method::GET, url).await,
            Ok(head) if matches!(head.status(), StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED) => {
                tracing::debug!(url, status = head.status().as_u16(), "HEAD rejected, retrying with GET");
                self.send(Method::GET, url).await
            }
            Ok(head) => Ok(head),
            Err(e) => {
                tracing::debug!(url, error = %e, "HEAD failed, retrying with GET");
                self.send(Method::GET, url).await
            }
        }
    }

    /// Read at most `max_bytes` of the body.
    async fn read_body(&self, mut response: Response) -> Result<String, reqwest::Error> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.config.max_bytes.saturating_sub(buf.len());
            if chunk.len() >= room {
                buf.extend_from_slice(&chunk[..room]);
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn transport_message(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("Timeout after {}ms", self.config.timeout.as_millis())
        } else {
            format!("Network error: {err}")
        }
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, url: &str, previous_hash: Option<&str>) -> SourceValidationResult {
        let start = Instant::now();
        let mut result = SourceValidationResult::new(url, Utc::now());

        let response = match self.fetch(url).await {
            Ok(r) => r,
            Err(e) => {
                result.error_message = Some(self.transport_message(&e));
                tracing::debug!(url, error = ?result.error_message, "probe failed in transit");
                return result;
            }
        };

        let status = response.status().as_u16();
        match status {
            200 => {
                let html = match self.read_body(response).await {
                    Ok(html) => html,
                    Err(e) => {
                        result.error_message = Some(self.transport_message(&e));
                        tracing::debug!(url, error = ?result.error_message, "body read failed");
                        return result;
                    }
                };
                result.http_status = Some(status);

                let title = extract_title(&html);
                let analysis = analyze(&html, &title);
                result.is_soft_404 = analysis.is_soft_404;
                result.is_parked_domain = analysis.is_parked_domain;
                result.content_changed = has_drifted(previous_hash, Some(analysis.content_hash.as_str()));
                result.content_hash = Some(analysis.content_hash);

                if result.is_soft_404 {
                    result.error_message = Some("Soft 404 detected: page returns 200 but contains error content".into());
                } else if result.is_parked_domain {
                    result.error_message =
                        Some("Parked domain detected: domain may have expired or been abandoned".into());
                }
            }
            404 | 410 => {
                result.http_status = Some(status);
                result.error_message = Some(format!("HTTP {status}: Resource not found"));
            }
            500.. => {
                result.http_status = Some(status);
                result.error_message = Some(format!("HTTP {status}: Server error"));
            }
            _ => {
                result.http_status = Some(status);
                result.error_message = Some(format!("HTTP {status}: Unexpected status code"));
            }
        }

        tracing::debug!(
            url,
            status,
            valid = result.is_valid(),
            changed = result.content_changed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "probed"
        );
        result
    }
}
