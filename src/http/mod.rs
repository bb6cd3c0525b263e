//! Endpoint parsing and HTTP transport.
//!
//! parse_endpoint -> validated http/https `Url`
//! parse_method   -> `reqwest::Method` from an operator-supplied token
//! HttpClient     -> synchronous `send` over an owned Tokio runtime
//! StatusBucket   -> response status classification for reporting
//!
use anyhow::{Context, Result, bail};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Parse an operator-supplied endpoint. Only http/https make sense for a
/// JSON API probe; anything else is rejected up front.
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("endpoint is empty");
    }
    let url =
        Url::parse(trimmed).with_context(|| format!("invalid endpoint URL: '{trimmed}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("unsupported endpoint scheme '{other}' (expected http or https)"),
    }
}

/// Parse an HTTP method token (case-insensitive, extension methods allowed).
pub fn parse_method(raw: &str) -> Result<Method> {
    let token = raw.trim().to_ascii_uppercase();
    if token.is_empty() {
        bail!("HTTP method is empty");
    }
    Method::from_bytes(token.as_bytes()).with_context(|| format!("invalid HTTP method: '{raw}'"))
}

/* ---- Client ---- */

/// Transport knobs shared by the source fetch and every submission.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Proxy URL for all traffic (e.g. http://127.0.0.1:8080).
    pub proxy: Option<String>,
    /// Accept invalid TLS certificates (intercepting proxies, lab targets).
    pub insecure: bool,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            proxy: None,
            insecure: false,
            timeout_secs: 30,
        }
    }
}

/// A buffered response: status, declared content type and full body text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    /// Whether the declared media type is JSON (parameters stripped, so
    /// `application/json; charset=utf-8` and `application/hal+json` pass).
    pub fn is_json(&self) -> bool {
        let Some(ct) = self.content_type.as_deref() else {
            return false;
        };
        let media = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        media == "application/json" || media.ends_with("+json")
    }
}

/// Synchronous HTTP client: a reqwest client driven through an owned Tokio
/// runtime, one request at a time. The probe flow is strictly sequential,
/// so the runtime never has more than a single request in flight.
pub struct HttpClient {
    rt: tokio::runtime::Runtime,
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure);
        if let Some(proxy) = &config.proxy {
            let proxy =
                reqwest::Proxy::all(proxy).with_context(|| format!("invalid proxy URL: '{proxy}'"))?;
            builder = builder.proxy(proxy);
        }
        let inner = builder.build().context("failed to build HTTP client")?;
        let rt = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
        Ok(HttpClient { rt, inner })
    }

    /// Send one request and buffer the entire response.
    pub fn send(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        json_body: Option<&Value>,
    ) -> Result<HttpResponse> {
        crate::log_trace!("{} {}", method, url);
        self.rt.block_on(async {
            let mut request = self
                .inner
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(body) = json_body {
                request = request.json(body);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("request to '{url}' failed"))?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .text()
                .await
                .with_context(|| format!("failed to read response body from '{url}'"))?;
            Ok(HttpResponse {
                status,
                content_type,
                body,
            })
        })
    }
}

/* ---- Status Classification ---- */

/// Coarse response status buckets used for coloring and the per-subtree
/// success flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    /// 200 / 201 / 202: the target took the mutation.
    Accepted,
    /// 401 / 403 / 404 / 405 and all 5xx.
    Rejected,
    /// 301 / 302.
    Redirected,
    /// Everything else.
    Other,
}

impl StatusBucket {
    pub fn classify(status: u16) -> Self {
        match status {
            200 | 201 | 202 => StatusBucket::Accepted,
            401 | 403 | 404 | 405 | 500..=599 => StatusBucket::Rejected,
            301 | 302 => StatusBucket::Redirected,
            _ => StatusBucket::Other,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, StatusBucket::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Accepted => "accepted",
            StatusBucket::Rejected => "rejected",
            StatusBucket::Redirected => "redirected",
            StatusBucket::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_endpoint_http_and_https() {
        assert!(parse_endpoint("http://api.example/users/1").is_ok());
        assert!(parse_endpoint("https://api.example/users/1").is_ok());
    }

    #[test]
    fn parse_endpoint_rejects_other_schemes() {
        let err = parse_endpoint("ftp://example.com/x").unwrap_err();
        assert!(err.to_string().contains("unsupported endpoint scheme"));
    }

    #[test]
    fn parse_endpoint_rejects_empty_and_garbage() {
        assert!(parse_endpoint("   ").is_err());
        assert!(parse_endpoint("not a url").is_err());
    }

    #[test]
    fn parse_method_is_case_insensitive() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Put").unwrap(), Method::PUT);
        assert_eq!(parse_method("PATCH").unwrap(), Method::PATCH);
    }

    #[test]
    fn parse_method_rejects_invalid_tokens() {
        assert!(parse_method("").is_err());
        assert!(parse_method("GE T").is_err());
    }

    #[test]
    fn classify_buckets() {
        for s in [200, 201, 202] {
            assert_eq!(StatusBucket::classify(s), StatusBucket::Accepted);
        }
        for s in [401, 403, 404, 405, 500, 502, 599] {
            assert_eq!(StatusBucket::classify(s), StatusBucket::Rejected);
        }
        for s in [301, 302] {
            assert_eq!(StatusBucket::classify(s), StatusBucket::Redirected);
        }
        for s in [204, 303, 307, 400, 418, 429] {
            assert_eq!(StatusBucket::classify(s), StatusBucket::Other);
        }
    }

    #[test]
    fn json_content_type_detection() {
        let resp = |ct: Option<&str>| HttpResponse {
            status: 200,
            content_type: ct.map(str::to_string),
            body: String::new(),
        };
        assert!(resp(Some("application/json")).is_json());
        assert!(resp(Some("application/json; charset=utf-8")).is_json());
        assert!(resp(Some("application/hal+json")).is_json());
        assert!(!resp(Some("text/html")).is_json());
        assert!(!resp(None).is_json());
    }
}
