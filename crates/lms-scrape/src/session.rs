//! HTTP session abstraction with cookie state.
//!
//! The pipeline only talks to the network through [`HttpSession`]. Transport
//! failures surface as `Unreachable`; status codes are left for callers to
//! judge, because the login flow needs to read non-2xx bodies too.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};

/// A text response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// A binary response, used for document payloads.
#[derive(Debug, Clone)]
pub struct ByteResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub bytes: Vec<u8>,
}

/// Case-insensitive header lookup.
fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl ByteResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server sent an HTML page rather than a file.
    ///
    /// A missing or generic content type falls back to sniffing the body.
    pub fn is_html(&self) -> bool {
        match self.header("content-type").map(str::to_ascii_lowercase) {
            Some(ct) if ct.contains("text/html") => true,
            Some(ct) if !GENERIC_TYPES.iter().any(|g| ct.starts_with(g)) => false,
            _ => looks_like_html(&self.bytes),
        }
    }
}

/// Content types that say nothing about the payload.
const GENERIC_TYPES: &[&str] = &["text/plain", "application/octet-stream", "binary/octet-stream"];

/// Whether `bytes` opens with an HTML document prologue.
fn looks_like_html(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let head = &bytes[start..bytes.len().min(start + 16)];
    let head = head.to_ascii_lowercase();
    head.starts_with(b"<!doctype html") || head.starts_with(b"<html")
}

/// Cookie-carrying HTTP capability consumed by the pipeline.
#[async_trait]
pub trait HttpSession: Send + Sync {
    /// GET a page as text.
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// POST url-encoded form fields.
    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<HttpResponse>;

    /// GET a payload as raw bytes.
    async fn get_bytes(&self, url: &str) -> Result<ByteResponse>;
}

/// [`HttpSession`] backed by a cookie-enabled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestSession {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestSession {
    /// Build a fresh session with an empty cookie jar.
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ScrapeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Wrap an existing client. Cookie handling is whatever the client does.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn send(&self, url: &str, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        builder
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ScrapeError::unreachable(url, e))
    }
}

fn collect_headers(resp: &reqwest::Response) -> Vec<(String, String)> {
    resp.headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect()
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let r = self.send(url, self.client.get(url)).await?;
        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let headers = collect_headers(&r);
        let body = r
            .text()
            .await
            .map_err(|e| ScrapeError::unreachable(url, e))?;
        debug!("GET {url} -> {status} ({} bytes)", body.len());

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            body,
        })
    }

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<HttpResponse> {
        let r = self.send(url, self.client.post(url).form(fields)).await?;
        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let headers = collect_headers(&r);
        let body = r
            .text()
            .await
            .map_err(|e| ScrapeError::unreachable(url, e))?;
        debug!("POST {url} -> {status}, landed on {final_url}");

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            body,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<ByteResponse> {
        let r = self.send(url, self.client.get(url)).await?;
        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let headers = collect_headers(&r);
        let bytes = r
            .bytes()
            .await
            .map_err(|e| ScrapeError::unreachable(url, e))?
            .to_vec();
        debug!("GET {url} -> {status} ({} bytes, binary)", bytes.len());

        Ok(ByteResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            bytes,
        })
    }
}
