//! In-memory [`HttpSession`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, ScrapeError};
use crate::session::{ByteResponse, HttpResponse, HttpSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A canned reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok {
        status: u16,
        final_url: Option<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
    Unreachable(String),
}

impl Reply {
    pub fn html(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Ok {
            status,
            final_url: None,
            headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn file(bytes: &[u8], headers: &[(&str, &str)]) -> Self {
        Reply::Ok {
            status: 200,
            final_url: None,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: bytes.to_vec(),
        }
    }

    pub fn redirected_to(mut self, url: &str) -> Self {
        if let Reply::Ok { final_url, .. } = &mut self {
            *final_url = Some(url.to_string());
        }
        self
    }
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub fields: Vec<(String, String)>,
}

/// Routes keyed by method and exact URL. Queued replies are consumed in
/// order; the last one stays for any further calls.
#[derive(Default)]
pub struct MockSession {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: Method, url: &str, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_get(self, url: &str, reply: Reply) -> Self {
        self.on(Method::Get, url, reply)
    }

    pub fn on_post(self, url: &str, reply: Reply) -> Self {
        self.on(Method::Post, url, reply)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.url == url)
            .count()
    }

    fn respond(
        &self,
        method: Method,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<(u16, String, Vec<(String, String)>, Vec<u8>)> {
        self.calls.lock().unwrap().push(Call {
            method,
            url: url.to_string(),
            fields: fields.to_vec(),
        });

        let mut routes = self.routes.lock().unwrap();
        let reply = match routes.get_mut(&(method, url.to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            Some(Reply::Ok {
                status,
                final_url,
                headers,
                body,
            }) => Ok((status, final_url.unwrap_or_else(|| url.to_string()), headers, body)),
            Some(Reply::Unreachable(reason)) => Err(ScrapeError::unreachable(url, reason)),
            None => Ok((404, url.to_string(), Vec::new(), b"not found".to_vec())),
        }
    }
}

#[async_trait]
impl HttpSession for MockSession {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let (status, final_url, headers, body) = self.respond(Method::Get, url, &[])?;
        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<HttpResponse> {
        let (status, final_url, headers, body) = self.respond(Method::Post, url, fields)?;
        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<ByteResponse> {
        let (status, final_url, headers, bytes) = self.respond(Method::Get, url, &[])?;
        Ok(ByteResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            bytes,
        })
    }
}
