// MIT License - Copyright (c) 2026 Peter Wright
// HTTP transport abstraction

pub mod http;

use crate::error::Result;

pub use http::HttpTransport;

/// One form POST to the panel web server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRequest {
    pub url: String,
    pub referer: String,
    /// Form fields, in the order the panel expects them
    pub form: Vec<(String, String)>,
}

impl PanelRequest {
    pub fn post(url: impl Into<String>, referer: impl Into<String>) -> Self {
        Self { url: url.into(), referer: referer.into(), form: Vec::new() }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Value of a form field, if present.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Status code and body of a panel response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelResponse {
    pub status: u16,
    pub body: String,
}

impl PanelResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// The panel answers with a redirect to the login page once a session
    /// token has expired.
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Sends requests to the panel.
///
/// Implementations must not follow redirects: a 3xx is how the panel
/// signals an expired session.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: &PanelRequest) -> Result<PanelResponse>;
}
