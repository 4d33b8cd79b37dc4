// MIT License - Copyright (c) 2026 Peter Wright
// reqwest-backed transport

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::config::{BasicAuth, PanelConfig};
use crate::error::{PanelError, Result};
use crate::transport::{PanelRequest, PanelResponse, Transport};

/// Transport speaking plain HTTP(S) to the panel.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    basic_auth: Option<BasicAuth>,
}

impl HttpTransport {
    pub fn new(config: &PanelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .redirect(Policy::none())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;

        Ok(Self { client, basic_auth: config.basic_auth.clone() })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &PanelRequest) -> Result<PanelResponse> {
        let mut headers = HeaderMap::new();
        if let Ok(referer) = HeaderValue::from_str(&request.referer) {
            headers.insert(REFERER, referer);
        }

        let mut builder = self.client.post(&request.url).form(&request.form).headers(headers);

        if let Some(auth) = &self.basic_auth {
            builder = builder.basic_auth(&auth.user, Some(&auth.password));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                PanelError::Connection { details: e.to_string() }
            } else {
                PanelError::Transport(e)
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("{} -> HTTP {} ({} bytes)", request.url, status, body.len());

        Ok(PanelResponse { status, body })
    }
}
