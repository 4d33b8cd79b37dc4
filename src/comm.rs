// MIT License - Copyright (c) 2026 Peter Wright
// Session handling

use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::PanelConfig;
use crate::constants::Endpoint;
use crate::error::{PanelError, Result};
use crate::protocol::session_token;
use crate::transport::{PanelRequest, PanelResponse, Transport};
use crate::vendor::{first_script_path, Encoding, PanelSignature, Vendor};

/// An authenticated panel session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub signature: PanelSignature,
    /// Monotonic time of the last completed sync (or login)
    pub synced_at: Option<Instant>,
    /// Wall-clock time of the last completed sync (or login)
    pub as_of: Option<DateTime<Utc>>,
}

/// Low-level communication with the panel web server.
///
/// Owns the transport and the session token. Requests sent through
/// [`PanelComm::send`] are not retried; the re-login policy lives one level
/// up, in [`UltraSync`](crate::panel::UltraSync).
pub struct PanelComm<T: Transport> {
    config: PanelConfig,
    transport: T,
    base_url: String,
    session: Option<Session>,
}

impl<T: Transport> PanelComm<T> {
    pub fn new(config: PanelConfig, transport: T) -> Self {
        let base_url = config.base_url();
        Self { config, transport, base_url, session: None }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn vendor(&self) -> Option<Vendor> {
        self.session.as_ref().map(|s| s.signature.vendor)
    }

    /// Response encoding of the current session. JSON until a vendor is known.
    pub fn encoding(&self) -> Encoding {
        self.vendor().map_or(Encoding::Json, |v| v.profile().encoding)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Post credentials and establish a new session.
    ///
    /// Returns the login page body, which carries the area definitions.
    pub async fn authenticate(&mut self) -> Result<String> {
        // any previous token is dead the moment we log in again
        self.session = None;

        info!("Logging in to {} as '{}'", self.base_url, self.config.user);
        let request = PanelRequest::post(
            self.url(&Endpoint::Login.path(Encoding::Json)),
            self.url(Endpoint::Login.referer()),
        )
        .field("lgname", self.config.user.clone())
        .field("lgpin", self.config.pin.clone());

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(PanelError::HttpStatus { status: response.status });
        }

        let token = session_token(&response.body).ok_or_else(|| PanelError::Authentication {
            reason: "no session token in login response".to_string(),
        })?;

        let signature = Vendor::detect(&response.body).ok_or_else(|| PanelError::UnsupportedPanel {
            signature: first_script_path(&response.body).unwrap_or_else(|| "<no script>".to_string()),
        })?;

        info!(
            "Authenticated; panel is {} v{} release {}",
            signature.vendor, signature.version, signature.release
        );
        self.session = Some(Session { token, signature, synced_at: None, as_of: None });
        Ok(response.body)
    }

    /// Send one request using the current session token.
    ///
    /// A 3xx is reported as [`PanelError::SessionExpired`], any other
    /// non-200 as [`PanelError::HttpStatus`].
    pub async fn send(&self, endpoint: Endpoint, form: &[(&str, String)]) -> Result<PanelResponse> {
        let mut request = PanelRequest::post(
            self.url(&endpoint.path(self.encoding())),
            self.url(endpoint.referer()),
        );
        if endpoint.needs_session() {
            let session = self.session.as_ref().ok_or(PanelError::NotAuthenticated)?;
            request = request.field("sess", session.token.clone());
        }
        for (key, value) in form {
            request = request.field(*key, value.clone());
        }

        debug!("POST {} {:?}", request.url, form);
        let response = self.transport.send(&request).await?;
        if response.is_redirect() {
            return Err(PanelError::SessionExpired { status: response.status });
        }
        if !response.is_success() {
            return Err(PanelError::HttpStatus { status: response.status });
        }
        Ok(response)
    }

    /// Forget the session without telling the panel.
    pub fn invalidate(&mut self) {
        self.session = None;
    }

    /// Tell the panel to drop the session. The local session is cleared
    /// whatever the outcome.
    pub async fn end_session(&mut self) -> Result<()> {
        if !self.is_authenticated() {
            return Ok(());
        }
        let result = self.send(Endpoint::Logout, &[]).await.map(|_| ());
        if let Err(e) = &result {
            warn!("Logout request failed: {}", e);
        }
        self.session = None;
        result
    }
}
