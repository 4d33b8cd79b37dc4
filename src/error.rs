// MIT License - Copyright (c) 2026 Peter Wright
// Error types

use crate::config::ConfigError;
use crate::vendor::Vendor;

/// All errors that can occur while talking to an UltraSync panel.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("Unsupported panel: {signature}")]
    UnsupportedPanel { signature: String },

    #[error("Decode error: {details}")]
    Decode { details: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Connection failed: {details}")]
    Connection { details: String },

    #[error("Session expired (HTTP {status})")]
    SessionExpired { status: u16 },

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No area numbered {area}")]
    InvalidArea { area: usize },

    #[error("No zone numbered {zone}")]
    InvalidZone { zone: usize },

    #[error("Zone bypass is not supported by {vendor} panels")]
    BypassUnsupported { vendor: Vendor },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl PanelError {
    pub fn decode(details: impl Into<String>) -> Self {
        Self::Decode { details: details.into() }
    }

    /// Whether this error means the panel session is gone and a single
    /// re-login followed by a replay of the request is warranted.
    pub fn is_session_loss(&self) -> bool {
        matches!(
            self,
            PanelError::Transport(_)
                | PanelError::Connection { .. }
                | PanelError::SessionExpired { .. }
                | PanelError::NotAuthenticated
        )
    }

    /// Errors that propagate out of the public API when strict mode is on.
    pub fn is_strict_failure(&self) -> bool {
        matches!(
            self,
            PanelError::Authentication { .. } | PanelError::UnsupportedPanel { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
