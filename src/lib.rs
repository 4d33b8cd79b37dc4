// MIT License - Copyright (c) 2026 Peter Wright
//
//! # ultrasync
//!
//! Client for the web interface of NX-595E / UltraSync family alarm panels
//! (Interlogix ZeroWire, NetworX xGen, xGen8 and Hills ComNav).
//!
//! The client logs in, detects the firmware family, mirrors the panel's
//! areas and zones in memory and keeps that mirror current through the
//! panel's sequence-number polling protocol. Areas can be armed or disarmed
//! and, where the firmware allows it, zones bypassed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use ultrasync::{AlarmScene, PanelConfig, UltraSync};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PanelConfig::builder()
//!         .host("zerowire")
//!         .user("User 1")
//!         .pin("1234")
//!         .build();
//!
//!     let mut panel = UltraSync::new(config)?;
//!     if let Some(details) = panel.details(Duration::from_secs(1)).await? {
//!         println!("{}", serde_json::to_string_pretty(&details)?);
//!     }
//!
//!     panel.set_alarm(&[1], AlarmScene::Away).await?;
//!     panel.logout().await?;
//!     Ok(())
//! }
//! ```

pub mod bank;
pub mod comm;
pub mod config;
pub mod constants;
pub mod devices;
pub mod error;
pub mod panel;
pub mod protocol;
pub mod sync;
pub mod transport;
pub mod vendor;

// Re-exports for convenience
pub use config::{AlarmScene, BasicAuth, ConfigError, PanelConfig, PanelConfigBuilder};
pub use devices::area::{Area, AreaLabel, AreaStates, AreaStatus, ExitModifier};
pub use devices::zone::{Zone, ZoneStates, ZoneStatus};
pub use error::{PanelError, Result};
pub use panel::{Details, UltraSync};
pub use sync::SequenceSnapshot;
pub use transport::{HttpTransport, PanelRequest, PanelResponse, Transport};
pub use vendor::{PanelSignature, Vendor, VendorProfile};
