// MIT License - Copyright (c) 2026 Peter Wright
// Protocol constants

use crate::vendor::Encoding;

/// Maximum number of areas any supported panel exposes.
pub const MAX_AREAS: usize = 8;
/// Maximum number of zones any supported panel exposes.
pub const MAX_ZONES: usize = 40;
/// Entries in the area half of a sequence snapshot.
pub const AREA_SEQUENCE_LEN: usize = 8;
/// Areas are always grouped eight to a status word.
pub const AREA_GROUP_BITS: u32 = 8;

/// Decoded names that mark an unused area or zone slot.
pub const PLACEHOLDER_NAMES: [&str; 3] = ["!", "-", ""];

/// System-fault entry the panel reports when nothing is wrong.
pub const NO_SYSTEM_FAULTS: &str = "No System Faults";

/// Pages and handlers on the panel web server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `login.cgi`: credentials in, area page out (unauthenticated)
    Login,
    /// `logout.cgi`
    Logout,
    /// `user/zones.htm`: zone names, sequences and status rows
    Zones,
    /// `user/seq.{json,xml}`: sequence snapshot
    Sequence,
    /// `user/status.{json,xml}`: one area status bank (`arsel`)
    AreaStatus,
    /// `user/zstate.{json,xml}`: one zone status row (`state`)
    ZoneStatus,
    /// `user/keyfunction.cgi`: arm / disarm
    KeyFunction,
    /// `user/zonefunction.cgi`: zone bypass toggle
    ZoneFunction,
}

impl Endpoint {
    /// Path relative to the panel root for a panel speaking `encoding`.
    pub fn path(&self, encoding: Encoding) -> String {
        let ext = encoding.extension();
        match self {
            Self::Login => "login.cgi".to_string(),
            Self::Logout => "logout.cgi".to_string(),
            Self::Zones => "user/zones.htm".to_string(),
            Self::Sequence => format!("user/seq.{ext}"),
            Self::AreaStatus => format!("user/status.{ext}"),
            Self::ZoneStatus => format!("user/zstate.{ext}"),
            Self::KeyFunction => "user/keyfunction.cgi".to_string(),
            Self::ZoneFunction => "user/zonefunction.cgi".to_string(),
        }
    }

    /// Page the panel expects in the `Referer` header.
    pub fn referer(&self) -> &'static str {
        match self {
            Self::Login => "login.htm",
            _ => "login.cgi",
        }
    }

    /// Whether the request carries the `sess` token.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Self::Login)
    }
}
