// MIT License - Copyright (c) 2026 Peter Wright
// Vendor profiles

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::config::AlarmScene;
use crate::devices::area::{AreaStates, AreaStatus};
use crate::devices::zone::{ZoneStates, ZoneStatus};

/// Firmware families sharing the NX-595E web protocol.
///
/// Each variant only differs in response encoding, status row layout,
/// label priority and command encoding; see [`VendorProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    /// Interlogix ZeroWire
    ZeroWire,
    /// Interlogix NetworX xGen
    XGen,
    /// xGen8 (NXG-8 series)
    XGen8,
    /// Hills ComNav
    ComNav,
}

/// Body format of the sequence and status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Xml,
}

impl Encoding {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

/// How the initial area status is laid out in the area page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaLayout {
    /// One hex string per 8-area group, one byte per status row
    HexColumns,
    /// Flat integer array, one run of `rows` integers per 8-area group
    FlatWords,
}

/// How zone status rows are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneLayout {
    /// Hex string per row, one byte per 8 zones
    HexRows,
    /// Integer array per row, one 16-bit word per 16 zones
    WordRows,
}

impl ZoneLayout {
    pub fn group_bits(&self) -> u32 {
        match self {
            Self::HexRows => 8,
            Self::WordRows => 16,
        }
    }
}

/// Command encoding family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFamily {
    /// `start` / `mask` / `fnum`
    Bitmask,
    /// `comm` opcode with `data0..data2` operands
    Opcode,
}

/// Static description of one firmware family.
#[derive(Debug)]
pub struct VendorProfile {
    pub vendor: Vendor,
    pub encoding: Encoding,
    pub area_layout: AreaLayout,
    pub zone_layout: ZoneLayout,
    pub control: ControlFamily,
    pub max_zones: usize,
    /// Area status row index -> canonical sub-state
    pub area_rows: &'static [AreaStates],
    /// Label walk order for areas
    pub area_order: &'static [AreaStatus],
    /// Zone status row index -> canonical sub-state
    pub zone_rows: &'static [ZoneStates],
    /// Label walk order for zones
    pub zone_order: &'static [ZoneStatus],
    /// Whether a zone row flags zones that may not be bypassed
    pub reports_bypass_lock: bool,
}

impl VendorProfile {
    /// Status words per zone row.
    pub fn zone_words(&self) -> usize {
        let group = self.zone_layout.group_bits() as usize;
        self.max_zones.div_ceil(group)
    }
}

const AREA_ROWS: [AreaStates; 17] = [
    AreaStates::ARMED,
    AreaStates::PARTIAL,
    AreaStates::READY,
    AreaStates::FIRE,
    AreaStates::BURGLARY,
    AreaStates::PANIC,
    AreaStates::MEDICAL,
    AreaStates::EXIT_DELAY_1,
    AreaStates::EXIT_DELAY_2,
    AreaStates::ENTRY_DELAY,
    AreaStates::ZONE_BYPASS,
    AreaStates::ZONE_TROUBLE,
    AreaStates::ZONE_TAMPER,
    AreaStates::ZONE_LOW_BATTERY,
    AreaStates::ZONE_SUPERVISION,
    AreaStates::CHIME,
    AreaStates::FORCEABLE,
];

// xGen firmware appends night and instant arming rows.
const XGEN_AREA_ROWS: [AreaStates; 19] = [
    AreaStates::ARMED,
    AreaStates::PARTIAL,
    AreaStates::READY,
    AreaStates::FIRE,
    AreaStates::BURGLARY,
    AreaStates::PANIC,
    AreaStates::MEDICAL,
    AreaStates::EXIT_DELAY_1,
    AreaStates::EXIT_DELAY_2,
    AreaStates::ENTRY_DELAY,
    AreaStates::ZONE_BYPASS,
    AreaStates::ZONE_TROUBLE,
    AreaStates::ZONE_TAMPER,
    AreaStates::ZONE_LOW_BATTERY,
    AreaStates::ZONE_SUPERVISION,
    AreaStates::CHIME,
    AreaStates::FORCEABLE,
    AreaStates::NIGHT,
    AreaStates::INSTANT,
];

const AREA_ORDER: [AreaStatus; 15] = [
    AreaStatus::FireAlarm,
    AreaStatus::BurgAlarm,
    AreaStatus::PanicAlarm,
    AreaStatus::MedicalAlarm,
    AreaStatus::ExitDelay1,
    AreaStatus::ExitDelay2,
    AreaStatus::EntryDelay,
    AreaStatus::ArmedAway,
    AreaStatus::ArmedStay,
    AreaStatus::ZoneTamper,
    AreaStatus::ZoneTrouble,
    AreaStatus::ZoneLowBattery,
    AreaStatus::ZoneSupervision,
    AreaStatus::Ready,
    AreaStatus::ZoneBypass,
];

// ComNav lists Ready ahead of the armed states.
const COMNAV_AREA_ORDER: [AreaStatus; 15] = [
    AreaStatus::FireAlarm,
    AreaStatus::BurgAlarm,
    AreaStatus::PanicAlarm,
    AreaStatus::MedicalAlarm,
    AreaStatus::EntryDelay,
    AreaStatus::ExitDelay1,
    AreaStatus::ExitDelay2,
    AreaStatus::Ready,
    AreaStatus::ArmedAway,
    AreaStatus::ArmedStay,
    AreaStatus::ZoneTamper,
    AreaStatus::ZoneTrouble,
    AreaStatus::ZoneLowBattery,
    AreaStatus::ZoneSupervision,
    AreaStatus::ZoneBypass,
];

const ZONE_ROWS: [ZoneStates; 18] = [
    ZoneStates::NOT_READY,
    ZoneStates::TAMPER,
    ZoneStates::TROUBLE,
    ZoneStates::BYPASS,
    ZoneStates::INHIBITED,
    ZoneStates::ALARM,
    ZoneStates::LOW_BATTERY,
    ZoneStates::SUPERVISION,
    ZoneStates::TEST_FAIL,
    ZoneStates::CHIME,
    ZoneStates::ALARM_MEMORY,
    ZoneStates::MASKED,
    ZoneStates::DIRTY,
    ZoneStates::LOW_SENSITIVITY,
    ZoneStates::FAULT,
    ZoneStates::empty(),
    ZoneStates::BYPASS_LOCK,
    ZoneStates::empty(),
];

const COMNAV_ZONE_ROWS: [ZoneStates; 14] = [
    ZoneStates::NOT_READY,
    ZoneStates::TAMPER,
    ZoneStates::TROUBLE,
    ZoneStates::BYPASS,
    ZoneStates::INHIBITED,
    ZoneStates::ALARM,
    ZoneStates::LOW_BATTERY,
    ZoneStates::SUPERVISION,
    ZoneStates::empty(),
    ZoneStates::CHIME,
    ZoneStates::empty(),
    ZoneStates::empty(),
    ZoneStates::empty(),
    ZoneStates::empty(),
];

const ZONE_ORDER: [ZoneStatus; 14] = [
    ZoneStatus::Alarm,
    ZoneStatus::Tamper,
    ZoneStatus::Trouble,
    ZoneStatus::Fault,
    ZoneStatus::LowBattery,
    ZoneStatus::SupervisionFault,
    ZoneStatus::TestFail,
    ZoneStatus::Masked,
    ZoneStatus::Dirty,
    ZoneStatus::LowSensitivity,
    ZoneStatus::Bypass,
    ZoneStatus::Inhibited,
    ZoneStatus::AlarmMemory,
    ZoneStatus::NotReady,
];

const COMNAV_ZONE_ORDER: [ZoneStatus; 8] = [
    ZoneStatus::Alarm,
    ZoneStatus::Tamper,
    ZoneStatus::Trouble,
    ZoneStatus::LowBattery,
    ZoneStatus::SupervisionFault,
    ZoneStatus::Bypass,
    ZoneStatus::Inhibited,
    ZoneStatus::NotReady,
];

static ZEROWIRE: VendorProfile = VendorProfile {
    vendor: Vendor::ZeroWire,
    encoding: Encoding::Json,
    area_layout: AreaLayout::HexColumns,
    zone_layout: ZoneLayout::HexRows,
    control: ControlFamily::Bitmask,
    max_zones: 40,
    area_rows: &AREA_ROWS,
    area_order: &AREA_ORDER,
    zone_rows: &ZONE_ROWS,
    zone_order: &ZONE_ORDER,
    reports_bypass_lock: true,
};

static XGEN: VendorProfile = VendorProfile {
    vendor: Vendor::XGen,
    encoding: Encoding::Json,
    area_layout: AreaLayout::HexColumns,
    zone_layout: ZoneLayout::HexRows,
    control: ControlFamily::Bitmask,
    max_zones: 40,
    area_rows: &XGEN_AREA_ROWS,
    area_order: &AREA_ORDER,
    zone_rows: &ZONE_ROWS,
    zone_order: &ZONE_ORDER,
    reports_bypass_lock: true,
};

static XGEN8: VendorProfile = VendorProfile {
    vendor: Vendor::XGen8,
    encoding: Encoding::Json,
    area_layout: AreaLayout::HexColumns,
    zone_layout: ZoneLayout::WordRows,
    control: ControlFamily::Opcode,
    max_zones: 32,
    area_rows: &XGEN_AREA_ROWS,
    area_order: &AREA_ORDER,
    zone_rows: &ZONE_ROWS,
    zone_order: &ZONE_ORDER,
    reports_bypass_lock: true,
};

static COMNAV: VendorProfile = VendorProfile {
    vendor: Vendor::ComNav,
    encoding: Encoding::Xml,
    area_layout: AreaLayout::FlatWords,
    zone_layout: ZoneLayout::WordRows,
    control: ControlFamily::Opcode,
    max_zones: 32,
    area_rows: &AREA_ROWS,
    area_order: &COMNAV_AREA_ORDER,
    zone_rows: &COMNAV_ZONE_ROWS,
    zone_order: &COMNAV_ZONE_ORDER,
    reports_bypass_lock: false,
};

/// Script path shapes that identify each family on the login page.
const SIGNATURES: [(Vendor, &str); 4] = [
    (
        Vendor::ZeroWire,
        r#"src=["']/v_ZW_(?P<major>\d+)_(?P<minor>\d+)_(?P<release>[A-Za-z0-9]+)/"#,
    ),
    (
        Vendor::XGen,
        r#"src=["']/v_XG_(?P<major>\d+)_(?P<minor>\d+)_(?P<release>[A-Za-z0-9]+)/"#,
    ),
    (
        Vendor::XGen8,
        r#"src=["']/xg8/v(?P<major>\d+)\.(?P<minor>\d+)-(?P<release>[A-Za-z0-9]+)/"#,
    ),
    (
        Vendor::ComNav,
        r#"src=["']/v(?P<major>\d+)\.(?P<minor>\d+)(?P<release>[A-Za-z])/"#,
    ),
];

static SIGNATURE_PATTERNS: LazyLock<Vec<(Vendor, Regex)>> = LazyLock::new(|| {
    SIGNATURES
        .iter()
        .map(|(vendor, pattern)| {
            (*vendor, Regex::new(pattern).expect("vendor signature patterns are valid"))
        })
        .collect()
});

static SCRIPT_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<script[^>]*src=["']([^"']+)["']"#).expect("valid script pattern"));

/// Vendor plus firmware identity, as read from the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelSignature {
    pub vendor: Vendor,
    pub version: String,
    pub release: String,
}

impl Vendor {
    pub fn profile(self) -> &'static VendorProfile {
        match self {
            Self::ZeroWire => &ZEROWIRE,
            Self::XGen => &XGEN,
            Self::XGen8 => &XGEN8,
            Self::ComNav => &COMNAV,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ZeroWire => "ZeroWire",
            Self::XGen => "xGen",
            Self::XGen8 => "xGen8",
            Self::ComNav => "ComNav",
        }
    }

    /// Identify the firmware family from the script path on a login page.
    pub fn detect(body: &str) -> Option<PanelSignature> {
        SIGNATURE_PATTERNS.iter().find_map(|(vendor, pattern)| {
            let caps = pattern.captures(body)?;
            let major: u32 = caps["major"].parse().ok()?;
            Some(PanelSignature {
                vendor: *vendor,
                version: format!("{}.{}", major, &caps["minor"]),
                release: caps["release"].to_string(),
            })
        })
    }

    /// Form fields that put area `bank` into `scene`.
    pub fn scene_payload(self, bank: usize, scene: AlarmScene) -> Vec<(&'static str, String)> {
        let mask = 1u32 << (bank % 8);
        match self.profile().control {
            ControlFamily::Bitmask => {
                let fnum = match scene {
                    AlarmScene::Disarm => 0,
                    AlarmScene::Stay => 1,
                    AlarmScene::Away => 15,
                };
                vec![
                    ("start", (bank / 8).to_string()),
                    ("mask", mask.to_string()),
                    ("fnum", fnum.to_string()),
                ]
            }
            ControlFamily::Opcode => {
                let function = match scene {
                    AlarmScene::Disarm => 16,
                    AlarmScene::Away => 17,
                    AlarmScene::Stay => 18,
                };
                vec![
                    ("comm", "80".to_string()),
                    ("data0", "2".to_string()),
                    ("data1", mask.to_string()),
                    ("data2", function.to_string()),
                ]
            }
        }
    }

    /// Form fields that toggle bypass on zone `bank`, if the family has an
    /// opcode for it.
    pub fn bypass_payload(self, bank: usize) -> Option<Vec<(&'static str, String)>> {
        match self.profile().control {
            ControlFamily::Bitmask => None,
            ControlFamily::Opcode => {
                Some(vec![("comm", "82".to_string()), ("data0", bank.to_string())])
            }
        }
    }
}

/// First `<script src>` on a page, for diagnostics when detection fails.
pub fn first_script_path(body: &str) -> Option<String> {
    SCRIPT_SRC.captures(body).map(|caps| caps[1].to_string())
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Vendor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(script: &str) -> String {
        format!(r#"<html><head><script type="text/javascript" src="{script}"></script></head></html>"#)
    }

    #[test]
    fn test_detect_zerowire() {
        let sig = Vendor::detect(&page("/v_ZW_03_02_C/status.js")).unwrap();
        assert_eq!(sig.vendor, Vendor::ZeroWire);
        assert_eq!(sig.version, "3.02");
        assert_eq!(sig.release, "C");
    }

    #[test]
    fn test_detect_xgen() {
        let sig = Vendor::detect(&page("/v_XG_04_01_B/status.js")).unwrap();
        assert_eq!(sig.vendor, Vendor::XGen);
        assert_eq!(sig.version, "4.01");
        assert_eq!(sig.release, "B");
    }

    #[test]
    fn test_detect_xgen8() {
        let sig = Vendor::detect(&page("/xg8/v8.000-0/master.js")).unwrap();
        assert_eq!(sig.vendor, Vendor::XGen8);
        assert_eq!(sig.version, "8.000");
        assert_eq!(sig.release, "0");
    }

    #[test]
    fn test_detect_comnav() {
        let sig = Vendor::detect(&page("/v0.106j/status.js")).unwrap();
        assert_eq!(sig.vendor, Vendor::ComNav);
        assert_eq!(sig.version, "0.106");
        assert_eq!(sig.release, "j");

        let sig = Vendor::detect(&page("/v0.108m/status.js")).unwrap();
        assert_eq!(sig.version, "0.108");
        assert_eq!(sig.release, "m");
    }

    #[test]
    fn test_detect_unknown() {
        let body = page("/js/jquery.min.js");
        assert_eq!(Vendor::detect(&body), None);
        assert_eq!(first_script_path(&body).as_deref(), Some("/js/jquery.min.js"));
    }

    #[test]
    fn test_bitmask_scene_payload() {
        assert_eq!(
            Vendor::ZeroWire.scene_payload(0, AlarmScene::Stay),
            vec![("start", "0".into()), ("mask", "1".into()), ("fnum", "1".into())]
        );
        assert_eq!(
            Vendor::XGen.scene_payload(2, AlarmScene::Away),
            vec![("start", "0".into()), ("mask", "4".into()), ("fnum", "15".into())]
        );
    }

    #[test]
    fn test_opcode_scene_payload() {
        assert_eq!(
            Vendor::ComNav.scene_payload(1, AlarmScene::Disarm),
            vec![
                ("comm", "80".into()),
                ("data0", "2".into()),
                ("data1", "2".into()),
                ("data2", "16".into()),
            ]
        );
    }

    #[test]
    fn test_bypass_payload_only_for_opcode_family() {
        assert_eq!(Vendor::ZeroWire.bypass_payload(3), None);
        assert_eq!(Vendor::XGen.bypass_payload(3), None);
        assert_eq!(
            Vendor::XGen8.bypass_payload(3),
            Some(vec![("comm", "82".into()), ("data0", "3".into())])
        );
        assert!(Vendor::ComNav.bypass_payload(0).is_some());
    }

    #[test]
    fn test_profile_tables() {
        for vendor in [Vendor::ZeroWire, Vendor::XGen, Vendor::XGen8, Vendor::ComNav] {
            let profile = vendor.profile();
            assert_eq!(profile.vendor, vendor);
            assert!(profile.max_zones <= crate::constants::MAX_ZONES);
            assert!(!profile.area_order.contains(&AreaStatus::NotReady));
        }
        assert_eq!(Vendor::ZeroWire.profile().zone_words(), 5);
        assert_eq!(Vendor::XGen8.profile().zone_words(), 2);
        assert_eq!(Vendor::ComNav.profile().zone_rows.len(), 14);
    }
}
