// MIT License - Copyright (c) 2026 Peter Wright
// Zone state derivation

use std::fmt;

use bitflags::bitflags;
use serde::{Serialize, Serializer};

use crate::bank::{next_sequence, render_bank_state};
use crate::vendor::VendorProfile;

bitflags! {
    /// Canonical zone sub-states, mapped from vendor status rows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ZoneStates: u32 {
        const NOT_READY       = 1 << 0;
        const TAMPER          = 1 << 1;
        const TROUBLE         = 1 << 2;
        const BYPASS          = 1 << 3;
        const INHIBITED       = 1 << 4;
        const ALARM           = 1 << 5;
        const LOW_BATTERY     = 1 << 6;
        const SUPERVISION     = 1 << 7;
        const TEST_FAIL       = 1 << 8;
        const CHIME           = 1 << 9;
        const ALARM_MEMORY    = 1 << 10;
        const MASKED          = 1 << 11;
        const DIRTY           = 1 << 12;
        const LOW_SENSITIVITY = 1 << 13;
        const FAULT           = 1 << 14;
        /// Zone is programmed so that it cannot be bypassed
        const BYPASS_LOCK     = 1 << 15;
    }
}

impl ZoneStates {
    /// Map a virtual bank through a vendor row table.
    pub fn from_virtual_bank(bits: &[bool], rows: &[ZoneStates]) -> Self {
        bits.iter()
            .zip(rows)
            .filter(|(set, _)| **set)
            .fold(Self::empty(), |acc, (_, flag)| acc | *flag)
    }
}

/// Zone status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneStatus {
    Ready,
    NotReady,
    Tamper,
    Trouble,
    Bypass,
    Inhibited,
    Alarm,
    LowBattery,
    SupervisionFault,
    TestFail,
    AlarmMemory,
    Masked,
    Dirty,
    LowSensitivity,
    Fault,
}

impl ZoneStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "Not Ready",
            Self::Tamper => "Tamper",
            Self::Trouble => "Trouble",
            Self::Bypass => "Bypass",
            Self::Inhibited => "Inhibited",
            Self::Alarm => "Alarm",
            Self::LowBattery => "Low Battery",
            Self::SupervisionFault => "Supervision Fault",
            Self::TestFail => "Test Fail",
            Self::AlarmMemory => "Alarm Memory",
            Self::Masked => "Masked",
            Self::Dirty => "Dirty",
            Self::LowSensitivity => "Low Sensitivity",
            Self::Fault => "Fault",
        }
    }

    pub fn flag(&self) -> ZoneStates {
        match self {
            Self::Ready => ZoneStates::empty(),
            Self::NotReady => ZoneStates::NOT_READY,
            Self::Tamper => ZoneStates::TAMPER,
            Self::Trouble => ZoneStates::TROUBLE,
            Self::Bypass => ZoneStates::BYPASS,
            Self::Inhibited => ZoneStates::INHIBITED,
            Self::Alarm => ZoneStates::ALARM,
            Self::LowBattery => ZoneStates::LOW_BATTERY,
            Self::SupervisionFault => ZoneStates::SUPERVISION,
            Self::TestFail => ZoneStates::TEST_FAIL,
            Self::AlarmMemory => ZoneStates::ALARM_MEMORY,
            Self::Masked => ZoneStates::MASKED,
            Self::Dirty => ZoneStates::DIRTY,
            Self::LowSensitivity => ZoneStates::LOW_SENSITIVITY,
            Self::Fault => ZoneStates::FAULT,
        }
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl PartialEq<&str> for ZoneStatus {
    fn eq(&self, other: &&str) -> bool {
        self.label() == *other
    }
}

impl Serialize for ZoneStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// First label in `order` whose sub-state is set, else `Ready`.
pub fn derive_zone_status(states: ZoneStates, order: &[ZoneStatus]) -> ZoneStatus {
    order
        .iter()
        .copied()
        .find(|status| {
            let flag = status.flag();
            !flag.is_empty() && states.contains(flag)
        })
        .unwrap_or(ZoneStatus::Ready)
}

/// Display priority, 1 (most urgent) to 5.
pub fn zone_priority(states: ZoneStates) -> u8 {
    if states.contains(ZoneStates::ALARM) {
        1
    } else if states.intersects(
        ZoneStates::TAMPER | ZoneStates::TROUBLE | ZoneStates::LOW_BATTERY | ZoneStates::SUPERVISION,
    ) {
        2
    } else if states.intersects(ZoneStates::BYPASS | ZoneStates::INHIBITED) {
        3
    } else if states.contains(ZoneStates::NOT_READY) {
        4
    } else {
        5
    }
}

/// A single sensor zone.
#[derive(Debug, Clone, Serialize)]
pub struct Zone {
    pub bank: usize,
    pub name: String,
    pub status: ZoneStatus,
    pub priority: u8,
    pub sequence: u8,
    /// `None` when the panel does not report bypass locks
    pub can_bypass: Option<bool>,
    pub bank_state: String,
    #[serde(skip)]
    pub states: ZoneStates,
}

impl Zone {
    pub fn new(bank: usize, name: impl Into<String>, bits: &[bool], profile: &VendorProfile) -> Self {
        let states = ZoneStates::from_virtual_bank(bits, profile.zone_rows);
        Self {
            bank,
            name: name.into(),
            status: derive_zone_status(states, profile.zone_order),
            priority: zone_priority(states),
            sequence: 1,
            can_bypass: can_bypass(states, profile),
            bank_state: render_bank_state(bits),
            states,
        }
    }

    /// Re-derive from a fresh virtual bank. Returns true (and bumps the
    /// sequence) when the label or bank state changed.
    pub fn refresh(&mut self, bits: &[bool], profile: &VendorProfile) -> bool {
        let states = ZoneStates::from_virtual_bank(bits, profile.zone_rows);
        let status = derive_zone_status(states, profile.zone_order);
        let bank_state = render_bank_state(bits);

        self.priority = zone_priority(states);
        self.can_bypass = can_bypass(states, profile);
        self.states = states;

        let changed = status != self.status || bank_state != self.bank_state;
        if changed {
            self.status = status;
            self.bank_state = bank_state;
            self.sequence = next_sequence(self.sequence);
        }
        changed
    }

    pub fn is_ready(&self) -> bool { !self.states.contains(ZoneStates::NOT_READY) }
    pub fn is_bypassed(&self) -> bool { self.states.contains(ZoneStates::BYPASS) }
    pub fn is_alarm(&self) -> bool { self.states.contains(ZoneStates::ALARM) }
    pub fn is_tamper(&self) -> bool { self.states.contains(ZoneStates::TAMPER) }
    pub fn is_trouble(&self) -> bool { self.states.contains(ZoneStates::TROUBLE) }
    pub fn is_low_battery(&self) -> bool { self.states.contains(ZoneStates::LOW_BATTERY) }
    pub fn is_chime(&self) -> bool { self.states.contains(ZoneStates::CHIME) }
}

fn can_bypass(states: ZoneStates, profile: &VendorProfile) -> Option<bool> {
    profile
        .reports_bypass_lock
        .then(|| !states.contains(ZoneStates::BYPASS_LOCK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::Vendor;

    fn bits_with(profile: &VendorProfile, rows: &[usize]) -> Vec<bool> {
        let mut bits = vec![false; profile.zone_rows.len()];
        for &row in rows {
            bits[row] = true;
        }
        bits
    }

    #[test]
    fn test_default_is_ready() {
        let profile = Vendor::ZeroWire.profile();
        let zone = Zone::new(0, "Front Door", &bits_with(profile, &[]), profile);
        assert_eq!(zone.status, "Ready");
        assert_eq!(zone.priority, 5);
        assert_eq!(zone.sequence, 1);
        assert_eq!(zone.can_bypass, Some(true));
        assert_eq!(zone.bank_state, "000000000000000000");
    }

    #[test]
    fn test_alarm_outranks_not_ready() {
        let profile = Vendor::ZeroWire.profile();
        let zone = Zone::new(0, "Hall", &bits_with(profile, &[0, 5]), profile);
        assert_eq!(zone.status, ZoneStatus::Alarm);
        assert_eq!(zone.priority, 1);
    }

    #[test]
    fn test_bypass_lock() {
        let profile = Vendor::ZeroWire.profile();
        let zone = Zone::new(3, "Smoke", &bits_with(profile, &[16]), profile);
        assert_eq!(zone.can_bypass, Some(false));
        assert_eq!(zone.status, "Ready");
    }

    #[test]
    fn test_comnav_does_not_report_bypass_lock() {
        let profile = Vendor::ComNav.profile();
        let zone = Zone::new(0, "Porch", &bits_with(profile, &[]), profile);
        assert_eq!(zone.can_bypass, None);
    }

    #[test]
    fn test_priority_groups() {
        assert_eq!(zone_priority(ZoneStates::ALARM | ZoneStates::BYPASS), 1);
        assert_eq!(zone_priority(ZoneStates::LOW_BATTERY), 2);
        assert_eq!(zone_priority(ZoneStates::INHIBITED), 3);
        assert_eq!(zone_priority(ZoneStates::NOT_READY), 4);
        // rows outside the priority groups do not raise the rank
        assert_eq!(zone_priority(ZoneStates::MASKED), 5);
    }

    #[test]
    fn test_refresh_tracks_bypass() {
        let profile = Vendor::XGen8.profile();
        let mut zone = Zone::new(0, "Sensor 1", &bits_with(profile, &[]), profile);

        assert!(zone.refresh(&bits_with(profile, &[3]), profile));
        assert!(zone.is_bypassed());
        assert_eq!(zone.status, "Bypass");
        assert_eq!(zone.bank_state, "000100000000000000");
        assert_eq!(zone.sequence, 2);

        assert!(!zone.refresh(&bits_with(profile, &[3]), profile));
        assert_eq!(zone.sequence, 2);
    }
}
