// MIT License - Copyright (c) 2026 Peter Wright
// Area state derivation

use std::fmt;

use bitflags::bitflags;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::bank::{next_sequence, render_bank_state};
use crate::vendor::VendorProfile;

bitflags! {
    /// Canonical area sub-states.
    ///
    /// Vendors report these as status rows in different orders; each
    /// vendor's row table maps its rows onto these flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AreaStates: u32 {
        const ARMED            = 1 << 0;
        const PARTIAL          = 1 << 1;
        const READY            = 1 << 2;
        const FIRE             = 1 << 3;
        const BURGLARY         = 1 << 4;
        const PANIC            = 1 << 5;
        const MEDICAL          = 1 << 6;
        const EXIT_DELAY_1     = 1 << 7;
        const EXIT_DELAY_2     = 1 << 8;
        const ENTRY_DELAY      = 1 << 9;
        const ZONE_BYPASS      = 1 << 10;
        const ZONE_TROUBLE     = 1 << 11;
        const ZONE_TAMPER      = 1 << 12;
        const ZONE_LOW_BATTERY = 1 << 13;
        const ZONE_SUPERVISION = 1 << 14;
        const CHIME            = 1 << 15;
        /// Area may be force-armed with open zones
        const FORCEABLE        = 1 << 16;
        /// Exit delay runs into a night arm
        const NIGHT            = 1 << 17;
        /// Exit delay runs into an instant arm (no entry delay)
        const INSTANT          = 1 << 18;
    }
}

impl AreaStates {
    /// Map a virtual bank through a vendor row table.
    pub fn from_virtual_bank(bits: &[bool], rows: &[AreaStates]) -> Self {
        bits.iter()
            .zip(rows)
            .filter(|(set, _)| **set)
            .fold(Self::empty(), |acc, (_, flag)| acc | *flag)
    }

    pub const ALARMS: Self = Self::FIRE
        .union(Self::BURGLARY)
        .union(Self::PANIC)
        .union(Self::MEDICAL);

    pub const ZONE_ISSUES: Self = Self::ZONE_TROUBLE
        .union(Self::ZONE_TAMPER)
        .union(Self::ZONE_LOW_BATTERY)
        .union(Self::ZONE_SUPERVISION);
}

/// Area status labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaStatus {
    ArmedAway,
    ArmedStay,
    Ready,
    FireAlarm,
    BurgAlarm,
    PanicAlarm,
    MedicalAlarm,
    ExitDelay1,
    ExitDelay2,
    EntryDelay,
    ZoneBypass,
    ZoneTrouble,
    ZoneTamper,
    ZoneLowBattery,
    ZoneSupervision,
    NotReady,
    NotReadyForceable,
}

impl AreaStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ArmedAway => "Armed Away",
            Self::ArmedStay => "Armed Stay",
            Self::Ready => "Ready",
            Self::FireAlarm => "Fire Alarm",
            Self::BurgAlarm => "Burg Alarm",
            Self::PanicAlarm => "Panic Alarm",
            Self::MedicalAlarm => "Medical Alarm",
            Self::ExitDelay1 => "Exit Delay 1",
            Self::ExitDelay2 => "Exit Delay 2",
            Self::EntryDelay => "Entry Delay",
            Self::ZoneBypass => "Zone Bypass",
            Self::ZoneTrouble => "Zone Trouble",
            Self::ZoneTamper => "Zone Tamper",
            Self::ZoneLowBattery => "Zone Low Battery",
            Self::ZoneSupervision => "Zone Supervision",
            Self::NotReady => "Not Ready",
            Self::NotReadyForceable => "Not Ready, forceable",
        }
    }

    /// Sub-state that selects this label. Empty for the fallbacks.
    pub fn flag(&self) -> AreaStates {
        match self {
            Self::ArmedAway => AreaStates::ARMED,
            Self::ArmedStay => AreaStates::PARTIAL,
            Self::Ready => AreaStates::READY,
            Self::FireAlarm => AreaStates::FIRE,
            Self::BurgAlarm => AreaStates::BURGLARY,
            Self::PanicAlarm => AreaStates::PANIC,
            Self::MedicalAlarm => AreaStates::MEDICAL,
            Self::ExitDelay1 => AreaStates::EXIT_DELAY_1,
            Self::ExitDelay2 => AreaStates::EXIT_DELAY_2,
            Self::EntryDelay => AreaStates::ENTRY_DELAY,
            Self::ZoneBypass => AreaStates::ZONE_BYPASS,
            Self::ZoneTrouble => AreaStates::ZONE_TROUBLE,
            Self::ZoneTamper => AreaStates::ZONE_TAMPER,
            Self::ZoneLowBattery => AreaStates::ZONE_LOW_BATTERY,
            Self::ZoneSupervision => AreaStates::ZONE_SUPERVISION,
            Self::NotReady | Self::NotReadyForceable => AreaStates::empty(),
        }
    }

    pub fn is_exit_delay(&self) -> bool {
        matches!(self, Self::ExitDelay1 | Self::ExitDelay2)
    }
}

/// Arming mode an exit delay is counting down towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitModifier {
    Night,
    Instant,
}

/// A derived area label, e.g. `Exit Delay 1 - Night`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaLabel {
    pub status: AreaStatus,
    pub modifier: Option<ExitModifier>,
}

impl AreaLabel {
    pub fn plain(status: AreaStatus) -> Self {
        Self { status, modifier: None }
    }
}

impl fmt::Display for AreaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status.label())?;
        match self.modifier {
            Some(ExitModifier::Night) => f.write_str(" - Night"),
            Some(ExitModifier::Instant) => f.write_str(" - Instant"),
            None => Ok(()),
        }
    }
}

impl PartialEq<&str> for AreaLabel {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl Serialize for AreaLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Walk the vendor's label order; the first label whose sub-state is set wins.
///
/// `Ready` is never reported while the area is armed or partially armed.
pub fn derive_area_status(states: AreaStates, order: &[AreaStatus]) -> AreaLabel {
    let engaged = states.intersects(AreaStates::ARMED | AreaStates::PARTIAL);

    for status in order {
        let flag = status.flag();
        if flag.is_empty() || !states.contains(flag) {
            continue;
        }
        if *status == AreaStatus::Ready && engaged {
            continue;
        }
        let modifier = if !status.is_exit_delay() {
            None
        } else if states.contains(AreaStates::NIGHT) {
            Some(ExitModifier::Night)
        } else if states.contains(AreaStates::INSTANT) {
            Some(ExitModifier::Instant)
        } else {
            None
        };
        return AreaLabel { status: *status, modifier };
    }

    if states.contains(AreaStates::FORCEABLE) {
        AreaLabel::plain(AreaStatus::NotReadyForceable)
    } else {
        AreaLabel::plain(AreaStatus::NotReady)
    }
}

/// Display priority, 1 (most urgent) to 5.
///
/// Computed from the sub-states directly, independent of the label walk.
/// The panel's status page only lowers a disarmed area to 5 when it is not
/// ready and leaves a ready one at its starting rank; here both rank 5 and
/// the label tells them apart.
pub fn area_priority(states: AreaStates, system_faults: bool) -> u8 {
    if states.intersects(AreaStates::ALARMS) {
        1
    } else if states.intersects(AreaStates::ZONE_ISSUES) || system_faults {
        2
    } else if states.intersects(AreaStates::ZONE_BYPASS | AreaStates::PARTIAL) {
        3
    } else if states.contains(AreaStates::ARMED) {
        4
    } else {
        5
    }
}

/// A partition of the alarm system.
#[derive(Debug, Clone, Serialize)]
pub struct Area {
    pub bank: usize,
    pub name: String,
    pub status: AreaLabel,
    pub priority: u8,
    pub sequence: u8,
    pub bank_state: String,
    #[serde(serialize_with = "serialize_area_states")]
    pub states: AreaStates,
}

impl Area {
    /// Build a fully derived area from its virtual bank.
    pub fn new(
        bank: usize,
        name: impl Into<String>,
        bits: &[bool],
        profile: &VendorProfile,
        system_faults: bool,
    ) -> Self {
        let states = AreaStates::from_virtual_bank(bits, profile.area_rows);
        Self {
            bank,
            name: name.into(),
            status: derive_area_status(states, profile.area_order),
            priority: area_priority(states, system_faults),
            sequence: 1,
            bank_state: render_bank_state(bits),
            states,
        }
    }

    /// Re-derive from a fresh virtual bank. Returns true (and bumps the
    /// sequence) when the label or bank state changed.
    pub fn refresh(&mut self, bits: &[bool], profile: &VendorProfile, system_faults: bool) -> bool {
        let states = AreaStates::from_virtual_bank(bits, profile.area_rows);
        let status = derive_area_status(states, profile.area_order);
        let bank_state = render_bank_state(bits);

        self.priority = area_priority(states, system_faults);
        self.states = states;

        let changed = status != self.status || bank_state != self.bank_state;
        if changed {
            self.status = status;
            self.bank_state = bank_state;
            self.sequence = next_sequence(self.sequence);
        }
        changed
    }

    pub fn is_armed(&self) -> bool { self.states.contains(AreaStates::ARMED) }
    pub fn is_partial(&self) -> bool { self.states.contains(AreaStates::PARTIAL) }
    pub fn is_ready(&self) -> bool { self.states.contains(AreaStates::READY) }
    pub fn is_chime(&self) -> bool { self.states.contains(AreaStates::CHIME) }
    pub fn is_exit_delay_1(&self) -> bool { self.states.contains(AreaStates::EXIT_DELAY_1) }
    pub fn is_exit_delay_2(&self) -> bool { self.states.contains(AreaStates::EXIT_DELAY_2) }
    pub fn is_night(&self) -> bool { self.states.contains(AreaStates::NIGHT) }
    pub fn is_instant(&self) -> bool { self.states.contains(AreaStates::INSTANT) }
    pub fn in_alarm(&self) -> bool { self.states.intersects(AreaStates::ALARMS) }
}

fn serialize_area_states<S: Serializer>(states: &AreaStates, serializer: S) -> Result<S::Ok, S::Error> {
    let named = [
        ("armed", AreaStates::ARMED),
        ("partial", AreaStates::PARTIAL),
        ("ready", AreaStates::READY),
        ("chime", AreaStates::CHIME),
        ("exit1", AreaStates::EXIT_DELAY_1),
        ("exit2", AreaStates::EXIT_DELAY_2),
        ("night", AreaStates::NIGHT),
        ("instant", AreaStates::INSTANT),
    ];
    let mut map = serializer.serialize_map(Some(named.len()))?;
    for (key, flag) in named {
        map.serialize_entry(key, &states.contains(flag))?;
    }
    map.end()
}
