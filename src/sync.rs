// MIT License - Copyright (c) 2026 Peter Wright
// Sequence-diff synchronization

use tracing::{debug, warn};

use crate::bank::BankGrid;
use crate::constants::{Endpoint, AREA_GROUP_BITS, AREA_SEQUENCE_LEN, NO_SYSTEM_FAULTS};
use crate::error::{PanelError, Result};
use crate::panel::UltraSync;
use crate::protocol::{
    js_array, js_integers, js_names, json_body, json_field, json_integers, json_u32, pad_sequence,
    status_words, xml_csv, xml_indexed, xml_optional, xml_u32,
};
use crate::transport::Transport;
use crate::vendor::{AreaLayout, Encoding, VendorProfile};

/// Area definitions embedded in the login page.
#[derive(Debug, Clone)]
pub struct AreaPage {
    pub names: Vec<Option<String>>,
    pub sequence: Vec<u32>,
    pub grid: BankGrid,
}

impl AreaPage {
    pub fn parse(body: &str, profile: &VendorProfile) -> Result<Self> {
        let names = js_names(body, "areaNames")?;
        let sequence = pad_sequence(js_integers(body, "areaSequence")?, AREA_SEQUENCE_LEN);
        let rows = profile.area_rows.len();
        let mut grid = BankGrid::new(rows, AREA_SEQUENCE_LEN, AREA_GROUP_BITS);

        match profile.area_layout {
            AreaLayout::HexColumns => {
                let groups = js_array(body, "areaStatus")?;
                for (group, value) in groups.iter().enumerate().take(AREA_SEQUENCE_LEN) {
                    grid.set_column(group, &status_words(value)?);
                }
            }
            AreaLayout::FlatWords => {
                let flat = to_words(&js_integers(body, "areaStatus")?)?;
                for (group, chunk) in flat.chunks(rows).enumerate().take(AREA_SEQUENCE_LEN) {
                    grid.set_column(group, chunk);
                }
            }
        }

        Ok(Self { names, sequence, grid })
    }
}

/// Zone definitions from `user/zones.htm`.
#[derive(Debug, Clone)]
pub struct ZonePage {
    pub names: Vec<Option<String>>,
    pub sequence: Vec<u32>,
    pub grid: BankGrid,
}

impl ZonePage {
    pub fn parse(body: &str, profile: &VendorProfile) -> Result<Self> {
        let rows = profile.zone_rows.len();
        let names = js_names(body, "zoneNames")?;
        let sequence = pad_sequence(js_integers(body, "zoneSequence")?, rows);
        let mut grid = BankGrid::new(rows, profile.zone_words(), profile.zone_layout.group_bits());

        for (row, value) in js_array(body, "zoneStatus")?.iter().enumerate().take(rows) {
            grid.set_row(row, &status_words(value)?);
        }

        Ok(Self { names, sequence, grid })
    }
}

/// Remote sequence counters: one per area bank and one per zone status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSnapshot {
    pub areas: Vec<u32>,
    pub zones: Vec<u32>,
}

impl SequenceSnapshot {
    pub fn parse(body: &str, profile: &VendorProfile) -> Result<Self> {
        let (areas, zones) = match profile.encoding {
            Encoding::Json => {
                let value = json_body(body)?;
                (json_integers(&value, "area")?, json_integers(&value, "zone")?)
            }
            Encoding::Xml => (xml_csv(body, "areas")?, xml_csv(body, "zones")?),
        };
        Ok(Self {
            areas: pad_sequence(areas, AREA_SEQUENCE_LEN),
            zones: pad_sequence(zones, profile.zone_rows.len()),
        })
    }
}

/// One area status bank: every status row for a group of eight areas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaBankUpdate {
    pub bank: usize,
    pub sequence: u32,
    pub words: Vec<u16>,
    /// Panel-wide faults, when the response carries them
    pub system_faults: Option<Vec<String>>,
}

impl AreaBankUpdate {
    pub fn parse(body: &str, profile: &VendorProfile) -> Result<Self> {
        match profile.encoding {
            Encoding::Json => {
                let value = json_body(body)?;
                Ok(Self {
                    bank: json_u32(&value, "abank")? as usize,
                    sequence: json_u32(&value, "aseq")?,
                    words: status_words(json_field(&value, "bankstates")?)?,
                    system_faults: value.get("sysflt").and_then(|v| v.as_str()).map(split_faults),
                })
            }
            Encoding::Xml => Ok(Self {
                bank: xml_u32(body, "abank")? as usize,
                sequence: xml_u32(body, "aseq")?,
                words: to_words(&xml_indexed(body, "stat", profile.area_rows.len())?)?,
                system_faults: xml_optional(body, "sysflt").map(|text| split_faults(&text)),
            }),
        }
    }
}

/// One zone status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneBankUpdate {
    pub row: usize,
    pub sequence: u32,
    pub words: Vec<u16>,
}

impl ZoneBankUpdate {
    pub fn parse(body: &str, profile: &VendorProfile) -> Result<Self> {
        match profile.encoding {
            Encoding::Json => {
                let value = json_body(body)?;
                Ok(Self {
                    row: json_u32(&value, "zstate")? as usize,
                    sequence: json_u32(&value, "zseq")?,
                    words: status_words(json_field(&value, "zdat")?)?,
                })
            }
            Encoding::Xml => Ok(Self {
                row: xml_u32(body, "zstate")? as usize,
                sequence: xml_u32(body, "zseq")?,
                words: to_words(&xml_csv(body, "zdat")?)?,
            }),
        }
    }
}

fn to_words(values: &[u32]) -> Result<Vec<u16>> {
    values
        .iter()
        .map(|&v| u16::try_from(v).map_err(|_| PanelError::decode(format!("status word {v} out of range"))))
        .collect()
}

fn split_faults(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != NO_SYSTEM_FAULTS)
        .map(str::to_string)
        .collect()
}

impl<T: Transport> UltraSync<T> {
    /// Bring the local mirror up to date with the panel.
    ///
    /// Fetches the sequence snapshot and then only the zone rows and area
    /// banks whose counters moved. A failed bank fetch is logged and retried
    /// on the next sync.
    pub async fn sync(&mut self) -> Result<bool> {
        let result = self.try_sync().await;
        self.settle("sync", result)
    }

    pub(crate) async fn try_sync(&mut self) -> Result<()> {
        let profile = self.ensure_session().await?.profile();

        let body = self.request(Endpoint::Sequence, &[], true).await?;
        let snapshot = SequenceSnapshot::parse(&body, profile)?;

        let mut zones_dirty = false;
        for (row, &remote) in snapshot.zones.iter().enumerate() {
            if self.zone_sequence.get(row).copied().unwrap_or(0) == remote {
                continue;
            }
            debug!("Zone status row {} changed (sequence {})", row, remote);
            match self.fetch_zone_row(row, profile).await {
                Ok(()) => {
                    if let Some(seen) = self.zone_sequence.get_mut(row) {
                        *seen = remote;
                    }
                    zones_dirty = true;
                }
                Err(e) => warn!("Failed to refresh zone status row {}: {}", row, e),
            }
        }

        let mut areas_dirty = false;
        for (bank, &remote) in snapshot.areas.iter().enumerate() {
            if self.area_sequence.get(bank).copied().unwrap_or(0) == remote {
                continue;
            }
            debug!("Area bank {} changed (sequence {})", bank, remote);
            match self.fetch_area_bank(bank, profile).await {
                Ok(()) => {
                    if let Some(seen) = self.area_sequence.get_mut(bank) {
                        *seen = remote;
                    }
                    areas_dirty = true;
                }
                Err(e) => warn!("Failed to refresh area bank {}: {}", bank, e),
            }
        }

        if zones_dirty {
            let changed = self.process_zones(profile);
            debug!("{} zone(s) changed", changed);
        }
        if areas_dirty {
            let changed = self.process_areas(profile);
            debug!("{} area(s) changed", changed);
        }

        self.mark_synced();
        Ok(())
    }

    async fn fetch_zone_row(&mut self, row: usize, profile: &'static VendorProfile) -> Result<()> {
        let body = self.request(Endpoint::ZoneStatus, &[("state", row.to_string())], true).await?;
        let update = ZoneBankUpdate::parse(&body, profile)?;
        if update.row >= self.zone_grid.rows() {
            return Err(PanelError::decode(format!("zone status row {} out of range", update.row)));
        }
        if update.row != row {
            debug!("Requested zone row {} but panel answered with row {}", row, update.row);
        }
        self.zone_grid.set_row(update.row, &update.words);
        Ok(())
    }

    async fn fetch_area_bank(&mut self, bank: usize, profile: &'static VendorProfile) -> Result<()> {
        let body = self.request(Endpoint::AreaStatus, &[("arsel", bank.to_string())], true).await?;
        let update = AreaBankUpdate::parse(&body, profile)?;
        if update.bank >= self.area_grid.words() {
            return Err(PanelError::decode(format!("area bank {} out of range", update.bank)));
        }
        self.area_grid.set_column(update.bank, &update.words);
        if let Some(faults) = update.system_faults {
            self.system_faults = faults;
        }
        Ok(())
    }
}
