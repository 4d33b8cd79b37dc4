// MIT License - Copyright (c) 2026 Peter Wright
// Public panel client

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::bank::{BankArena, BankGrid};
use crate::comm::PanelComm;
use crate::config::{AlarmScene, PanelConfig};
use crate::constants::{Endpoint, MAX_AREAS, MAX_ZONES};
use crate::devices::area::Area;
use crate::devices::zone::Zone;
use crate::error::{PanelError, Result};
use crate::sync::{AreaPage, ZonePage};
use crate::transport::{HttpTransport, Transport};
use crate::vendor::{Vendor, VendorProfile};

/// Point-in-time view of the whole panel.
#[derive(Debug, Clone, Serialize)]
pub struct Details {
    pub user: String,
    pub vendor: Option<Vendor>,
    pub version: Option<String>,
    pub release: Option<String>,
    pub areas: Vec<Area>,
    pub zones: Vec<Zone>,
    pub system_faults: Vec<String>,
    pub as_of: Option<DateTime<Utc>>,
}

/// Client for an NX-595E / UltraSync panel web interface.
///
/// Holds one session and an in-memory mirror of the panel's areas and
/// zones. Every operation takes `&mut self`, so calls on one client never
/// overlap.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use ultrasync::{AlarmScene, PanelConfig, UltraSync};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = PanelConfig::builder()
///         .host("192.168.1.20")
///         .user("User 1")
///         .pin("1234")
///         .build();
///
///     let mut panel = UltraSync::new(config)?;
///     if !panel.login().await? {
///         anyhow::bail!("login failed");
///     }
///
///     panel.update(Duration::ZERO).await?;
///     for area in panel.areas() {
///         println!("{}: {}", area.name, area.status);
///     }
///
///     panel.set_alarm(&[], AlarmScene::Stay).await?;
///     panel.logout().await?;
///     Ok(())
/// }
/// ```
pub struct UltraSync<T: Transport = HttpTransport> {
    comm: PanelComm<T>,
    pub(crate) areas: BankArena<Area, MAX_AREAS>,
    pub(crate) zones: BankArena<Zone, MAX_ZONES>,
    pub(crate) area_grid: BankGrid,
    pub(crate) zone_grid: BankGrid,
    /// Last observed remote sequence per area bank
    pub(crate) area_sequence: Vec<u32>,
    /// Last observed remote sequence per zone status row
    pub(crate) zone_sequence: Vec<u32>,
    pub(crate) system_faults: Vec<String>,
}

impl UltraSync<HttpTransport> {
    /// Create a client talking HTTP to the configured host.
    pub fn new(config: PanelConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> UltraSync<T> {
    pub fn with_transport(config: PanelConfig, transport: T) -> Self {
        Self {
            comm: PanelComm::new(config, transport),
            areas: BankArena::new(),
            zones: BankArena::new(),
            area_grid: BankGrid::default(),
            zone_grid: BankGrid::default(),
            area_sequence: Vec::new(),
            zone_sequence: Vec::new(),
            system_faults: Vec::new(),
        }
    }

    // --- Session ---

    /// Authenticate and rebuild areas and zones.
    ///
    /// Returns `Ok(false)` on failure; in strict mode authentication and
    /// unsupported-panel failures are returned as errors instead.
    pub async fn login(&mut self) -> Result<bool> {
        let result = self.try_login().await;
        self.settle("login", result)
    }

    pub(crate) async fn try_login(&mut self) -> Result<()> {
        let body = self.comm.authenticate().await?;
        match self.rebuild(&body).await {
            Ok(()) => {
                self.mark_synced();
                Ok(())
            }
            Err(e) => {
                self.comm.invalidate();
                Err(e)
            }
        }
    }

    /// Parse both topology pages before touching any state.
    async fn rebuild(&mut self, area_body: &str) -> Result<()> {
        let vendor = self.comm.vendor().ok_or(PanelError::NotAuthenticated)?;
        let profile = vendor.profile();

        let area_page = AreaPage::parse(area_body, profile)?;
        let zone_body = self.comm.send(Endpoint::Zones, &[]).await?.body;
        let zone_page = ZonePage::parse(&zone_body, profile)?;

        self.system_faults.clear();
        self.install_areas(area_page, profile);
        self.install_zones(zone_page, profile);
        info!("Panel has {} area(s) and {} zone(s)", self.areas.len(), self.zones.len());
        Ok(())
    }

    fn install_areas(&mut self, page: AreaPage, profile: &VendorProfile) {
        let mut areas = BankArena::new();
        for (bank, name) in page.names.into_iter().enumerate() {
            let Some(name) = name else { continue };
            if bank >= MAX_AREAS {
                debug!("Ignoring area '{}' beyond bank {}", name, MAX_AREAS - 1);
                break;
            }
            let bits = page.grid.virtual_bank(bank);
            areas.insert(bank, Area::new(bank, name, &bits, profile, false));
        }
        self.areas = areas;
        self.area_grid = page.grid;
        self.area_sequence = page.sequence;
    }

    fn install_zones(&mut self, page: ZonePage, profile: &VendorProfile) {
        let mut zones = BankArena::new();
        for (bank, name) in page.names.into_iter().enumerate() {
            let Some(name) = name else { continue };
            if bank >= profile.max_zones {
                debug!("Ignoring zone '{}' beyond bank {}", name, profile.max_zones - 1);
                break;
            }
            let bits = page.grid.virtual_bank(bank);
            zones.insert(bank, Zone::new(bank, name, &bits, profile));
        }
        self.zones = zones;
        self.zone_grid = page.grid;
        self.zone_sequence = page.sequence;
    }

    /// End the session. Local state is cleared whatever the panel says.
    pub async fn logout(&mut self) -> Result<bool> {
        let result = self.comm.end_session().await;
        self.clear_state();
        self.settle("logout", result)
    }

    fn clear_state(&mut self) {
        self.areas.clear();
        self.zones.clear();
        self.area_grid = BankGrid::default();
        self.zone_grid = BankGrid::default();
        self.area_sequence.clear();
        self.zone_sequence.clear();
        self.system_faults.clear();
    }

    /// Vendor of the current session, logging in first when needed.
    pub(crate) async fn ensure_session(&mut self) -> Result<Vendor> {
        if let Some(vendor) = self.comm.vendor() {
            return Ok(vendor);
        }
        self.try_login().await?;
        self.comm.vendor().ok_or(PanelError::NotAuthenticated)
    }

    /// Perform one panel request and return the body.
    ///
    /// With `auth_on_fail`, a missing session, a connection failure or a
    /// redirect triggers one fresh login and one replay of the request. At
    /// most one login happens per call.
    pub(crate) async fn request(
        &mut self,
        endpoint: Endpoint,
        form: &[(&str, String)],
        auth_on_fail: bool,
    ) -> Result<String> {
        let mut logged_in = false;
        if !self.comm.is_authenticated() {
            if !auth_on_fail {
                return Err(PanelError::NotAuthenticated);
            }
            self.try_login().await?;
            logged_in = true;
        }

        match self.comm.send(endpoint, form).await {
            Ok(response) => Ok(response.body),
            Err(e) if auth_on_fail && !logged_in && e.is_session_loss() => {
                warn!("{:?} request failed ({}); logging in again", endpoint, e);
                self.try_login().await?;
                Ok(self.comm.send(endpoint, form).await?.body)
            }
            Err(e) => Err(e),
        }
    }

    /// Map an internal result onto the public `bool` contract.
    pub(crate) fn settle(&self, operation: &str, result: Result<()>) -> Result<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if self.comm.config().strict && e.is_strict_failure() => Err(e),
            Err(e) => {
                error!("{} failed: {}", operation, e);
                Ok(false)
            }
        }
    }

    pub(crate) fn mark_synced(&mut self) {
        if let Some(session) = self.comm.session_mut() {
            session.synced_at = Some(Instant::now());
            session.as_of = Some(Utc::now());
        }
    }

    fn is_fresh(&self, max_age: Duration) -> bool {
        self.comm
            .session()
            .and_then(|s| s.synced_at)
            .is_some_and(|at| at.elapsed() < max_age)
    }

    // --- State processing ---

    /// Re-derive every area from the raw grid. Returns how many changed.
    pub(crate) fn process_areas(&mut self, profile: &VendorProfile) -> usize {
        let faults = !self.system_faults.is_empty();
        let mut changed = 0;
        for (bank, area) in self.areas.iter_mut() {
            let bits = self.area_grid.virtual_bank(bank);
            if area.refresh(&bits, profile, faults) {
                info!("Area {} '{}' is now {}", bank, area.name, area.status);
                changed += 1;
            }
        }
        changed
    }

    /// Re-derive every zone from the raw grid. Returns how many changed.
    pub(crate) fn process_zones(&mut self, profile: &VendorProfile) -> usize {
        let mut changed = 0;
        for (bank, zone) in self.zones.iter_mut() {
            let bits = self.zone_grid.virtual_bank(bank);
            if zone.refresh(&bits, profile) {
                info!("Zone {} '{}' is now {}", bank, zone.name, zone.status);
                changed += 1;
            }
        }
        changed
    }

    // --- Queries ---

    /// Log in if needed and sync when the mirror is older than `max_age`.
    pub async fn update(&mut self, max_age: Duration) -> Result<bool> {
        if !self.comm.is_authenticated() {
            let result = self.try_login().await;
            if !self.settle("login", result)? {
                return Ok(false);
            }
        }
        if self.is_fresh(max_age) {
            return Ok(true);
        }
        self.sync().await
    }

    /// [`update`](Self::update) and return a snapshot of everything known.
    pub async fn details(&mut self, max_age: Duration) -> Result<Option<Details>> {
        if !self.update(max_age).await? {
            return Ok(None);
        }
        Ok(Some(self.snapshot()))
    }

    /// Current mirror without contacting the panel.
    pub fn snapshot(&self) -> Details {
        let signature = self.comm.session().map(|s| &s.signature);
        Details {
            user: self.comm.config().user.clone(),
            vendor: signature.map(|s| s.vendor),
            version: signature.map(|s| s.version.clone()),
            release: signature.map(|s| s.release.clone()),
            areas: self.areas().cloned().collect(),
            zones: self.zones().cloned().collect(),
            system_faults: self.system_faults.clone(),
            as_of: self.comm.session().and_then(|s| s.as_of),
        }
    }

    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.iter().map(|(_, area)| area)
    }

    pub fn area(&self, bank: usize) -> Option<&Area> {
        self.areas.get(bank)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().map(|(_, zone)| zone)
    }

    pub fn zone(&self, bank: usize) -> Option<&Zone> {
        self.zones.get(bank)
    }

    pub fn system_faults(&self) -> &[String] {
        &self.system_faults
    }

    pub fn is_authenticated(&self) -> bool {
        self.comm.is_authenticated()
    }

    pub fn vendor(&self) -> Option<Vendor> {
        self.comm.vendor()
    }

    pub fn version(&self) -> Option<&str> {
        self.comm.session().map(|s| s.signature.version.as_str())
    }

    pub fn release(&self) -> Option<&str> {
        self.comm.session().map(|s| s.signature.release.as_str())
    }

    pub fn config(&self) -> &PanelConfig {
        self.comm.config()
    }

    pub fn transport(&self) -> &T {
        self.comm.transport()
    }

    // --- Commands ---

    /// Put areas into `scene`. Areas are numbered from 1, as on the
    /// keypad; an empty slice targets every known area.
    ///
    /// Every target is attempted; returns false if any of them failed.
    pub async fn set_alarm(&mut self, areas: &[usize], scene: AlarmScene) -> Result<bool> {
        let vendor = match self.ensure_session().await {
            Ok(vendor) => vendor,
            Err(e) => return self.settle("set alarm", Err(e)),
        };

        let targets: Vec<usize> = if areas.is_empty() {
            self.areas.banks().into_iter().map(|bank| bank + 1).collect()
        } else {
            areas.to_vec()
        };
        if targets.is_empty() {
            warn!("No areas to {}", scene);
            return Ok(false);
        }

        let mut all_ok = true;
        for area in targets {
            let Some(bank) = area.checked_sub(1).filter(|&bank| self.areas.contains(bank)) else {
                warn!("{}", PanelError::InvalidArea { area });
                all_ok = false;
                continue;
            };
            debug!("Setting area {} (bank {}) to {}", area, bank, scene);
            let payload = vendor.scene_payload(bank, scene);
            let result = self.request(Endpoint::KeyFunction, &payload, true).await.map(|_| ());
            if !self.settle(&format!("set area {area} to {scene}"), result)? {
                all_ok = false;
            }
        }
        Ok(all_ok)
    }

    /// Bypass (or un-bypass) a zone, numbered from 1.
    ///
    /// The panel only offers a toggle, so nothing is sent when the zone is
    /// already in the requested state.
    pub async fn set_zone_bypass(&mut self, zone: usize, enabled: bool) -> Result<bool> {
        let vendor = match self.ensure_session().await {
            Ok(vendor) => vendor,
            Err(e) => return self.settle("zone bypass", Err(e)),
        };

        let Some(current) = zone.checked_sub(1).and_then(|bank| self.zones.get(bank)) else {
            warn!("{}", PanelError::InvalidZone { zone });
            return Ok(false);
        };
        let Some(payload) = vendor.bypass_payload(current.bank) else {
            warn!("{}", PanelError::BypassUnsupported { vendor });
            return Ok(false);
        };
        if current.is_bypassed() == enabled {
            debug!("Zone {} bypass already {}", zone, enabled);
            return Ok(true);
        }

        info!("{} zone {}", if enabled { "Bypassing" } else { "Restoring" }, zone);
        let result = self.request(Endpoint::ZoneFunction, &payload, true).await.map(|_| ());
        self.settle("zone bypass", result)
    }
}
