// MIT License - Copyright (c) 2026 Peter Wright
// Command line interface

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use ultrasync::config::default_config_paths;
use ultrasync::{AlarmScene, PanelConfig, UltraSync};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "ultrasync", version)]
#[command(about = "Monitor and control an UltraSync / NX-595E alarm panel")]
struct Cli {
    /// TOML configuration file (default: ~/.ultrasync.toml, then
    /// ~/.config/ultrasync/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print areas and zones as JSON
    #[arg(short, long)]
    details: bool,

    /// Set the alarm scene: away, stay or disarm
    #[arg(short, long)]
    scene: Option<AlarmScene>,

    /// Area number (from 1) the scene applies to (repeatable; default: every area)
    #[arg(short, long = "area", requires = "scene")]
    areas: Vec<usize>,

    /// Zone number (from 1) to bypass or restore
    #[arg(short, long, requires = "bypass")]
    zone: Option<usize>,

    /// Bypass state to apply to --zone (true or false)
    #[arg(short, long, requires = "zone")]
    bypass: Option<bool>,

    /// Keep polling and print every area or zone change
    #[arg(short, long)]
    watch: bool,

    /// Poll period for --watch
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_logging(verbose: u8) {
    // RUST_LOG wins over -v.
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(env_filter).init();
    }
}

fn load_config(path: Option<&Path>) -> Result<PanelConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_paths().into_iter().find(|p| p.is_file()),
    };

    let mut config = match &path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            PanelConfig::load(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?
        }
        None => {
            debug!("No configuration file found; using defaults");
            PanelConfig::default()
        }
    };

    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Watch loop
// ---------------------------------------------------------------------------

/// Print one line per area or zone whose local sequence moved since the last call.
fn report_changes(panel: &UltraSync, seen: &mut HashMap<(char, usize), u8>) -> usize {
    let mut printed = 0;

    for area in panel.areas() {
        if seen.insert(('a', area.bank), area.sequence) != Some(area.sequence) {
            println!(
                "Area {:>2}  {:<24} {:<28} [{}] priority={}",
                area.bank, area.name, area.status.to_string(), area.bank_state, area.priority
            );
            printed += 1;
        }
    }

    for zone in panel.zones() {
        if seen.insert(('z', zone.bank), zone.sequence) != Some(zone.sequence) {
            println!(
                "Zone {:>2}  {:<24} {:<28} [{}] priority={}",
                zone.bank, zone.name, zone.status.label(), zone.bank_state, zone.priority
            );
            printed += 1;
        }
    }

    printed
}

async fn watch(panel: &mut UltraSync, period: Duration) -> Result<()> {
    let mut seen = HashMap::new();
    if report_changes(panel, &mut seen) > 0 {
        println!("---");
    }

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Watching panel every {:?}; Ctrl-C to stop", period);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping watch");
                return Ok(());
            }
            _ = ticker.tick() => {
                if !panel.update(Duration::ZERO).await? {
                    warn!("Panel update failed; retrying");
                    continue;
                }
                if report_changes(panel, &mut seen) > 0 {
                    println!("---");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !(cli.details || cli.watch || cli.scene.is_some() || cli.zone.is_some()) {
        eprintln!("Nothing to do: pass --details, --watch, --scene or --zone/--bypass (see --help)");
        return Ok(ExitCode::FAILURE);
    }

    let config = load_config(cli.config.as_deref())?;
    let mut panel = UltraSync::new(config).context("Failed to create panel client")?;

    if !panel.login().await? {
        eprintln!("Failed to log in to the panel");
        return Ok(ExitCode::FAILURE);
    }

    let mut ok = true;

    if let Some(scene) = cli.scene {
        ok &= panel.set_alarm(&cli.areas, scene).await?;
    }

    if let (Some(zone), Some(bypass)) = (cli.zone, cli.bypass) {
        ok &= panel.set_zone_bypass(zone, bypass).await?;
    }

    if cli.details {
        match panel.details(Duration::ZERO).await? {
            Some(details) => println!("{}", serde_json::to_string_pretty(&details)?),
            None => ok = false,
        }
    }

    if cli.watch {
        watch(&mut panel, Duration::from_millis(cli.interval_ms)).await?;
    }

    panel.logout().await?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
