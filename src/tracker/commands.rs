use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::types::*;
use super::{record_status, LogNotifier, Tracker};
use crate::carrier::{self, CarrierConfig};
use crate::reconcile::ReconcileOptions;
use crate::shipment::manual::preset_labels;
use crate::shipment::{Store, TrackedShipment};
use crate::telemetry::{self};
use crate::telemetry::ops::check::Phase as CheckPhase;
use crate::telemetry::ops::track::Phase as TrackPhase;
use crate::util::time::{format_carrier_local, format_relative};
use crate::watch;

/// Start tracking a shipment
#[derive(Args, Debug)]
pub struct AddCmd {
    pub tracking_number: String,
    #[arg(long)] pub name: Option<String>,
    #[arg(long)] pub address: Option<String>,
    #[arg(long)] pub quantity: Option<u32>,
}

/// List tracked shipments
#[derive(Args, Debug)]
pub struct LsCmd {
    /// Only shipments not yet delivered
    #[arg(long, default_value_t = false)]
    pub pending: bool,
}

/// Show one shipment's timeline, newest first
#[derive(Args, Debug)]
pub struct ShowCmd {
    pub tracking_number: String,
}

/// Stop tracking a shipment (plan-only by default; use --apply to delete)
#[derive(Args, Debug)]
pub struct RmCmd {
    pub tracking_number: String,
    #[arg(long, default_value_t = false)]
    pub apply: bool,
}

/// Change recipient details
#[derive(Args, Debug)]
pub struct EditCmd {
    pub tracking_number: String,
    #[arg(long)] pub name: Option<String>,
    #[arg(long)] pub address: Option<String>,
    #[arg(long)] pub quantity: Option<u32>,
}

/// Record a status by hand: a preset number 1-5 or free text
#[derive(Args, Debug)]
pub struct StatusCmd {
    pub tracking_number: String,
    /// Preset number or status text; omit to list the presets
    pub text: Vec<String>,
}

/// Query the carrier now for one shipment, or every undelivered one
#[derive(Args, Debug)]
pub struct CheckCmd {
    pub tracking_number: Option<String>,
    /// Pause between shipments when checking several
    #[arg(long, default_value_t = watch::DEFAULT_PACE_MS)]
    pub pace_ms: u64,
    /// Drop scraped rows with blank status text
    #[arg(long, default_value_t = false)]
    pub skip_empty: bool,
}

pub async fn add(store_path: &Path, args: AddCmd) -> Result<()> {
    let log = telemetry::track();
    let _g = log.root_span_kv([("action", "add".to_string()), ("tracking_number", args.tracking_number.clone())]).entered();

    let mut store = { let _s = log.span(&TrackPhase::Load).entered(); Store::open(store_path)? };
    let mut shipment = TrackedShipment::new(&args.tracking_number, Utc::now())?;
    if let Some(name) = args.name { shipment.name = name; }
    if let Some(address) = args.address { shipment.address = address; }
    if let Some(q) = args.quantity.filter(|q| *q > 0) { shipment.quantity = q; }

    let row = ShipmentRow::from(store.add(shipment)?);
    { let _s = log.span(&TrackPhase::Save).entered(); store.save()?; }

    log.info(format!("➕ Tracking {} ({} total)", row.tracking_number, store.items().len()));
    if telemetry::config::json_mode() { log.result(&row)?; }
    Ok(())
}

pub async fn ls(store_path: &Path, args: LsCmd) -> Result<()> {
    let log = telemetry::track();
    let _g = log.root_span_kv([("action", "ls".to_string()), ("pending", args.pending.to_string())]).entered();
    let store = { let _s = log.span(&TrackPhase::Load).entered(); Store::open(store_path)? };
    let _s = log.span(&TrackPhase::List).entered();

    let now = Utc::now();
    let rows: Vec<ShipmentRow> = store
        .items()
        .iter()
        .filter(|s| !args.pending || !s.is_delivered)
        .map(ShipmentRow::from)
        .collect();

    if telemetry::config::json_mode() {
        let list = ShipmentList { total: store.items().len(), undelivered: store.undelivered_numbers().len(), shipments: rows };
        log.result(&list)?;
        return Ok(());
    }
    log.info(format!("📦 {} shipment(s), {} undelivered", store.items().len(), store.undelivered_numbers().len()));
    for r in &rows {
        let when = r.last_update.map(|t| format_relative(t, now)).unwrap_or_default();
        log.info(format!("  {}  {:<6} {}  {}", r.tracking_number, r.name, r.badge, when));
    }
    Ok(())
}

pub async fn show(store_path: &Path, args: ShowCmd) -> Result<()> {
    let log = telemetry::track();
    let _g = log.root_span_kv([("action", "show".to_string()), ("tracking_number", args.tracking_number.clone())]).entered();
    let store = { let _s = log.span(&TrackPhase::Load).entered(); Store::open(store_path)? };
    let Some(s) = store.get(&args.tracking_number) else { bail!("not tracking {}", args.tracking_number) };

    let _s = log.span(&TrackPhase::Show).entered();
    if telemetry::config::json_mode() {
        log.result(s)?;
        return Ok(());
    }
    let now = Utc::now();
    log.info(format!("{} {}  x{}  {}", s.tracking_number, s.name, s.quantity, s.badge()));
    if !s.address.is_empty() { log.info(format!("  {}", s.address)); }
    if s.status_history.is_empty() { log.info("  尚無貨態記錄"); }
    for ev in s.status_history.iter().rev() {
        log.info(format!("  {} {}  {} ({})", ev.icon, ev.status, format_carrier_local(ev.timestamp), format_relative(ev.timestamp, now)));
    }
    Ok(())
}

pub async fn rm(store_path: &Path, args: RmCmd) -> Result<()> {
    let log = telemetry::track();
    let _g = log.root_span_kv([
        ("action", "rm".to_string()),
        ("mode", if args.apply { "apply".to_string() } else { "plan".to_string() }),
        ("tracking_number", args.tracking_number.clone()),
    ]).entered();
    let mut store = { let _s = log.span(&TrackPhase::Load).entered(); Store::open(store_path)? };
    let Some(s) = store.get(&args.tracking_number) else { bail!("not tracking {}", args.tracking_number) };

    if !args.apply {
        let _s = log.span(&TrackPhase::Plan).entered();
        let plan = RemovePlan { action: "remove", tracking_number: s.tracking_number.clone(), events: s.status_history.len() };
        log.info(format!("📝 Remove plan — {} with {} event(s)", plan.tracking_number, plan.events));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() { log.plan(&plan)?; }
        return Ok(());
    }

    let removed = store.remove(&args.tracking_number)?;
    { let _s = log.span(&TrackPhase::Save).entered(); store.save()?; }
    log.info(format!("🗑️ Stopped tracking {}", removed.tracking_number));
    if telemetry::config::json_mode() { log.result(&RemoveResult { removed: removed.tracking_number })?; }
    Ok(())
}

pub async fn edit(store_path: &Path, args: EditCmd) -> Result<()> {
    let log = telemetry::track();
    let _g = log.root_span_kv([("action", "edit".to_string()), ("tracking_number", args.tracking_number.clone())]).entered();
    if args.name.is_none() && args.address.is_none() && args.quantity.is_none() {
        bail!("nothing to change: pass --name, --address or --quantity");
    }
    let mut store = { let _s = log.span(&TrackPhase::Load).entered(); Store::open(store_path)? };
    let s = store.require_mut(&args.tracking_number)?;
    if let Some(name) = args.name { s.name = name; }
    if let Some(address) = args.address { s.address = address; }
    if let Some(q) = args.quantity { s.quantity = q.max(1); }
    let row = ShipmentRow::from(&*s);
    { let _s = log.span(&TrackPhase::Save).entered(); store.save()?; }
    log.info(format!("✏️ Updated {}", row.tracking_number));
    if telemetry::config::json_mode() { log.result(&row)?; }
    Ok(())
}

pub async fn status(store_path: &Path, args: StatusCmd) -> Result<()> {
    let log = telemetry::track();
    let _g = log.root_span_kv([("action", "status".to_string()), ("tracking_number", args.tracking_number.clone())]).entered();

    let input = args.text.join(" ");
    if input.trim().is_empty() {
        log.info(format!("請輸入 {} 的貨態：", args.tracking_number));
        for (n, label) in preset_labels() { log.info(format!("  {n}. {label}")); }
        return Ok(());
    }

    let mut store = { let _s = log.span(&TrackPhase::Load).entered(); Store::open(store_path)? };
    let event = { let _s = log.span(&TrackPhase::Save).entered(); record_status(&mut store, &LogNotifier, &args.tracking_number, &input, Utc::now())? };
    let is_delivered = store.get(&args.tracking_number).map(|s| s.is_delivered).unwrap_or(false);

    log.info(format!("{} {} recorded for {}", event.icon, event.status, args.tracking_number));
    if telemetry::config::json_mode() {
        log.result(&StatusResult { tracking_number: args.tracking_number, event, is_delivered })?;
    }
    Ok(())
}

pub async fn check(store_path: &Path, args: CheckCmd) -> Result<()> {
    let log = telemetry::check();
    let _g = log.root_span_kv([("tracking_number", format!("{:?}", args.tracking_number)), ("pace_ms", args.pace_ms.to_string())]).entered();

    let store = { let _s = log.span(&CheckPhase::Load).entered(); Store::open(store_path)? };
    let source = carrier::event_source(&CarrierConfig::from_env())?;
    let mut tracker = Tracker::new(store, source, Box::new(LogNotifier))
        .with_options(ReconcileOptions { skip_empty_status: args.skip_empty });

    let reports = match &args.tracking_number {
        Some(tn) => vec![tracker.check(tn, Utc::now()).await?],
        None => {
            let cancel = CancellationToken::new();
            watch::run_pass(&mut tracker, Duration::from_millis(args.pace_ms), &cancel).await?
        }
    };

    let totals = CheckTotals {
        checked: reports.len(),
        added: reports.iter().map(|r| r.added).sum(),
        newly_delivered: reports.iter().filter(|r| r.newly_delivered).count(),
        not_found: reports.iter().filter(|r| r.error.is_none() && r.fetched == 0).count(),
        errors: reports.iter().filter(|r| r.error.is_some()).count(),
    };
    log.totals(&totals);
    if telemetry::config::json_mode() {
        log.result(&serde_json::json!({ "totals": totals, "shipments": reports }))?;
    }
    Ok(())
}
