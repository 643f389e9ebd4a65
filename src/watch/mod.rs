use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::carrier::{self, CarrierConfig};
use crate::reconcile::ReconcileOptions;
use crate::shipment::Store;
use crate::telemetry::{self};
use crate::telemetry::ops::watch::Phase as WatchPhase;
use crate::tracker::{CheckReport, LogNotifier, Notification, Tracker};

pub const DEFAULT_INTERVAL_SECS: u64 = 30 * 60;
pub const DEFAULT_PACE_MS: u64 = 2_000;

/// Re-check undelivered shipments on a timer until all are delivered or Ctrl-C
#[derive(Args, Debug)]
pub struct WatchCmd {
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,
    /// Pause between shipments inside one pass
    #[arg(long, default_value_t = DEFAULT_PACE_MS)]
    pub pace_ms: u64,
    /// Run the first pass right away instead of after one interval
    #[arg(long, default_value_t = false)]
    pub now: bool,
    /// Drop scraped rows with blank status text
    #[arg(long, default_value_t = false)]
    pub skip_empty: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub interval: Duration,
    pub pace: Duration,
    pub immediate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    AllDelivered,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchSummary {
    pub passes: usize,
    pub stopped: StopReason,
}

/// One sequential pass over the undelivered shipments. A started check always
/// finishes; cancellation is honoured between shipments.
pub async fn run_pass(tracker: &mut Tracker, pace: Duration, cancel: &CancellationToken) -> Result<Vec<CheckReport>> {
    let log = telemetry::watch();
    let pending = tracker.store().undelivered_numbers();
    let mut reports = Vec::with_capacity(pending.len());

    for (i, tn) in pending.iter().enumerate() {
        if cancel.is_cancelled() { break; }
        reports.push(tracker.check(tn, Utc::now()).await?);

        if i + 1 < pending.len() && !pace.is_zero() {
            let _s = log.span(&WatchPhase::Pace).entered();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pace) => {}
            }
        }
    }
    Ok(reports)
}

fn all_delivered(tracker: &Tracker) -> bool {
    tracker.store().undelivered_numbers().is_empty()
}

pub async fn run_watch(tracker: &mut Tracker, cfg: WatchConfig, cancel: &CancellationToken) -> Result<WatchSummary> {
    let log = telemetry::watch();
    let start = if cfg.immediate { Instant::now() } else { Instant::now() + cfg.interval };
    let mut ticker = interval_at(start, cfg.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut passes = 0usize;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(WatchSummary { passes, stopped: StopReason::Cancelled }),
            _ = ticker.tick() => {}
        }

        if all_delivered(tracker) {
            tracker.notify(Notification::AllDelivered);
            return Ok(WatchSummary { passes, stopped: StopReason::AllDelivered });
        }

        let pending = tracker.store().undelivered_numbers().len();
        let _p = log.span_kv(&WatchPhase::Pass, [("pass", (passes + 1).to_string()), ("pending", pending.to_string())]).entered();
        tracker.notify(Notification::PassStarted { pending });
        let reports = run_pass(tracker, cfg.pace, cancel).await?;
        passes += 1;

        let delivered = tracker.store().items().iter().filter(|s| s.is_delivered).count();
        if delivered > 0 {
            tracker.notify(Notification::PassFinished { delivered });
        }
        log.pass_summary(passes, &reports);

        if all_delivered(tracker) {
            tracker.notify(Notification::AllDelivered);
            return Ok(WatchSummary { passes, stopped: StopReason::AllDelivered });
        }
        if cancel.is_cancelled() {
            return Ok(WatchSummary { passes, stopped: StopReason::Cancelled });
        }
    }
}

pub async fn run(store_path: &Path, args: WatchCmd) -> Result<()> {
    let log = telemetry::watch();
    let _g = log.root_span_kv([
        ("interval_secs", args.interval_secs.to_string()),
        ("pace_ms", args.pace_ms.to_string()),
        ("now", args.now.to_string()),
    ]).entered();

    let store = Store::open(store_path)?;
    let source = carrier::event_source(&CarrierConfig::from_env())?;
    let mut tracker = Tracker::new(store, source, Box::new(LogNotifier))
        .with_options(ReconcileOptions { skip_empty_status: args.skip_empty });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() { on_signal.cancel(); }
    });

    let cfg = WatchConfig {
        interval: Duration::from_secs(args.interval_secs.max(1)),
        pace: Duration::from_millis(args.pace_ms),
        immediate: args.now,
    };
    log.info(format!("⏱️ Watching {} undelivered shipment(s) every {}s", tracker.store().undelivered_numbers().len(), cfg.interval.as_secs()));
    let summary = { let _s = log.span(&WatchPhase::Tick).entered(); run_watch(&mut tracker, cfg, &cancel).await? };

    match summary.stopped {
        StopReason::AllDelivered => log.info(format!("🎉 All shipments delivered after {} pass(es)", summary.passes)),
        StopReason::Cancelled => log.info(format!("🛑 Watch stopped after {} pass(es)", summary.passes)),
    }
    if telemetry::config::json_mode() { log.result(&summary)?; }
    Ok(())
}
