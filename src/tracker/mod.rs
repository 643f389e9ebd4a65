// Owns the store and drives fetch -> extract -> reconcile -> save -> notify.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::carrier::EventSource;
use crate::reconcile::{reconcile_with, ReconcileOptions};
use crate::shipment::{manual_status, StatusEvent, Store};
use crate::telemetry::{self};
use crate::telemetry::ops::check::Phase as CheckPhase;

pub mod commands;
pub mod notify;
pub mod types;

pub use notify::{LogNotifier, Notification, Notifier};

/// Outcome of checking one shipment against the carrier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub tracking_number: String,
    pub fetched: usize,
    pub added: usize,
    pub is_delivered: bool,
    pub newly_delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckReport {
    pub fn found(&self) -> bool { self.error.is_none() && self.fetched > 0 }
}

pub struct Tracker {
    store: Store,
    source: Box<dyn EventSource>,
    notifier: Box<dyn Notifier>,
    opts: ReconcileOptions,
}

impl Tracker {
    pub fn new(store: Store, source: Box<dyn EventSource>, notifier: Box<dyn Notifier>) -> Self {
        Self { store, source, notifier, opts: ReconcileOptions::default() }
    }

    pub fn with_options(mut self, opts: ReconcileOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn store(&self) -> &Store { &self.store }

    pub fn notify(&self, n: Notification) { self.notifier.notify(&n) }

    /// Fetch and merge one shipment. Carrier failures end up in the report;
    /// only store errors are returned.
    pub async fn check(&mut self, tracking_number: &str, now: DateTime<Utc>) -> Result<CheckReport> {
        let log = telemetry::check();
        let _g = log.span_kv(&CheckPhase::Shipment, [("tracking_number", tracking_number.to_string())]).entered();

        let Some(current) = self.store.get(tracking_number) else { bail!("not tracking {}", tracking_number) };
        let mut report = CheckReport {
            tracking_number: tracking_number.to_string(),
            fetched: 0,
            added: 0,
            is_delivered: current.is_delivered,
            newly_delivered: false,
            error: None,
        };

        let fetched = {
            let _s = log.span(&CheckPhase::Fetch).entered();
            match self.source.events(tracking_number).await {
                Ok(events) => events,
                Err(err) => {
                    log.warn_kv("❌ carrier query failed", [
                        ("tracking_number", tracking_number.to_string()),
                        ("retryable", err.is_retryable().to_string()),
                        ("error", err.to_string()),
                    ]);
                    report.error = Some(err.to_string());
                    return Ok(report);
                }
            }
        };
        report.fetched = fetched.len();
        if fetched.is_empty() {
            log.info_kv("🔍 no status events found", [("tracking_number", tracking_number.to_string())]);
            return Ok(report);
        }

        let shipment = self.store.require_mut(tracking_number)?;
        let rec = { let _s = log.span(&CheckPhase::Reconcile).entered(); reconcile_with(&shipment.status_history, &fetched, now, self.opts) };
        let was_delivered = shipment.is_delivered;
        report.added = rec.added;
        report.newly_delivered = shipment.apply(rec);
        report.is_delivered = shipment.is_delivered;
        let changed = report.added > 0 || shipment.is_delivered != was_delivered;

        if changed {
            let _s = log.span(&CheckPhase::Save).entered();
            self.store.save()?;
        }
        if report.newly_delivered {
            let _s = log.span(&CheckPhase::Notify).entered();
            self.notify(Notification::Delivered { tracking_number: tracking_number.to_string() });
        }
        log.shipment_summary(&report);
        Ok(report)
    }

    pub fn record_status(&mut self, tracking_number: &str, input: &str, now: DateTime<Utc>) -> Result<StatusEvent> {
        record_status(&mut self.store, self.notifier.as_ref(), tracking_number, input, now)
    }
}

/// Record a user-entered status (`1`-`5` preset or free text) and save.
pub fn record_status(
    store: &mut Store,
    notifier: &dyn Notifier,
    tracking_number: &str,
    input: &str,
    now: DateTime<Utc>,
) -> Result<StatusEvent> {
    let Some(event) = manual_status(input, now) else { bail!("status text is empty") };
    let shipment = store.require_mut(tracking_number)?;
    let newly = shipment.record_manual(event.clone());
    store.save()?;
    if newly {
        notifier.notify(&Notification::Delivered { tracking_number: tracking_number.to_string() });
    }
    Ok(event)
}
