use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{info, warn, Span};

use super::emit;
use crate::output::types::Meta;
use crate::tracker::types::CheckTotals;
use crate::tracker::CheckReport;

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

pub struct LogCtx<O: OpMarker> {
    json: bool,
    started: Instant,
    _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    pub fn new(json: bool) -> Self { Self { json, started: Instant::now(), _marker: PhantomData } }

    fn meta(&self) -> Option<Meta> { Some(Meta { duration_ms: Some(self.started.elapsed().as_millis()) }) }

    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), "start");
        } else {
            info!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span { ph.span() }

    pub fn span_kv<'a, T>(&self, ph: &O::Phase, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.span(ph);
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), phase = ph.name(), "span_start");
        } else {
            info!(op = %self.op_name(), phase = ph.name(), details = %details, "span_start");
        }
        span
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        if self.json { let details = kv_to_string(kv); info!(op = %self.op_name(), details = %details, "{}", msg); }
        else { info!("{}", msg); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else { warn!("{} {}", msg, details); }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> { emit::print_plan(self.op_name(), plan, self.meta()) }
    pub fn result<T: Serialize>(&self, result: &T) -> Result<()> { emit::print_result(self.op_name(), result, self.meta()) }
}

impl LogCtx<crate::telemetry::ops::check::Check> {
    pub fn shipment_summary(&self, r: &CheckReport) {
        if self.json {
            info!(op = %self.op_name(), tracking_number = %r.tracking_number, fetched = r.fetched, added = r.added, delivered = r.is_delivered, "shipment_summary");
        } else {
            let flag = if r.newly_delivered { " 🎉 delivered" } else { "" };
            info!("✅ {} — fetched={} added={}{}", r.tracking_number, r.fetched, r.added, flag);
        }
    }

    pub fn totals(&self, t: &CheckTotals) {
        if self.json {
            info!(op = %self.op_name(), checked = t.checked, added = t.added, newly_delivered = t.newly_delivered, not_found = t.not_found, errors = t.errors, "check_totals");
        } else {
            info!("📊 Check totals — checked={} added={} delivered={} not_found={} errors={}", t.checked, t.added, t.newly_delivered, t.not_found, t.errors);
        }
    }
}

impl LogCtx<crate::telemetry::ops::watch::Watch> {
    pub fn pass_summary(&self, pass: usize, reports: &[CheckReport]) {
        let added: usize = reports.iter().map(|r| r.added).sum();
        let errors = reports.iter().filter(|r| r.error.is_some()).count();
        if self.json { info!(op = %self.op_name(), pass, checked = reports.len(), added, errors, "pass_summary"); }
        else { info!("🔁 Pass {} — checked={} added={} errors={}", pass, reports.len(), added, errors); }
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_pairs_join_with_spaces() {
        assert_eq!(kv_to_string([("a", "1".to_string()), ("b", "x y".to_string())]), "a=1 b=x y");
        assert_eq!(kv_to_string(std::iter::empty::<(&str, String)>()), "");
    }
}
