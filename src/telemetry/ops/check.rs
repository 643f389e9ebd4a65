use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Check;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Load, Shipment, Fetch, Reconcile, Save, Notify }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Load => "load",
        Phase::Shipment => "shipment",
        Phase::Fetch => "fetch",
        Phase::Reconcile => "reconcile",
        Phase::Save => "save",
        Phase::Notify => "notify",
    }}
    fn span(&self) -> Span { match self {
        Phase::Load => info_span!("load"),
        Phase::Shipment => info_span!("shipment"),
        Phase::Fetch => info_span!("fetch"),
        Phase::Reconcile => info_span!("reconcile"),
        Phase::Save => info_span!("save"),
        Phase::Notify => info_span!("notify"),
    }}
}

impl OpMarker for Check {
    const NAME: &'static str = "check";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("check") }
}
