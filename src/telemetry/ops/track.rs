use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Track;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Load, Plan, List, Show, Save }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Load => "load",
        Phase::Plan => "plan",
        Phase::List => "list",
        Phase::Show => "show",
        Phase::Save => "save",
    }}
    fn span(&self) -> Span { match self {
        Phase::Load => info_span!("load"),
        Phase::Plan => info_span!("plan"),
        Phase::List => info_span!("list"),
        Phase::Show => info_span!("show"),
        Phase::Save => info_span!("save"),
    }}
}

impl OpMarker for Track {
    const NAME: &'static str = "track";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("track") }
}
