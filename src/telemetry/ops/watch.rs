use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Watch;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Tick, Pass, Pace }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Tick => "tick",
        Phase::Pass => "pass",
        Phase::Pace => "pace",
    }}
    fn span(&self) -> Span { match self {
        Phase::Tick => info_span!("tick"),
        Phase::Pass => info_span!("pass"),
        Phase::Pace => info_span!("pace"),
    }}
}

impl OpMarker for Watch {
    const NAME: &'static str = "watch";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("watch") }
}
