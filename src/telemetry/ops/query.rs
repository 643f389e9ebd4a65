use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Query;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Handle, Respond }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Handle => "handle",
        Phase::Respond => "respond",
    }}
    fn span(&self) -> Span { match self {
        Phase::Handle => info_span!("handle"),
        Phase::Respond => info_span!("respond"),
    }}
}

impl OpMarker for Query {
    const NAME: &'static str = "query";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("query") }
}
