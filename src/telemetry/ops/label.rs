use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Label;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Recognize, Load, Apply }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Recognize => "recognize",
        Phase::Load => "load",
        Phase::Apply => "apply",
    }}
    fn span(&self) -> Span { match self {
        Phase::Recognize => info_span!("recognize"),
        Phase::Load => info_span!("load"),
        Phase::Apply => info_span!("apply"),
    }}
}

impl OpMarker for Label {
    const NAME: &'static str = "label";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("label") }
}
