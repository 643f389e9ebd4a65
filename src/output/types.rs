use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "hct.v1";

/// Timing attached to an envelope; `duration_ms` counts from the start of the operation.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

/// What an operation reports: a plan it would carry out (`rm` without `--apply`)
/// or the result of what it did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Plan(Value),
    Result(Value),
}

impl Payload {
    pub fn label(&self) -> &'static str {
        match self {
            Payload::Plan(_) => "Plan",
            Payload::Result(_) => "Result",
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Payload::Plan(v) | Payload::Result(v) => v,
        }
    }
}

/// One stdout document per `hct --json` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub schema_version: &'static str,
    pub time: DateTime<Utc>,
    pub request_id: Uuid,
    pub op: &'static str,
    pub apply: bool,
    #[serde(flatten)]
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Envelope {
    fn new(op: &'static str, payload: Payload, meta: Option<Meta>) -> Self {
        Envelope {
            schema_version: SCHEMA_VERSION,
            time: Utc::now(),
            request_id: Uuid::new_v4(),
            op,
            apply: matches!(payload, Payload::Result(_)),
            payload,
            meta,
        }
    }

    pub fn plan<T: Serialize>(op: &'static str, plan: &T, meta: Option<Meta>) -> Result<Self, serde_json::Error> {
        Ok(Self::new(op, Payload::Plan(serde_json::to_value(plan)?), meta))
    }

    pub fn result<T: Serialize>(op: &'static str, result: &T, meta: Option<Meta>) -> Result<Self, serde_json::Error> {
        Ok(Self::new(op, Payload::Result(serde_json::to_value(result)?), meta))
    }
}
