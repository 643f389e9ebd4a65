use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::shipment::{StatusEvent, TrackedShipment};

#[derive(Serialize)]
pub struct ShipmentRow {
    pub tracking_number: String,
    pub name: String,
    pub badge: String,
    pub events: usize,
    pub is_delivered: bool,
    pub last_update: Option<DateTime<Utc>>,
}

impl From<&TrackedShipment> for ShipmentRow {
    fn from(s: &TrackedShipment) -> Self {
        Self {
            tracking_number: s.tracking_number.clone(),
            name: s.name.clone(),
            badge: s.badge(),
            events: s.status_history.len(),
            is_delivered: s.is_delivered,
            last_update: s.latest().map(|e| e.timestamp),
        }
    }
}

#[derive(Serialize)]
pub struct ShipmentList {
    pub total: usize,
    pub undelivered: usize,
    pub shipments: Vec<ShipmentRow>,
}

#[derive(Serialize)]
pub struct RemovePlan {
    pub action: &'static str,
    pub tracking_number: String,
    pub events: usize,
}

#[derive(Serialize)]
pub struct RemoveResult {
    pub removed: String,
}

#[derive(Serialize)]
pub struct StatusResult {
    pub tracking_number: String,
    pub event: StatusEvent,
    pub is_delivered: bool,
}

#[derive(Serialize)]
pub struct CheckTotals {
    pub checked: usize,
    pub added: usize,
    pub newly_delivered: usize,
    pub not_found: usize,
    pub errors: usize,
}
