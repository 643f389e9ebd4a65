use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reconcile::{self, Reconciliation};

pub const TRACKING_NUMBER_LEN: usize = 10;

/// Carrier tracking numbers are exactly ten ASCII digits.
pub fn is_valid_tracking_number(s: &str) -> bool {
    s.len() == TRACKING_NUMBER_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCode {
    Pickup,
    Transit,
    Delivery,
    Delivered,
    Exception,
    #[default]
    #[serde(other)]
    Custom,
}

impl StatusCode {
    pub fn icon(&self) -> &'static str {
        match self {
            StatusCode::Pickup => "📦",
            StatusCode::Transit => "🚚",
            StatusCode::Delivery => "🏃",
            StatusCode::Delivered => "✅",
            StatusCode::Exception => "⚠️",
            StatusCode::Custom => "📝",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub code: StatusCode,
    #[serde(default)]
    pub icon: String,
}

impl StatusEvent {
    pub fn new(timestamp: DateTime<Utc>, status: impl Into<String>, code: StatusCode) -> Self {
        Self { timestamp, status: status.into(), code, icon: code.icon().to_string() }
    }
}

fn default_quantity() -> u32 { 1 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedShipment {
    pub tracking_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub status_history: Vec<StatusEvent>,
    #[serde(default)]
    pub is_delivered: bool,
}

impl TrackedShipment {
    pub fn new(tracking_number: &str, now: DateTime<Utc>) -> Result<Self> {
        let tracking_number = tracking_number.trim();
        if !is_valid_tracking_number(tracking_number) {
            bail!("tracking number must be {} digits: {:?}", TRACKING_NUMBER_LEN, tracking_number);
        }
        Ok(Self {
            tracking_number: tracking_number.to_string(),
            name: String::new(),
            address: String::new(),
            quantity: default_quantity(),
            added_at: now,
            status_history: Vec::new(),
            is_delivered: false,
        })
    }

    pub fn latest(&self) -> Option<&StatusEvent> {
        self.status_history.last()
    }

    /// Append a user-entered event. Returns true when it flips the shipment to delivered.
    pub fn record_manual(&mut self, event: StatusEvent) -> bool {
        let was = self.is_delivered;
        self.status_history.push(event);
        self.is_delivered = was || reconcile::history_is_delivered(&self.status_history);
        self.is_delivered && !was
    }

    /// Take a merged history. The stored flag is never cleared, so a record
    /// already marked delivered does not transition again. Returns true on a
    /// false -> true transition.
    pub fn apply(&mut self, rec: Reconciliation) -> bool {
        let was = self.is_delivered;
        self.status_history = rec.history;
        self.is_delivered = was || rec.is_delivered;
        self.is_delivered && !was
    }

    // Icons are derived from codes; stored glyphs are not trusted.
    pub fn normalize_icons(&mut self) {
        for ev in &mut self.status_history {
            ev.icon = ev.code.icon().to_string();
        }
    }

    pub fn badge(&self) -> String {
        if self.is_delivered { return "✅ 已送達".to_string(); }
        match self.latest() {
            Some(ev) => strip_leading_glyph(&ev.status).to_string(),
            None => "待查詢".to_string(),
        }
    }
}

// Preset labels carry a glyph prefix ("📦 已集貨"); the badge shows the words only.
fn strip_leading_glyph(s: &str) -> &str {
    let trimmed = s.trim_start();
    match trimmed.split_once(' ') {
        Some((head, rest)) if !head.chars().any(|c| c.is_alphanumeric()) => rest.trim_start(),
        _ => trimmed,
    }
}
