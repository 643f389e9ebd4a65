use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use super::types::{is_valid_tracking_number, StatusCode, StatusEvent, TrackedShipment};
use crate::reconcile;

pub const DEFAULT_STORE_PATH: &str = "hct_tracking_items.json";

// Accepts both the current shape and the older single-status one
// (`lastStatus`/`lastUpdate`/`statusCode`, no `statusHistory`).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    tracking_number: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    quantity: Option<u32>,
    added_at: Option<DateTime<Utc>>,
    status_history: Option<Vec<StatusEvent>>,
    #[serde(default)]
    is_delivered: bool,
    last_status: Option<String>,
    last_update: Option<DateTime<Utc>>,
    status_code: Option<StatusCode>,
}

impl StoredRecord {
    fn into_shipment(self, now: DateTime<Utc>) -> TrackedShipment {
        let added_at = self.added_at.unwrap_or(now);
        let status_history = match self.status_history {
            Some(h) => h,
            None => self
                .last_status
                .map(|s| vec![StatusEvent::new(self.last_update.unwrap_or(added_at), s, self.status_code.unwrap_or_default())])
                .unwrap_or_default(),
        };
        let mut shipment = TrackedShipment {
            tracking_number: self.tracking_number,
            name: self.name,
            address: self.address,
            quantity: self.quantity.filter(|q| *q > 0).unwrap_or(1),
            added_at,
            status_history,
            is_delivered: self.is_delivered,
        };
        shipment.normalize_icons();
        // A stored flag may predate any stored event; it is never cleared on load.
        shipment.is_delivered = reconcile::history_is_delivered(&shipment.status_history) || self.is_delivered;
        shipment
    }
}

/// All tracked shipments, persisted as one JSON array.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    items: Vec<TrackedShipment>,
}

impl Store {
    pub fn in_memory(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), items: Vec::new() }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() { return Ok(Self::in_memory(path)); }
        let raw = std::fs::read_to_string(&path).with_context(|| format!("read store {}", path.display()))?;
        let items = Self::parse(&raw, Utc::now()).with_context(|| format!("parse store {}", path.display()))?;
        Ok(Self { path, items })
    }

    pub fn parse(raw: &str, now: DateTime<Utc>) -> Result<Vec<TrackedShipment>> {
        if raw.trim().is_empty() { return Ok(Vec::new()); }
        let records: Vec<StoredRecord> = serde_json::from_str(raw)?;
        let mut items: Vec<TrackedShipment> = Vec::with_capacity(records.len());
        for rec in records {
            if !is_valid_tracking_number(&rec.tracking_number) {
                warn!(tracking_number = %rec.tracking_number, "skipping stored record with malformed tracking number");
                continue;
            }
            if items.iter().any(|s| s.tracking_number == rec.tracking_number) {
                warn!(tracking_number = %rec.tracking_number, "skipping duplicate stored record");
                continue;
            }
            items.push(rec.into_shipment(now));
        }
        Ok(items)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(&self.items)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn items(&self) -> &[TrackedShipment] { &self.items }

    pub fn get(&self, tracking_number: &str) -> Option<&TrackedShipment> {
        self.items.iter().find(|s| s.tracking_number == tracking_number)
    }

    pub fn get_mut(&mut self, tracking_number: &str) -> Option<&mut TrackedShipment> {
        self.items.iter_mut().find(|s| s.tracking_number == tracking_number)
    }

    pub fn require_mut(&mut self, tracking_number: &str) -> Result<&mut TrackedShipment> {
        match self.get_mut(tracking_number) {
            Some(s) => Ok(s),
            None => bail!("not tracking {}", tracking_number),
        }
    }

    pub fn add(&mut self, shipment: TrackedShipment) -> Result<&TrackedShipment> {
        if self.get(&shipment.tracking_number).is_some() {
            bail!("already tracking {}", shipment.tracking_number);
        }
        self.items.push(shipment);
        let idx = self.items.len() - 1;
        Ok(&self.items[idx])
    }

    pub fn remove(&mut self, tracking_number: &str) -> Result<TrackedShipment> {
        match self.items.iter().position(|s| s.tracking_number == tracking_number) {
            Some(idx) => Ok(self.items.remove(idx)),
            None => bail!("not tracking {}", tracking_number),
        }
    }

    pub fn undelivered_numbers(&self) -> Vec<String> {
        self.items.iter().filter(|s| !s.is_delivered).map(|s| s.tracking_number.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> { "2025-10-23T01:00:00Z".parse().unwrap() }

    #[test]
    fn legacy_record_gets_one_synthesized_event() {
        let raw = r#"[{
            "trackingNumber": "6714484884",
            "addedAt": "2025-10-20T02:00:00.000Z",
            "lastStatus": "配送中",
            "lastUpdate": "2025-10-22T00:00:00.000Z",
            "statusCode": "delivery"
        }]"#;
        let items = Store::parse(raw, now()).unwrap();
        assert_eq!(items.len(), 1);
        let s = &items[0];
        assert_eq!(s.status_history.len(), 1);
        let ev = &s.status_history[0];
        assert_eq!(ev.status, "配送中");
        assert_eq!(ev.code, StatusCode::Delivery);
        assert_eq!(ev.icon, "🏃");
        assert_eq!(ev.timestamp, "2025-10-22T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(s.quantity, 1);
        assert!(!s.is_delivered);
    }

    #[test]
    fn legacy_record_without_update_uses_added_at_and_custom() {
        let raw = r#"[{"trackingNumber":"6714484884","addedAt":"2025-10-20T02:00:00Z","lastStatus":"順利送達"}]"#;
        let items = Store::parse(raw, now()).unwrap();
        let ev = &items[0].status_history[0];
        assert_eq!(ev.code, StatusCode::Custom);
        assert_eq!(ev.timestamp, items[0].added_at);
        assert!(items[0].is_delivered);
    }

    #[test]
    fn legacy_record_without_status_has_empty_history() {
        let raw = r#"[{"trackingNumber":"6714484884","addedAt":"2025-10-20T02:00:00Z","isDelivered":true}]"#;
        let items = Store::parse(raw, now()).unwrap();
        assert!(items[0].status_history.is_empty());
        assert!(items[0].is_delivered);
    }

    #[test]
    fn current_records_recompute_flag_and_icons() {
        let raw = r#"[{
            "trackingNumber": "6714484884", "name": "王小明", "address": "新竹市東區光復路", "quantity": 2,
            "addedAt": "2025-10-20T02:00:00Z", "isDelivered": false,
            "statusHistory": [{"timestamp":"2025-10-22T04:37:00Z","status":"順利送達","code":"delivered","icon":"?"}]
        }]"#;
        let items = Store::parse(raw, now()).unwrap();
        assert!(items[0].is_delivered);
        assert_eq!(items[0].status_history[0].icon, "✅");
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn migrated_delivered_flag_survives_a_save() {
        let dir = std::env::temp_dir().join(format!("hct-store-{}", uuid::Uuid::new_v4()));
        let path = dir.join("items.json");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, r#"[{"trackingNumber":"6714484884","addedAt":"2025-10-20T02:00:00Z","isDelivered":true}]"#).unwrap();
        Store::open(&path).unwrap().save().unwrap();
        let reopened = Store::open(&path).unwrap();
        assert!(reopened.get("6714484884").unwrap().is_delivered);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_and_duplicate_numbers_are_skipped() {
        let raw = r#"[
            {"trackingNumber":"123","addedAt":"2025-10-20T02:00:00Z","statusHistory":[]},
            {"trackingNumber":"6714484884","addedAt":"2025-10-20T02:00:00Z","statusHistory":[]},
            {"trackingNumber":"6714484884","addedAt":"2025-10-21T02:00:00Z","statusHistory":[]}
        ]"#;
        let items = Store::parse(raw, now()).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn corrupt_store_is_an_error() {
        assert!(Store::parse("{not json", now()).is_err());
        assert!(Store::parse("", now()).unwrap().is_empty());
    }

    #[test]
    fn add_remove_and_save_roundtrip() {
        let dir = std::env::temp_dir().join(format!("hct-store-{}", uuid::Uuid::new_v4()));
        let path = dir.join("items.json");
        let mut store = Store::open(&path).unwrap();
        assert!(store.items().is_empty());

        store.add(TrackedShipment::new("6714484884", now()).unwrap()).unwrap();
        store.add(TrackedShipment::new("1234567890", now()).unwrap()).unwrap();
        assert!(store.add(TrackedShipment::new("6714484884", now()).unwrap()).is_err());
        store.save().unwrap();

        let mut reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.items().len(), 2);
        assert_eq!(reopened.undelivered_numbers(), vec!["6714484884", "1234567890"]);
        reopened.remove("1234567890").unwrap();
        assert!(reopened.remove("1234567890").is_err());
        assert!(reopened.require_mut("0000000000").is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
