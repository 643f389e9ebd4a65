use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extractor::{PageDiagnostics, RawEvent};

/// JSON body of the query endpoint; success and failure share one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_list: Option<Vec<RawEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<PageDiagnostics>,
}

impl QueryResponse {
    pub fn found(tracking_number: &str, status_list: Vec<RawEvent>, now: DateTime<Utc>) -> Self {
        Self {
            success: true,
            tracking_number: Some(tracking_number.to_string()),
            status_list: Some(status_list),
            timestamp: Some(now),
            error: None,
            debug: None,
        }
    }

    pub fn not_found(tracking_number: &str, debug: PageDiagnostics) -> Self {
        Self {
            success: false,
            tracking_number: Some(tracking_number.to_string()),
            status_list: None,
            timestamp: None,
            error: Some(NOT_FOUND.to_string()),
            debug: Some(debug),
        }
    }

    pub fn failure(tracking_number: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tracking_number: tracking_number.map(str::to_string),
            status_list: None,
            timestamp: None,
            error: Some(error.into()),
            debug: None,
        }
    }
}

pub const MISSING_NUMBER: &str = "缺少 trackingNumber 參數";
pub const MALFORMED_NUMBER: &str = "貨號格式錯誤（必須是 10 碼數字）";
pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
pub const NOT_FOUND: &str = "未找到貨態記錄";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Options,
    Other,
}

impl Method {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "OPTIONS" => Method::Options,
            _ => Method::Other,
        }
    }
}

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpReply {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<QueryResponse>,
}

impl HttpReply {
    pub fn new(status: u16, body: Option<QueryResponse>) -> Self {
        Self { status, headers: CORS_HEADERS.to_vec(), body }
    }
}
