use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CarrierClient, CarrierError};

/// Queue-backed carrier for tests; records every tracking number asked for.
#[derive(Debug, Default)]
pub struct MockCarrier {
    pages: Mutex<VecDeque<Result<String, CarrierError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: Result<String, CarrierError>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CarrierClient for MockCarrier {
    async fn fetch_page(&self, tracking_number: &str) -> Result<String, CarrierError> {
        self.calls.lock().unwrap().push(tracking_number.to_string());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CarrierError::Decode("mock carrier queue is empty".into())))
    }
}
