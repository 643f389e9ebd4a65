use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use url::Url;

use super::{CarrierConfig, CarrierError, EventSource};
use crate::extractor::RawEvent;
use crate::query::QueryResponse;

/// Client for a deployed query endpoint (`GET ?trackingNumber=`).
pub struct EndpointClient {
    http: HttpClient,
    base: Url,
}

impl EndpointClient {
    pub fn new(endpoint: &str, cfg: &CarrierConfig) -> anyhow::Result<Self> {
        let base = Url::parse(endpoint).with_context(|| format!("invalid HCT_QUERY_ENDPOINT {endpoint:?}"))?;
        let http = HttpClient::builder().timeout(cfg.timeout).build().context("build http client")?;
        Ok(Self { http, base })
    }

    pub fn request_url(&self, tracking_number: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("trackingNumber", tracking_number);
        url
    }
}

/// Interpret an endpoint reply. A "not found" reply is zero events, not an error.
pub fn events_from_reply(status: reqwest::StatusCode, body: &str) -> Result<Vec<RawEvent>, CarrierError> {
    let parsed: Result<QueryResponse, _> = serde_json::from_str(body);
    if !status.is_success() {
        let message = parsed.ok().and_then(|r| r.error);
        return Err(CarrierError::Status { status, message });
    }
    let reply = parsed.map_err(|e| CarrierError::Decode(e.to_string()))?;
    if !reply.success {
        tracing::debug!(error = ?reply.error, "endpoint reported no events");
        return Ok(Vec::new());
    }
    Ok(reply.status_list.unwrap_or_default())
}

#[async_trait]
impl EventSource for EndpointClient {
    async fn events(&self, tracking_number: &str) -> Result<Vec<RawEvent>, CarrierError> {
        let response = self
            .http
            .get(self.request_url(tracking_number))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(CarrierError::http)?;
        let status = response.status();
        let body = response.text().await.map_err(CarrierError::http)?;
        events_from_reply(status, &body)
    }
}
