use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client as HttpClient;
use url::Url;

use super::{CarrierClient, CarrierConfig, CarrierError};
use crate::util::time::carrier_offset;

pub const DEFAULT_APP_API_URL: &str = "https://hctapiweb.hct.com.tw/phone/searchGoods_Main.aspx";
const APP_API_VERSION: &str = "314FABD52C024B800AE5F0D2B1AC4FF1";
const KEY_LAG_DAYS: i64 = 218;
const IV: &[u8; 8] = b"PEBQNLTU";

type DesCbcEnc = cbc::Encryptor<des::Des>;

/// The key is the carrier-local date 218 days back, as `yyyyMMdd`.
pub fn key_for(now: DateTime<Utc>) -> String {
    let day = now.with_timezone(&carrier_offset()).date_naive() - Duration::days(KEY_LAG_DAYS);
    day.format("%Y%m%d").to_string()
}

/// DES-CBC (PKCS#7) of the tracking number, Base64 encoded.
pub fn encrypt_number(tracking_number: &str, now: DateTime<Utc>) -> Result<String, CarrierError> {
    let key = key_for(now);
    let cipher = DesCbcEnc::new_from_slices(key.as_bytes(), IV)
        .map_err(|_| CarrierError::Decode(format!("DES key {key:?} is not 8 bytes")))?;
    let sealed = cipher.encrypt_padded_vec_mut::<Pkcs7>(tracking_number.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(sealed))
}

/// The carrier's mobile-app lookup: the number goes out encrypted, a status table comes back.
pub struct AppApiCarrier {
    http: HttpClient,
    base: Url,
}

impl AppApiCarrier {
    pub fn new(cfg: &CarrierConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&cfg.app_api_url).with_context(|| format!("invalid HCT_APP_API_URL {:?}", cfg.app_api_url))?;
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build http client")?;
        Ok(Self { http, base })
    }

    pub fn request_url(&self, tracking_number: &str, now: DateTime<Utc>) -> Result<Url, CarrierError> {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("no", &encrypt_number(tracking_number, now)?)
            .append_pair("v", APP_API_VERSION);
        Ok(url)
    }
}

#[async_trait]
impl CarrierClient for AppApiCarrier {
    async fn fetch_page(&self, tracking_number: &str) -> Result<String, CarrierError> {
        let url = self.request_url(tracking_number, Utc::now())?;
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "zh-TW,zh;q=0.9")
            .send()
            .await
            .map_err(CarrierError::http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CarrierError::Status { status, message: status.canonical_reason().map(str::to_string) });
        }
        let body = response.text().await.map_err(CarrierError::http)?;
        tracing::debug!(len = body.len(), "app api page fetched");
        Ok(body)
    }
}
