// Getting carrier pages and events off the network.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{Client as HttpClient, StatusCode};
use url::Url;

use crate::extractor::{self, RawEvent};

pub mod app_api;
pub mod endpoint;
#[cfg(test)]
pub mod mock;
pub mod routes;

pub use app_api::AppApiCarrier;
pub use endpoint::EndpointClient;
pub use routes::ProxyRoute;

const DEFAULT_BASE_URL: &str = "https://www.hct.com.tw/Search/SearchGoods.aspx";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 15;
const RETRY_PAUSE_MS: u64 = 800;
pub const MIN_BODY_BYTES: usize = 200;

// Title of the tracker's own front page; seeing it means a proxy bounced us back.
const SELF_ECHO_MARKER: &str = "新竹物流貨態查詢通知";

/// Which carrier service pages come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Upstream {
    /// The public search page, with proxy fallbacks.
    #[default]
    Page,
    /// The mobile-app lookup with an encrypted number.
    App,
}

impl Upstream {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page" => Some(Upstream::Page),
            "app" => Some(Upstream::App),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CarrierConfig {
    pub upstream: Upstream,
    pub app_api_url: String,
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub proxies: Vec<ProxyRoute>,
    pub attempt_timeout: Duration,
    pub retry_pause: Duration,
    pub query_endpoint: Option<String>,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            upstream: Upstream::default(),
            app_api_url: app_api::DEFAULT_APP_API_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            proxies: Vec::new(),
            attempt_timeout: Duration::from_secs(DEFAULT_PROXY_TIMEOUT_SECS),
            retry_pause: Duration::from_millis(RETRY_PAUSE_MS),
            query_endpoint: None,
        }
    }
}

impl CarrierConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(upstream) = std::env::var("HCT_UPSTREAM") {
            match Upstream::parse(&upstream) {
                Some(u) => cfg.upstream = u,
                None => tracing::warn!(value = %upstream, "ignoring HCT_UPSTREAM; expected page or app"),
            }
        }
        if let Ok(url) = std::env::var("HCT_APP_API_URL") {
            cfg.app_api_url = url;
        }
        if let Ok(base) = std::env::var("HCT_BASE_URL") {
            cfg.base_url = base;
        }
        if let Ok(ua) = std::env::var("HCT_USER_AGENT") {
            cfg.user_agent = ua;
        }
        if let Ok(timeout) = std::env::var("HCT_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.timeout = Duration::from_secs(parsed);
            }
        }
        if let Ok(timeout) = std::env::var("HCT_PROXY_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.attempt_timeout = Duration::from_secs(parsed);
            }
        }
        if let Ok(list) = std::env::var("HCT_PROXIES") {
            cfg.proxies = routes::parse_routes(&list);
        }
        cfg.query_endpoint = std::env::var("HCT_QUERY_ENDPOINT").ok().filter(|s| !s.trim().is_empty());
        cfg
    }
}

#[derive(Debug)]
pub enum CarrierError {
    Http(reqwest::Error),
    Timeout,
    Status { status: StatusCode, message: Option<String> },
    TooShort { len: usize },
    SelfEcho,
    AllRoutesFailed(Vec<(String, CarrierError)>),
    Decode(String),
}

impl CarrierError {
    fn http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CarrierError::Timeout
        } else {
            CarrierError::Http(err)
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            CarrierError::Timeout | CarrierError::Http(_) | CarrierError::TooShort { .. } => true,
            CarrierError::Status { status, .. } => status.is_server_error(),
            CarrierError::SelfEcho | CarrierError::AllRoutesFailed(_) | CarrierError::Decode(_) => false,
        }
    }
}

impl std::fmt::Display for CarrierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CarrierError::Http(err) => write!(f, "http error: {err}"),
            CarrierError::Timeout => write!(f, "request timed out"),
            CarrierError::Status { status, message: Some(m) } => write!(f, "HTTP {status}: {m}"),
            CarrierError::Status { status, message: None } => write!(f, "HTTP {status}"),
            CarrierError::TooShort { len } => write!(f, "response too short ({len} bytes)"),
            CarrierError::SelfEcho => write!(f, "fetch returned the tracker's own page instead of the carrier's"),
            CarrierError::AllRoutesFailed(errors) => {
                write!(f, "all {} routes failed", errors.len())?;
                for (name, err) in errors {
                    write!(f, "; {name}: {err}")?;
                }
                Ok(())
            }
            CarrierError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for CarrierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CarrierError::Http(err) => Some(err),
            _ => None,
        }
    }
}

/// Something that can hand back the carrier's tracking page for a number.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    async fn fetch_page(&self, tracking_number: &str) -> Result<String, CarrierError>;
}

#[async_trait]
impl<C: CarrierClient + ?Sized> CarrierClient for Arc<C> {
    async fn fetch_page(&self, tracking_number: &str) -> Result<String, CarrierError> {
        (**self).fetch_page(tracking_number).await
    }
}

#[async_trait]
impl<C: CarrierClient + ?Sized> CarrierClient for Box<C> {
    async fn fetch_page(&self, tracking_number: &str) -> Result<String, CarrierError> {
        (**self).fetch_page(tracking_number).await
    }
}

/// Where the tracker gets raw events from: a scraped page or a deployed query endpoint.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn events(&self, tracking_number: &str) -> Result<Vec<RawEvent>, CarrierError>;
}

pub struct PageSource<C> {
    client: C,
}

impl<C: CarrierClient> PageSource<C> {
    pub fn new(client: C) -> Self { Self { client } }
}

#[async_trait]
impl<C: CarrierClient> EventSource for PageSource<C> {
    async fn events(&self, tracking_number: &str) -> Result<Vec<RawEvent>, CarrierError> {
        let html = self.client.fetch_page(tracking_number).await?;
        Ok(extractor::extract(&html))
    }
}

/// The page fetcher for the configured upstream.
pub fn page_client(cfg: &CarrierConfig) -> anyhow::Result<Box<dyn CarrierClient>> {
    Ok(match cfg.upstream {
        Upstream::Page => Box::new(HttpCarrier::new(cfg.clone())?),
        Upstream::App => Box::new(AppApiCarrier::new(cfg)?),
    })
}

/// Pick the event source the config asks for.
pub fn event_source(cfg: &CarrierConfig) -> anyhow::Result<Box<dyn EventSource>> {
    Ok(match &cfg.query_endpoint {
        Some(endpoint) => Box::new(EndpointClient::new(endpoint, cfg)?),
        None => Box::new(PageSource::new(page_client(cfg)?)),
    })
}

/// Direct fetch of the carrier page, then each configured proxy in turn.
#[derive(Clone)]
pub struct HttpCarrier {
    http: HttpClient,
    cfg: CarrierConfig,
    base: Url,
}

impl HttpCarrier {
    pub fn new(cfg: CarrierConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&cfg.base_url).with_context(|| format!("invalid HCT_BASE_URL {:?}", cfg.base_url))?;
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .default_headers(browser_headers())
            .build()
            .context("build http client")?;
        Ok(Self { http, cfg, base })
    }

    pub fn page_url(&self, tracking_number: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("txtNo", tracking_number);
        url
    }

    async fn attempt(&self, route: &ProxyRoute, target: &Url) -> Result<String, CarrierError> {
        let request_url = route.request_url(target);
        let fut = async {
            let response = self.http.get(request_url).send().await.map_err(CarrierError::http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(CarrierError::Status { status, message: status.canonical_reason().map(str::to_string) });
            }
            let body = response.text().await.map_err(CarrierError::http)?;
            route.unwrap_body(body)
        };
        let body = tokio::time::timeout(self.cfg.attempt_timeout, fut).await.map_err(|_| CarrierError::Timeout)??;
        check_body(body)
    }
}

pub(crate) fn check_body(body: String) -> Result<String, CarrierError> {
    if body.contains(SELF_ECHO_MARKER) {
        return Err(CarrierError::SelfEcho);
    }
    if body.len() < MIN_BODY_BYTES {
        return Err(CarrierError::TooShort { len: body.len() });
    }
    Ok(body)
}

fn browser_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"));
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"));
    h.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    h
}

#[async_trait]
impl CarrierClient for HttpCarrier {
    async fn fetch_page(&self, tracking_number: &str) -> Result<String, CarrierError> {
        let target = self.page_url(tracking_number);
        let routes: Vec<ProxyRoute> = std::iter::once(ProxyRoute::direct()).chain(self.cfg.proxies.iter().cloned()).collect();
        if routes.len() == 1 {
            return self.attempt(&routes[0], &target).await;
        }

        let mut errors = Vec::new();
        for (i, route) in routes.iter().enumerate() {
            match self.attempt(route, &target).await {
                Ok(body) => {
                    tracing::debug!(route = %route.name, len = body.len(), "carrier page fetched");
                    return Ok(body);
                }
                Err(err) => {
                    tracing::debug!(route = %route.name, error = %err, "route failed");
                    errors.push((route.name.clone(), err));
                }
            }
            if i + 1 < routes.len() {
                tokio::time::sleep(self.cfg.retry_pause).await;
            }
        }
        Err(CarrierError::AllRoutesFailed(errors))
    }
}
