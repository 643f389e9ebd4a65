use serde::Deserialize;
use url::Url;

use super::CarrierError;

/// One way of reaching the carrier page.
///
/// Templates come from `HCT_PROXIES`, separated by whitespace or commas:
/// `{url}` is replaced by the percent-encoded page URL and `{raw}` by the page
/// URL as-is. A `json:` prefix marks proxies that wrap the page in a JSON
/// object under `contents`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyRoute {
    pub name: String,
    template: Option<String>,
    json_wrapped: bool,
}

#[derive(Deserialize)]
struct Wrapped {
    contents: Option<String>,
}

impl ProxyRoute {
    pub fn direct() -> Self {
        Self { name: "direct".to_string(), template: None, json_wrapped: false }
    }

    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (json_wrapped, template) = match spec.strip_prefix("json:") {
            Some(rest) => (true, rest.trim()),
            None => (false, spec),
        };
        if !template.contains("{url}") && !template.contains("{raw}") { return None; }
        let probe = template.replace("{url}", "x").replace("{raw}", "x");
        let host = Url::parse(&probe).ok()?.host_str()?.to_string();
        let name = if json_wrapped { format!("{host} (json)") } else { host };
        Some(Self { name, template: Some(template.to_string()), json_wrapped })
    }

    pub fn request_url(&self, target: &Url) -> String {
        match &self.template {
            None => target.to_string(),
            Some(t) => {
                let encoded: String = url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
                t.replace("{url}", &encoded).replace("{raw}", target.as_str())
            }
        }
    }

    pub fn unwrap_body(&self, body: String) -> Result<String, CarrierError> {
        if !self.json_wrapped { return Ok(body); }
        let wrapped: Wrapped = serde_json::from_str(&body).map_err(|e| CarrierError::Decode(e.to_string()))?;
        Ok(wrapped.contents.unwrap_or_default())
    }
}

pub fn parse_routes(list: &str) -> Vec<ProxyRoute> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let route = ProxyRoute::parse(s);
            if route.is_none() {
                tracing::warn!(entry = %s, "ignoring proxy entry without {{url}} or {{raw}}");
            }
            route
        })
        .collect()
}
