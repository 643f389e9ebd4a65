use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

fn truthy(v: &str) -> bool {
    ["1", "true", "yes"].iter().any(|t| v.eq_ignore_ascii_case(t))
}

impl OutputConfig {
    /// `HCT_OUTPUT_FORMAT=text|json` (default json), `HCT_OUTPUT_PRETTY=1|true|yes`.
    pub fn from_env() -> Self {
        Self::from_values(env::var("HCT_OUTPUT_FORMAT").ok().as_deref(), env::var("HCT_OUTPUT_PRETTY").ok().as_deref())
    }

    pub fn from_values(format: Option<&str>, pretty: Option<&str>) -> Self {
        let format = match format {
            Some(f) if f.eq_ignore_ascii_case("text") => OutputFormat::Text,
            _ => OutputFormat::Json,
        };
        OutputConfig { format, pretty: pretty.is_some_and(truthy) }
    }
}
