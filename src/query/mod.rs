use anyhow::Result;
use chrono::Utc;
use clap::Args;

use crate::carrier::{self, CarrierConfig};
use crate::telemetry::{self};
use crate::telemetry::ops::query::Phase as QueryPhase;

mod handler;
pub mod types;

pub use handler::handle;
pub use types::{HttpReply, Method, QueryResponse};

/// Answer one endpoint request against the live carrier page.
#[derive(Args, Debug)]
pub struct QueryCmd {
    /// Tracking number as it would arrive in `?trackingNumber=`
    pub tracking_number: Option<String>,
    /// HTTP method to simulate (GET, OPTIONS, ...)
    #[arg(long, default_value = "GET")]
    pub method: String,
}

pub async fn run(args: QueryCmd) -> Result<()> {
    let log = telemetry::query();
    let _g = log.root_span_kv([
        ("method", args.method.clone()),
        ("tracking_number", format!("{:?}", args.tracking_number)),
    ]).entered();

    let client = carrier::page_client(&CarrierConfig::from_env())?;
    let reply = {
        let _s = log.span(&QueryPhase::Handle).entered();
        handle(client.as_ref(), Method::parse(&args.method), args.tracking_number.as_deref(), Utc::now()).await
    };

    let _s = log.span(&QueryPhase::Respond).entered();
    if telemetry::config::json_mode() {
        log.result(&reply)?;
        return Ok(());
    }
    match &reply.body {
        None => log.info(format!("HTTP {}", reply.status)),
        Some(body) if body.success => {
            log.info(format!("HTTP {} ✅ {} event(s) for {}", reply.status, body.status_list.as_ref().map_or(0, Vec::len), body.tracking_number.as_deref().unwrap_or("")));
            for ev in body.status_list.iter().flatten() { log.info(format!("  {}  {}", ev.time_text, ev.status_text)); }
        }
        Some(body) => {
            log.warn_kv(
                &format!("HTTP {} ❌ {}", reply.status, body.error.as_deref().unwrap_or("")),
                [("tracking_number", format!("{:?}", body.tracking_number))],
            );
            if let Some(d) = &body.debug {
                log.info(format!(
                    "  htmlLength={} hasGridItems={} hasColOptime={} hasTables={} hasDateTime={}",
                    d.html_length, d.has_grid_items, d.has_col_optime, d.has_tables, d.has_date_time
                ));
            }
        }
    }
    Ok(())
}
