use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use crate::extractor::patterns::truncate_chars;
use crate::shipment::{is_valid_tracking_number, Store, TrackedShipment};
use crate::telemetry::{self};
use crate::telemetry::ops::label::Phase as LabelPhase;

mod ocr;
mod parse;

pub use ocr::{TesseractCli, TextRecognizer};
pub use parse::{parse_label_text, LabelFields};

const UNRECOGNIZED_PREVIEW_CHARS: usize = 200;

/// Read a shipping label and fill in recipient details
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("source").required(true).args(["image", "text"]))]
pub struct LabelCmd {
    /// Label photo to run OCR on
    pub image: Option<PathBuf>,
    /// Use already-recognized text from a file instead of running OCR
    #[arg(long)]
    pub text: Option<PathBuf>,
    /// Update this tracked shipment; otherwise start tracking the number on the label
    #[arg(long)]
    pub tracking: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LabelOutcome {
    pub tracking_number: String,
    pub created: bool,
    pub fields: LabelFields,
}

/// Fill an existing shipment from label text, or create one from the number printed on it.
pub fn apply_label(store: &mut Store, text: &str, tracking: Option<&str>, now: DateTime<Utc>) -> Result<LabelOutcome> {
    match tracking {
        Some(tn) => {
            let fields = parse_label_text(text, false);
            let shipment = store.require_mut(tn)?;
            fill(shipment, &fields);
            Ok(LabelOutcome { tracking_number: tn.to_string(), created: false, fields })
        }
        None => {
            let fields = parse_label_text(text, true);
            let Some(tn) = fields.tracking_number.clone().filter(|t| is_valid_tracking_number(t)) else {
                bail!("no tracking number recognized; text starts with: {:?}", truncate_chars(text.trim(), UNRECOGNIZED_PREVIEW_CHARS));
            };
            let mut shipment = TrackedShipment::new(&tn, now)?;
            fill(&mut shipment, &fields);
            store.add(shipment)?;
            Ok(LabelOutcome { tracking_number: tn, created: true, fields })
        }
    }
}

fn fill(shipment: &mut TrackedShipment, fields: &LabelFields) {
    if let Some(name) = &fields.name { shipment.name = name.clone(); }
    if let Some(address) = &fields.address { shipment.address = address.clone(); }
    if let Some(q) = fields.quantity.filter(|q| *q > 0) { shipment.quantity = q; }
}

async fn label_text(args: &LabelCmd, recognizer: &dyn TextRecognizer) -> Result<String> {
    if let Some(path) = &args.text {
        return tokio::fs::read_to_string(path).await.with_context(|| format!("read {}", path.display()));
    }
    match &args.image {
        Some(image) => recognizer.recognize(image).await,
        None => bail!("pass an image or --text"),
    }
}

pub async fn run(store_path: &Path, args: LabelCmd) -> Result<()> {
    let log = telemetry::label();
    let _g = log.root_span_kv([
        ("image", format!("{:?}", args.image)),
        ("text", format!("{:?}", args.text)),
        ("tracking", format!("{:?}", args.tracking)),
    ]).entered();

    let text = {
        let _s = log.span(&LabelPhase::Recognize).entered();
        label_text(&args, &TesseractCli::from_env()).await?
    };
    let mut store = { let _s = log.span(&LabelPhase::Load).entered(); Store::open(store_path)? };
    let outcome = {
        let _s = log.span(&LabelPhase::Apply).entered();
        apply_label(&mut store, &text, args.tracking.as_deref(), Utc::now())?
    };
    store.save()?;

    let f = &outcome.fields;
    let verb = if outcome.created { "➕ Tracking" } else { "✏️ Updated" };
    log.info(format!("{} {}", verb, outcome.tracking_number));
    log.info(format!("  姓名：{}", f.name.as_deref().unwrap_or("未識別")));
    log.info(format!("  地址：{}", f.address.as_deref().unwrap_or("未識別")));
    log.info(format!("  件數：{}", f.quantity.map(|q| q.to_string()).unwrap_or_else(|| "未識別".to_string())));
    if telemetry::config::json_mode() { log.result(&outcome)?; }
    Ok(())
}
