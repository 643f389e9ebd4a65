use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

mod carrier;
mod extractor;
mod label;
mod output;
mod query;
mod reconcile;
mod shipment;
mod telemetry;
mod tracker;
mod util;
mod watch;

use tracker::commands;

#[derive(Parser)]
#[command(name = "hct", about = "HCT (新竹物流) package tracker")]
struct Cli {
    /// Tracking store file (defaults to HCT_STORE_PATH, then ./hct_tracking_items.json)
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Add(commands::AddCmd),
    Ls(commands::LsCmd),
    Show(commands::ShowCmd),
    Rm(commands::RmCmd),
    Edit(commands::EditCmd),
    Status(commands::StatusCmd),
    Check(commands::CheckCmd),
    Watch(watch::WatchCmd),
    Query(query::QueryCmd),
    Extract(extractor::ExtractCmd),
    Label(label::LabelCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // stderr logging; respects RUST_LOG and HCT_LOG_FORMAT
    telemetry::config::init_tracing();
    let store = cli
        .store
        .or_else(|| env::var("HCT_STORE_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(shipment::store::DEFAULT_STORE_PATH));

    match cli.command {
        Commands::Add(args) => commands::add(&store, args).await?,
        Commands::Ls(args) => commands::ls(&store, args).await?,
        Commands::Show(args) => commands::show(&store, args).await?,
        Commands::Rm(args) => commands::rm(&store, args).await?,
        Commands::Edit(args) => commands::edit(&store, args).await?,
        Commands::Status(args) => commands::status(&store, args).await?,
        Commands::Check(args) => commands::check(&store, args).await?,
        Commands::Watch(args) => watch::run(&store, args).await?,
        Commands::Query(args) => query::run(args).await?,
        Commands::Extract(args) => extractor::run(args).await?,
        Commands::Label(args) => label::run(&store, args).await?,
    }

    Ok(())
}
