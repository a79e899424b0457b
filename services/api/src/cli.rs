use crate::infra::{self, InMemoryAliasStore, InMemoryCriteriaStore};
use crate::routes::run_ingest;
use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use runlist_core::config::AppConfig;
use runlist_core::error::AppError;
use runlist_core::pipeline::{
    AuctionId, BuyBox, CanonicalField, ColumnMapping, MakeAlias, ModelAlias, PartyId,
    RunlistUpload,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "Runlist Ingestion Service",
    about = "Ingest auction runlists and match vehicles against acquisition criteria",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run one runlist file through the pipeline and print the summary
    Ingest(IngestArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct IngestArgs {
    /// Path to the runlist CSV file
    #[arg(long)]
    csv: PathBuf,
    /// Auction the runlist belongs to
    #[arg(long)]
    auction: String,
    /// Inspection date in YYYY-MM-DD form
    #[arg(long, value_parser = infra::parse_date)]
    inspection_date: NaiveDate,
    /// Party to record as the requesting inspector
    #[arg(long)]
    inspector: Option<String>,
    /// JSON file mapping canonical fields to this auction's column headers
    #[arg(long)]
    mapping: Option<PathBuf>,
    /// Guess VIN, lane, and run columns when no mapping file is given
    #[arg(long)]
    allow_heuristic: bool,
    /// JSON file with active buy-box criteria
    #[arg(long)]
    buy_boxes: Option<PathBuf>,
    /// JSON file with make and model alias tables
    #[arg(long)]
    aliases: Option<PathBuf>,
}

/// Shape of the `--aliases` file.
#[derive(Debug, Default, Deserialize)]
struct AliasSeed {
    #[serde(default)]
    makes: Vec<MakeAlias>,
    #[serde(default)]
    models: Vec<ModelAlias>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Ingest(args) => ingest(args).await,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|err| {
        AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })
}

async fn ingest(args: IngestArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let auction = AuctionId(args.auction);
    let mapping = args
        .mapping
        .as_deref()
        .map(read_json::<HashMap<CanonicalField, String>>)
        .transpose()?
        .map(|columns| ColumnMapping {
            auction: auction.clone(),
            columns,
        });
    let boxes: Vec<BuyBox> = args
        .buy_boxes
        .as_deref()
        .map(read_json)
        .transpose()?
        .unwrap_or_default();
    let seed: AliasSeed = args
        .aliases
        .as_deref()
        .map(read_json)
        .transpose()?
        .unwrap_or_default();

    let service = infra::build_service(
        &config.registry,
        InMemoryAliasStore::with_aliases(seed.makes, seed.models),
        InMemoryCriteriaStore::with_boxes(boxes),
    )?;

    let upload = RunlistUpload {
        auction,
        inspection_date: args.inspection_date,
        inspector: args.inspector.map(PartyId),
        bytes: std::fs::read(&args.csv)?,
        mapping,
        allow_heuristic: args.allow_heuristic,
    };

    let outcome = run_ingest(Arc::new(service), upload).await?;
    let rendered = serde_json::to_string_pretty(&outcome).map_err(|err| {
        AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })?;
    println!("{rendered}");
    Ok(())
}
