//! jts-sync — synchronizes a spreadsheet-resident job tracker with the
//! intranet system of record.
//!
//! One invocation performs one full cycle: read the workbook, sign in,
//! reconcile every record, write the workbook back. Exits non-zero on any
//! unhandled error.

mod actuator;
mod config;
mod errors;
mod geocode;
mod reconcile;
mod store;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::actuator::intranet::IntranetSession;
use crate::config::Config;
use crate::errors::SyncError;
use crate::geocode::PlacesClient;
use crate::reconcile::Reconciler;

#[derive(Parser, Debug)]
#[command(name = "jts-sync")]
#[command(about = "Upload job tracking spreadsheet entries to the intranet")]
#[command(version)]
struct Args {
    /// Job Tracking System xlsx file path
    file_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting jts-sync v{}", env!("CARGO_PKG_VERSION"));

    // Pre-flight: both failures below abort before any record is touched.
    let mut store = store::workbook::load(&args.file_path)?;
    let session = IntranetSession::login(&config).await?;

    let geocoder = PlacesClient::new(config.places_api_key.clone());
    let reconciler = Reconciler::new(&session, &geocoder);
    let outcome = reconciler.run(&mut store).await;

    // Flush even when the pass aborted mid-way: ids and timestamps already
    // assigned must survive so a re-run resumes from the first unprocessed
    // record.
    store::workbook::save(&store, &args.file_path)?;

    let counts = outcome.map_err(SyncError::from)?;
    info!(
        created = counts.created,
        updated = counts.updated,
        deleted = counts.deleted,
        processed = counts.processed(),
        total = store.job_count(),
        "sync cycle finished"
    );
    Ok(())
}
