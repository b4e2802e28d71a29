//! tripweave - multi-day trip route optimization engine
//!
//! Reads a JSON-encoded trip from disk, runs it through the optimization
//! pipeline, and prints the resulting itinerary.

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tripweave::cli::{Cli, Command};
use tripweave::config::PipelineConfig;
use tripweave::services::distance_matrix::MatrixBuildOptions;
use tripweave::services::routing::providers_from_config;
use tripweave::types::TripInput;
use tripweave::PipelineOptions;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tripweave=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env()?;

    let Some(Command::Optimize { trip }) = cli.command else {
        anyhow::bail!("no command given; run with --help");
    };

    let raw = fs::read_to_string(&trip).with_context(|| format!("failed to read trip file {}", trip.display()))?;
    let trip_input: TripInput = serde_json::from_str(&raw).context("failed to parse trip JSON")?;

    let (car, transit, walking) = providers_from_config(
        config.car_routing_url.as_deref(),
        config.transit_routing_url.as_deref(),
        config.walking_routing_url.as_deref(),
        config.call_timeout_ms,
    );

    let options = PipelineOptions {
        matrix_options: MatrixBuildOptions { batch_size: config.batch_size, batch_delay_ms: config.batch_delay_ms, max_attempts: config.max_attempts },
        ..Default::default()
    };

    let cancel = CancellationToken::new();

    info!(trip = %trip.display(), "starting optimization");
    let result = tripweave::optimize_route(&trip_input, car.as_ref(), transit.as_ref(), walking.as_ref(), &options, &cancel).await?;

    info!(days = result.itinerary.len(), errors = result.errors.len(), "optimization complete");
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
