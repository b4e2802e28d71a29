//! CLI argument parsing for the `tripweave` demo binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tripweave", about = "Multi-day trip route optimizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Optimize a trip described by a JSON file and print the itinerary (default).
    Optimize {
        /// Path to a JSON-encoded `TripInput`.
        #[arg(long)]
        trip: PathBuf,
    },
}
