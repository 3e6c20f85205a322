// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use clap::Parser;
use simple_logger::SimpleLogger;

use rpki_history::cli::{Cli, Commands};
use rpki_history::commands;
use rpki_history::config::StoreConfig;
use rpki_history::history::RpkiHistory;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    SimpleLogger::new()
        .with_level(cli.log_level_filter())
        .init()
        .context("Failed to initialize logger")?;

    let mut config = StoreConfig::new();
    if let Some(ref dir) = cli.data_dir {
        let dir = if dir.is_absolute() {
            dir.clone()
        } else {
            std::env::current_dir()
                .context("Failed to resolve the working directory")?
                .join(dir)
        };
        config.set_data_dir(dir);
    }

    let history = RpkiHistory::open(&config).context("Failed to open the history store")?;

    let result = match &cli.command {
        Commands::Ingest(args) => commands::handle_ingest_command(args, &history).await,
        Commands::Vrps(args) => commands::handle_vrps_command(args, &history).await,
        Commands::Status(args) => commands::handle_status_command(args, &history).await,
        Commands::Metadata(args) => commands::handle_metadata_command(args, &history).await,
        Commands::Stats(args) => commands::handle_stats_command(args, &history).await,
        Commands::Verify => commands::handle_verify_command(&history).await,
    };

    history.flush().context("Failed to flush the history store")?;
    result
}
