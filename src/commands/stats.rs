// File: stats.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use colored::*;
use serde_json::json;

use super::{format_file_size, format_time, print_error, print_info, OutputFormat};
use crate::cli::StatsArgs;
use crate::history::RpkiHistory;

pub async fn execute(args: &StatsArgs, history: &RpkiHistory) -> Result<()> {
    let format = match OutputFormat::parse(&args.format) {
        Some(format) => format,
        None => {
            print_error(&format!("Unsupported format: {}", args.format));
            return Ok(());
        }
    };

    let stats = history.stats()?;
    let span = history.span();
    let count = |name: &str| stats.get(name).copied().unwrap_or(0);

    match format {
        OutputFormat::Json => {
            let value = json!({
                "stats": stats,
                "earliest": span.map(|s| s.earliest),
                "latest": span.map(|s| s.latest),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            print_info("Store statistics");
            println!("  {:<18} {}", "Dumps:".bold(), count("dumps"));
            println!("  {:<18} {}", "Interval rows:".bold(), count("interval_rows"));
            println!("  {:<18} {}", "Open intervals:".bold(), count("open_intervals"));
            println!(
                "  {:<18} {}",
                "Size on disk:".bold(),
                format_file_size(count("size_bytes"))
            );
            match span {
                Some(span) => println!(
                    "  {:<18} {} to {}",
                    "Covered range:".bold(),
                    format_time(&span.earliest),
                    format_time(&span.latest)
                ),
                None => println!("  {:<18} {}", "Covered range:".bold(), "empty".dimmed()),
            }
        }
    }
    Ok(())
}
