// File: status.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use colored::*;

use super::{print_error, OutputFormat};
use crate::cli::StatusArgs;
use crate::history::RpkiHistory;
use crate::validation::ValidationStatus;

pub async fn execute(args: &StatusArgs, history: &RpkiHistory) -> Result<()> {
    let format = match OutputFormat::parse(&args.format) {
        Some(format) => format,
        None => {
            print_error(&format!("Unsupported format: {}", args.format));
            return Ok(());
        }
    };
    let prefix = args.parse_prefix()?;
    let asn = args.parse_asn()?;
    let at = args.parse_at()?;

    let status = history.status(&prefix, asn, at)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Table => {
            let label = match &status {
                ValidationStatus::Valid => "Valid".green().bold(),
                ValidationStatus::Invalid { .. } => "Invalid".red().bold(),
                ValidationStatus::NotFound => "NotFound".yellow().bold(),
            };
            println!("{} AS{}: {}", prefix, asn, label);
            if let ValidationStatus::Invalid { reason } = &status {
                println!("  {}: {}", reason.code.to_string().bold(), reason.description);
            }
        }
    }
    Ok(())
}
