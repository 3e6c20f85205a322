// File: metadata.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use colored::*;

use super::{format_time, print_error, print_info, print_warning, OutputFormat};
use crate::cli::MetadataArgs;
use crate::history::RpkiHistory;
use crate::ledger::LedgerPage;

pub async fn execute(args: &MetadataArgs, history: &RpkiHistory) -> Result<()> {
    let format = match OutputFormat::parse(&args.format) {
        Some(format) => format,
        None => {
            print_error(&format!("Unsupported format: {}", args.format));
            return Ok(());
        }
    };

    let mut query = history
        .ledger_query()
        .between(args.parse_start()?, args.parse_end()?)
        .page(args.page);
    if let Some(page_size) = args.page_size {
        query.page_size = page_size;
    }

    let page = history.metadata(&query)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Table => display_page(&page),
    }
    Ok(())
}

fn display_page(page: &LedgerPage) {
    if page.records.is_empty() {
        print_warning(&format!("No dumps on page {}", page.page));
        return;
    }

    println!(
        "{:<21} {:>10} {:>10} {:>10} {:<21}",
        "Dump".bold(),
        "New".bold(),
        "Updated".bold(),
        "Deleted".bold(),
        "Ingested".bold()
    );
    for record in &page.records {
        println!(
            "{:<21} {:>10} {:>10} {:>10} {:<21}",
            format_time(&record.timestamp),
            record.new_count.to_string().green(),
            record.updated_count,
            record.deleted_count.to_string().red(),
            format_time(&record.ingested_at)
        );
    }

    if let Some(next) = page.next_page {
        print_info(&format!("More dumps follow, use --page {}", next));
    }
}
