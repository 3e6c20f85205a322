// File: vrps.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use colored::*;

use super::{format_time, print_error, print_info, print_warning, OutputFormat};
use crate::cli::VrpsArgs;
use crate::history::RpkiHistory;
use crate::models::{CoveringVrp, IntervalEnd};

pub async fn execute(args: &VrpsArgs, history: &RpkiHistory) -> Result<()> {
    let format = match OutputFormat::parse(&args.format) {
        Some(format) => format,
        None => {
            print_error(&format!("Unsupported format: {}", args.format));
            return Ok(());
        }
    };
    let prefix = args.parse_prefix()?;
    let filter = args.time_filter()?;

    let vrps = history.covering(&prefix, &filter)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&vrps)?),
        OutputFormat::Table => {
            if vrps.is_empty() {
                print_warning(&format!("No VRPs cover {} at {}", prefix, filter));
                return Ok(());
            }
            print_info(&format!("{} VRP(s) cover {} at {}", vrps.len(), prefix, filter));
            display_vrps_table(&vrps);
        }
    }
    Ok(())
}

fn display_vrps_table(vrps: &[CoveringVrp]) {
    println!(
        "{:<10} {:<44} {:>4} {:<10} {:<21} {:<21}",
        "ASN".bold(),
        "Prefix".bold(),
        "Max".bold(),
        "TA".bold(),
        "From".bold(),
        "To".bold()
    );
    for vrp in vrps {
        let to = match vrp.interval.to {
            IntervalEnd::Open => "open".green().to_string(),
            IntervalEnd::Closed(to) => format_time(&to),
        };
        println!(
            "{:<10} {:<44} {:>4} {:<10} {:<21} {:<21}",
            format!("AS{}", vrp.key.asn),
            vrp.key.prefix.to_string(),
            vrp.key.max_length,
            vrp.key.trust_anchor,
            format_time(&vrp.interval.from),
            to
        );
    }
}
