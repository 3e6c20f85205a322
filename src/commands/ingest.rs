// File: ingest.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use super::{format_time, print_info, print_success, print_warning};
use crate::cli::IngestArgs;
use crate::history::RpkiHistory;
use crate::models::DumpRecord;
use crate::snapshot::{timestamp_from_file_name, Snapshot};

pub async fn execute(args: &IngestArgs, history: &RpkiHistory) -> Result<()> {
    let explicit = args.parse_timestamp()?;
    if explicit.is_some() && args.files.len() > 1 {
        bail!("--timestamp can only be used with a single file");
    }

    let mut planned = plan_files(&args.files, explicit)?;
    if args.skip_ingested {
        if let Some(span) = history.span() {
            let before = planned.len();
            planned.retain(|(timestamp, _)| *timestamp > span.latest);
            if planned.len() < before {
                print_info(&format!(
                    "Skipping {} file(s) not newer than {}",
                    before - planned.len(),
                    format_time(&span.latest)
                ));
            }
        }
    }

    if planned.is_empty() {
        print_warning("Nothing to ingest");
        return Ok(());
    }

    let pb = ProgressBar::new(planned.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}",
            )?
            .progress_chars("##-"),
    );

    let mut ingested = 0usize;
    for (timestamp, path) in planned {
        let name = path.display().to_string();
        pb.set_message(name.clone());

        let handle = history.clone();
        let record = tokio::task::spawn_blocking(move || -> Result<DumpRecord> {
            let snapshot = Snapshot::load(&path)
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            Ok(handle.ingest(&snapshot.vrps, timestamp)?)
        })
        .await?
        .with_context(|| format!("Failed to ingest {}", name))?;

        pb.inc(1);
        pb.println(format!(
            "{}: {} new, {} updated, {} deleted",
            format_time(&record.timestamp),
            record.new_count,
            record.updated_count,
            record.deleted_count
        ));
        ingested += 1;
    }
    pb.finish_and_clear();

    print_success(&format!("Ingested {} dump(s)", ingested));
    Ok(())
}

/// Pairs each file with its dump time and sorts oldest first.
fn plan_files(
    files: &[PathBuf],
    explicit: Option<DateTime<Utc>>,
) -> Result<Vec<(DateTime<Utc>, PathBuf)>> {
    let mut planned = Vec::with_capacity(files.len());
    for file in files {
        let timestamp = explicit
            .or_else(|| {
                file.file_name()
                    .and_then(|name| name.to_str())
                    .and_then(timestamp_from_file_name)
            })
            .with_context(|| {
                format!(
                    "Cannot derive a dump time from {}; pass --timestamp",
                    file.display()
                )
            })?;
        planned.push((timestamp, file.clone()));
    }
    planned.sort_by_key(|(timestamp, _)| *timestamp);
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_plan_orders_by_file_name_time() {
        let files = vec![
            PathBuf::from("/data/rpki-20240101T002000Z.csv"),
            PathBuf::from("/data/rpki-20240101T000000Z.csv"),
        ];
        let planned = plan_files(&files, None).unwrap();
        assert_eq!(planned[0].1, files[1]);
        assert_eq!(
            planned[1].0,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 20, 0).unwrap()
        );
    }

    #[test]
    fn test_plan_requires_a_timestamp() {
        let files = vec![PathBuf::from("/data/rpki-client.csv")];
        assert!(plan_files(&files, None).is_err());

        let explicit = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let planned = plan_files(&files, Some(explicit)).unwrap();
        assert_eq!(planned[0].0, explicit);
    }
}
