// File: verify.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{bail, Result};

use super::{print_error, print_info, print_success};
use crate::history::RpkiHistory;

pub async fn execute(history: &RpkiHistory) -> Result<()> {
    print_info("Verifying interval invariants...");

    let handle = history.clone();
    let issues = tokio::task::spawn_blocking(move || handle.verify_integrity()).await??;

    if issues.is_empty() {
        print_success("No integrity issues found");
        return Ok(());
    }

    for issue in &issues {
        print_error(issue);
    }
    bail!("{} integrity issue(s) found", issues.len())
}
