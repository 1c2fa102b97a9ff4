// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client error log: an append-only text file of failure descriptions.
//
// Entry format:
//
//   "\r\n ========= <YYYY-mm-dd-HHMMSS> ========= \r\n<description>"
//
// Each entry is rendered into one buffer and written with a single call on a
// file opened in append mode, so concurrent client processes do not
// interleave partial entries.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, instrument};

use idwire_core::error::Result;

/// Append-only failure log.
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `desc` stamped with the current local time.
    pub fn append(&self, desc: &str) -> Result<()> {
        self.append_at(Local::now(), desc)
    }

    #[instrument(skip(self, desc), fields(path = %self.path.display()))]
    pub fn append_at(&self, at: DateTime<Local>, desc: &str) -> Result<()> {
        let entry = format_entry(at, desc);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())?;
        debug!(bytes = entry.len(), "error log entry appended");
        Ok(())
    }
}

fn format_entry(at: DateTime<Local>, desc: &str) -> String {
    format!(
        "\r\n ========= {} ========= \r\n{desc}",
        at.format("%Y-%m-%d-%H%M%S")
    )
}
