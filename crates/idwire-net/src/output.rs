// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result artifacts: pretty JSON to stdout, or one timestamped file per result.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use idwire_core::config::OutputTarget;
use idwire_core::error::Result;
use idwire_core::types::ResponseEnvelope;

/// Render `envelope` as four-space indented JSON with every object's keys
/// sorted, struct fields included.
pub fn render(envelope: &ResponseEnvelope) -> Result<String> {
    // `Value` objects are BTreeMap-backed, which sorts struct fields too.
    let sorted = serde_json::to_value(envelope)?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    sorted.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `<YYYY-MM-DD_HH-MM>_<8 hex>.json`, timestamp in UTC.
pub fn artifact_file_name(at: DateTime<Utc>, salt: Uuid) -> String {
    let hex = salt.simple().to_string();
    format!("{}_{}.json", at.format("%Y-%m-%d_%H-%M"), &hex[..8])
}

/// Write the envelope to `target`. Returns the file path, or `None` for stdout.
pub fn write_result(envelope: &ResponseEnvelope, target: &OutputTarget) -> Result<Option<PathBuf>> {
    let rendered = render(envelope)?;
    match target {
        OutputTarget::Stdout => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
            Ok(None)
        }
        OutputTarget::Directory(dir) => write_into(dir, &rendered).map(Some),
    }
}

fn write_into(dir: &Path, rendered: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(artifact_file_name(Utc::now(), Uuid::new_v4()));
    std::fs::write(&path, rendered)?;
    info!(path = %path.display(), "result written");
    Ok(path)
}
