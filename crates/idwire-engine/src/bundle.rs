// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine bundle discovery.

use std::path::{Path, PathBuf};

use idwire_core::error::{IdwireError, Result};
use tracing::debug;

/// File extension of engine bundles.
pub const BUNDLE_EXTENSION: &str = "se";

/// Find the engine bundle inside `dir`.
///
/// The directory must contain exactly one `*.se` file. Anything else in the
/// directory is ignored.
pub fn locate_bundle(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        IdwireError::EngineInit(format!("cannot read bundle dir {}: {e}", dir.display()))
    })?;

    let mut bundles = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_bundle = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == BUNDLE_EXTENSION);
        if is_bundle {
            bundles.push(path);
        }
    }

    match bundles.len() {
        1 => {
            let bundle = bundles.remove(0);
            debug!(bundle = %bundle.display(), "engine bundle located");
            Ok(bundle)
        }
        0 => Err(IdwireError::EngineInit(format!(
            "no .{BUNDLE_EXTENSION} bundle found in {}",
            dir.display()
        ))),
        n => Err(IdwireError::EngineInit(format!(
            "expected one .{BUNDLE_EXTENSION} bundle in {}, found {n}",
            dir.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_single_bundle() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.txt"), "docs").unwrap();
        std::fs::write(dir.path().join("bundle_mrz.se"), "{}").unwrap();

        let found = locate_bundle(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("bundle_mrz.se"));
    }

    #[test]
    fn empty_dir_is_an_init_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_bundle(dir.path()).unwrap_err();
        assert!(matches!(err, IdwireError::EngineInit(_)), "got {err}");
    }

    #[test]
    fn several_bundles_are_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.se"), "{}").unwrap();
        std::fs::write(dir.path().join("b.se"), "{}").unwrap();

        let err = locate_bundle(dir.path()).unwrap_err();
        assert!(err.to_string().contains("found 2"), "got {err}");
    }

    #[test]
    fn missing_dir_is_an_init_error() {
        let err = locate_bundle(Path::new("/nonexistent/idwire/bundle")).unwrap_err();
        assert!(matches!(err, IdwireError::EngineInit(_)));
    }
}
