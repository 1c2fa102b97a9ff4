// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Server and client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default TCP port shared by server and client.
pub const DEFAULT_PORT: u16 = 53000;

/// Largest payload accepted in a single frame (64 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Per-frame read/write deadline in seconds.
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 60;

/// Upper bound on simultaneous recognitions; the engine semaphore cannot hold
/// more permits than this.
pub const MAX_CONCURRENCY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Recognition server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory holding the single `.se` engine bundle.
    pub bundle_dir: PathBuf,
    /// Skip cache warm-up at engine creation. Keep disabled for servers.
    pub lazy_init: bool,
    /// Maximum simultaneous engine calls; 0 means one per available core.
    pub concurrency: usize,
    /// Address to bind the listener to.
    pub bind_addr: String,
    /// Port to listen on (0 lets the OS pick one).
    pub port: u16,
    /// Deadline for reading or writing one frame; `None` waits forever.
    pub io_timeout: Option<Duration>,
    /// Largest request payload accepted.
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bundle_dir: PathBuf::from("./bundle"),
            lazy_init: false,
            concurrency: 0,
            bind_addr: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            io_timeout: Some(Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS)),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ServerConfig {
    /// Resolve `concurrency`, mapping 0 to the number of available cores and
    /// capping at [`MAX_CONCURRENCY`].
    pub fn effective_concurrency(&self) -> usize {
        let requested = if self.concurrency > 0 {
            self.concurrency
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        };
        requested.min(MAX_CONCURRENCY)
    }
}

/// Where a successful recognition result is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    Stdout,
    /// Directory receiving one timestamped JSON file per result.
    Directory(PathBuf),
}

impl OutputTarget {
    /// Parse the `--output` value; the literal `stdout` selects standard output.
    pub fn parse(value: &str) -> Self {
        if value == "stdout" {
            Self::Stdout
        } else {
            Self::Directory(PathBuf::from(value))
        }
    }
}

/// Recognition client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    pub port: u16,
    pub output: OutputTarget,
    /// Append-only log receiving failure descriptions.
    pub error_log: PathBuf,
    /// Deadline for connecting and for each frame read/write.
    pub io_timeout: Option<Duration>,
    /// Largest response payload accepted.
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            output: OutputTarget::Directory(PathBuf::from("./result")),
            error_log: PathBuf::from("error.log"),
            io_timeout: Some(Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS)),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.endpoint, self.port)
    }
}

/// Turn a seconds count from the command line into a deadline; 0 disables it.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_target_parses_stdout_literal() {
        assert_eq!(OutputTarget::parse("stdout"), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::parse("./result"),
            OutputTarget::Directory(PathBuf::from("./result"))
        );
    }

    #[test]
    fn zero_concurrency_uses_available_cores() {
        let config = ServerConfig::default();
        assert!(config.effective_concurrency() >= 1);

        let pinned = ServerConfig {
            concurrency: 3,
            ..Default::default()
        };
        assert_eq!(pinned.effective_concurrency(), 3);
    }

    #[test]
    fn oversized_concurrency_is_capped() {
        let config = ServerConfig {
            concurrency: usize::MAX,
            ..Default::default()
        };
        assert_eq!(config.effective_concurrency(), MAX_CONCURRENCY);
        // The cap must be constructible.
        let _ = tokio::sync::Semaphore::new(config.effective_concurrency());
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        assert_eq!(timeout_from_secs(0), None);
        assert_eq!(timeout_from_secs(5), Some(Duration::from_secs(5)));
    }

    #[test]
    fn client_defaults_match_cli_surface() {
        let config = ClientConfig::default();
        assert_eq!(config.server_addr(), "127.0.0.1:53000");
        assert_eq!(
            config.output,
            OutputTarget::Directory(PathBuf::from("./result"))
        );
    }
}
