// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-shot recognition client.
//
// Connect, send one request frame, read one response frame, close. There is
// no pipelining and no automatic retry; re-running the client is the retry.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use idwire_core::codec::{self, with_deadline};
use idwire_core::config::ClientConfig;
use idwire_core::error::{IdwireError, Result};
use idwire_core::types::{ClientMessage, FailureReason, ResponseEnvelope};

use crate::error_log::ErrorLog;
use crate::output;

/// What the client did with the server's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutcome {
    /// Result written to this file, or to stdout when `None`.
    Saved(Option<PathBuf>),
    /// Failure description appended to the error log.
    Failed { desc: String, reason: FailureReason },
}

/// Client for a single recognition server endpoint.
pub struct RecognitionClient {
    config: ClientConfig,
}

impl RecognitionClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `message` and return the server's response.
    ///
    /// `io_timeout` bounds the connect, the request write, and the wait for
    /// the response (which includes the server's recognition time).
    #[instrument(skip_all, fields(addr = %self.config.server_addr()))]
    pub async fn exchange(&self, message: &ClientMessage) -> Result<ResponseEnvelope> {
        let addr = self.config.server_addr();
        let timeout = self.config.io_timeout;

        let mut stream = with_deadline(timeout, "connecting", async {
            TcpStream::connect(&addr)
                .await
                .map_err(|e| IdwireError::Connection(format!("connect to {addr}: {e}")))
        })
        .await?;

        let sent = with_deadline(
            timeout,
            "sending request",
            codec::write_message(&mut stream, message),
        )
        .await?;
        debug!(bytes = sent, "request sent");

        let envelope: ResponseEnvelope = with_deadline(
            timeout,
            "awaiting response",
            codec::read_message(&mut stream, self.config.max_frame_bytes),
        )
        .await?;

        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "shutdown after response failed");
        }

        info!(error = envelope.is_error(), "response received");
        Ok(envelope)
    }

    /// Hand a response to the matching collaborator: results go to the
    /// configured output, failures to the error log.
    pub fn dispatch(&self, envelope: ResponseEnvelope) -> Result<ClientOutcome> {
        match envelope {
            ResponseEnvelope::Success { .. } => {
                let written = output::write_result(&envelope, &self.config.output)?;
                Ok(ClientOutcome::Saved(written))
            }
            ResponseEnvelope::Failure { desc, reason } => {
                ErrorLog::new(&self.config.error_log).append(&desc)?;
                Ok(ClientOutcome::Failed { desc, reason })
            }
        }
    }

    /// [`Self::exchange`] followed by [`Self::dispatch`].
    pub async fn run(&self, message: &ClientMessage) -> Result<ClientOutcome> {
        let envelope = self.exchange(message).await?;
        self.dispatch(envelope)
    }
}
