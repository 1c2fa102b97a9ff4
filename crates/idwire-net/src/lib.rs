// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idwire net: the TCP recognition server, the one-shot client, and the
// client-side collaborators that persist results and failures.

pub mod client;
pub mod error_log;
pub mod output;
pub mod server;

pub use client::{ClientOutcome, RecognitionClient};
pub use error_log::ErrorLog;
pub use server::RecognitionServer;
