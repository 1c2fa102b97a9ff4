// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idwire core: types, error definitions, configuration, and the length-prefixed
// frame codec shared by the engine, server, and client crates.

pub mod codec;
pub mod config;
pub mod error;
pub mod types;

pub use config::{ClientConfig, OutputTarget, ServerConfig};
pub use error::{IdwireError, Result};
pub use types::*;
