// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idwire app: command-line surfaces shared by the `idwire-server` and
// `idwire-client` binaries.

pub mod cli;
pub mod logging;
