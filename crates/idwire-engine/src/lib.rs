// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idwire engine: the typed binding to the recognition engine, the normalizer
// that turns raw engine results into the canonical result document, and the
// orchestrator that drives one recognition per request.

pub mod binding;
pub mod bundle;
pub mod fixture;
pub mod normalize;
pub mod orchestrator;

pub use binding::{RecognitionEngine, RecognitionSession, SessionSettings};
pub use fixture::FixtureEngine;
pub use normalize::normalize;
pub use orchestrator::Orchestrator;
