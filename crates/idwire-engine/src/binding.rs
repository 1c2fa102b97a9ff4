// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed binding to a document recognition engine.
//
// The engine itself is a black box. These traits describe the slice of it the
// server needs: build session settings, spawn a session bound to a license
// signature, process one image, and read back the raw result. Raw results are
// plain ordered sequences rather than native cursors, so the normalizer can
// walk them with ordinary iteration.

use idwire_core::error::Result;

/// A loaded recognition engine, shared by every request in the process.
///
/// Implementations must be `Send + Sync`; sessions are created per request
/// and never shared.
pub trait RecognitionEngine: Send + Sync + 'static {
    type Settings: SessionSettings;
    type Session: RecognitionSession;

    /// Engine build/version string, logged once at startup.
    fn version(&self) -> String;

    /// Fresh settings with the engine's defaults applied.
    fn create_session_settings(&self) -> Result<Self::Settings>;

    /// Spawn a one-shot session for `settings`, authorized by `signature`.
    fn spawn_session(&self, settings: &Self::Settings, signature: &str) -> Result<Self::Session>;
}

/// Mutable per-request session configuration.
pub trait SessionSettings {
    fn set_current_mode(&mut self, mode: &str) -> Result<()>;

    fn enable_forensics(&mut self) -> Result<()>;

    /// Enable one document-type filter (exact type or wildcard mask).
    fn add_enabled_document_types(&mut self, mask: &str) -> Result<()>;

    fn set_option(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One recognition session, used for exactly one image.
pub trait RecognitionSession {
    fn process(&mut self, image: &[u8]) -> Result<()>;

    fn current_result(&self) -> Result<RawResult>;
}

// ---------------------------------------------------------------------------
// Raw engine result
// ---------------------------------------------------------------------------

/// The engine's native result, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResult {
    /// Matched document type; empty when nothing matched.
    pub document_type: String,
    pub text_fields: Vec<RawTextField>,
    pub image_fields: Vec<RawImageField>,
    pub forensic_check_fields: Vec<RawCheckField>,
}

/// Metadata every engine field carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseFieldInfo {
    pub is_accepted: bool,
    /// Attributes in engine order; keys are unique.
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTextField {
    pub key: String,
    pub info: BaseFieldInfo,
    /// Alternative readings, best first.
    pub strings: Vec<String>,
}

impl RawTextField {
    /// The best reading, or an empty string if the engine produced none.
    pub fn first_string(&self) -> &str {
        self.strings.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImageField {
    pub key: String,
    pub info: BaseFieldInfo,
    /// The field image as a base64 string.
    pub base64: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCheckField {
    pub key: String,
    pub info: BaseFieldInfo,
    pub status: NativeCheckStatus,
}

/// Engine-native forensic check status code.
///
/// Only [`NativeCheckStatus::PASSED`] and [`NativeCheckStatus::FAILED`] carry
/// meaning; every other code is reported as undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeCheckStatus(pub i32);

impl NativeCheckStatus {
    pub const UNDEFINED: Self = Self(0);
    pub const PASSED: Self = Self(1);
    pub const FAILED: Self = Self(2);
}
