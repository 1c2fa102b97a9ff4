// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire-level domain types: the recognition request, the response envelope,
// and the canonical recognition result document.
//
// Every type that crosses the network denies unknown fields, so a decoded
// payload is always one of the shapes below and nothing else.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::IdwireError;

/// Processing mode used when a request does not name one.
pub const DEFAULT_MODE: &str = "default";

/// Session option carrying the reference date for date-based forensic checks.
pub const CURRENT_DATE_OPTION: &str = "common.currentDate";

fn default_mode() -> String {
    DEFAULT_MODE.to_owned()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One recognition job: a single image plus the session configuration to
/// process it with.
///
/// Missing keys decode to the same defaults the server has always applied, so
/// older clients that omit `mode` or `options` keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecognitionRequest {
    #[serde(default)]
    signature: String,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default)]
    mask: Vec<String>,
    #[serde(default)]
    forensics: bool,
    #[serde(default)]
    options: BTreeMap<String, String>,
    #[serde(default, with = "base64_bytes")]
    input: Vec<u8>,
}

impl RecognitionRequest {
    /// Start a request for `input` signed with `signature`, using the default
    /// mode, an empty mask, no forensics, and no options.
    pub fn new(signature: impl Into<String>, input: Vec<u8>) -> Self {
        Self {
            signature: signature.into(),
            mode: default_mode(),
            mask: Vec::new(),
            forensics: false,
            options: BTreeMap::new(),
            input,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Append one document-type filter. Order is preserved on the wire and
    /// when the filters are applied to the session.
    pub fn with_mask(mut self, doc_type: impl Into<String>) -> Self {
        self.mask.push(doc_type.into());
        self
    }

    pub fn with_forensics(mut self, enabled: bool) -> Self {
        self.forensics = enabled;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn mask(&self) -> &[String] {
        &self.mask
    }

    pub fn forensics(&self) -> bool {
        self.forensics
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }
}

/// Asks the server to report its engine status instead of recognizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogRequest {
    pub log: bool,
}

impl Default for LogRequest {
    fn default() -> Self {
        Self { log: true }
    }
}

/// Everything a client may send in a request frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Recognize(RecognitionRequest),
    Log(LogRequest),
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Why a request ended in a failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Recognition ran to completion but no document type matched.
    NoDocument,
    /// The engine failed to start; nothing can be recognized until restart.
    EngineNotInitialized,
    /// Session setup, spawning, or image processing failed.
    Recognition,
    /// The request frame did not match the request schema.
    BadRequest,
    /// Reply to a log request: `desc` carries the engine status.
    EngineStatus,
}

/// The single response written back on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub enum ResponseEnvelope {
    Success { response: RecognitionResult },
    Failure { desc: String, reason: FailureReason },
}

impl ResponseEnvelope {
    pub fn success(response: RecognitionResult) -> Self {
        Self::Success { response }
    }

    pub fn failure(desc: impl Into<String>, reason: FailureReason) -> Self {
        Self::Failure {
            desc: desc.into(),
            reason,
        }
    }

    /// Convert an error into a failure envelope. Only the rendered message
    /// and its reason code cross the wire.
    pub fn from_error(err: &IdwireError) -> Self {
        Self::failure(err.to_string(), err.failure_reason())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Flat `{error, response?, desc?, reason?}` shape used on the wire.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEnvelope {
    error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<RecognitionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<FailureReason>,
}

impl TryFrom<WireEnvelope> for ResponseEnvelope {
    type Error = String;

    fn try_from(wire: WireEnvelope) -> std::result::Result<Self, Self::Error> {
        match (wire.error, wire.response, wire.desc) {
            (false, Some(response), None) if wire.reason.is_none() => {
                Ok(Self::Success { response })
            }
            (true, None, Some(desc)) => Ok(Self::Failure {
                desc,
                reason: wire.reason.unwrap_or(FailureReason::Recognition),
            }),
            (false, _, _) => {
                Err("success envelope must carry `response` and nothing else".to_owned())
            }
            (true, _, _) => Err("failure envelope must carry `desc` and no `response`".to_owned()),
        }
    }
}

impl From<ResponseEnvelope> for WireEnvelope {
    fn from(envelope: ResponseEnvelope) -> Self {
        match envelope {
            ResponseEnvelope::Success { response } => Self {
                error: false,
                response: Some(response),
                desc: None,
                reason: None,
            },
            ResponseEnvelope::Failure { desc, reason } => Self {
                error: true,
                response: None,
                desc: Some(desc),
                reason: Some(reason),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Recognition result document
// ---------------------------------------------------------------------------

/// Canonical, transport-safe recognition result.
///
/// An empty `doc_type` means no document was detected. `forensics` is left
/// out of the JSON entirely when no checks were computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecognitionResult {
    pub doc_type: String,
    #[serde(default)]
    pub fields: BTreeMap<String, TextField>,
    #[serde(default)]
    pub images: BTreeMap<String, ImageField>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub forensics: BTreeMap<String, ForensicField>,
}

impl RecognitionResult {
    pub fn is_document_detected(&self) -> bool {
        !self.doc_type.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextField {
    pub name: String,
    pub value: String,
    pub is_accepted: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attr: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageField {
    pub name: String,
    /// Base64-encoded image data.
    pub value: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attr: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForensicField {
    pub name: String,
    pub value: CheckStatus,
    pub is_accepted: bool,
}

/// Outcome of a single forensic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Undefined,
}

/// Lifecycle status of the recognition server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

/// Binary blobs travel as standard base64 strings inside the JSON payload.
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
