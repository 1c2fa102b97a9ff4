// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result normalization: raw engine result -> canonical result document.
//
// Pure and total. Every well-formed raw result produces a document; nothing
// here performs I/O or can fail.

use std::collections::BTreeMap;

use idwire_core::types::{CheckStatus, ForensicField, ImageField, RecognitionResult, TextField};

use crate::binding::{BaseFieldInfo, NativeCheckStatus, RawResult};

/// Convert a raw engine result into the wire-level [`RecognitionResult`].
///
/// Field keys become map keys and are copied into each field's `name`.
/// Forensic checks end up in the JSON only when at least one was reported.
pub fn normalize(raw: &RawResult) -> RecognitionResult {
    let fields = raw
        .text_fields
        .iter()
        .map(|field| {
            let text = TextField {
                name: field.key.clone(),
                value: field.first_string().to_owned(),
                is_accepted: field.info.is_accepted,
                attr: attributes(&field.info),
            };
            (field.key.clone(), text)
        })
        .collect();

    let images = raw
        .image_fields
        .iter()
        .map(|field| {
            let image = ImageField {
                name: field.key.clone(),
                value: field.base64.clone(),
                attr: attributes(&field.info),
            };
            (field.key.clone(), image)
        })
        .collect();

    let forensics = raw
        .forensic_check_fields
        .iter()
        .map(|field| {
            let check = ForensicField {
                name: field.key.clone(),
                value: check_status(field.status),
                is_accepted: field.info.is_accepted,
            };
            (field.key.clone(), check)
        })
        .collect();

    RecognitionResult {
        doc_type: raw.document_type.clone(),
        fields,
        images,
        forensics,
    }
}

fn attributes(info: &BaseFieldInfo) -> BTreeMap<String, String> {
    info.attributes.iter().cloned().collect()
}

fn check_status(status: NativeCheckStatus) -> CheckStatus {
    match status {
        NativeCheckStatus::PASSED => CheckStatus::Passed,
        NativeCheckStatus::FAILED => CheckStatus::Failed,
        _ => CheckStatus::Undefined,
    }
}
