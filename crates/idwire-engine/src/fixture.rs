// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixture engine for development, CI, and integration tests.
//
// The bundle is a JSON catalogue of known documents, each keyed by the SHA-256
// of its image bytes. Processing validates that the input really is an image,
// looks up its digest, and replays the catalogued fields. Images that are not
// in the catalogue (or are filtered out by the mask) produce an empty document
// type, exactly like a real engine that found nothing.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use idwire_core::error::{IdwireError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::binding::{
    BaseFieldInfo, NativeCheckStatus, RawCheckField, RawImageField, RawResult, RawTextField,
    RecognitionEngine, RecognitionSession, SessionSettings,
};
use crate::bundle::locate_bundle;

/// Lowercase hex SHA-256 of `data`, the catalogue key for an image.
pub fn image_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Bundle file format
// ---------------------------------------------------------------------------

/// Top-level contents of a fixture `.se` bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureBundle {
    pub version: String,
    #[serde(default)]
    pub documents: Vec<FixtureDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FixtureDocument {
    /// See [`image_digest`].
    pub image_sha256: String,
    pub doc_type: String,
    #[serde(default)]
    pub text_fields: Vec<FixtureTextField>,
    #[serde(default)]
    pub image_fields: Vec<FixtureImageField>,
    /// Only reported when the session enabled forensics.
    #[serde(default)]
    pub forensic_checks: Vec<FixtureCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureTextField {
    pub name: String,
    pub values: Vec<String>,
    pub accepted: bool,
    #[serde(default)]
    pub attr: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureImageField {
    pub name: String,
    pub base64: String,
    #[serde(default)]
    pub attr: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureCheck {
    pub name: String,
    /// Native status code, see [`NativeCheckStatus`].
    pub status: i32,
    pub accepted: bool,
}

impl FixtureDocument {
    fn to_raw(&self, with_forensics: bool) -> RawResult {
        let info = |accepted: bool, attr: &BTreeMap<String, String>| BaseFieldInfo {
            is_accepted: accepted,
            attributes: attr.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };

        RawResult {
            document_type: self.doc_type.clone(),
            text_fields: self
                .text_fields
                .iter()
                .map(|f| RawTextField {
                    key: f.name.clone(),
                    info: info(f.accepted, &f.attr),
                    strings: f.values.clone(),
                })
                .collect(),
            image_fields: self
                .image_fields
                .iter()
                .map(|f| RawImageField {
                    key: f.name.clone(),
                    info: info(true, &f.attr),
                    base64: f.base64.clone(),
                })
                .collect(),
            forensic_check_fields: if with_forensics {
                self.forensic_checks
                    .iter()
                    .map(|c| RawCheckField {
                        key: c.name.clone(),
                        info: info(c.accepted, &BTreeMap::new()),
                        status: NativeCheckStatus(c.status),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        }
    }
}

/// Parsed bundle, indexed by image digest.
struct Catalog {
    version: String,
    documents: HashMap<String, FixtureDocument>,
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let bytes = std::fs::read(path)
        .map_err(|e| IdwireError::EngineInit(format!("{}: {e}", path.display())))?;
    let bundle: FixtureBundle = serde_json::from_slice(&bytes)
        .map_err(|e| IdwireError::EngineInit(format!("{}: {e}", path.display())))?;

    let documents = bundle
        .documents
        .into_iter()
        .map(|doc| (doc.image_sha256.to_ascii_lowercase(), doc))
        .collect::<HashMap<_, _>>();

    debug!(documents = documents.len(), "fixture catalogue parsed");
    Ok(Catalog {
        version: bundle.version,
        documents,
    })
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Catalogue-backed [`RecognitionEngine`].
pub struct FixtureEngine {
    bundle_path: PathBuf,
    concurrency: usize,
    catalog: OnceLock<std::result::Result<Arc<Catalog>, String>>,
}

impl FixtureEngine {
    /// Load the engine from a bundle file.
    ///
    /// Without `lazy_init` the catalogue is parsed here, so a broken bundle
    /// fails engine creation. With `lazy_init` parsing waits for the first
    /// session.
    #[instrument(
        skip_all,
        fields(
            bundle = %bundle_path.display(),
            lazy_init = lazy_init,
            concurrency = concurrency,
        )
    )]
    pub fn create(bundle_path: &Path, lazy_init: bool, concurrency: usize) -> Result<Self> {
        if !bundle_path.is_file() {
            return Err(IdwireError::EngineInit(format!(
                "bundle {} is not a file",
                bundle_path.display()
            )));
        }

        let engine = Self {
            bundle_path: bundle_path.to_path_buf(),
            concurrency,
            catalog: OnceLock::new(),
        };

        if !lazy_init {
            engine.catalog()?;
        }

        info!("fixture engine created");
        Ok(engine)
    }

    /// Locate the single bundle in `dir` and create the engine from it.
    pub fn from_bundle_dir(dir: &Path, lazy_init: bool, concurrency: usize) -> Result<Self> {
        let bundle = locate_bundle(dir)?;
        Self::create(&bundle, lazy_init, concurrency)
    }

    /// Concurrency the engine was created with (0 = all cores).
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn catalog(&self) -> Result<Arc<Catalog>> {
        self.catalog
            .get_or_init(|| {
                load_catalog(&self.bundle_path)
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(IdwireError::EngineInit)
    }
}

impl RecognitionEngine for FixtureEngine {
    type Settings = FixtureSettings;
    type Session = FixtureSession;

    /// Never loads the bundle; a lazy engine reports "not loaded" until its
    /// first session.
    fn version(&self) -> String {
        match self.catalog.get() {
            Some(Ok(catalog)) => format!("fixture-engine {}", catalog.version),
            Some(Err(_)) | None => "fixture-engine (bundle not loaded)".to_owned(),
        }
    }

    fn create_session_settings(&self) -> Result<FixtureSettings> {
        Ok(FixtureSettings::default())
    }

    fn spawn_session(&self, settings: &FixtureSettings, signature: &str) -> Result<FixtureSession> {
        if signature.trim().is_empty() {
            return Err(IdwireError::Engine("session signature is empty".into()));
        }

        Ok(FixtureSession {
            settings: settings.clone(),
            catalog: self.catalog()?,
            result: None,
        })
    }
}

/// Settings recorded for a fixture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSettings {
    mode: String,
    forensics: bool,
    document_types: Vec<String>,
    options: BTreeMap<String, String>,
}

impl Default for FixtureSettings {
    fn default() -> Self {
        Self {
            mode: "default".into(),
            forensics: false,
            document_types: Vec::new(),
            options: BTreeMap::new(),
        }
    }
}

impl FixtureSettings {
    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn forensics(&self) -> bool {
        self.forensics
    }

    pub fn document_types(&self) -> &[String] {
        &self.document_types
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Whether any enabled mask admits `doc_type`. Masks are `*`, an exact
    /// type, or a prefix ending in `*` (e.g. `mrz.*`).
    fn admits(&self, doc_type: &str) -> bool {
        self.document_types.iter().any(|mask| match mask.strip_suffix('*') {
            Some(prefix) => doc_type.starts_with(prefix),
            None => mask == doc_type,
        })
    }
}

impl SessionSettings for FixtureSettings {
    fn set_current_mode(&mut self, mode: &str) -> Result<()> {
        if mode.is_empty() {
            return Err(IdwireError::Engine("mode must not be empty".into()));
        }
        self.mode = mode.to_owned();
        Ok(())
    }

    fn enable_forensics(&mut self) -> Result<()> {
        self.forensics = true;
        Ok(())
    }

    fn add_enabled_document_types(&mut self, mask: &str) -> Result<()> {
        if mask.is_empty() {
            return Err(IdwireError::Engine("document type mask must not be empty".into()));
        }
        self.document_types.push(mask.to_owned());
        Ok(())
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        self.options.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// A one-shot fixture session.
pub struct FixtureSession {
    settings: FixtureSettings,
    catalog: Arc<Catalog>,
    result: Option<RawResult>,
}

impl RecognitionSession for FixtureSession {
    fn process(&mut self, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            return Err(IdwireError::Engine("image buffer is empty".into()));
        }
        image::load_from_memory(image)
            .map_err(|e| IdwireError::Engine(format!("cannot decode image: {e}")))?;

        let digest = image_digest(image);
        let matched = self
            .catalog
            .documents
            .get(&digest)
            .filter(|doc| self.settings.admits(&doc.doc_type));

        debug!(
            digest = %digest,
            mode = %self.settings.mode,
            matched = matched.map(|doc| doc.doc_type.as_str()).unwrap_or(""),
            "fixture image processed"
        );

        self.result = Some(match matched {
            Some(doc) => doc.to_raw(self.settings.forensics),
            None => RawResult::default(),
        });
        Ok(())
    }

    fn current_result(&self) -> Result<RawResult> {
        self.result
            .clone()
            .ok_or_else(|| IdwireError::Engine("no image has been processed".into()))
    }
}
