// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition orchestration: request settings -> engine session -> one
// processed image -> normalized result.
//
// The orchestrator owns the process-wide engine handle. Engine creation is
// attempted exactly once; a failure is retained and every later request is
// rejected with `EngineNotInitialized` until the process restarts.

use idwire_core::error::{IdwireError, Result};
use idwire_core::types::{RecognitionRequest, RecognitionResult};
use tracing::{debug, error, info};

use crate::binding::{RawResult, RecognitionEngine, RecognitionSession, SessionSettings};
use crate::normalize::normalize;

/// Engine lifecycle after the single initialization attempt.
enum EngineState<E> {
    Ready(E),
    /// Creation failed; the rendered error is kept for every later request.
    Failed(String),
}

/// Drives one recognition per request against a shared engine.
pub struct Orchestrator<E: RecognitionEngine> {
    state: EngineState<E>,
}

impl<E: RecognitionEngine> Orchestrator<E> {
    /// Run the engine constructor once and keep either the engine or its error.
    pub fn initialize<F>(create: F) -> Self
    where
        F: FnOnce() -> Result<E>,
    {
        match create() {
            Ok(engine) => Self::ready(engine),
            Err(e) => Self::failed(e.to_string()),
        }
    }

    pub fn ready(engine: E) -> Self {
        info!(version = %engine.version(), "recognition engine ready");
        Self {
            state: EngineState::Ready(engine),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!(error = %reason, "recognition engine unavailable until restart");
        Self {
            state: EngineState::Failed(reason),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// Engine version when ready, otherwise the retained initialization error.
    pub fn engine_status(&self) -> Result<String> {
        match &self.state {
            EngineState::Ready(engine) => Ok(engine.version()),
            EngineState::Failed(reason) => Err(IdwireError::EngineNotInitialized(reason.clone())),
        }
    }

    /// Recognize the single image in `request`.
    ///
    /// Any failure while configuring, spawning, or processing is returned as
    /// [`IdwireError::Recognition`]. A completed recognition that matched no
    /// document type is [`IdwireError::NoDocumentDetected`].
    pub fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResult> {
        let engine = match &self.state {
            EngineState::Ready(engine) => engine,
            EngineState::Failed(reason) => {
                return Err(IdwireError::EngineNotInitialized(reason.clone()));
            }
        };

        let raw = run_session(engine, request).map_err(|e| match e {
            IdwireError::Engine(detail) => IdwireError::Recognition(detail),
            other => IdwireError::Recognition(other.to_string()),
        })?;

        let result = normalize(&raw);
        debug!(
            doc_type = %result.doc_type,
            fields = result.fields.len(),
            images = result.images.len(),
            forensics = result.forensics.len(),
            "recognition finished"
        );

        if result.is_document_detected() {
            Ok(result)
        } else {
            Err(IdwireError::NoDocumentDetected)
        }
    }
}

/// Configure a fresh session from `request`, process its image, and return
/// the raw result. The session is dropped on return.
fn run_session<E: RecognitionEngine>(
    engine: &E,
    request: &RecognitionRequest,
) -> Result<RawResult> {
    let mut settings = engine.create_session_settings()?;
    settings.set_current_mode(request.mode())?;

    // Forensic date checks need `common.currentDate`; supplying it is the
    // caller's job.
    if request.forensics() {
        settings.enable_forensics()?;
    }
    for mask in request.mask() {
        settings.add_enabled_document_types(mask)?;
    }
    for (key, value) in request.options() {
        settings.set_option(key, value)?;
    }

    let mut session = engine.spawn_session(&settings, request.signature())?;
    session.process(request.input())?;
    session.current_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BaseFieldInfo, RawTextField};
    use std::sync::{Arc, Mutex};

    /// Engine double that records every binding call in order.
    struct RecordingEngine {
        calls: Arc<Mutex<Vec<String>>>,
        result: RawResult,
        fail_process: bool,
    }

    struct RecordingSettings {
        calls: Arc<Mutex<Vec<String>>>,
    }

    struct RecordingSession {
        calls: Arc<Mutex<Vec<String>>>,
        result: RawResult,
        fail_process: bool,
    }

    impl RecordingEngine {
        fn new(result: RawResult) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                result,
                fail_process: false,
            }
        }

        fn log(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RecognitionEngine for RecordingEngine {
        type Settings = RecordingSettings;
        type Session = RecordingSession;

        fn version(&self) -> String {
            "recording 0.1".into()
        }

        fn create_session_settings(&self) -> Result<RecordingSettings> {
            Ok(RecordingSettings {
                calls: Arc::clone(&self.calls),
            })
        }

        fn spawn_session(
            &self,
            _settings: &RecordingSettings,
            signature: &str,
        ) -> Result<RecordingSession> {
            self.calls.lock().unwrap().push(format!("spawn:{signature}"));
            Ok(RecordingSession {
                calls: Arc::clone(&self.calls),
                result: self.result.clone(),
                fail_process: self.fail_process,
            })
        }
    }

    impl SessionSettings for RecordingSettings {
        fn set_current_mode(&mut self, mode: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("mode:{mode}"));
            Ok(())
        }

        fn enable_forensics(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push("forensics".into());
            Ok(())
        }

        fn add_enabled_document_types(&mut self, mask: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("mask:{mask}"));
            Ok(())
        }

        fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("option:{key}={value}"));
            Ok(())
        }
    }

    impl RecognitionSession for RecordingSession {
        fn process(&mut self, image: &[u8]) -> Result<()> {
            self.calls.lock().unwrap().push(format!("process:{}", image.len()));
            if self.fail_process {
                return Err(IdwireError::Engine("corrupt image".into()));
            }
            Ok(())
        }

        fn current_result(&self) -> Result<RawResult> {
            Ok(self.result.clone())
        }
    }

    fn mrz_raw() -> RawResult {
        RawResult {
            document_type: "mrz.mrp".into(),
            text_fields: vec![RawTextField {
                key: "mrz_gender".into(),
                info: BaseFieldInfo {
                    is_accepted: true,
                    attributes: Vec::new(),
                },
                strings: vec!["F".into()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn session_is_configured_from_the_request_in_order() {
        let engine = RecordingEngine::new(mrz_raw());
        let calls = Arc::clone(&engine.calls);
        let orchestrator = Orchestrator::ready(engine);

        let request = RecognitionRequest::new("license-123", vec![1, 2, 3])
            .with_mode("anyfast")
            .with_forensics(true)
            .with_mask("mrz.mrp")
            .with_mask("rus.passport.*")
            .with_option("common.currentDate", "16.10.2026");

        let result = orchestrator.recognize(&request).unwrap();
        assert_eq!(result.fields["mrz_gender"].value, "F");

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "mode:anyfast",
                "forensics",
                "mask:mrz.mrp",
                "mask:rus.passport.*",
                "option:common.currentDate=16.10.2026",
                "spawn:license-123",
                "process:3",
            ]
        );
    }

    #[test]
    fn forensics_not_enabled_unless_requested() {
        let engine = RecordingEngine::new(mrz_raw());
        let orchestrator = Orchestrator::ready(engine);
        orchestrator
            .recognize(&RecognitionRequest::new("sig", vec![0]).with_mask("*"))
            .unwrap();

        let EngineState::Ready(engine) = &orchestrator.state else {
            panic!("engine should be ready");
        };
        assert!(!engine.log().iter().any(|c| c == "forensics"));
    }

    #[test]
    fn every_request_spawns_a_fresh_session() {
        let engine = RecordingEngine::new(mrz_raw());
        let calls = Arc::clone(&engine.calls);
        let orchestrator = Orchestrator::ready(engine);

        for i in 0..3 {
            let request = RecognitionRequest::new(format!("sig-{i}"), vec![0]);
            orchestrator.recognize(&request).unwrap();
        }

        let spawns: Vec<_> = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("spawn:"))
            .cloned()
            .collect();
        assert_eq!(spawns, vec!["spawn:sig-0", "spawn:sig-1", "spawn:sig-2"]);
    }

    #[test]
    fn empty_doc_type_is_no_document_detected() {
        let orchestrator = Orchestrator::ready(RecordingEngine::new(RawResult::default()));
        let err = orchestrator
            .recognize(&RecognitionRequest::new("sig", vec![0]))
            .unwrap_err();
        assert!(matches!(err, IdwireError::NoDocumentDetected));
    }

    #[test]
    fn engine_failure_becomes_recognition_error() {
        let mut engine = RecordingEngine::new(mrz_raw());
        engine.fail_process = true;
        let orchestrator = Orchestrator::ready(engine);

        let err = orchestrator
            .recognize(&RecognitionRequest::new("sig", Vec::new()))
            .unwrap_err();
        match err {
            IdwireError::Recognition(desc) => assert_eq!(desc, "corrupt image"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_initialization_is_retained() {
        let orchestrator = Orchestrator::<RecordingEngine>::initialize(|| {
            Err(IdwireError::EngineInit("no .se bundle found".into()))
        });
        assert!(!orchestrator.is_ready());

        for _ in 0..2 {
            let err = orchestrator
                .recognize(&RecognitionRequest::new("sig", vec![0]))
                .unwrap_err();
            match err {
                IdwireError::EngineNotInitialized(reason) => {
                    assert!(reason.contains("no .se bundle found"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(orchestrator.engine_status().is_err());
    }

    #[test]
    fn ready_engine_reports_version() {
        let orchestrator = Orchestrator::initialize(|| Ok(RecordingEngine::new(mrz_raw())));
        assert!(orchestrator.is_ready());
        assert_eq!(orchestrator.engine_status().unwrap(), "recording 0.1");
    }
}
