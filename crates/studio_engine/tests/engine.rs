use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use studio_core::{
    fields, AutosaveStatus, CallSummary, ConversationDetail, CtaSource, CtaSuggestion, FlowKind,
    OperationPayload, OperationRequest, PlacedContent, WizardProgress,
};
use studio_engine::{
    cache_ctas, fetch_history, ApiError, ApiSettings, AutosaveSettings, BackendApi, CallBatch,
    ChatFeedback, ChatReply, EngineConfig, EngineEvent, EngineHandle, FailureKind,
    OperationSettings, ProgressStore,
};
use tempfile::TempDir;

/// Canned backend: playbook generation echoes its input, everything about
/// CTAs fails.
struct FakeBackend;

#[async_trait::async_trait]
impl BackendApi for FakeBackend {
    async fn fetch_calls(&self, _days_back: u32, limit: u32) -> Result<CallBatch, ApiError> {
        let calls = (0..limit)
            .map(|n| CallSummary {
                id: format!("call-{n}"),
                title: None,
                started: None,
                duration: None,
                participants: Vec::new(),
            })
            .collect();
        Ok(CallBatch {
            calls,
            total_found: 99,
        })
    }

    async fn conversation_details(&self, call_id: &str) -> Result<ConversationDetail, ApiError> {
        Ok(ConversationDetail(json!({ "id": call_id })))
    }

    async fn convert_to_markdown(
        &self,
        job_title: &str,
        _raw_data: &str,
    ) -> Result<String, ApiError> {
        tokio::time::sleep(Duration::from_millis(120)).await;
        Ok(format!("# {job_title}\n"))
    }

    async fn start_conversation(&self) -> Result<String, ApiError> {
        Ok("conv".to_string())
    }

    async fn send_message(&self, _id: &str, _message: &str) -> Result<ChatReply, ApiError> {
        Err(ApiError::new(FailureKind::Network, "offline"))
    }

    async fn send_feedback(&self, _feedback: &ChatFeedback) -> Result<(), ApiError> {
        Ok(())
    }

    async fn generate_ctas(&self, _source: &CtaSource) -> Result<Vec<CtaSuggestion>, ApiError> {
        Err(ApiError::new(FailureKind::HttpStatus(500), ""))
    }

    async fn apply_placements(
        &self,
        _source: &CtaSource,
        _ctas: &[CtaSuggestion],
    ) -> Result<PlacedContent, ApiError> {
        Err(ApiError::new(FailureKind::Timeout, "slow"))
    }
}

struct Harness {
    _temp: TempDir,
    export_dir: std::path::PathBuf,
    store: Arc<ProgressStore>,
    engine: EngineHandle,
}

fn harness() -> Harness {
    studio_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = EngineConfig {
        api: ApiSettings::default(),
        data_dir: temp.path().join("data"),
        export_dir: temp.path().join("exports"),
        autosave: AutosaveSettings {
            quiet_period: Duration::from_millis(40),
            display_interval: Duration::from_millis(40),
        },
        operation: OperationSettings {
            tick_interval: Duration::from_millis(10),
        },
    };
    let store = Arc::new(ProgressStore::in_memory());
    let export_dir = config.export_dir.clone();
    let engine = EngineHandle::with_backend(config, Arc::new(FakeBackend), Arc::clone(&store));
    Harness {
        _temp: temp,
        export_dir,
        store,
        engine,
    }
}

/// Collects events until `done` matches one, or gives up after 5 s.
fn wait_for(engine: &EngineHandle, done: impl Fn(&EngineEvent) -> bool) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(50)) {
            let finished = done(&event);
            events.push(event);
            if finished {
                return events;
            }
        }
    }
    panic!("timed out; saw {events:?}");
}

fn playbook(title: &str) -> WizardProgress {
    let mut progress = WizardProgress::new(FlowKind::Playbook);
    progress.set_field(fields::JOB_TITLE, json!(title));
    progress
}

#[test]
fn save_goes_through_autosave_and_reports_status() {
    let h = harness();
    assert_eq!(h.engine.mount(FlowKind::Playbook), None);

    h.engine.save_progress(playbook("AE"));
    let events = wait_for(&h.engine, |event| {
        matches!(
            event,
            EngineEvent::AutosaveStatus {
                status: AutosaveStatus::Idle,
                ..
            }
        )
    });
    let statuses: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::AutosaveStatus { status, .. } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            AutosaveStatus::Saving,
            AutosaveStatus::Saved,
            AutosaveStatus::Idle
        ]
    );
    let saved = h.store.load_progress(FlowKind::Playbook).unwrap();
    assert_eq!(saved.text(fields::JOB_TITLE), "AE");
    assert!(saved.last_saved_at <= Utc::now());
}

#[test]
fn mount_with_saved_progress_skips_the_restore_echo() {
    let h = harness();
    let mut stored = playbook("Restored");
    stored.last_saved_at = Utc::now();
    assert!(h.store.save_progress(&stored));

    let restored = h.engine.mount(FlowKind::Playbook).unwrap();
    h.engine.save_progress(restored.clone());
    assert!(h.engine.recv_timeout(Duration::from_millis(300)).is_none());
    assert_eq!(h.store.load_progress(FlowKind::Playbook), Some(stored));
}

#[test]
fn cta_mount_without_progress_starts_from_cached_suggestions() {
    let h = harness();
    let source = CtaSource::Text("Our onboarding guide.".to_string());
    let suggestion = CtaSuggestion {
        id: "cta-1".to_string(),
        headline: "Start free".to_string(),
        button_text: "Try it".to_string(),
        target_url: None,
        placement_hint: None,
    };
    assert!(cache_ctas(&h.store, &source, &[suggestion]));

    let seeded = h.engine.mount(FlowKind::Cta).unwrap();
    assert_eq!(seeded.text(fields::SOURCE_INPUT), "Our onboarding guide.");
    assert_eq!(seeded.current_step, FlowKind::Cta.operation_step());
    assert_eq!(h.engine.mount(FlowKind::Playbook), None);

    // Seeding is not a restore: the first save is written.
    h.engine.save_progress(seeded);
    wait_for(&h.engine, |event| {
        matches!(
            event,
            EngineEvent::AutosaveStatus {
                status: AutosaveStatus::Saved,
                ..
            }
        )
    });
    assert!(h.store.load_progress(FlowKind::Cta).is_some());
}

#[test]
fn operation_completes_with_payload() {
    let h = harness();
    h.engine.start_operation(
        1,
        OperationRequest::GeneratePlaybook {
            job_title: "SDR".to_string(),
            raw_data: "notes".to_string(),
        },
    );
    let events = wait_for(&h.engine, |event| {
        matches!(event, EngineEvent::OperationCompleted { .. })
    });
    assert!(matches!(
        events.first(),
        Some(EngineEvent::OperationProgress { operation_id: 1, percent: 0, .. })
    ));
    assert_eq!(
        events.last(),
        Some(&EngineEvent::OperationCompleted {
            operation_id: 1,
            result: Ok(OperationPayload::Playbook {
                markdown: "# SDR\n".to_string()
            }),
        })
    );
}

#[test]
fn fetch_operation_records_history() {
    let h = harness();
    h.engine.start_operation(
        4,
        OperationRequest::FetchCalls {
            days_back: 30,
            limit: 2,
        },
    );
    let events = wait_for(&h.engine, |event| {
        matches!(event, EngineEvent::OperationCompleted { .. })
    });
    match events.last() {
        Some(EngineEvent::OperationCompleted {
            result: Ok(OperationPayload::Calls { calls, total_found }),
            ..
        }) => {
            assert_eq!(calls.len(), 2);
            assert!(calls.iter().all(|call| call.is_enriched()));
            assert_eq!(*total_found, 99);
        }
        other => panic!("unexpected {other:?}"),
    }
    let history = fetch_history(&h.store);
    assert_eq!(history.latest().map(|r| (r.days_back, r.returned)), Some((30, 2)));
}

#[test]
fn failure_is_reported_as_user_text() {
    let h = harness();
    h.engine.start_operation(
        2,
        OperationRequest::GenerateCtas {
            source: CtaSource::Text("body".to_string()),
        },
    );
    let events = wait_for(&h.engine, |event| {
        matches!(event, EngineEvent::OperationCompleted { .. })
    });
    match events.last() {
        Some(EngineEvent::OperationCompleted {
            operation_id: 2,
            result: Err(message),
        }) => assert!(message.contains("HTTP 500"), "{message}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn newer_operation_supersedes_older() {
    let h = harness();
    let request = || OperationRequest::GeneratePlaybook {
        job_title: "AE".to_string(),
        raw_data: "notes".to_string(),
    };
    h.engine.start_operation(1, request());
    h.engine.start_operation(2, request());
    let events = wait_for(&h.engine, |event| {
        matches!(event, EngineEvent::OperationCompleted { .. })
    });
    assert!(matches!(
        events.last(),
        Some(EngineEvent::OperationCompleted { operation_id: 2, .. })
    ));
    assert!(h.engine.recv_timeout(Duration::from_millis(300)).is_none());
}

#[test]
fn export_writes_document() {
    let h = harness();
    h.engine.export(
        FlowKind::Playbook,
        "AE playbook".to_string(),
        "# Discovery\n".to_string(),
    );
    let events = wait_for(&h.engine, |event| {
        matches!(event, EngineEvent::ExportCompleted { .. })
    });
    let Some(EngineEvent::ExportCompleted { result: Ok(path) }) = events.last() else {
        panic!("unexpected {events:?}");
    };
    assert!(path.starts_with(&h.export_dir));
    assert!(fs::read_to_string(path).unwrap().contains("title: AE playbook\n"));
}

#[test]
fn clear_progress_cancels_pending_save() {
    let h = harness();
    h.engine.save_progress(playbook("Doomed"));
    h.engine.clear_progress(FlowKind::Playbook);
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(h.store.load_progress(FlowKind::Playbook), None);
}
