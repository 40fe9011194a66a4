use anyhow::{Context, Result};
use studio_core::{Effect, FetchRecord, FlowKind, Msg, WizardProgress};
use studio_engine::{
    dismiss_notice, fetch_history, is_notice_dismissed, EngineEvent, EngineHandle,
};
use studio_logging::{studio_info, studio_warn};

use super::config::StudioConfig;

/// Carries core effects to the engine and engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: &StudioConfig) -> Result<Self> {
        let engine = EngineHandle::new(config.engine_config())
            .context("could not build the backend client")?;
        Ok(Self { engine })
    }

    /// Saved progress for `flow`, if any. Arms the engine's initial-load guard.
    pub fn mount(&self, flow: FlowKind) -> Option<WizardProgress> {
        let progress = self.engine.mount(flow);
        if progress.is_some() {
            studio_info!("Restoring saved {} progress", flow);
        }
        progress
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SaveProgress(progress) => self.engine.save_progress(progress),
                Effect::ClearProgress { flow } => self.engine.clear_progress(flow),
                Effect::StartOperation {
                    operation_id,
                    request,
                } => {
                    studio_info!("StartOperation id={}", operation_id);
                    self.engine.start_operation(operation_id, request);
                }
                Effect::CancelOperation => self.engine.cancel_operation(),
                Effect::ExportDocument { flow, title, body } => {
                    self.engine.export(flow, title, body);
                }
            }
        }
    }

    /// Engine events that arrived since the last call, as messages for `flow`.
    pub fn poll(&self, flow: FlowKind) -> Vec<Msg> {
        std::iter::from_fn(|| self.engine.try_recv())
            .map(|event| map_event(event, flow))
            .filter(|msg| *msg != Msg::NoOp)
            .collect()
    }

    /// Cancels the running operation and drops events already queued for it.
    pub fn abandon_operation(&self) {
        self.engine.cancel_operation();
        let dropped = std::iter::from_fn(|| self.engine.try_recv()).count();
        if dropped > 0 {
            studio_info!("Dropped {} pending engine events", dropped);
        }
    }

    pub fn fetch_history(&self) -> Vec<FetchRecord> {
        fetch_history(self.engine.store()).items().to_vec()
    }

    pub fn is_notice_dismissed(&self, notice_id: &str) -> bool {
        is_notice_dismissed(self.engine.store(), notice_id)
    }

    pub fn dismiss_notice(&self, notice_id: &str) {
        if !dismiss_notice(self.engine.store(), notice_id) {
            studio_warn!("Could not remember dismissed notice {}", notice_id);
        }
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }
}

pub fn map_event(event: EngineEvent, flow: FlowKind) -> Msg {
    match event {
        EngineEvent::AutosaveStatus {
            flow: event_flow,
            status,
        } if event_flow == flow => Msg::AutosaveStatusChanged(status),
        EngineEvent::AutosaveStatus { .. } => Msg::NoOp,
        EngineEvent::OperationProgress {
            operation_id,
            stage,
            label,
            percent,
        } => Msg::OperationProgress {
            operation_id,
            stage,
            label,
            percent,
        },
        EngineEvent::OperationCompleted {
            operation_id,
            result,
        } => match result {
            Ok(payload) => Msg::OperationSucceeded {
                operation_id,
                payload,
            },
            Err(message) => Msg::OperationFailed {
                operation_id,
                message,
            },
        },
        EngineEvent::ExportCompleted { result } => match result {
            Ok(path) => Msg::ExportCompleted {
                path: path.display().to_string(),
            },
            Err(message) => Msg::ExportFailed { message },
        },
    }
}
