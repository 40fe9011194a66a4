use serde_json::Value;

use crate::flow::fields;
use crate::{
    call_review_markdown, AppState, CallRecord, ConfirmationRequest, Effect, FlowKind, Msg,
    OperationPayload, OperationRequest, OperationStatus, WizardProgress,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RestoreProgress(mut progress) => {
            if progress.flow != state.flow() {
                return (state, Vec::new());
            }
            progress.normalize();
            state.replace_progress(progress);
            state.mark_dirty();
            // Watchers see the restore like any other change; the engine's
            // initial-load guard swallows this save.
            save(&state)
        }
        Msg::FieldEdited { name, value } => {
            let wizard = state.wizard();
            let edits_inputs = state.progress().current_step < state.flow().operation_step();
            wizard.edit(state.progress_mut(), &name, value);
            state.set_notice(None);
            state.mark_dirty();
            let mut effects = Vec::new();
            if edits_inputs {
                effects.extend(supersede_running(&mut state));
            }
            effects.extend(save(&state));
            effects
        }
        Msg::NextClicked => {
            let wizard = state.wizard();
            if !wizard.next(state.progress_mut()) {
                return (state, Vec::new());
            }
            state.set_notice(None);
            state.mark_dirty();
            save(&state)
        }
        Msg::BackClicked => {
            let wizard = state.wizard();
            if !wizard.previous(state.progress_mut()) {
                return (state, Vec::new());
            }
            state.set_notice(None);
            state.mark_dirty();
            let mut effects = supersede_running(&mut state);
            effects.extend(save(&state));
            effects
        }
        Msg::RunClicked => {
            let flow = state.flow();
            if state.progress().current_step != flow.operation_step() {
                return (state, Vec::new());
            }
            let request = flow.operation_request(state.progress());
            start_operation(&mut state, request)
        }
        Msg::FinishClicked => finish(&mut state),
        Msg::StartOverClicked => {
            state.set_confirmation(Some(ConfirmationRequest::StartOver));
            state.mark_dirty();
            Vec::new()
        }
        Msg::ClearResultsClicked => {
            let has_results = state
                .flow()
                .derived_fields()
                .iter()
                .any(|name| state.progress().has_field(name));
            if !has_results {
                return (state, Vec::new());
            }
            state.set_confirmation(Some(ConfirmationRequest::ClearResults));
            state.mark_dirty();
            Vec::new()
        }
        Msg::ConfirmAccepted => {
            let Some(request) = state.confirmation() else {
                return (state, Vec::new());
            };
            state.set_confirmation(None);
            state.mark_dirty();
            confirm(&mut state, request)
        }
        Msg::ConfirmDismissed => {
            if state.confirmation().is_some() {
                state.set_confirmation(None);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::AutosaveStatusChanged(status) => {
            state.set_autosave(status);
            state.mark_dirty();
            Vec::new()
        }
        Msg::OperationProgress {
            operation_id,
            stage,
            label,
            percent,
        } => {
            if operation_id != state.operation_id() {
                return (state, Vec::new());
            }
            let advances = matches!(
                state.operation(),
                OperationStatus::Running { stage: shown_stage, percent: shown, .. }
                    if stage >= *shown_stage && percent >= *shown
            );
            if advances {
                state.set_operation(OperationStatus::Running {
                    stage,
                    label,
                    percent,
                });
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::OperationSucceeded {
            operation_id,
            payload,
        } => {
            if operation_id != state.operation_id() || !state.operation().is_running() {
                return (state, Vec::new());
            }
            let message = state_label(&state).to_string();
            state.mark_dirty();
            match store_payload(state.progress_mut(), payload) {
                Ok(()) => {
                    state.set_operation(OperationStatus::Succeeded { message });
                    state.set_notice(None);
                    save(&state)
                }
                Err(err) => {
                    let message = format!("Could not keep the result: {err}");
                    state.set_operation(OperationStatus::Failed {
                        message: message.clone(),
                    });
                    state.set_notice(Some(message));
                    Vec::new()
                }
            }
        }
        Msg::OperationFailed {
            operation_id,
            message,
        } => {
            if operation_id != state.operation_id() || !state.operation().is_running() {
                return (state, Vec::new());
            }
            state.set_operation(OperationStatus::Failed {
                message: message.clone(),
            });
            state.set_notice(Some(message));
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportCompleted { path } => {
            state.set_notice(Some(format!("Exported to {path}")));
            state.mark_dirty();
            Vec::new()
        }
        Msg::ExportFailed { message } => {
            state.set_notice(Some(format!("Export failed: {message}")));
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn save(state: &AppState) -> Vec<Effect> {
    vec![Effect::SaveProgress(state.progress().clone())]
}

/// Abandons an in-flight operation so its late result cannot land in
/// progress whose inputs have moved on.
fn supersede_running(state: &mut AppState) -> Vec<Effect> {
    if !state.operation().is_running() {
        return Vec::new();
    }
    state.next_operation_id();
    state.set_operation(OperationStatus::Idle);
    vec![Effect::CancelOperation]
}

fn state_label(state: &AppState) -> &str {
    match state.operation() {
        OperationStatus::Running { label, .. } => label,
        _ => "",
    }
}

fn start_operation(
    state: &mut AppState,
    request: Result<OperationRequest, crate::ValidationError>,
) -> Vec<Effect> {
    state.mark_dirty();
    let request = match request {
        Ok(request) => request,
        Err(err) => {
            state.set_notice(Some(err.to_string()));
            return Vec::new();
        }
    };
    let plan = request.stage_plan();
    let first = plan.position_at(std::time::Duration::ZERO);
    let operation_id = state.next_operation_id();
    state.set_operation(OperationStatus::Running {
        stage: first.index,
        label: plan.label(first.index).to_string(),
        percent: first.percent,
    });
    state.set_notice(None);
    vec![Effect::StartOperation {
        operation_id,
        request,
    }]
}

fn finish(state: &mut AppState) -> Vec<Effect> {
    let flow = state.flow();
    if !state.wizard().is_last_step(state.progress()) {
        return Vec::new();
    }
    let progress = state.progress();
    match flow {
        FlowKind::Cta => {
            let request = flow.placement_request(progress);
            start_operation(state, request)
        }
        FlowKind::Playbook => {
            let title = progress.text(fields::JOB_TITLE).trim().to_string();
            let body = progress.text(fields::OUTPUT).to_string();
            vec![Effect::ExportDocument {
                flow,
                title: format!("{title} playbook"),
                body,
            }]
        }
        FlowKind::CallReview => {
            let Some((calls, total_found)) = stored_calls(progress) else {
                return Vec::new();
            };
            let days = progress.number(fields::DAYS_BACK).unwrap_or_default();
            vec![Effect::ExportDocument {
                flow,
                title: format!("Call review last {days} days"),
                body: call_review_markdown(&calls, total_found),
            }]
        }
    }
}

fn confirm(state: &mut AppState, request: ConfirmationRequest) -> Vec<Effect> {
    let flow = state.flow();
    match request {
        ConfirmationRequest::StartOver => {
            let fresh = state.wizard().reset();
            state.replace_progress(fresh);
            state.next_operation_id();
            state.set_operation(OperationStatus::Idle);
            state.set_notice(None);
            vec![Effect::CancelOperation, Effect::ClearProgress { flow }]
        }
        ConfirmationRequest::ClearResults => {
            let wizard = state.wizard();
            wizard.clear_results(state.progress_mut());
            state.next_operation_id();
            state.set_operation(OperationStatus::Idle);
            let mut effects = vec![Effect::CancelOperation];
            effects.extend(save(state));
            effects
        }
    }
}

fn store_payload(
    progress: &mut WizardProgress,
    payload: OperationPayload,
) -> Result<(), serde_json::Error> {
    match payload {
        OperationPayload::Calls { calls, total_found } => {
            let mut output = serde_json::Map::new();
            output.insert("calls".to_string(), serde_json::to_value(calls)?);
            output.insert("total_found".to_string(), Value::from(total_found));
            progress.set_field(fields::OUTPUT, Value::Object(output));
        }
        OperationPayload::Playbook { markdown } => {
            progress.set_field(fields::OUTPUT, Value::String(markdown));
        }
        OperationPayload::Ctas { ctas } => {
            progress.set_field(fields::OUTPUT, serde_json::to_value(ctas)?);
        }
        OperationPayload::Placed(placed) => {
            progress.set_field(fields::PLACED, Value::String(placed.content));
        }
    }
    Ok(())
}

fn stored_calls(progress: &WizardProgress) -> Option<(Vec<CallRecord>, u64)> {
    let output = progress.field(fields::OUTPUT)?;
    let calls = serde_json::from_value(output.get("calls")?.clone()).ok()?;
    let total_found = output
        .get("total_found")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    Some((calls, total_found))
}
