use std::sync::Once;

use pretty_assertions::assert_eq;
use serde_json::json;
use studio_core::{
    fields, update, AppState, ConfirmationRequest, Effect, FlowKind, Msg, WizardProgress,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(studio_logging::initialize_for_tests);
}

fn edit(state: AppState, name: &str, value: serde_json::Value) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::FieldEdited {
            name: name.to_string(),
            value,
        },
    )
}

fn playbook_at_step_two() -> AppState {
    let (state, _) = edit(
        AppState::new(FlowKind::Playbook),
        fields::JOB_TITLE,
        json!("Account Executive"),
    );
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.progress().current_step, 2);
    state
}

#[test]
fn next_is_noop_while_gate_fails() {
    init_logging();
    let mut state = AppState::new(FlowKind::Playbook);
    state.consume_dirty();
    let before = state.clone();

    let (mut next, effects) = update(state, Msg::NextClicked);

    assert!(effects.is_empty());
    assert_eq!(next.progress().current_step, 1);
    assert!(!next.consume_dirty());
    assert_eq!(next, before);
}

#[test]
fn edit_emits_save_and_next_marks_completion() {
    init_logging();
    let (state, effects) = edit(
        AppState::new(FlowKind::Playbook),
        fields::JOB_TITLE,
        json!("Account Executive"),
    );
    assert!(matches!(effects.as_slice(), [Effect::SaveProgress(p)] if p.text(fields::JOB_TITLE) == "Account Executive"));
    assert!(state.view().can_advance);

    let (state, effects) = update(state, Msg::NextClicked);
    assert_eq!(state.progress().current_step, 2);
    assert!(state.progress().is_complete(1));
    assert_eq!(effects.len(), 1);
    assert!(!state.view().can_advance, "empty research must block step 2");
}

#[test]
fn next_is_idempotent_at_last_step() {
    init_logging();
    let mut progress = WizardProgress::new(FlowKind::CallReview);
    progress.set_field(fields::DAYS_BACK, json!(7));
    progress.set_field(fields::LIMIT, json!(5));
    progress.set_field(fields::OUTPUT, json!({ "calls": [], "total_found": 0 }));
    progress.set_complete(1, true);
    progress.set_complete(2, true);
    progress.current_step = 3;

    let (state, _) = update(AppState::new(FlowKind::CallReview), Msg::RestoreProgress(progress));
    assert!(state.view().is_last_step);

    let (once, effects_once) = update(state.clone(), Msg::NextClicked);
    let (twice, effects_twice) = update(once.clone(), Msg::NextClicked);
    assert!(effects_once.is_empty());
    assert!(effects_twice.is_empty());
    assert_eq!(once.progress(), state.progress());
    assert_eq!(twice.progress(), state.progress());
}

#[test]
fn back_is_always_allowed_and_noop_at_start() {
    init_logging();
    let state = playbook_at_step_two();
    let (state, effects) = update(state, Msg::BackClicked);
    assert_eq!(state.progress().current_step, 1);
    assert_eq!(effects.len(), 1);

    let (state, effects) = update(state, Msg::BackClicked);
    assert_eq!(state.progress().current_step, 1);
    assert!(effects.is_empty());
}

#[test]
fn start_over_cancelled_keeps_everything() {
    init_logging();
    let state = playbook_at_step_two();
    let (state, _) = edit(state, fields::RAW_DATA, json!("Notes from three discovery calls."));
    let before = state.progress().clone();

    let (state, effects) = update(state, Msg::StartOverClicked);
    assert!(effects.is_empty());
    assert_eq!(state.view().confirmation, Some(ConfirmationRequest::StartOver));

    let (state, effects) = update(state, Msg::ConfirmDismissed);
    assert!(effects.is_empty());
    assert_eq!(state.view().confirmation, None);
    assert_eq!(state.progress(), &before);
    assert_eq!(state.progress().current_step, 2);
}

#[test]
fn start_over_confirmed_resets_and_purges() {
    init_logging();
    let state = playbook_at_step_two();
    let (state, _) = update(state, Msg::StartOverClicked);
    let (state, effects) = update(state, Msg::ConfirmAccepted);

    assert_eq!(
        effects,
        vec![
            Effect::CancelOperation,
            Effect::ClearProgress {
                flow: FlowKind::Playbook
            }
        ]
    );
    assert_eq!(state.progress(), &WizardProgress::new(FlowKind::Playbook));
    assert_eq!(state.view().confirmation, None);
}

#[test]
fn confirm_without_request_is_ignored() {
    init_logging();
    let state = playbook_at_step_two();
    let (next, effects) = update(state.clone(), Msg::ConfirmAccepted);
    assert!(effects.is_empty());
    assert_eq!(next.progress(), state.progress());
}

#[test]
fn restore_normalizes_and_ignores_other_flows() {
    init_logging();
    let mut progress = WizardProgress::new(FlowKind::Playbook);
    progress.set_field(fields::JOB_TITLE, json!("SDR"));
    progress.current_step = 4;

    let (state, effects) = update(
        AppState::new(FlowKind::Playbook),
        Msg::RestoreProgress(progress.clone()),
    );
    // No completion flags: the step invariant pulls it back to 1.
    assert_eq!(state.progress().current_step, 1);
    assert_eq!(state.progress().text(fields::JOB_TITLE), "SDR");
    assert_eq!(effects.len(), 1);

    let (state, effects) = update(AppState::new(FlowKind::Cta), Msg::RestoreProgress(progress));
    assert!(effects.is_empty());
    assert_eq!(state.progress(), &WizardProgress::new(FlowKind::Cta));
}

#[test]
fn progress_round_trips_through_json() {
    init_logging();
    let state = playbook_at_step_two();
    let (state, _) = edit(state, fields::RAW_DATA, json!("Notes from three discovery calls."));
    let saved = state.progress().clone();

    let text = serde_json::to_string(&saved).unwrap();
    let loaded: WizardProgress = serde_json::from_str(&text).unwrap();
    let (restored, _) = update(AppState::new(FlowKind::Playbook), Msg::RestoreProgress(loaded));

    assert_eq!(restored.progress().current_step, saved.current_step);
    assert_eq!(restored.progress().fields, saved.fields);
    assert_eq!(restored.progress().completion_flags, saved.completion_flags);
}

#[test]
fn call_review_range_gate() {
    init_logging();
    let state = AppState::new(FlowKind::CallReview);
    let (state, _) = edit(state, fields::DAYS_BACK, json!("30"));
    let (state, _) = edit(state, fields::LIMIT, json!("500"));
    assert!(!state.view().can_advance);

    let (state, _) = edit(state, fields::LIMIT, json!("25"));
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.progress().current_step, 2);
    assert!(state.view().is_operation_step);
}
