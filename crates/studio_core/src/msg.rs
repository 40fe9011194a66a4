use serde_json::Value;

use crate::{AutosaveStatus, OperationId, OperationPayload, WizardProgress};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Previously saved progress loaded on mount.
    RestoreProgress(WizardProgress),
    /// User edited a field on the current step.
    FieldEdited { name: String, value: Value },
    NextClicked,
    BackClicked,
    /// User started the current step's generation request.
    RunClicked,
    /// Terminal action on the last step.
    FinishClicked,
    StartOverClicked,
    ClearResultsClicked,
    ConfirmAccepted,
    ConfirmDismissed,
    /// Autosave indicator changed in the engine.
    AutosaveStatusChanged(AutosaveStatus),
    /// Cosmetic stage animation advanced.
    OperationProgress {
        operation_id: OperationId,
        stage: usize,
        label: String,
        percent: u8,
    },
    OperationSucceeded {
        operation_id: OperationId,
        payload: OperationPayload,
    },
    OperationFailed {
        operation_id: OperationId,
        message: String,
    },
    ExportCompleted { path: String },
    ExportFailed { message: String },
    /// UI/render tick to coalesce rendering.
    Tick,
    NoOp,
}
