use crate::{FlowKind, OperationId, OperationRequest, WizardProgress};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Hand the latest progress to the debounced autosave.
    SaveProgress(WizardProgress),
    /// Cancel any pending autosave and delete the stored progress.
    ClearProgress { flow: FlowKind },
    /// Start a staged request, superseding any operation still running.
    StartOperation {
        operation_id: OperationId,
        request: OperationRequest,
    },
    CancelOperation,
    /// Write the flow's result as a markdown document.
    ExportDocument {
        flow: FlowKind,
        title: String,
        body: String,
    },
}
