use crate::{AutosaveStatus, ConfirmationRequest, FlowKind, OperationStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub flow: FlowKind,
    pub step: u32,
    pub total_steps: u32,
    pub step_title: &'static str,
    pub fields: Vec<FieldView>,
    pub can_advance: bool,
    pub is_last_step: bool,
    pub is_operation_step: bool,
    pub autosave: AutosaveStatus,
    pub operation: OperationStatus,
    pub confirmation: Option<ConfirmationRequest>,
    pub notice: Option<String>,
    pub output_preview: Option<String>,
    pub placement_count: usize,
    pub dirty: bool,
}
