use serde_json::Value;

use crate::flow::fields;
use crate::preview::prepare_preview_content;
use crate::shortcode::{parse_shortcodes, strip_shortcodes};
use crate::view_model::{AppViewModel, FieldView};
use crate::{
    AutosaveStatus, CallRecord, ConfirmationRequest, FlowKind, OperationId, OperationStatus,
    Wizard, WizardProgress,
};

/// Everything one mounted flow shows: its progress plus transient UI state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    progress: WizardProgress,
    autosave: AutosaveStatus,
    operation: OperationStatus,
    operation_id: OperationId,
    confirmation: Option<ConfirmationRequest>,
    notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new(flow: FlowKind) -> Self {
        Self {
            progress: WizardProgress::new(flow),
            ..Self::default()
        }
    }

    pub fn flow(&self) -> FlowKind {
        self.progress.flow
    }

    pub fn wizard(&self) -> Wizard {
        Wizard::new(self.progress.flow)
    }

    pub fn progress(&self) -> &WizardProgress {
        &self.progress
    }

    pub fn operation(&self) -> &OperationStatus {
        &self.operation
    }

    pub fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    pub fn confirmation(&self) -> Option<ConfirmationRequest> {
        self.confirmation
    }

    pub fn view(&self) -> AppViewModel {
        let flow = self.flow();
        let wizard = self.wizard();
        let step = self.progress.current_step;
        let fields = flow
            .step_fields(step)
            .iter()
            .map(|name| FieldView {
                name: (*name).to_string(),
                value: display_value(self.progress.field(name)),
            })
            .collect();
        let placed = self.progress.text(fields::PLACED);

        AppViewModel {
            flow,
            step,
            total_steps: flow.total_steps(),
            step_title: flow.step_title(step),
            fields,
            can_advance: wizard.can_advance(&self.progress),
            is_last_step: wizard.is_last_step(&self.progress),
            is_operation_step: step == flow.operation_step(),
            autosave: self.autosave,
            operation: self.operation.clone(),
            confirmation: self.confirmation,
            notice: self.notice.clone(),
            output_preview: self.output_preview(),
            placement_count: parse_shortcodes(placed).len(),
            dirty: self.dirty,
        }
    }

    /// Returns and clears the "needs re-render" flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn progress_mut(&mut self) -> &mut WizardProgress {
        &mut self.progress
    }

    pub(crate) fn replace_progress(&mut self, progress: WizardProgress) {
        self.progress = progress;
    }

    pub(crate) fn set_autosave(&mut self, status: AutosaveStatus) {
        self.autosave = status;
    }

    pub(crate) fn set_operation(&mut self, status: OperationStatus) {
        self.operation = status;
    }

    /// Allocates the id for a new operation; older ids become stale.
    pub(crate) fn next_operation_id(&mut self) -> OperationId {
        self.operation_id += 1;
        self.operation_id
    }

    pub(crate) fn set_confirmation(&mut self, request: Option<ConfirmationRequest>) {
        self.confirmation = request;
    }

    pub(crate) fn set_notice(&mut self, notice: Option<String>) {
        self.notice = notice;
    }

    fn output_preview(&self) -> Option<String> {
        if self.progress.has_field(fields::PLACED) {
            let readable = strip_shortcodes(self.progress.text(fields::PLACED));
            return Some(prepare_preview_content(&readable));
        }
        let output = self.progress.field(fields::OUTPUT)?;
        let text = match (self.flow(), output) {
            (_, Value::String(markdown)) => markdown.clone(),
            (FlowKind::CallReview, value) => {
                let calls: Vec<CallRecord> =
                    serde_json::from_value(value.get("calls")?.clone()).ok()?;
                let total = value.get("total_found").and_then(Value::as_u64).unwrap_or(0);
                crate::call_review_markdown(&calls, total)
            }
            (_, value) => serde_json::to_string_pretty(value).ok()?,
        };
        Some(prepare_preview_content(&text))
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
