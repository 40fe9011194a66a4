use crate::{FlowKind, WizardProgress};

/// A destructive action waiting for explicit user confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationRequest {
    /// Clear every field and return to step 1.
    StartOver,
    /// Drop the derived output of the current flow.
    ClearResults,
}

impl ConfirmationRequest {
    pub fn prompt(self) -> &'static str {
        match self {
            ConfirmationRequest::StartOver => {
                "Start over? All entered data and results will be cleared."
            }
            ConfirmationRequest::ClearResults => "Clear the generated results?",
        }
    }
}

/// Linear step navigation over a flow's [`WizardProgress`].
///
/// Invalid requests are ignored: each method reports whether anything moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wizard {
    flow: FlowKind,
}

impl Wizard {
    pub fn new(flow: FlowKind) -> Self {
        Self { flow }
    }

    pub fn flow(&self) -> FlowKind {
        self.flow
    }

    pub fn can_advance(&self, progress: &WizardProgress) -> bool {
        self.flow.can_advance(progress.current_step, progress)
    }

    pub fn is_last_step(&self, progress: &WizardProgress) -> bool {
        progress.current_step >= self.flow.total_steps()
    }

    pub fn next(&self, progress: &mut WizardProgress) -> bool {
        if self.is_last_step(progress) || !self.can_advance(progress) {
            return false;
        }
        progress.set_complete(progress.current_step, true);
        progress.current_step += 1;
        true
    }

    pub fn previous(&self, progress: &mut WizardProgress) -> bool {
        if progress.current_step <= 1 {
            return false;
        }
        progress.current_step -= 1;
        true
    }

    /// Applies a user edit on the current step.
    ///
    /// Completion of this step and every later one is revoked, and edits made
    /// before the generation step discard the derived output, which no longer
    /// matches its inputs.
    pub fn edit(&self, progress: &mut WizardProgress, name: &str, value: serde_json::Value) {
        progress.set_field(name, value);
        progress.clear_completion_from(progress.current_step);
        if progress.current_step < self.flow.operation_step() {
            for derived in self.flow.derived_fields() {
                progress.remove_field(derived);
            }
        }
    }

    /// Drops the operation output and pulls the step back to the generation
    /// step if the user had moved past it.
    pub fn clear_results(&self, progress: &mut WizardProgress) -> bool {
        let mut changed = false;
        for derived in self.flow.derived_fields() {
            changed |= progress.remove_field(derived).is_some();
        }
        let operation_step = self.flow.operation_step();
        progress.clear_completion_from(operation_step);
        if progress.current_step > operation_step {
            progress.current_step = operation_step;
            changed = true;
        }
        changed
    }

    /// Fresh progress at step 1. Callers purge the stored copy.
    pub fn reset(&self) -> WizardProgress {
        WizardProgress::new(self.flow)
    }
}
