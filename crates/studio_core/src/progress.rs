use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FlowKind;

/// In-progress wizard state as persisted by the progress store.
///
/// `current_step` is 1-based and never exceeds `last_completed_step() + 1`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WizardProgress {
    pub flow: FlowKind,
    pub current_step: u32,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub completion_flags: BTreeMap<u32, bool>,
    #[serde(default)]
    pub last_saved_at: DateTime<Utc>,
}

impl WizardProgress {
    pub fn new(flow: FlowKind) -> Self {
        Self {
            flow,
            current_step: 1,
            ..Self::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String value of a field, or `""` when absent or not a string.
    pub fn text(&self, name: &str) -> &str {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Numeric value of a field. Text inputs holding digits count as numbers.
    pub fn number(&self, name: &str) -> Option<u64> {
        match self.fields.get(name)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        match self.fields.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn is_complete(&self, step: u32) -> bool {
        self.completion_flags.get(&step).copied().unwrap_or(false)
    }

    pub fn set_complete(&mut self, step: u32, complete: bool) {
        if complete {
            self.completion_flags.insert(step, true);
        } else {
            self.completion_flags.remove(&step);
        }
    }

    /// Drops the completion flag of `from` and every later step.
    pub fn clear_completion_from(&mut self, from: u32) {
        self.completion_flags.retain(|step, _| *step < from);
    }

    /// Highest step `n` such that steps `1..=n` are all complete (0 if none).
    pub fn last_completed_step(&self) -> u32 {
        let mut step = 0;
        while self.is_complete(step + 1) {
            step += 1;
        }
        step
    }

    /// Re-establishes the step invariant after loading untrusted data.
    pub fn normalize(&mut self) {
        let total = self.flow.total_steps();
        let reachable = (self.last_completed_step() + 1).min(total);
        self.current_step = self.current_step.clamp(1, reachable);
        self.completion_flags.retain(|step, done| *done && *step <= total);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::WizardProgress;
    use crate::FlowKind;

    #[test]
    fn last_completed_step_stops_at_first_gap() {
        let mut progress = WizardProgress::new(FlowKind::Playbook);
        progress.set_complete(1, true);
        progress.set_complete(3, true);
        assert_eq!(progress.last_completed_step(), 1);
    }

    #[test]
    fn normalize_pulls_step_back_to_reachable() {
        let mut progress = WizardProgress::new(FlowKind::Playbook);
        progress.current_step = 4;
        progress.set_complete(1, true);
        progress.normalize();
        assert_eq!(progress.current_step, 2);

        progress.current_step = 0;
        progress.normalize();
        assert_eq!(progress.current_step, 1);
    }

    #[test]
    fn numbers_accept_text_input() {
        let mut progress = WizardProgress::new(FlowKind::CallReview);
        progress.set_field("days_back", json!(" 14 "));
        progress.set_field("limit", json!(25));
        progress.set_field("bad", json!("fourteen"));
        assert_eq!(progress.number("days_back"), Some(14));
        assert_eq!(progress.number("limit"), Some(25));
        assert_eq!(progress.number("bad"), None);
    }
}
