/// Indicator shown next to a form while its progress is being persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutosaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Swallowed by the initial-load guard.
    Suppressed,
    /// A commit should be (re)armed for this generation.
    Scheduled { generation: u64 },
}

/// Timer-free half of the debounced autosave: `Idle -> Saving -> Saved -> Idle`.
///
/// Every change bumps a generation counter. A commit or display timer only
/// takes effect when it carries the current generation, so a superseded
/// timer can never write or flip the status.
#[derive(Debug, Clone, Default)]
pub struct AutosaveMachine {
    status: AutosaveStatus,
    generation: u64,
    skip_next_change: bool,
}

impl AutosaveMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AutosaveStatus {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Suppress the one change produced by restoring saved state on mount.
    pub fn arm_initial_load_guard(&mut self) {
        self.skip_next_change = true;
    }

    pub fn on_change(&mut self) -> ChangeOutcome {
        if std::mem::take(&mut self.skip_next_change) {
            return ChangeOutcome::Suppressed;
        }
        self.generation += 1;
        self.status = AutosaveStatus::Saving;
        ChangeOutcome::Scheduled {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.status == AutosaveStatus::Saving
    }

    /// Records the outcome of a commit. Returns false for stale generations.
    pub fn on_commit(&mut self, generation: u64, succeeded: bool) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.status = if succeeded {
            AutosaveStatus::Saved
        } else {
            AutosaveStatus::Idle
        };
        true
    }

    /// The cosmetic "saved" indicator has been shown long enough.
    pub fn on_display_elapsed(&mut self, generation: u64) -> bool {
        if self.generation != generation || self.status != AutosaveStatus::Saved {
            return false;
        }
        self.status = AutosaveStatus::Idle;
        true
    }

    /// Invalidates any pending commit, e.g. on teardown or reset.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.skip_next_change = false;
        self.status = AutosaveStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_swallows_exactly_one_change() {
        let mut machine = AutosaveMachine::new();
        machine.arm_initial_load_guard();
        assert_eq!(machine.on_change(), ChangeOutcome::Suppressed);
        assert_eq!(machine.status(), AutosaveStatus::Idle);
        assert_eq!(
            machine.on_change(),
            ChangeOutcome::Scheduled { generation: 1 }
        );
        assert_eq!(machine.status(), AutosaveStatus::Saving);
    }

    #[test]
    fn stale_commit_is_ignored() {
        let mut machine = AutosaveMachine::new();
        let ChangeOutcome::Scheduled { generation: first } = machine.on_change() else {
            panic!("expected scheduled");
        };
        let ChangeOutcome::Scheduled { generation: second } = machine.on_change() else {
            panic!("expected scheduled");
        };
        assert!(!machine.on_commit(first, true));
        assert_eq!(machine.status(), AutosaveStatus::Saving);
        assert!(machine.on_commit(second, true));
        assert_eq!(machine.status(), AutosaveStatus::Saved);
        assert!(machine.on_display_elapsed(second));
        assert_eq!(machine.status(), AutosaveStatus::Idle);
    }

    #[test]
    fn failed_commit_goes_straight_to_idle() {
        let mut machine = AutosaveMachine::new();
        machine.on_change();
        assert!(machine.on_commit(machine.generation(), false));
        assert_eq!(machine.status(), AutosaveStatus::Idle);
        assert!(!machine.on_display_elapsed(machine.generation()));
    }

    #[test]
    fn change_while_saved_restarts_cycle() {
        let mut machine = AutosaveMachine::new();
        machine.on_change();
        let generation = machine.generation();
        machine.on_commit(generation, true);
        machine.on_change();
        // The display timer of the previous cycle must not clear the new one.
        assert!(!machine.on_display_elapsed(generation));
        assert_eq!(machine.status(), AutosaveStatus::Saving);
    }
}
