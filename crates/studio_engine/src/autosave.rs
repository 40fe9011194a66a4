use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use studio_core::{AutosaveMachine, AutosaveStatus, ChangeOutcome, WizardProgress};
use studio_logging::{studio_debug, studio_warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::store::ProgressStore;

#[derive(Debug, Clone)]
pub struct AutosaveSettings {
    /// Silence required after the last change before it is written.
    pub quiet_period: Duration,
    /// How long `Saved` stays visible before falling back to `Idle`.
    pub display_interval: Duration,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(1000),
            display_interval: Duration::from_millis(2000),
        }
    }
}

struct Shared {
    store: Arc<ProgressStore>,
    machine: Mutex<AutosaveMachine>,
    status: watch::Sender<AutosaveStatus>,
}

impl Shared {
    fn publish(&self, status: AutosaveStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// Debounced writer for one flow's progress.
///
/// Must be driven from inside a tokio runtime: each change spawns the timer
/// task that eventually commits it.
pub struct AutosaveController {
    settings: AutosaveSettings,
    shared: Arc<Shared>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutosaveController {
    pub fn new(store: Arc<ProgressStore>, settings: AutosaveSettings) -> Self {
        let (status, _) = watch::channel(AutosaveStatus::Idle);
        Self {
            settings,
            shared: Arc::new(Shared {
                store,
                machine: Mutex::new(AutosaveMachine::new()),
                status,
            }),
            pending: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.shared.status.subscribe()
    }

    pub fn status(&self) -> AutosaveStatus {
        *self.shared.status.borrow()
    }

    pub fn arm_initial_load_guard(&self) {
        lock(&self.shared.machine).arm_initial_load_guard();
    }

    /// Schedules `progress` to be written once changes go quiet. Any commit
    /// still waiting from an earlier change is dropped.
    pub fn notify_change(&self, progress: WizardProgress) {
        let generation = match lock(&self.shared.machine).on_change() {
            ChangeOutcome::Suppressed => {
                studio_debug!("Skipping autosave for restored {} progress", progress.flow);
                return;
            }
            ChangeOutcome::Scheduled { generation } => generation,
        };
        self.shared.publish(AutosaveStatus::Saving);

        let shared = Arc::clone(&self.shared);
        let settings = self.settings.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(settings.quiet_period).await;
            let committed = {
                let mut machine = lock(&shared.machine);
                if !machine.is_current(generation) {
                    return;
                }
                let mut progress = progress;
                progress.last_saved_at = Utc::now();
                let ok = shared.store.save_progress(&progress);
                if !ok {
                    studio_warn!("Autosave of {} progress failed", progress.flow);
                }
                machine.on_commit(generation, ok) && ok
            };
            if !committed {
                shared.publish(AutosaveStatus::Idle);
                return;
            }
            shared.publish(AutosaveStatus::Saved);

            tokio::time::sleep(settings.display_interval).await;
            if lock(&shared.machine).on_display_elapsed(generation) {
                shared.publish(AutosaveStatus::Idle);
            }
        });

        if let Some(previous) = lock(&self.pending).replace(task) {
            previous.abort();
        }
    }

    /// Drops any pending commit and returns to `Idle`.
    pub fn cancel(&self) {
        if let Some(task) = lock(&self.pending).take() {
            task.abort();
        }
        lock(&self.shared.machine).cancel();
        self.shared.publish(AutosaveStatus::Idle);
    }
}

impl Drop for AutosaveController {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.pending).take() {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
