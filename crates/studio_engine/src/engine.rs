use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use studio_core::{FlowKind, OperationId, OperationRequest, WizardProgress};
use studio_logging::{studio_debug, studio_error, studio_info};
use tokio_util::sync::CancellationToken;

use crate::autosave::{AutosaveController, AutosaveSettings};
use crate::export::export_document;
use crate::operation::{execute_request, run_staged, OperationSettings};
use crate::records::cached_ctas;
use crate::store::{FileStore, ProgressStore};
use crate::{ApiError, ApiSettings, BackendApi, ChannelProgressSink, EngineEvent, ReqwestBackend};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiSettings,
    /// Holds the key-value store files.
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub autosave: AutosaveSettings,
    pub operation: OperationSettings,
}

enum EngineCommand {
    ArmInitialLoadGuard {
        flow: FlowKind,
    },
    SaveProgress(WizardProgress),
    ClearProgress {
        flow: FlowKind,
    },
    StartOperation {
        operation_id: OperationId,
        request: OperationRequest,
    },
    CancelOperation,
    Export {
        flow: FlowKind,
        title: String,
        body: String,
    },
    Shutdown,
}

/// Owns the tokio runtime thread. Commands go in over a channel; results
/// come back as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    store: Arc<ProgressStore>,
    thread: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, ApiError> {
        let api = Arc::new(ReqwestBackend::new(config.api.clone())?);
        let store = Arc::new(ProgressStore::new(Box::new(FileStore::new(
            config.data_dir.clone(),
        ))));
        Ok(Self::with_backend(config, api, store))
    }

    pub fn with_backend(
        config: EngineConfig,
        api: Arc<dyn BackendApi>,
        store: Arc<ProgressStore>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker_store = Arc::clone(&store);

        let thread = thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    studio_error!("Could not start the engine runtime: {}", err);
                    return;
                }
            };
            {
                let _enter = runtime.enter();
                let mut worker = Worker::new(config, api, worker_store, event_tx);
                while let Ok(command) = cmd_rx.recv() {
                    if !worker.handle(command) {
                        break;
                    }
                }
                worker.teardown();
            }
            runtime.shutdown_timeout(Duration::from_secs(1));
        });

        Self {
            cmd_tx,
            event_rx,
            store,
            thread: Some(thread),
        }
    }

    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    /// Loads saved progress for `flow`. When something was saved, the next
    /// change for that flow is treated as the restore echo and not written.
    ///
    /// A CTA flow without saved progress starts from the CTA cache instead;
    /// that restore is persisted like an edit.
    pub fn mount(&self, flow: FlowKind) -> Option<WizardProgress> {
        if let Some(progress) = self.store.load_progress(flow) {
            self.send(EngineCommand::ArmInitialLoadGuard { flow });
            return Some(progress);
        }
        if flow != FlowKind::Cta {
            return None;
        }
        let seeded = cached_ctas(&self.store)?.to_progress()?;
        studio_info!("Seeding CTA flow from the cached suggestions");
        Some(seeded)
    }

    pub fn save_progress(&self, progress: WizardProgress) {
        self.send(EngineCommand::SaveProgress(progress));
    }

    pub fn clear_progress(&self, flow: FlowKind) {
        self.send(EngineCommand::ClearProgress { flow });
    }

    pub fn start_operation(&self, operation_id: OperationId, request: OperationRequest) {
        self.send(EngineCommand::StartOperation {
            operation_id,
            request,
        });
    }

    pub fn cancel_operation(&self) {
        self.send(EngineCommand::CancelOperation);
    }

    pub fn export(&self, flow: FlowKind, title: String, body: String) {
        self.send(EngineCommand::Export { flow, title, body });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Cancels pending autosaves and operations and joins the runtime thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                studio_error!("Engine thread panicked");
            }
        }
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            studio_error!("Engine thread is gone; command dropped");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lives on the runtime thread, inside the runtime context.
struct Worker {
    config: EngineConfig,
    api: Arc<dyn BackendApi>,
    store: Arc<ProgressStore>,
    event_tx: mpsc::Sender<EngineEvent>,
    autosaves: HashMap<FlowKind, AutosaveController>,
    operation: Option<CancellationToken>,
}

impl Worker {
    fn new(
        config: EngineConfig,
        api: Arc<dyn BackendApi>,
        store: Arc<ProgressStore>,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        Self {
            config,
            api,
            store,
            event_tx,
            autosaves: HashMap::new(),
            operation: None,
        }
    }

    /// Returns false once the engine should stop.
    fn handle(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::ArmInitialLoadGuard { flow } => {
                self.autosave(flow).arm_initial_load_guard();
            }
            EngineCommand::SaveProgress(progress) => {
                self.autosave(progress.flow).notify_change(progress);
            }
            EngineCommand::ClearProgress { flow } => {
                if let Some(controller) = self.autosaves.get(&flow) {
                    controller.cancel();
                }
                self.store.clear_progress(flow);
                studio_info!("Cleared saved {} progress", flow);
            }
            EngineCommand::StartOperation {
                operation_id,
                request,
            } => self.start_operation(operation_id, request),
            EngineCommand::CancelOperation => {
                if let Some(token) = self.operation.take() {
                    token.cancel();
                }
            }
            EngineCommand::Export { flow, title, body } => {
                let result =
                    export_document(&self.config.export_dir, flow, &title, &body, Utc::now())
                        .map_err(|err| {
                            studio_error!("Export of {:?} failed: {}", title, err);
                            err.to_string()
                        });
                let _ = self.event_tx.send(EngineEvent::ExportCompleted { result });
            }
            EngineCommand::Shutdown => return false,
        }
        true
    }

    fn autosave(&mut self, flow: FlowKind) -> &AutosaveController {
        let store = &self.store;
        let settings = &self.config.autosave;
        let event_tx = &self.event_tx;
        self.autosaves.entry(flow).or_insert_with(|| {
            let controller = AutosaveController::new(Arc::clone(store), settings.clone());
            let mut status_rx = controller.subscribe();
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                while status_rx.changed().await.is_ok() {
                    let status = *status_rx.borrow_and_update();
                    if event_tx
                        .send(EngineEvent::AutosaveStatus { flow, status })
                        .is_err()
                    {
                        break;
                    }
                }
            });
            controller
        })
    }

    fn start_operation(&mut self, operation_id: OperationId, request: OperationRequest) {
        if let Some(previous) = self.operation.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.operation = Some(token.clone());

        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let settings = self.config.operation.clone();
        let event_tx = self.event_tx.clone();
        studio_debug!(
            "Starting operation {} ({} stages)",
            operation_id,
            request.stage_plan().stages().len()
        );
        tokio::spawn(async move {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let plan = request.stage_plan();
            let work = execute_request(api.as_ref(), store.as_ref(), request);
            let Some(finished) =
                run_staged(operation_id, plan, &settings, &token, &sink, work).await
            else {
                return;
            };
            let _ = event_tx.send(EngineEvent::OperationCompleted {
                operation_id,
                result: finished.outcome.map_err(|err| err.user_message()),
            });
        });
    }

    fn teardown(&mut self) {
        if let Some(token) = self.operation.take() {
            token.cancel();
        }
        for controller in self.autosaves.values() {
            controller.cancel();
        }
        self.autosaves.clear();
    }
}
