//! Studio engine: backend IO, local persistence and the timed halves of the
//! autosave and staged-operation state machines.
mod api;
mod autosave;
mod chat;
mod engine;
mod enrich;
mod export;
mod operation;
mod persist;
mod records;
mod store;
mod types;

pub use api::{
    ApiSettings, BackendApi, CallBatch, ChatFeedback, ChatReply, FeedbackRating, ReqwestBackend,
    DEFAULT_API_BASE_URL,
};
pub use autosave::{AutosaveController, AutosaveSettings};
pub use chat::{ChatMessage, ChatRole, ChatSession, PING_MESSAGE};
pub use engine::{EngineConfig, EngineHandle};
pub use enrich::{
    enrich_sequentially, fetch_enriched_calls, CallDetailSource, DetailSource, EnrichedCalls,
};
pub use export::{build_markdown_document, deterministic_filename, export_document};
pub use operation::{execute_request, run_staged, OperationSettings, StagedResult};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use records::{
    cache_ctas, cached_ctas, dismiss_notice, fetch_history, is_notice_dismissed, record_fetch,
};
pub use store::{
    keys, FileStore, KeyValueStore, MemoryStore, ProgressStore, StoreError, SCHEMA_VERSION,
};
pub use types::{ApiError, ChannelProgressSink, EngineEvent, FailureKind, ProgressSink};
