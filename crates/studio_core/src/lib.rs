//! Studio core: pure wizard state machines, autosave and stage-animation
//! logic, domain records and view-model helpers. No IO happens here.
mod autosave;
mod effect;
mod flow;
mod history;
mod model;
mod msg;
mod preview;
mod progress;
mod shortcode;
mod stages;
mod state;
mod update;
mod validate;
mod view_model;
mod wizard;

pub use autosave::{AutosaveMachine, AutosaveStatus, ChangeOutcome};
pub use effect::Effect;
pub use flow::{call_review_markdown, fields, FlowKind};
pub use history::{RecentList, HISTORY_LIMIT};
pub use model::{
    CallRecord, CallSummary, ConversationDetail, CtaCache, CtaSource, CtaSourceKind,
    CtaSuggestion, Enriched, EnrichmentReport, FetchRecord, NoticeFlags, OperationId,
    OperationPayload, OperationRequest, PlacedContent,
};
pub use preview::{prepare_preview_content, MAX_PREVIEW_CONTENT};
pub use progress::WizardProgress;
pub use shortcode::{count_words, parse_shortcodes, strip_shortcodes, Shortcode};
pub use stages::{
    OperationStatus, StageDescriptor, StagePlan, StagePlanError, StagePosition, StageTracker,
};
pub use state::AppState;
pub use update::update;
pub use validate::{
    validate_length, validate_range, validate_required, validate_url, LengthBounds,
    ValidationError, CONTENT_BOUNDS, JOB_TITLE_BOUNDS, RAW_DATA_BOUNDS,
};
pub use view_model::{AppViewModel, FieldView};
pub use wizard::{ConfirmationRequest, Wizard};
pub use msg::Msg;
