use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{CallRecord, CtaSource, CtaSourceKind, CtaSuggestion, OperationRequest};
use crate::validate::{
    validate_length, validate_range, validate_required, validate_url, ValidationError,
    CONTENT_BOUNDS, JOB_TITLE_BOUNDS, RAW_DATA_BOUNDS,
};
use crate::WizardProgress;

/// Field names shared by the flows and their persisted progress.
pub mod fields {
    pub const JOB_TITLE: &str = "job_title";
    pub const RAW_DATA: &str = "raw_data";
    pub const DAYS_BACK: &str = "days_back";
    pub const LIMIT: &str = "limit";
    pub const SOURCE_KIND: &str = "source_kind";
    pub const SOURCE_INPUT: &str = "source_input";
    /// Derived output of the flow's generation step.
    pub const OUTPUT: &str = "output";
    /// Content returned by the CTA placement step.
    pub const PLACED: &str = "placed_content";
}

pub const MAX_DAYS_BACK: u64 = 365;
pub const MAX_CALL_LIMIT: u64 = 100;

/// The multi-step workflows of the studio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    CallReview,
    #[default]
    Playbook,
    Cta,
}

impl FlowKind {
    pub const ALL: [FlowKind; 3] = [FlowKind::CallReview, FlowKind::Playbook, FlowKind::Cta];

    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::CallReview => "call_review",
            FlowKind::Playbook => "playbook",
            FlowKind::Cta => "cta",
        }
    }

    pub fn storage_key(self) -> &'static str {
        match self {
            FlowKind::CallReview => "progress.call_review",
            FlowKind::Playbook => "progress.playbook",
            FlowKind::Cta => "progress.cta",
        }
    }

    pub fn total_steps(self) -> u32 {
        match self {
            FlowKind::CallReview => 3,
            FlowKind::Playbook | FlowKind::Cta => 4,
        }
    }

    /// The step whose gate is "the async operation completed".
    pub fn operation_step(self) -> u32 {
        match self {
            FlowKind::CallReview => 2,
            FlowKind::Playbook | FlowKind::Cta => 3,
        }
    }

    pub fn step_title(self, step: u32) -> &'static str {
        match (self, step) {
            (FlowKind::CallReview, 1) => "Choose date range",
            (FlowKind::CallReview, 2) => "Fetch calls",
            (FlowKind::CallReview, 3) => "Review insights",
            (FlowKind::Playbook, 1) => "Job title",
            (FlowKind::Playbook, 2) => "Paste research",
            (FlowKind::Playbook, 3) => "Generate playbook",
            (FlowKind::Playbook, 4) => "Review playbook",
            (FlowKind::Cta, 1) => "Content source",
            (FlowKind::Cta, 2) => "Provide content",
            (FlowKind::Cta, 3) => "Generate CTAs",
            (FlowKind::Cta, 4) => "Place CTAs",
            _ => "",
        }
    }

    /// Fields edited on `step`.
    pub fn step_fields(self, step: u32) -> &'static [&'static str] {
        match (self, step) {
            (FlowKind::CallReview, 1) => &[fields::DAYS_BACK, fields::LIMIT],
            (FlowKind::Playbook, 1) => &[fields::JOB_TITLE],
            (FlowKind::Playbook, 2) => &[fields::RAW_DATA],
            (FlowKind::Cta, 1) => &[fields::SOURCE_KIND],
            (FlowKind::Cta, 2) => &[fields::SOURCE_INPUT],
            _ => &[],
        }
    }

    /// Fields produced by operations rather than typed by the user.
    pub fn derived_fields(self) -> &'static [&'static str] {
        match self {
            FlowKind::Cta => &[fields::OUTPUT, fields::PLACED],
            FlowKind::CallReview | FlowKind::Playbook => &[fields::OUTPUT],
        }
    }

    /// Pure forward-navigation gate for `step`. The last step never advances.
    pub fn can_advance(self, step: u32, progress: &WizardProgress) -> bool {
        if step == 0 || step >= self.total_steps() {
            return false;
        }
        self.check_step(step, progress).is_ok()
    }

    /// Why `step` cannot be left yet, if anything blocks it.
    pub fn check_step(self, step: u32, progress: &WizardProgress) -> Result<(), ValidationError> {
        if step == self.operation_step() {
            return if progress.has_field(fields::OUTPUT) {
                Ok(())
            } else {
                Err(ValidationError::NotReady("run the generation step first"))
            };
        }
        match (self, step) {
            (FlowKind::CallReview, 1) => call_range(progress).map(|_| ()),
            (FlowKind::Playbook, 1) => {
                validate_length(fields::JOB_TITLE, progress.text(fields::JOB_TITLE), JOB_TITLE_BOUNDS)
                    .map(|_| ())
            }
            (FlowKind::Playbook, 2) => {
                validate_length(fields::RAW_DATA, progress.text(fields::RAW_DATA), RAW_DATA_BOUNDS)
                    .map(|_| ())
            }
            (FlowKind::Cta, 1) => source_kind(progress).map(|_| ()),
            (FlowKind::Cta, 2) => cta_source(progress).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Builds the request for the flow's generation step.
    pub fn operation_request(
        self,
        progress: &WizardProgress,
    ) -> Result<OperationRequest, ValidationError> {
        match self {
            FlowKind::CallReview => {
                let (days_back, limit) = call_range(progress)?;
                Ok(OperationRequest::FetchCalls { days_back, limit })
            }
            FlowKind::Playbook => {
                let job_title = validate_length(
                    fields::JOB_TITLE,
                    progress.text(fields::JOB_TITLE),
                    JOB_TITLE_BOUNDS,
                )?;
                let raw_data = validate_length(
                    fields::RAW_DATA,
                    progress.text(fields::RAW_DATA),
                    RAW_DATA_BOUNDS,
                )?;
                Ok(OperationRequest::GeneratePlaybook {
                    job_title: job_title.to_string(),
                    raw_data: raw_data.to_string(),
                })
            }
            FlowKind::Cta => Ok(OperationRequest::GenerateCtas {
                source: cta_source(progress)?,
            }),
        }
    }

    /// The CTA flow's terminal request: place the generated CTAs.
    pub fn placement_request(
        self,
        progress: &WizardProgress,
    ) -> Result<OperationRequest, ValidationError> {
        if self != FlowKind::Cta {
            return Err(ValidationError::NotReady("this flow has no placement step"));
        }
        let source = cta_source(progress)?;
        let ctas: Vec<CtaSuggestion> = progress
            .field(fields::OUTPUT)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .filter(|ctas: &Vec<CtaSuggestion>| !ctas.is_empty())
            .ok_or(ValidationError::NotReady("generate CTAs before placing them"))?;
        Ok(OperationRequest::ApplyPlacements { source, ctas })
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "call_review" | "calls" => Ok(FlowKind::CallReview),
            "playbook" => Ok(FlowKind::Playbook),
            "cta" => Ok(FlowKind::Cta),
            other => Err(format!("unknown flow '{other}'")),
        }
    }
}

fn call_range(progress: &WizardProgress) -> Result<(u32, u32), ValidationError> {
    let days_back = validate_range(
        fields::DAYS_BACK,
        progress.number(fields::DAYS_BACK),
        1,
        MAX_DAYS_BACK,
    )?;
    let limit = validate_range(fields::LIMIT, progress.number(fields::LIMIT), 1, MAX_CALL_LIMIT)?;
    // Both bounds fit in u32.
    Ok((days_back as u32, limit as u32))
}

fn source_kind(progress: &WizardProgress) -> Result<CtaSourceKind, ValidationError> {
    let raw = validate_required(fields::SOURCE_KIND, progress.text(fields::SOURCE_KIND))?;
    CtaSourceKind::parse(raw).ok_or_else(|| ValidationError::UnknownSource(raw.to_string()))
}

fn cta_source(progress: &WizardProgress) -> Result<CtaSource, ValidationError> {
    let kind = source_kind(progress)?;
    let input = progress.text(fields::SOURCE_INPUT);
    match kind {
        CtaSourceKind::Url => Ok(CtaSource::Url(validate_url(input)?.to_string())),
        CtaSourceKind::Text | CtaSourceKind::Markdown => {
            let content = validate_length(fields::SOURCE_INPUT, input, CONTENT_BOUNDS)?;
            Ok(CtaSource::new(kind, content))
        }
    }
}

/// Markdown summary of a fetched call list, used by the call-review export.
pub fn call_review_markdown(calls: &[CallRecord], total_found: u64) -> String {
    let mut out = format!(
        "# Call review\n\n{} of {} calls returned.\n\n| # | Call | Started | Duration | Details |\n|---|---|---|---|---|\n",
        calls.len(),
        total_found
    );
    for (index, call) in calls.iter().enumerate() {
        let summary = &call.item;
        let title = summary.title.as_deref().unwrap_or(summary.id.as_str());
        let started = summary.started.as_deref().unwrap_or("-");
        let duration = summary
            .duration
            .map(|secs| format!("{}m{:02}s", secs / 60, secs % 60))
            .unwrap_or_else(|| "-".to_string());
        let details = if call.is_enriched() { "yes" } else { "no" };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            index + 1,
            title.replace('|', "\\|"),
            started,
            duration,
            details
        ));
    }
    out
}
