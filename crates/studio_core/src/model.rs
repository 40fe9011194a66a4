use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::fields;
use crate::stages::{StageDescriptor, StagePlan};
use crate::{FlowKind, WizardProgress};

pub type OperationId = u64;

/// One interaction record as returned by `fetch-calls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub started: Option<String>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Opaque conversation detail blob; the backend owns its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationDetail(pub Value);

/// A primary record plus optional secondary detail.
///
/// The detail is either the full payload of a successful follow-up request or
/// absent; it is never partially merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enriched<P, D> {
    pub item: P,
    pub detail: Option<D>,
}

impl<P, D> Enriched<P, D> {
    pub fn bare(item: P) -> Self {
        Self { item, detail: None }
    }

    pub fn with_detail(item: P, detail: D) -> Self {
        Self {
            item,
            detail: Some(detail),
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.detail.is_some()
    }
}

pub type CallRecord = Enriched<CallSummary, ConversationDetail>;

/// Output of an enrichment pass, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentReport<P, D> {
    pub items: Vec<Enriched<P, D>>,
}

impl<P, D> EnrichmentReport<P, D> {
    pub fn returned(&self) -> usize {
        self.items.len()
    }

    pub fn enriched(&self) -> usize {
        self.items.iter().filter(|item| item.is_enriched()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtaSourceKind {
    Url,
    Text,
    Markdown,
}

impl CtaSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CtaSourceKind::Url => "url",
            CtaSourceKind::Text => "text",
            CtaSourceKind::Markdown => "markdown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "url" => Some(CtaSourceKind::Url),
            "text" => Some(CtaSourceKind::Text),
            "markdown" | "md" => Some(CtaSourceKind::Markdown),
            _ => None,
        }
    }
}

impl fmt::Display for CtaSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content the CTA generator analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "input", rename_all = "lowercase")]
pub enum CtaSource {
    Url(String),
    Text(String),
    Markdown(String),
}

impl CtaSource {
    pub fn new(kind: CtaSourceKind, input: impl Into<String>) -> Self {
        let input = input.into();
        match kind {
            CtaSourceKind::Url => CtaSource::Url(input),
            CtaSourceKind::Text => CtaSource::Text(input),
            CtaSourceKind::Markdown => CtaSource::Markdown(input),
        }
    }

    pub fn kind(&self) -> CtaSourceKind {
        match self {
            CtaSource::Url(_) => CtaSourceKind::Url,
            CtaSource::Text(_) => CtaSourceKind::Text,
            CtaSource::Markdown(_) => CtaSourceKind::Markdown,
        }
    }

    pub fn input(&self) -> &str {
        match self {
            CtaSource::Url(s) | CtaSource::Text(s) | CtaSource::Markdown(s) => s,
        }
    }
}

/// A generated call-to-action that passed response validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtaSuggestion {
    pub id: String,
    pub headline: String,
    pub button_text: String,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub placement_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedContent {
    pub content: String,
}

/// One entry in the persisted fetch history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRecord {
    pub fetched_at: DateTime<Utc>,
    pub days_back: u32,
    pub limit: u32,
    pub returned: usize,
    pub enriched: usize,
    pub total_found: u64,
}

impl FetchRecord {
    pub fn same_query(&self, other: &FetchRecord) -> bool {
        self.days_back == other.days_back && self.limit == other.limit
    }
}

/// Last CTA inputs and generated suggestions, restored on mount.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CtaCache {
    #[serde(default)]
    pub last_source: Option<CtaSource>,
    #[serde(default)]
    pub ctas: Vec<CtaSuggestion>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CtaCache {
    /// Fresh CTA progress seeded from the cache: the last source, and when
    /// suggestions were cached, the generation step with them as output.
    pub fn to_progress(&self) -> Option<WizardProgress> {
        let source = self.last_source.as_ref()?;
        let mut progress = WizardProgress::new(FlowKind::Cta);
        progress.set_field(fields::SOURCE_KIND, Value::from(source.kind().as_str()));
        progress.set_field(fields::SOURCE_INPUT, Value::from(source.input()));
        if !self.ctas.is_empty() {
            let ctas = serde_json::to_value(&self.ctas).ok()?;
            progress.set_field(fields::OUTPUT, ctas);
            let operation_step = FlowKind::Cta.operation_step();
            for step in 1..operation_step {
                progress.set_complete(step, true);
            }
            progress.current_step = operation_step;
        }
        Some(progress)
    }
}

/// Ids of one-time notices the user has dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoticeFlags {
    #[serde(default)]
    dismissed: BTreeSet<String>,
}

impl NoticeFlags {
    pub fn dismiss(&mut self, notice_id: impl Into<String>) -> bool {
        self.dismissed.insert(notice_id.into())
    }

    pub fn is_dismissed(&self, notice_id: &str) -> bool {
        self.dismissed.contains(notice_id)
    }
}

/// A long-running backend request issued by a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    FetchCalls { days_back: u32, limit: u32 },
    GeneratePlaybook { job_title: String, raw_data: String },
    GenerateCtas { source: CtaSource },
    ApplyPlacements {
        source: CtaSource,
        ctas: Vec<CtaSuggestion>,
    },
}

impl OperationRequest {
    /// The cosmetic stage sequence shown while this request is in flight.
    pub fn stage_plan(&self) -> StagePlan {
        let stages = match self {
            OperationRequest::FetchCalls { .. } => vec![
                StageDescriptor::new("Connecting to call library", 0, 15, 1_500),
                StageDescriptor::new("Fetching recent calls", 15, 50, 3_000),
                StageDescriptor::new("Loading conversation details", 50, 90, 8_000),
            ],
            OperationRequest::GeneratePlaybook { .. } => vec![
                StageDescriptor::new("Analyzing job requirements", 0, 20, 2_500),
                StageDescriptor::new("Researching industry context", 20, 45, 4_000),
                StageDescriptor::new("Drafting playbook sections", 45, 75, 6_000),
                StageDescriptor::new("Formatting markdown", 75, 95, 3_000),
            ],
            OperationRequest::GenerateCtas { .. } => vec![
                StageDescriptor::new("Reading source content", 0, 25, 2_000),
                StageDescriptor::new("Identifying placement opportunities", 25, 60, 4_000),
                StageDescriptor::new("Writing calls to action", 60, 92, 5_000),
            ],
            OperationRequest::ApplyPlacements { .. } => vec![
                StageDescriptor::new("Matching CTAs to sections", 0, 50, 1_500),
                StageDescriptor::new("Inserting placements", 50, 90, 2_000),
            ],
        };
        StagePlan::from_builtin(stages)
    }
}

/// Successful result of an [`OperationRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPayload {
    Calls {
        calls: Vec<CallRecord>,
        total_found: u64,
    },
    Playbook {
        markdown: String,
    },
    Ctas {
        ctas: Vec<CtaSuggestion>,
    },
    Placed(PlacedContent),
}
