use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use studio_core::{CallSummary, ConversationDetail, CtaSource, CtaSuggestion, PlacedContent};
use studio_logging::{studio_debug, studio_warn};

use crate::{ApiError, FailureKind};

/// Used when no backend URL is configured (local development).
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request limit. `None` leaves it to the transport.
    pub request_timeout: Option<Duration>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

/// Primary result of `fetch-calls`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallBatch {
    pub calls: Vec<CallSummary>,
    #[serde(default)]
    pub total_found: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackRating {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatFeedback {
    pub conversation_id: String,
    pub message_id: String,
    pub rating: FeedbackRating,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// The backend analysis/AI service.
#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    async fn fetch_calls(&self, days_back: u32, limit: u32) -> Result<CallBatch, ApiError>;

    async fn conversation_details(&self, call_id: &str) -> Result<ConversationDetail, ApiError>;

    async fn convert_to_markdown(&self, job_title: &str, raw_data: &str)
        -> Result<String, ApiError>;

    async fn start_conversation(&self) -> Result<String, ApiError>;

    async fn send_message(&self, conversation_id: &str, message: &str)
        -> Result<ChatReply, ApiError>;

    async fn send_feedback(&self, feedback: &ChatFeedback) -> Result<(), ApiError>;

    async fn generate_ctas(&self, source: &CtaSource) -> Result<Vec<CtaSuggestion>, ApiError>;

    async fn apply_placements(
        &self,
        source: &CtaSource,
        ctas: &[CtaSuggestion],
    ) -> Result<PlacedContent, ApiError>;
}

#[derive(Serialize)]
struct FetchCallsRequest {
    #[serde(rename = "daysBack")]
    days_back: u32,
    limit: u32,
}

#[derive(Deserialize)]
struct ConversationDetailsResponse {
    data: ConversationDetail,
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    job_title: &'a str,
    raw_data: &'a str,
}

#[derive(Deserialize)]
struct ConvertResponse {
    markdown_content: String,
}

#[derive(Deserialize)]
struct StartConversationResponse {
    conversation_id: String,
}

#[derive(Serialize)]
struct ChatMessageRequest<'a> {
    conversation_id: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct GenerateCtasResponse {
    #[serde(default)]
    ctas: Vec<RawCta>,
}

/// CTA exactly as the service sent it, before required-field checks.
#[derive(Deserialize)]
struct RawCta {
    id: Option<String>,
    headline: Option<String>,
    button_text: Option<String>,
    target_url: Option<String>,
    placement_hint: Option<String>,
}

#[derive(Serialize)]
struct ApplyPlacementsRequest<'a> {
    source_kind: &'static str,
    content: &'a str,
    ctas: &'a [CtaSuggestion],
}

#[derive(Deserialize)]
struct ApplyPlacementsResponse {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.settings.base_url.trim_end_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))?;
        studio_debug!("POST {} ({} bytes)", url, payload.len());
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, ApiError> {
        studio_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl BackendApi for ReqwestBackend {
    async fn fetch_calls(&self, days_back: u32, limit: u32) -> Result<CallBatch, ApiError> {
        self.post_json("fetch-calls", &FetchCallsRequest { days_back, limit })
            .await
    }

    async fn conversation_details(&self, call_id: &str) -> Result<ConversationDetail, ApiError> {
        let mut url = self.endpoint("calls")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidRequest, "base URL cannot hold paths"))?
            .push(call_id)
            .push("conversation-details");
        let response: ConversationDetailsResponse = self.get_json(url).await?;
        Ok(response.data)
    }

    async fn convert_to_markdown(
        &self,
        job_title: &str,
        raw_data: &str,
    ) -> Result<String, ApiError> {
        let response: ConvertResponse = self
            .post_json("convert-to-markdown", &ConvertRequest { job_title, raw_data })
            .await?;
        if response.markdown_content.trim().is_empty() {
            return Err(ApiError::new(
                FailureKind::InvalidResponse,
                "markdown_content is empty",
            ));
        }
        Ok(response.markdown_content)
    }

    async fn start_conversation(&self) -> Result<String, ApiError> {
        let response: StartConversationResponse = self
            .post_json("gong-chat/start-conversation", &serde_json::json!({}))
            .await?;
        Ok(response.conversation_id)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<ChatReply, ApiError> {
        self.post_json(
            "gong-chat/message",
            &ChatMessageRequest {
                conversation_id,
                message,
            },
        )
        .await
    }

    async fn send_feedback(&self, feedback: &ChatFeedback) -> Result<(), ApiError> {
        let _: serde_json::Value = self.post_json("gong-chat/feedback", feedback).await?;
        Ok(())
    }

    async fn generate_ctas(&self, source: &CtaSource) -> Result<Vec<CtaSuggestion>, ApiError> {
        let kind = source.kind().as_str();
        let path = format!("cta-generation/generate-from-{kind}");
        let mut body = serde_json::Map::new();
        body.insert(kind.to_string(), source.input().into());
        let response: GenerateCtasResponse = self.post_json(&path, &body).await?;
        validate_ctas(response.ctas)
    }

    async fn apply_placements(
        &self,
        source: &CtaSource,
        ctas: &[CtaSuggestion],
    ) -> Result<PlacedContent, ApiError> {
        let request = ApplyPlacementsRequest {
            source_kind: source.kind().as_str(),
            content: source.input(),
            ctas,
        };
        let response: ApplyPlacementsResponse = self
            .post_json("cta-generation/apply-placements", &request)
            .await?;
        match response.content {
            Some(content) if !content.trim().is_empty() => Ok(PlacedContent { content }),
            _ => Err(ApiError::new(
                FailureKind::InvalidResponse,
                "placement response has no content",
            )),
        }
    }
}

/// Every CTA needs an id, a headline and button text; an empty list is an
/// error too.
fn validate_ctas(raw: Vec<RawCta>) -> Result<Vec<CtaSuggestion>, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::new(
            FailureKind::InvalidResponse,
            "no CTAs were generated",
        ));
    }
    raw.into_iter()
        .enumerate()
        .map(|(index, cta)| {
            let missing = |field: &str| {
                ApiError::new(
                    FailureKind::InvalidResponse,
                    format!("CTA {} is missing {field}", index + 1),
                )
            };
            let required = |value: Option<String>, field: &str| {
                value
                    .filter(|v| !v.trim().is_empty())
                    .ok_or_else(|| missing(field))
            };
            Ok(CtaSuggestion {
                id: required(cta.id, "id")?,
                headline: required(cta.headline, "headline")?,
                button_text: required(cta.button_text, "button_text")?,
                target_url: cta.target_url,
                placement_hint: cta.placement_hint,
            })
        })
        .collect()
}

async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ApiError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    serde_json::from_slice(&body).map_err(|err| {
        studio_warn!("Unparseable response body ({} bytes): {}", body.len(), err);
        ApiError::new(FailureKind::InvalidResponse, err.to_string())
    })
}

fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.detail)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_default();
    ApiError::new(FailureKind::HttpStatus(status.as_u16()), message)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
