use std::sync::Arc;

use serde::{Deserialize, Serialize};
use studio_logging::{studio_debug, studio_info};

use crate::api::{ChatFeedback, FeedbackRating};
use crate::store::{keys, ProgressStore};
use crate::{ApiError, BackendApi, FailureKind};

/// Reserved message used to probe whether a stored conversation is alive.
///
/// The backend is expected to answer it without recording a turn; no
/// stronger liveness contract exists yet.
pub const PING_MESSAGE: &str = "__ping__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Conversational Q&A over the call library.
pub struct ChatSession {
    api: Arc<dyn BackendApi>,
    store: Arc<ProgressStore>,
    conversation_id: Option<String>,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(api: Arc<dyn BackendApi>, store: Arc<ProgressStore>) -> Self {
        Self {
            api,
            store,
            conversation_id: None,
            transcript: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Reuses the persisted conversation if it still answers a ping,
    /// otherwise starts (and persists) a new one.
    pub async fn resume_or_start(&mut self) -> Result<String, ApiError> {
        if let Some(stored) = self.store.load::<String>(keys::CHAT_CONVERSATION) {
            match self.api.send_message(&stored, PING_MESSAGE).await {
                Ok(_) => {
                    studio_debug!("Resumed conversation {}", stored);
                    self.conversation_id = Some(stored.clone());
                    return Ok(stored);
                }
                Err(err) => {
                    studio_info!("Stored conversation {} is gone ({}); starting anew", stored, err);
                }
            }
        }
        let fresh = self.api.start_conversation().await?;
        self.store.save(keys::CHAT_CONVERSATION, &fresh);
        self.transcript.clear();
        self.conversation_id = Some(fresh.clone());
        Ok(fresh)
    }

    /// Sends a user question and records both turns.
    pub async fn send(&mut self, message: &str) -> Result<&ChatMessage, ApiError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::new(
                FailureKind::InvalidRequest,
                "Please enter a question.",
            ));
        }
        let conversation_id = match &self.conversation_id {
            Some(id) => id.clone(),
            None => self.resume_or_start().await?,
        };
        let reply = self.api.send_message(&conversation_id, message).await?;
        self.transcript.push(ChatMessage {
            role: ChatRole::User,
            content: message.to_string(),
            message_id: None,
        });
        self.transcript.push(ChatMessage {
            role: ChatRole::Assistant,
            content: reply.response,
            message_id: reply.message_id,
        });
        Ok(&self.transcript[self.transcript.len() - 1])
    }

    pub async fn feedback(
        &self,
        message_id: &str,
        rating: FeedbackRating,
        comment: Option<String>,
    ) -> Result<(), ApiError> {
        let Some(conversation_id) = self.conversation_id.clone() else {
            return Err(ApiError::new(
                FailureKind::InvalidRequest,
                "No active conversation.",
            ));
        };
        self.api
            .send_feedback(&ChatFeedback {
                conversation_id,
                message_id: message_id.to_string(),
                rating,
                comment: comment.filter(|c| !c.trim().is_empty()),
            })
            .await
    }

    /// Drops the conversation locally and from the store.
    pub fn forget(&mut self) {
        self.conversation_id = None;
        self.transcript.clear();
        self.store.clear(keys::CHAT_CONVERSATION);
    }
}
