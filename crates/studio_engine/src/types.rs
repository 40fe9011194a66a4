use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc;

use studio_core::{AutosaveStatus, FlowKind, OperationId, OperationPayload};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    AutosaveStatus {
        flow: FlowKind,
        status: AutosaveStatus,
    },
    OperationProgress {
        operation_id: OperationId,
        stage: usize,
        label: String,
        percent: u8,
    },
    /// Failures are already converted to user-facing text.
    OperationCompleted {
        operation_id: OperationId,
        result: Result<OperationPayload, String>,
    },
    ExportCompleted {
        result: Result<PathBuf, String>,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Text safe to show in the UI. Server-provided messages win for HTTP
    /// errors; everything else gets a fixed explanation.
    pub fn user_message(&self) -> String {
        match &self.kind {
            FailureKind::InvalidRequest => self.message.clone(),
            FailureKind::HttpStatus(_) if !self.message.is_empty() => self.message.clone(),
            FailureKind::HttpStatus(code) => {
                format!("The analysis service returned an error (HTTP {code}). Please try again.")
            }
            FailureKind::Timeout => "The request timed out. Please try again.".to_string(),
            FailureKind::Network => {
                "Could not reach the analysis service. Check your connection and try again."
                    .to_string()
            }
            FailureKind::InvalidResponse => {
                "The analysis service returned an unexpected response.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Rejected locally; no request was sent.
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Network,
    /// 2xx response that failed parsing or required-field checks.
    InvalidResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::InvalidResponse => write!(f, "invalid response"),
        }
    }
}
