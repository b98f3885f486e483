//! crates/post_planner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the remote
//! generation and calendar endpoints, the transcription endpoint and the
//! persisted cache slot are all reached through them.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::domain::{CalendarCommand, ContentRequest, ContentResult, DictationTarget};

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// Errors raised by adapters.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// No response was received at all.
    #[error("Network error: {0}")]
    Network(String),
    /// The persisted cache slot could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Core Error Type
//=========================================================================================

/// Classification of every failure surfaced by the dispatcher and calendar engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NetworkFailure,
    ServerFailure,
    MalformedResponse,
    UnexpectedShape,
    MissingField,
    Rollback,
    /// Refused client-side before any request was sent.
    Rejected,
}

/// One human-readable message plus its kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<PortError> for CoreError {
    fn from(err: PortError) -> Self {
        let kind = match err {
            PortError::Network(_) => ErrorKind::NetworkFailure,
            PortError::Storage(_) | PortError::Unexpected(_) => ErrorKind::ServerFailure,
        };
        CoreError::new(kind, err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

//=========================================================================================
// Raw Transport Result
//=========================================================================================

/// A response as received from a remote endpoint, before normalization.
///
/// Bodies that are not valid JSON are carried as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteReply {
    pub status: u16,
    pub payload: serde_json::Value,
}

impl RemoteReply {
    pub fn new(status: u16, payload: serde_json::Value) -> Self {
        Self { status, payload }
    }

    pub fn ok(payload: serde_json::Value) -> Self {
        Self::new(200, payload)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Sends a content request to the generation endpoint.
    async fn send(&self, request: &ContentRequest) -> PortResult<RemoteReply>;
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Reads the full calendar list.
    async fn fetch(&self) -> PortResult<RemoteReply>;

    async fn write(&self, command: &CalendarCommand) -> PortResult<RemoteReply>;
}

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Uploads a recording to be transcribed into the given form field.
    async fn transcribe(&self, audio: Bytes, target: DictationTarget) -> PortResult<RemoteReply>;
}

/// The persisted single slot holding the last successful result.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self) -> PortResult<Option<ContentResult>>;

    async fn save(&self, result: &ContentResult) -> PortResult<()>;

    async fn clear(&self) -> PortResult<()>;
}
