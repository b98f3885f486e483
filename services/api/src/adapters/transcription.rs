//! services/api/src/adapters/transcription.rs
//!
//! This module contains the adapter for the dictation webhook.
//! It implements the `TranscriptionService` port from the `core` crate.

use crate::adapters::webhook::WebhookClient;
use async_trait::async_trait;
use bytes::Bytes;
use post_planner_core::{
    domain::DictationTarget,
    ports::{PortError, PortResult, RemoteReply, TranscriptionService},
};
use reqwest::multipart::{Form, Part};

/// An adapter that implements the `TranscriptionService` port over a webhook.
#[derive(Clone)]
pub struct WebhookTranscriptionAdapter {
    webhook: WebhookClient,
}

impl WebhookTranscriptionAdapter {
    /// Creates a new `WebhookTranscriptionAdapter`.
    pub fn new(webhook: WebhookClient) -> Self {
        Self { webhook }
    }
}

#[async_trait]
impl TranscriptionService for WebhookTranscriptionAdapter {
    /// Uploads the recording as `recording.wav` along with the target field name.
    async fn transcribe(&self, audio: Bytes, target: DictationTarget) -> PortResult<RemoteReply> {
        let recording = Part::bytes(audio.to_vec())
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = Form::new()
            .part("audio", recording)
            .text("type", target.as_str());
        self.webhook.post_multipart(form).await
    }
}
