//! services/api/src/adapters/calendar.rs
//!
//! This module contains the adapter for the calendar webhook.
//! It implements the `CalendarService` port from the `core` crate.

use crate::adapters::webhook::WebhookClient;
use async_trait::async_trait;
use post_planner_core::{
    domain::CalendarCommand,
    ports::{CalendarService, PortResult, RemoteReply},
};
use serde_json::json;
use tracing::debug;

/// An adapter that implements the `CalendarService` port over a webhook.
#[derive(Clone)]
pub struct WebhookCalendarAdapter {
    webhook: WebhookClient,
}

impl WebhookCalendarAdapter {
    /// Creates a new `WebhookCalendarAdapter`.
    pub fn new(webhook: WebhookClient) -> Self {
        Self { webhook }
    }
}

#[async_trait]
impl CalendarService for WebhookCalendarAdapter {
    async fn fetch(&self) -> PortResult<RemoteReply> {
        self.webhook.post_json(&json!({ "action": "get_list" })).await
    }

    async fn write(&self, command: &CalendarCommand) -> PortResult<RemoteReply> {
        debug!(action = command.tag(), "Sending calendar write.");
        self.webhook.post_json(command).await
    }
}
