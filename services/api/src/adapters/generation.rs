//! services/api/src/adapters/generation.rs
//!
//! This module contains the adapter for the generation webhook.
//! It implements the `GenerationService` port from the `core` crate.

use crate::adapters::webhook::WebhookClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use post_planner_core::{
    domain::{ContentRequest, ImageRef, ReGenerateOptions},
    ports::{GenerationService, PortError, PortResult, RemoteReply},
};
use reqwest::multipart::{Form, Part};
use serde::Serialize;

//=========================================================================================
// Wire Format
//=========================================================================================

#[derive(Serialize, Debug)]
struct GenerationPayload<'a> {
    action: &'a str,
    news: &'a str,
    personal: &'a str,
    controversial: &'a str,
    projects: &'a str,
    draft: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_date: Option<NaiveDate>,
    #[serde(rename = "reGenerateOptions", skip_serializing_if = "Option::is_none")]
    regenerate_options: Option<&'a ReGenerateOptions>,
}

impl<'a> GenerationPayload<'a> {
    fn from_request(request: &'a ContentRequest) -> Self {
        Self {
            action: request.action.tag(),
            news: &request.news,
            personal: &request.personal,
            controversial: &request.controversial,
            projects: &request.projects,
            draft: request.draft.as_deref().unwrap_or_default(),
            image: request.image.as_ref().and_then(ImageRef::url),
            scheduled_date: request.scheduled_date,
            regenerate_options: request.regenerate_options(),
        }
    }

    /// The same fields as text parts, for requests that carry an uploaded image.
    fn text_parts(&self) -> PortResult<Vec<(&'static str, String)>> {
        let mut parts = vec![
            ("action", self.action.to_string()),
            ("news", self.news.to_string()),
            ("personal", self.personal.to_string()),
            ("controversial", self.controversial.to_string()),
            ("projects", self.projects.to_string()),
            ("draft", self.draft.to_string()),
        ];
        if let Some(date) = self.scheduled_date {
            parts.push(("scheduled_date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(options) = self.regenerate_options {
            let encoded = serde_json::to_string(options)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            parts.push(("reGenerateOptions", encoded));
        }
        Ok(parts)
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `GenerationService` port over a webhook.
#[derive(Clone)]
pub struct WebhookGenerationAdapter {
    webhook: WebhookClient,
}

impl WebhookGenerationAdapter {
    /// Creates a new `WebhookGenerationAdapter`.
    pub fn new(webhook: WebhookClient) -> Self {
        Self { webhook }
    }
}

#[async_trait]
impl GenerationService for WebhookGenerationAdapter {
    /// Sends the request as JSON, or as multipart when an image was uploaded.
    async fn send(&self, request: &ContentRequest) -> PortResult<RemoteReply> {
        let payload = GenerationPayload::from_request(request);
        match &request.image {
            Some(ImageRef::Upload {
                data,
                file_name,
                mime_type,
            }) => {
                let mut form = Form::new();
                for (name, value) in payload.text_parts()? {
                    form = form.text(name, value);
                }
                let image = Part::bytes(data.to_vec())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(|e| PortError::Unexpected(format!("Invalid image type: {}", e)))?;
                form = form.part("image", image).text("fileName", file_name.clone());
                self.webhook.post_multipart(form).await
            }
            _ => self.webhook.post_json(&payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use post_planner_core::domain::{Action, ContentLength, ContentStyle};
    use serde_json::json;

    fn request(action: Action) -> ContentRequest {
        ContentRequest {
            action,
            news: "Acme raises funding".to_string(),
            personal: String::new(),
            controversial: String::new(),
            projects: "parser".to_string(),
            draft: None,
            image: Some(ImageRef::Url("https://img.example/a.png".to_string())),
            file_name: None,
            scheduled_date: Some("2024-06-01".parse().unwrap()),
        }
    }

    #[test]
    fn json_payload_uses_the_webhook_field_names() {
        let request = request(Action::ReGenerate(ReGenerateOptions {
            model: "gpt-4".to_string(),
            length: ContentLength::Long,
            style: ContentStyle::Formal,
        }));
        let json = serde_json::to_value(GenerationPayload::from_request(&request)).unwrap();

        assert_eq!(
            json,
            json!({
                "action": "re-generate",
                "news": "Acme raises funding",
                "personal": "",
                "controversial": "",
                "projects": "parser",
                "draft": "",
                "image": "https://img.example/a.png",
                "scheduled_date": "2024-06-01",
                "reGenerateOptions": {"model": "gpt-4", "length": "long", "style": "formal"}
            })
        );
    }

    #[test]
    fn options_are_omitted_for_other_actions() {
        let request = request(Action::Generate);
        let json = serde_json::to_value(GenerationPayload::from_request(&request)).unwrap();
        assert!(json.get("reGenerateOptions").is_none());
        assert_eq!(json["action"], "generate");
    }

    #[test]
    fn multipart_text_parts_carry_encoded_options() {
        let request = request(Action::ReGenerate(ReGenerateOptions::default()));
        let parts = GenerationPayload::from_request(&request).text_parts().unwrap();
        let options = parts
            .iter()
            .find(|(name, _)| *name == "reGenerateOptions")
            .map(|(_, value)| value.as_str());
        assert_eq!(
            options,
            Some(r#"{"model":"gpt-3.5-turbo","length":"medium","style":"neutral"}"#)
        );
        assert!(parts.contains(&("scheduled_date", "2024-06-01".to_string())));
    }
}
