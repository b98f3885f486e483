//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the workspace, action and dictation
//! endpoints, and the master definition for the OpenAPI specification.

use crate::error::{ErrorBody, HandlerError};
use crate::web::{calendar, protocol::*, state::AppState};
use axum::{
    extract::{Multipart, Path, State},
    response::Json,
};
use bytes::Bytes;
use post_planner_core::{
    domain::{Action, DictationTarget, ImageRef, ReGenerateOptions},
    normalizer::parse_calendar_date,
};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_state_handler,
        update_state_handler,
        upload_image_handler,
        reset_handler,
        dispatch_handler,
        dictation_handler,
        calendar::get_calendar_handler,
        calendar::refresh_calendar_handler,
        calendar::schedule_handler,
        calendar::reschedule_handler,
        calendar::remove_handler,
    ),
    components(
        schemas(
            WorkspaceView, FormView, ImageView, ContentResultView, OutcomeResponse,
            UpdateWorkspaceRequest, ReGenerateBody, DictationResponse, CalendarView,
            ScheduledPostView, ScheduleRequest, PostRef, RescheduleRequest, RemoveRequest,
            ErrorBody,
        )
    ),
    tags(
        (name = "Post Planner API", description = "Content generation and post scheduling.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Workspace Handlers
//=========================================================================================

/// Return the current workspace.
#[utoipa::path(
    get,
    path = "/state",
    responses((status = 200, description = "Current workspace", body = WorkspaceView))
)]
pub async fn get_state_handler(State(app_state): State<Arc<AppState>>) -> Json<WorkspaceView> {
    Json(app_state.workspace_view().await)
}

/// Edit form fields, the draft, the image URL or the scheduled date.
#[utoipa::path(
    put,
    path = "/state",
    request_body = UpdateWorkspaceRequest,
    responses(
        (status = 200, description = "Updated workspace", body = WorkspaceView),
        (status = 409, description = "Invalid scheduled date", body = ErrorBody)
    )
)]
pub async fn update_state_handler(
    State(app_state): State<Arc<AppState>>,
    Json(update): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspaceView>, HandlerError> {
    let scheduled_date = match update.scheduled_date.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(raw) => Some(Some(parse_calendar_date(raw).ok_or_else(|| {
            HandlerError::rejected(format!("'{}' is not a valid date", raw))
        })?)),
    };

    app_state
        .planner
        .edit(|workspace| {
            let form = &mut workspace.form;
            for (field, value) in [
                (&mut form.news, update.news),
                (&mut form.personal, update.personal),
                (&mut form.controversial, update.controversial),
                (&mut form.projects, update.projects),
                (&mut workspace.draft, update.draft),
            ] {
                if let Some(value) = value {
                    *field = value;
                }
            }
            if let Some(url) = update.image_url {
                workspace.image = (!url.trim().is_empty()).then(|| ImageRef::Url(url));
            }
            if let Some(date) = scheduled_date {
                workspace.scheduled_date = date;
            }
        })
        .await;
    Ok(Json(app_state.workspace_view().await))
}

/// Attach an uploaded image to the draft.
///
/// Accepts a multipart/form-data request with a single `image` file part.
#[utoipa::path(
    post,
    path = "/state/image",
    request_body(content_type = "multipart/form-data", description = "The image to attach."),
    responses(
        (status = 200, description = "Image attached", body = WorkspaceView),
        (status = 409, description = "Missing or empty image part", body = ErrorBody)
    )
)]
pub async fn upload_image_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<WorkspaceView>, HandlerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HandlerError::rejected(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image.png").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| HandlerError::rejected(format!("Failed to read image bytes: {}", e)))?;
        if data.is_empty() {
            return Err(HandlerError::rejected("The uploaded image is empty"));
        }

        info!(file_name = %file_name, bytes = data.len(), "Image uploaded.");
        app_state
            .planner
            .edit(|workspace| {
                workspace.image = Some(ImageRef::Upload {
                    data,
                    file_name,
                    mime_type,
                })
            })
            .await;
        return Ok(Json(app_state.workspace_view().await));
    }
    Err(HandlerError::rejected("Multipart form must include an image"))
}

/// Clear the cached result together with every field that depends on it.
#[utoipa::path(
    post,
    path = "/state/reset",
    responses(
        (status = 200, description = "Workspace cleared", body = WorkspaceView),
        (status = 502, description = "The cache slot could not be cleared", body = ErrorBody)
    )
)]
pub async fn reset_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<WorkspaceView>, HandlerError> {
    app_state.planner.reset().await.map_err(|e| {
        error!("Failed to reset the workspace: {:?}", e);
        HandlerError::from(e)
    })?;
    Ok(Json(app_state.workspace_view().await))
}

//=========================================================================================
// Action Handlers
//=========================================================================================

/// Run an action against the generation endpoint.
///
/// `re-generate` accepts an optional JSON body with the re-generation options.
#[utoipa::path(
    post,
    path = "/actions/{action}",
    request_body(content = ReGenerateBody, description = "Optional; only read by re-generate."),
    params(
        ("action" = String, Path, description = "generate, improve, re-generate, get-news, generate-image, post or schedule")
    ),
    responses(
        (status = 200, description = "Action completed", body = OutcomeResponse),
        (status = 409, description = "Rejected before sending", body = ErrorBody),
        (status = 502, description = "The remote service failed", body = ErrorBody),
        (status = 503, description = "The remote service was unreachable", body = ErrorBody)
    )
)]
pub async fn dispatch_handler(
    State(app_state): State<Arc<AppState>>,
    Path(tag): Path<String>,
    body: Bytes,
) -> Result<Json<OutcomeResponse>, HandlerError> {
    let options = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let parsed: ReGenerateBody = serde_json::from_slice(&body)
            .map_err(|e| HandlerError::rejected(format!("Invalid options: {}", e)))?;
        Some(ReGenerateOptions::from(parsed))
    };
    let action = Action::from_tag(&tag, options)
        .ok_or_else(|| HandlerError::rejected(format!("Unknown action '{}'", tag)))?;

    let outcome = app_state.planner.dispatch(action).await?;
    let workspace = app_state.workspace_view().await;
    Ok(Json(OutcomeResponse::new(&outcome, workspace)))
}

/// Transcribe a recording into one of the form fields.
///
/// Accepts multipart/form-data with an `audio` file part and a `type` text part
/// (`personal`, `projects` or `controversial`).
#[utoipa::path(
    post,
    path = "/dictation",
    request_body(content_type = "multipart/form-data", description = "The recording and its target field."),
    responses(
        (status = 200, description = "Transcription added", body = DictationResponse),
        (status = 409, description = "Rejected before sending", body = ErrorBody),
        (status = 502, description = "The transcription service failed", body = ErrorBody)
    )
)]
pub async fn dictation_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DictationResponse>, HandlerError> {
    let mut audio = None;
    let mut target = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HandlerError::rejected(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("audio") => {
                audio = Some(field.bytes().await.map_err(|e| {
                    HandlerError::rejected(format!("Failed to read audio bytes: {}", e))
                })?);
            }
            Some("type") => {
                let label = field.text().await.map_err(|e| {
                    HandlerError::rejected(format!("Failed to read the target field: {}", e))
                })?;
                target = Some(DictationTarget::from_label(label.trim()).ok_or_else(|| {
                    HandlerError::rejected(format!("Unknown dictation target '{}'", label))
                })?);
            }
            _ => {}
        }
    }
    let audio = audio.ok_or_else(|| HandlerError::rejected("Missing the `audio` part"))?;
    let target = target.ok_or_else(|| HandlerError::rejected("Missing the `type` part"))?;

    let fragment = app_state.planner.dictate(audio, target).await?;
    Ok(Json(DictationResponse {
        target: fragment.target.as_str().to_string(),
        text: fragment.text,
        workspace: app_state.workspace_view().await,
    }))
}
