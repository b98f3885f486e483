//! services/api/src/web/calendar.rs
//!
//! Axum handlers for the calendar tab.

use crate::error::{ErrorBody, HandlerError};
use crate::web::{protocol::*, state::AppState};
use axum::{extract::State, response::Json};
use post_planner_core::{calendar::NewPost, domain::ScheduledPost};
use std::sync::Arc;

async fn locate(app_state: &AppState, post: &PostRef) -> Result<ScheduledPost, HandlerError> {
    let snapshot = app_state.planner.calendar().await;
    post.find_in(&snapshot).ok_or_else(|| {
        HandlerError::rejected(format!("\"{}\" is not in the calendar", post.title))
    })
}

/// Return the last confirmed calendar without contacting the server.
#[utoipa::path(
    get,
    path = "/calendar",
    responses((status = 200, description = "Current calendar", body = CalendarView))
)]
pub async fn get_calendar_handler(State(app_state): State<Arc<AppState>>) -> Json<CalendarView> {
    Json(CalendarView::from(&app_state.planner.calendar().await))
}

/// Re-read the calendar from the server.
#[utoipa::path(
    post,
    path = "/calendar/refresh",
    responses(
        (status = 200, description = "Refreshed calendar", body = CalendarView),
        (status = 502, description = "The calendar service failed", body = ErrorBody),
        (status = 503, description = "The calendar service was unreachable", body = ErrorBody)
    )
)]
pub async fn refresh_calendar_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<CalendarView>, HandlerError> {
    let snapshot = app_state.planner.refresh_calendar().await?;
    Ok(Json(CalendarView::from(&snapshot)))
}

/// Add a post to the calendar.
#[utoipa::path(
    post,
    path = "/calendar/items",
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Calendar after the post was added", body = CalendarView),
        (status = 409, description = "Nothing to schedule", body = ErrorBody),
        (status = 502, description = "The calendar service failed", body = ErrorBody)
    )
)]
pub async fn schedule_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<CalendarView>, HandlerError> {
    let snapshot = match request.content {
        Some(content) => {
            app_state
                .planner
                .schedule(NewPost {
                    date: request.date,
                    title: request.title,
                    content,
                    image_url: request.image_url.filter(|url| !url.trim().is_empty()),
                })
                .await?
        }
        None => {
            app_state
                .planner
                .schedule_draft(request.date, request.title)
                .await?
        }
    };
    Ok(Json(CalendarView::from(&snapshot)))
}

/// Move a post to another day.
#[utoipa::path(
    post,
    path = "/calendar/reschedule",
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Calendar after the move", body = CalendarView),
        (status = 409, description = "Rejected or rolled back", body = ErrorBody),
        (status = 502, description = "The calendar service failed", body = ErrorBody)
    )
)]
pub async fn reschedule_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<CalendarView>, HandlerError> {
    let post = locate(&app_state, &request.post).await?;
    let snapshot = app_state.planner.reschedule(&post, request.new_date).await?;
    Ok(Json(CalendarView::from(&snapshot)))
}

/// Remove the posts on a day.
#[utoipa::path(
    post,
    path = "/calendar/remove",
    request_body = RemoveRequest,
    responses(
        (status = 200, description = "Calendar after the removal", body = CalendarView),
        (status = 409, description = "Rejected", body = ErrorBody),
        (status = 502, description = "The calendar service failed", body = ErrorBody)
    )
)]
pub async fn remove_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<RemoveRequest>,
) -> Result<Json<CalendarView>, HandlerError> {
    let post = locate(&app_state, &request.post).await?;
    let snapshot = app_state.planner.remove(&post).await?;
    Ok(Json(CalendarView::from(&snapshot)))
}
