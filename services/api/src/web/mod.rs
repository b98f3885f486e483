pub mod calendar;
pub mod protocol;
pub mod rest;
pub mod state;

use crate::error::ApiError;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use rest::ApiDoc;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the full application: the API routes, CORS for the browser client,
/// and the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let api_router = Router::new()
        .route(
            "/state",
            get(rest::get_state_handler).put(rest::update_state_handler),
        )
        .route("/state/image", post(rest::upload_image_handler))
        .route("/state/reset", post(rest::reset_handler))
        .route("/actions/{action}", post(rest::dispatch_handler))
        .route("/dictation", post(rest::dictation_handler))
        .route("/calendar", get(calendar::get_calendar_handler))
        .route("/calendar/refresh", post(calendar::refresh_calendar_handler))
        .route("/calendar/items", post(calendar::schedule_handler))
        .route("/calendar/reschedule", post(calendar::reschedule_handler))
        .route("/calendar/remove", post(calendar::remove_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
