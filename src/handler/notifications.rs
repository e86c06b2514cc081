use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dtos::common::{ApiResponse, Response},
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn notifications_handler() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:notification_id/read", put(mark_read))
        .route("/read-all", put(mark_all_read))
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_notifications(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let notifications = app_state
        .notification_service
        .get_party_notifications(auth.party.id, limit, offset)
        .await?;

    Ok(Json(ApiResponse::success(
        "Notifications retrieved",
        notifications,
    )))
}

pub async fn mark_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .notification_service
        .mark_read(notification_id, auth.party.id)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "Notification marked as read".to_string(),
    }))
}

pub async fn mark_all_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .notification_service
        .mark_all_read(auth.party.id)
        .await?;

    Ok(Json(Response {
        status: "success",
        message: "All notifications marked as read".to_string(),
    }))
}
