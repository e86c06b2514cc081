use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        collabdtos::{
            RecordClicksDto, RequestCancellationDto, RespondCancellationDto, ReviewContentDto,
            SubmitContentDto,
        },
        common::ApiResponse,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    service::payment_gateway::verify_webhook_signature,
    AppState,
};

pub fn collaborations_handler() -> Router {
    Router::new()
        .route("/", get(list_collaborations))
        .route("/:collaboration_id", get(get_collaboration))
        .route("/:collaboration_id/content", post(submit_content))
        .route("/:collaboration_id/review", put(review_content))
        .route("/:collaboration_id/pay", post(pay))
        .route("/:collaboration_id/platform-fee/retry", post(retry_platform_fee))
        .route("/:collaboration_id/traffic", get(traffic_stats))
        .route("/:collaboration_id/cancellation", post(request_cancellation))
        .route("/:collaboration_id/cancellation/respond", put(respond_cancellation))
}

pub async fn list_collaborations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let collaborations = app_state
        .collaboration_service
        .list_for_party(auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Collaborations retrieved",
        collaborations,
    )))
}

pub async fn get_collaboration(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let collaboration = app_state
        .collaboration_service
        .get_collaboration(collaboration_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Collaboration retrieved",
        collaboration,
    )))
}

pub async fn submit_content(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
    Json(body): Json<SubmitContentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let collaboration = app_state
        .collaboration_service
        .submit_content(collaboration_id, auth.party.id, body.content_links)
        .await?;

    Ok(Json(ApiResponse::success(
        "Content submitted for review",
        collaboration,
    )))
}

pub async fn review_content(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
    Json(body): Json<ReviewContentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let collaboration = app_state
        .collaboration_service
        .review_content(collaboration_id, auth.party.id, body.decision, body.feedback)
        .await?;

    Ok(Json(ApiResponse::success("Review recorded", collaboration)))
}

pub async fn pay(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let collaboration = app_state
        .collaboration_service
        .pay(collaboration_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Payment completed", collaboration)))
}

pub async fn retry_platform_fee(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let collaboration = app_state
        .collaboration_service
        .retry_platform_fee(collaboration_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Platform fee paid, collaboration activated",
        collaboration,
    )))
}

pub async fn traffic_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state
        .traffic_service
        .traffic_stats(collaboration_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Traffic stats retrieved", stats)))
}

pub async fn request_cancellation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
    Json(body): Json<RequestCancellationDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let collaboration = app_state
        .collaboration_service
        .request_cancellation(collaboration_id, auth.party.id, body.reason)
        .await?;

    Ok(Json(ApiResponse::success(
        "Cancellation requested",
        collaboration,
    )))
}

pub async fn respond_cancellation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(collaboration_id): Path<Uuid>,
    Json(body): Json<RespondCancellationDto>,
) -> Result<impl IntoResponse, HttpError> {
    let collaboration = app_state
        .collaboration_service
        .respond_cancellation(collaboration_id, auth.party.id, body.decision)
        .await?;

    Ok(Json(ApiResponse::success(
        "Cancellation response recorded",
        collaboration,
    )))
}

/// Public endpoint hit by the external tracking redirector on every
/// affiliate-link click. Defaults to a single click when no body is sent.
pub async fn track_click(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(affiliate_token): Path<String>,
    body: Option<Json<RecordClicksDto>>,
) -> Result<impl IntoResponse, HttpError> {
    let delta = match body {
        Some(Json(dto)) => {
            dto.validate()
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            dto.clicks.unwrap_or(1)
        }
        None => 1,
    };

    let collaboration = app_state
        .traffic_service
        .record_clicks(&affiliate_token, delta)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "clicks_generated": collaboration.clicks_generated,
        "traffic_bonus_payable": collaboration.traffic_bonus_payable,
    })))
}

/// Public gateway webhook. The raw body is HMAC-verified before parsing;
/// replayed or already-processed events resolve as no-ops.
pub async fn gateway_webhook(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpError> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HttpError::unauthorized("Missing webhook signature"))?;

    if !verify_webhook_signature(&body, signature, &app_state.env.gateway_webhook_secret) {
        return Err(HttpError::unauthorized("Invalid webhook signature"));
    }

    let event: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| HttpError::bad_request("Malformed webhook payload"))?;

    if event["event"].as_str() != Some("charge.success") {
        return Ok(StatusCode::OK);
    }

    let reference = event["data"]["reference"].as_str().unwrap_or_default();

    // Platform-fee references carry the collaboration id: "fee-<uuid>".
    if let Some(raw_id) = reference.strip_prefix("fee-") {
        if let Ok(collaboration_id) = Uuid::parse_str(raw_id) {
            app_state
                .collaboration_service
                .resume_activation_from_webhook(collaboration_id)
                .await?;
        } else {
            tracing::warn!("webhook charge.success with unparseable reference '{}'", reference);
        }
    }

    Ok(StatusCode::OK)
}
