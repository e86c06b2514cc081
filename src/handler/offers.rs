use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        common::ApiResponse,
        offerdtos::{CreateOfferDto, RespondOfferDto},
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn offers_handler() -> Router {
    Router::new()
        .route("/", post(create_offer))
        .route("/sent", get(sent_offers))
        .route("/received", get(received_offers))
        .route("/:offer_id", get(get_offer))
        .route("/:offer_id/rounds", get(negotiation_rounds))
        .route("/:offer_id/viewed", put(mark_viewed))
        .route("/:offer_id/respond", post(respond))
        .route("/:offer_id/withdraw", put(withdraw))
        .route("/:offer_id/resend", post(resend))
}

pub async fn create_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateOfferDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let offer = app_state
        .offer_service
        .create_offer(auth.party.id, body)
        .await?;

    Ok(Json(ApiResponse::success("Offer created", offer)))
}

pub async fn sent_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let offers = app_state.offer_service.list_for_host(auth.party.id).await?;

    Ok(Json(ApiResponse::success("Offers retrieved", offers)))
}

pub async fn received_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let offers = app_state
        .offer_service
        .list_for_creator(auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Offers retrieved", offers)))
}

pub async fn get_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .offer_service
        .get_offer(offer_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Offer retrieved", offer)))
}

pub async fn negotiation_rounds(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let rounds = app_state
        .offer_service
        .negotiation_history(offer_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Negotiation rounds retrieved", rounds)))
}

pub async fn mark_viewed(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .offer_service
        .mark_viewed(offer_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Offer marked as viewed", offer)))
}

pub async fn respond(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
    Json(body): Json<RespondOfferDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let offer = app_state
        .offer_service
        .respond(offer_id, auth.party.id, body)
        .await?;

    Ok(Json(ApiResponse::success("Response recorded", offer)))
}

pub async fn withdraw(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .offer_service
        .withdraw(offer_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Offer withdrawn", offer)))
}

pub async fn resend(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .offer_service
        .resend(offer_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Offer re-sent", offer)))
}
