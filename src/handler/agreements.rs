use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::common::ApiResponse, error::HttpError, middleware::JWTAuthMiddeware, AppState,
};

pub fn agreements_handler() -> Router {
    Router::new()
        .route("/:agreement_id", get(get_agreement))
        .route("/:agreement_id/sign", put(sign_agreement))
}

pub async fn get_agreement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(agreement_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let agreement = app_state
        .agreement_service
        .get_agreement(agreement_id, auth.party.id)
        .await?;

    Ok(Json(ApiResponse::success("Agreement retrieved", agreement)))
}

pub async fn sign_agreement(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(agreement_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let agreement = app_state
        .agreement_service
        .sign(agreement_id, auth.party.id)
        .await?;

    let message = if agreement.is_fully_executed {
        "Agreement fully executed"
    } else {
        "Signature recorded"
    };

    Ok(Json(ApiResponse::success(message, agreement)))
}
