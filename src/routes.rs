use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        agreements::agreements_handler,
        collaborations::{collaborations_handler, gateway_webhook, track_click},
        notifications::notifications_handler,
        offers::offers_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest(
            "/offers",
            offers_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/agreements",
            agreements_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/collaborations",
            collaborations_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/notifications",
            notifications_handler().layer(middleware::from_fn(auth)),
        )
        .route("/webhook/gateway", post(gateway_webhook));

    Router::new()
        .route("/health", get(health_check))
        .route("/track/:affiliate_token", post(track_click))
        .nest("/api", api_route)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}
