mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::filter::LevelFilter;

use config::Config;
use db::db::DBClient;
use routes::create_router;
use service::{
    agreement_service::AgreementService, background_jobs::spawn_expiry_sweep,
    collaboration_service::CollaborationService, notification_service::NotificationService,
    offer_service::OfferService, payment_gateway::PaymentGatewayService,
    traffic_service::TrafficService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub offer_service: Arc<OfferService>,
    pub agreement_service: Arc<AgreementService>,
    pub collaboration_service: Arc<CollaborationService>,
    pub traffic_service: Arc<TrafficService>,
    pub notification_service: Arc<NotificationService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client = Arc::new(db_client);

        let notification_service = Arc::new(NotificationService::new(
            db_client.clone(),
            config.clone(),
        ));
        let payment_gateway = Arc::new(PaymentGatewayService::new(&config));

        let collaboration_service = Arc::new(CollaborationService::new(
            db_client.clone(),
            payment_gateway,
            notification_service.clone(),
        ));
        let agreement_service = Arc::new(AgreementService::new(
            db_client.clone(),
            collaboration_service.clone(),
            notification_service.clone(),
        ));
        let offer_service = Arc::new(OfferService::new(
            db_client.clone(),
            agreement_service.clone(),
            notification_service.clone(),
        ));
        let traffic_service = Arc::new(TrafficService::new(
            db_client.clone(),
            notification_service.clone(),
        ));

        Self {
            env: config,
            db_client,
            offer_service,
            agreement_service,
            collaboration_service,
            traffic_service,
            notification_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("connected to the database");
            pool
        }
        Err(e) => {
            tracing::error!("failed to connect to the database: {}", e);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);
    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    spawn_expiry_sweep(
        app_state.offer_service.clone(),
        config.expiry_sweep_interval_secs,
    );

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .app_url
                .parse::<HeaderValue>()
                .expect("APP_URL must be a valid origin"),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true);

    let app = create_router(app_state).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
    }
}
