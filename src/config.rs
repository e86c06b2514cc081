#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    // Payment gateway
    pub gateway_base_url: String,
    pub gateway_secret_key: String,
    pub gateway_webhook_secret: String,
    pub gateway_timeout_secs: u64,
    // Outbound mail
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    // Background sweep cadence
    pub expiry_sweep_interval_secs: u64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let app_url = std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());

        let gateway_base_url = std::env::var("GATEWAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.gateway.test".to_string());
        let gateway_secret_key = std::env::var("GATEWAY_SECRET_KEY")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let gateway_webhook_secret = std::env::var("GATEWAY_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "test_webhook_secret".to_string());
        let gateway_timeout_secs = std::env::var("GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(15);

        let mail_api_url = std::env::var("MAIL_API_URL")
            .unwrap_or_else(|_| "https://api.resend.com/emails".to_string());
        let mail_api_key = std::env::var("MAIL_API_KEY").unwrap_or_else(|_| "".to_string());
        let mail_from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "StayCollab <no-reply@staycollab.app>".to_string());

        let expiry_sweep_interval_secs = std::env::var("EXPIRY_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        Config {
            database_url,
            app_url,
            jwt_secret,
            port: 8000,
            gateway_base_url,
            gateway_secret_key,
            gateway_webhook_secret,
            gateway_timeout_secs,
            mail_api_url,
            mail_api_key,
            mail_from,
            expiry_sweep_interval_secs,
        }
    }
}
