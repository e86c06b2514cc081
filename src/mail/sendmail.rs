use serde_json::json;
use tokio::time::{sleep, Duration};

use crate::config::Config;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

pub type MailError = Box<dyn std::error::Error + Send + Sync>;

pub async fn send_email(
    config: &Config,
    to_email: &str,
    subject: &str,
    html_body: &str,
) -> Result<(), MailError> {
    if to_email.is_empty() {
        return Err("Email recipient cannot be empty".into());
    }
    if !to_email.contains('@') {
        return Err(format!("Invalid email address: {}", to_email).into());
    }

    let mut last_error = None;

    for attempt in 1..=MAX_RETRIES {
        match send_via_api(config, to_email, subject, html_body).await {
            Ok(email_id) => {
                tracing::info!("Email sent to {} (id: {})", to_email, email_id);
                return Ok(());
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < MAX_RETRIES {
                    let delay = RETRY_DELAY_MS * (2_u64.pow(attempt - 1));
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| "Email delivery failed".into()))
}

async fn send_via_api(
    config: &Config,
    to_email: &str,
    subject: &str,
    html_body: &str,
) -> Result<String, MailError> {
    let client = reqwest::Client::new();

    let payload = json!({
        "from": config.mail_from,
        "to": [to_email],
        "subject": subject,
        "html": html_body,
    });

    let response = client
        .post(&config.mail_api_url)
        .header("Authorization", format!("Bearer {}", config.mail_api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    let body: serde_json::Value = response.json().await?;

    if status.is_success() {
        Ok(body["id"].as_str().unwrap_or("unknown").to_string())
    } else {
        Err(body["message"]
            .as_str()
            .unwrap_or("Mail API rejected the message")
            .to_string()
            .into())
    }
}
