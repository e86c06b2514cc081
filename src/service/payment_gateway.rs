use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{config::Config, service::error::ServiceError};

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargePurpose {
    /// Flat post-for-stay activation fee.
    PlatformFee,
    /// Cash compensation plus markup, charged to the host at payment time.
    CollaborationPayment,
}

impl ChargePurpose {
    pub fn to_str(&self) -> &'static str {
        match self {
            ChargePurpose::PlatformFee => "platform_fee",
            ChargePurpose::CollaborationPayment => "collaboration_payment",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub reference: String,
    pub amount_minor: i64,
    pub status: String,
}

/// Thin client over the external payment gateway. Charges are synchronous
/// gates: the caller's transition does not complete until the gateway
/// responds, and a timeout counts as failure, never success.
#[derive(Debug, Clone)]
pub struct PaymentGatewayService {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl PaymentGatewayService {
    pub fn new(config: &Config) -> Self {
        // Startup-only construction; a client without the configured timeout
        // would turn gateway outages into hung transitions.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .expect("failed to build the payment gateway HTTP client");

        Self {
            client,
            base_url: config.gateway_base_url.clone(),
            secret_key: config.gateway_secret_key.clone(),
        }
    }

    /// Charge `payer_id` through the gateway. `idempotency_key` must be
    /// stable per logical charge so caller retries never double-charge.
    pub async fn charge(
        &self,
        payer_id: Uuid,
        amount_minor: i64,
        purpose: ChargePurpose,
        idempotency_key: &str,
    ) -> Result<ChargeReceipt, ServiceError> {
        let payload = serde_json::json!({
            "payer_id": payer_id,
            "amount": amount_minor,
            "currency": "USD",
            "purpose": purpose.to_str(),
            "reference": idempotency_key,
        });

        let response = self
            .client
            .post(format!("{}/charges", self.base_url))
            .header("Authorization", format!("Bearer {}", self.secret_key))
            .header("Idempotency-Key", idempotency_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Gateway(format!("charge timed out: {}", e))
                } else {
                    ServiceError::Gateway(format!("charge request failed: {}", e))
                }
            })?;

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Gateway(format!("invalid gateway response: {}", e)))?;

        if response_body["status"].as_str() == Some("success") {
            let data = &response_body["data"];
            Ok(ChargeReceipt {
                reference: data["reference"]
                    .as_str()
                    .unwrap_or(idempotency_key)
                    .to_string(),
                amount_minor: data["amount"].as_i64().unwrap_or(amount_minor),
                status: "success".to_string(),
            })
        } else {
            let message = response_body["message"]
                .as_str()
                .unwrap_or("charge was declined")
                .to_string();
            Err(ServiceError::Gateway(message))
        }
    }
}

/// Verify the gateway webhook HMAC (hex-encoded SHA-512 over the raw body).
/// Constant-time comparison so mismatches leak no timing information.
pub fn verify_webhook_signature(body: &[u8], signature_hex: &str, secret: &str) -> bool {
    let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    expected.as_bytes().ct_eq(signature_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_client_with_the_configured_timeout() {
        let config = Config {
            database_url: "postgres://localhost/test".to_string(),
            app_url: "http://localhost:8000".to_string(),
            jwt_secret: "secret".to_string(),
            port: 8000,
            gateway_base_url: "https://api.gateway.test".to_string(),
            gateway_secret_key: "sk_test".to_string(),
            gateway_webhook_secret: "whsec_test".to_string(),
            gateway_timeout_secs: 15,
            mail_api_url: "https://api.resend.com/emails".to_string(),
            mail_api_key: String::new(),
            mail_from: "StayCollab <no-reply@staycollab.app>".to_string(),
            expiry_sweep_interval_secs: 600,
        };

        let gateway = PaymentGatewayService::new(&config);
        assert_eq!(gateway.base_url, "https://api.gateway.test");
    }

    #[test]
    fn accepts_a_correctly_signed_body() {
        let secret = "webhook-secret";
        let body = br#"{"event":"charge.success"}"#;

        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_webhook_signature(body, &signature, secret));
    }

    #[test]
    fn rejects_a_tampered_body_or_wrong_secret() {
        let secret = "webhook-secret";
        let body = br#"{"event":"charge.success"}"#;

        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(!verify_webhook_signature(br#"{"event":"other"}"#, &signature, secret));
        assert!(!verify_webhook_signature(body, &signature, "another-secret"));
        assert!(!verify_webhook_signature(body, "deadbeef", secret));
    }
}
