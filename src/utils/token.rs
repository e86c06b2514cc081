//! JWT mint/verify pair shared with the profile store. Tokens are issued
//! out of band when a party signs in there; this service only verifies
//! them, so `create_token` has no caller outside the test suite and the
//! issuing side. Both halves live together so the claim shape and
//! algorithm cannot drift apart.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(
    token: T,
    secret: &[u8],
) -> Result<String, crate::error::HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(crate::error::HttpError::unauthorized(
            crate::error::ErrorMessage::InvalidToken.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_the_subject() {
        let secret = b"my-test-secret";
        let id = uuid::Uuid::new_v4().to_string();

        let token = create_token(&id, secret, 60).unwrap();
        let sub = decode_token(token, secret).unwrap();

        assert_eq!(sub, id);
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let id = uuid::Uuid::new_v4().to_string();
        let token = create_token(&id, b"secret-a", 60).unwrap();

        assert!(decode_token(token, b"secret-b").is_err());
    }

    #[test]
    fn rejects_an_empty_subject() {
        assert!(create_token("", b"secret", 60).is_err());
    }
}
