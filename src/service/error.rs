use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::{collabmodel::CollaborationStatus, offermodel::OfferStatus, partymodel::PartyRole},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid amount {0}: counter amounts must be greater than zero")]
    InvalidAmount(i64),

    #[error("Offer {0} not found")]
    OfferNotFound(Uuid),

    #[error("Agreement {0} not found")]
    AgreementNotFound(Uuid),

    #[error("Collaboration {0} not found")]
    CollaborationNotFound(Uuid),

    #[error("No collaboration matches affiliate token '{0}'")]
    AffiliateTokenNotFound(String),

    #[error("Party {0} is not allowed to perform this action on {1}")]
    Forbidden(Uuid, Uuid),

    #[error("Action '{}' is not legal for offer {} in status '{}'", .action, .offer_id, .current.to_str())]
    InvalidOfferTransition {
        offer_id: Uuid,
        current: OfferStatus,
        action: &'static str,
    },

    #[error("Action '{}' is not legal for collaboration {} in status '{}'", .action, .collaboration_id, .current.to_str())]
    InvalidCollaborationTransition {
        collaboration_id: Uuid,
        current: CollaborationStatus,
        action: &'static str,
    },

    #[error("Agreement {} has already been signed by the {}", .0, .1.to_str())]
    AlreadySigned(Uuid, PartyRole),

    #[error("Agreement {0} is already fully executed and immutable")]
    AgreementExecuted(Uuid),

    #[error("Record {0} was modified concurrently, re-fetch and retry")]
    ConcurrentModification(Uuid),

    #[error("Payment gateway failure: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::OfferNotFound(_)
            | ServiceError::AgreementNotFound(_)
            | ServiceError::CollaborationNotFound(_)
            | ServiceError::AffiliateTokenNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Validation(_)
            | ServiceError::InvalidAmount(_)
            | ServiceError::InvalidOfferTransition { .. }
            | ServiceError::InvalidCollaborationTransition { .. } => StatusCode::BAD_REQUEST,

            ServiceError::Forbidden(_, _) => StatusCode::FORBIDDEN,

            ServiceError::AlreadySigned(_, _)
            | ServiceError::AgreementExecuted(_)
            | ServiceError::ConcurrentModification(_) => StatusCode::CONFLICT,

            ServiceError::Gateway(_) => StatusCode::BAD_GATEWAY,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        HttpError::new(error.to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_transitions_report_the_actual_state() {
        let offer_id = Uuid::new_v4();
        let err = ServiceError::InvalidOfferTransition {
            offer_id,
            current: OfferStatus::Declined,
            action: "withdraw",
        };
        let msg = err.to_string();
        assert!(msg.contains("declined") || msg.contains("Declined"));
        assert!(msg.contains("withdraw"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn concurrency_and_signature_conflicts_map_to_409() {
        let id = Uuid::new_v4();
        assert_eq!(
            ServiceError::ConcurrentModification(id).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::AlreadySigned(id, PartyRole::Host).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn gateway_failures_are_bad_gateway() {
        assert_eq!(
            ServiceError::Gateway("timeout".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
