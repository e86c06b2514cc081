use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::offermodel::OfferType;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOfferDto {
    pub creator_id: Uuid,

    pub property_id: Uuid,

    pub offer_type: OfferType,

    #[validate(range(min = 0, message = "Cash amount cannot be negative"))]
    pub cash_amount_minor: i64,

    #[validate(range(min = 1, max = 90, message = "Stay must be between 1 and 90 nights"))]
    pub stay_nights: Option<i32>,

    pub traffic_bonus_enabled: bool,

    #[validate(range(min = 1, message = "Bonus threshold must be positive"))]
    pub traffic_bonus_threshold_clicks: Option<i64>,

    #[validate(range(min = 1, message = "Bonus amount must be positive"))]
    pub traffic_bonus_amount_minor: Option<i64>,

    #[validate(length(min = 1, message = "At least one deliverable is required"))]
    pub deliverables: Vec<String>,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,

    #[validate(range(min = 1, max = 365, message = "Content deadline must be between 1 and 365 days"))]
    pub content_deadline_days: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RespondAction {
    Accept,
    Decline,
    Counter,
    ReCounter,
}

impl RespondAction {
    pub fn to_str(&self) -> &'static str {
        match self {
            RespondAction::Accept => "accept",
            RespondAction::Decline => "decline",
            RespondAction::Counter => "counter",
            RespondAction::ReCounter => "re-counter",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RespondOfferDto {
    pub action: RespondAction,

    pub counter_cash_amount_minor: Option<i64>,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub counter_message: Option<String>,
}
