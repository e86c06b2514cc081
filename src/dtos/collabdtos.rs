use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SubmitContentDto {
    #[validate(length(min = 1, message = "At least one content link is required"))]
    pub content_links: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewDecision {
    Approve,
    RequestChanges,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReviewContentDto {
    pub decision: ReviewDecision,

    #[validate(length(max = 2000, message = "Feedback must be at most 2000 characters"))]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RequestCancellationDto {
    #[validate(length(max = 2000, message = "Reason must be at most 2000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CancellationDecision {
    Accept,
    Decline,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RespondCancellationDto {
    pub decision: CancellationDecision,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordClicksDto {
    #[validate(range(min = 0, message = "Click delta cannot be negative"))]
    pub clicks: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TrafficStatsDto {
    pub clicks_generated: i64,
    pub traffic_bonus_threshold_clicks: Option<i64>,
    pub traffic_bonus_amount_minor: Option<i64>,
    pub traffic_bonus_payable: bool,
    pub affiliate_token: Option<String>,
}
