use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "collaboration_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    PendingAgreement,
    Active,
    ContentSubmitted,
    Approved,
    Completed,
    CancellationRequested,
    Cancelled,
}

impl CollaborationStatus {
    pub fn to_str(&self) -> &str {
        match self {
            CollaborationStatus::PendingAgreement => "pending_agreement",
            CollaborationStatus::Active => "active",
            CollaborationStatus::ContentSubmitted => "content_submitted",
            CollaborationStatus::Approved => "approved",
            CollaborationStatus::Completed => "completed",
            CollaborationStatus::CancellationRequested => "cancellation_requested",
            CollaborationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CollaborationStatus::Completed | CollaborationStatus::Cancelled
        )
    }

    /// The forward-path transition table. Cancellation is a parallel branch
    /// handled separately because its target depends on the remembered
    /// prior status.
    pub fn can_advance_to(&self, to: CollaborationStatus) -> bool {
        use CollaborationStatus::*;
        matches!(
            (self, to),
            (PendingAgreement, Active)
                | (Active, ContentSubmitted)
                | (ContentSubmitted, Approved)
                | (ContentSubmitted, Active)
                | (Approved, Completed)
        )
    }

    /// Any live status may enter the cancellation sub-protocol.
    pub fn can_request_cancellation(&self) -> bool {
        !self.is_terminal() && *self != CollaborationStatus::CancellationRequested
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "collab_payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CollabPaymentStatus {
    Unpaid,
    Pending,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "platform_fee_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlatformFeeStatus {
    NotRequired,
    FeePending,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collaboration {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub host_id: Uuid,
    pub creator_id: Uuid,
    pub property_id: Uuid,
    pub agreement_id: Option<Uuid>,
    pub status: CollaborationStatus,
    pub payment_status: CollabPaymentStatus,
    pub platform_fee_status: PlatformFeeStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub content_links: Vec<String>,
    pub content_submitted_at: Option<DateTime<Utc>>,
    pub content_approved_at: Option<DateTime<Utc>>,
    pub change_request_feedback: Option<String>,
    pub clicks_generated: i64,
    pub traffic_bonus_threshold_clicks: Option<i64>,
    pub traffic_bonus_amount_minor: Option<i64>,
    pub traffic_bonus_payable: bool,
    pub affiliate_token: Option<String>,
    pub cancellation_requested_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    pub prior_status: Option<CollaborationStatus>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collaboration {
    pub fn counterparty(&self, actor_id: Uuid) -> Option<Uuid> {
        if actor_id == self.host_id {
            Some(self.creator_id)
        } else if actor_id == self.creator_id {
            Some(self.host_id)
        } else {
            None
        }
    }

    pub fn is_participant(&self, actor_id: Uuid) -> bool {
        actor_id == self.host_id || actor_id == self.creator_id
    }
}

/// Host pays the cash compensation plus this percentage as platform markup.
pub const PLATFORM_MARKUP_PERCENT: i64 = 15;

/// Flat activation fee for post-for-stay deals, in minor currency units ($99).
pub const POST_FOR_STAY_FEE_MINOR: i64 = 9_900;

/// Total the host is charged at payment time: cash amount plus the 15%
/// platform markup, in integer minor units (truncating division).
pub fn host_total_minor(cash_amount_minor: i64) -> i64 {
    cash_amount_minor + cash_amount_minor * PLATFORM_MARKUP_PERCENT / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use CollaborationStatus::*;

    #[test]
    fn forward_path_follows_the_lifecycle() {
        assert!(PendingAgreement.can_advance_to(Active));
        assert!(Active.can_advance_to(ContentSubmitted));
        assert!(ContentSubmitted.can_advance_to(Approved));
        // request-changes sends content back to active
        assert!(ContentSubmitted.can_advance_to(Active));
        assert!(Approved.can_advance_to(Completed));
    }

    #[test]
    fn no_skipping_or_reversing_outside_the_table() {
        assert!(!PendingAgreement.can_advance_to(ContentSubmitted));
        assert!(!PendingAgreement.can_advance_to(Completed));
        assert!(!Active.can_advance_to(Approved));
        assert!(!Approved.can_advance_to(Active));
        assert!(!Completed.can_advance_to(Active));
        assert!(!Cancelled.can_advance_to(Active));
    }

    #[test]
    fn cancellation_is_reachable_from_live_states_only() {
        assert!(PendingAgreement.can_request_cancellation());
        assert!(Active.can_request_cancellation());
        assert!(ContentSubmitted.can_request_cancellation());
        assert!(Approved.can_request_cancellation());
        assert!(!Completed.can_request_cancellation());
        assert!(!Cancelled.can_request_cancellation());
        assert!(!CancellationRequested.can_request_cancellation());
    }

    #[test]
    fn host_total_applies_fifteen_percent_markup() {
        assert_eq!(host_total_minor(50_000), 57_500);
        assert_eq!(host_total_minor(0), 0);
        // truncating integer division on odd amounts
        assert_eq!(host_total_minor(101), 101 + 15);
    }
}
