use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::models::partymodel::PartyRole;

/// Offers expire this many days after creation (server-assigned).
pub const OFFER_EXPIRY_DAYS: i64 = 14;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "offer_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Flat,
    FlatWithBonus,
    PostForStay,
}

impl OfferType {
    pub fn to_str(&self) -> &str {
        match self {
            OfferType::Flat => "flat",
            OfferType::FlatWithBonus => "flat_with_bonus",
            OfferType::PostForStay => "post_for_stay",
        }
    }

    /// Deals that settle in cash: compensation is cash_amount_minor and the
    /// host pays the percentage markup at payment time.
    pub fn has_cash_compensation(&self) -> bool {
        matches!(self, OfferType::Flat | OfferType::FlatWithBonus)
    }

    /// Post-for-stay deals compensate with nights, not cash, and gate
    /// activation on the flat platform fee.
    pub fn requires_stay(&self) -> bool {
        matches!(self, OfferType::PostForStay)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "offer_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Countered,
    Accepted,
    Declined,
    Withdrawn,
    Expired,
}

impl OfferStatus {
    pub fn to_str(&self) -> &str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Countered => "countered",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Declined => "declined",
            OfferStatus::Withdrawn => "withdrawn",
            OfferStatus::Expired => "expired",
        }
    }

    /// Terminal statuses never transition again; resend creates a new record.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OfferStatus::Accepted
                | OfferStatus::Declined
                | OfferStatus::Withdrawn
                | OfferStatus::Expired
        )
    }

    /// Which role is allowed to respond while the offer sits in this status.
    /// Pending offers await the creator; countered offers await the host.
    pub fn responder_role(&self) -> Option<PartyRole> {
        match self {
            OfferStatus::Pending => Some(PartyRole::Creator),
            OfferStatus::Countered => Some(PartyRole::Host),
            _ => None,
        }
    }

    /// Only live negotiations can be withdrawn by the host or swept by expiry.
    pub fn is_open(&self) -> bool {
        matches!(self, OfferStatus::Pending | OfferStatus::Countered)
    }

    /// Resend is limited to offers that died without agreement.
    pub fn is_resendable(&self) -> bool {
        matches!(self, OfferStatus::Expired | OfferStatus::Declined)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "negotiation_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NegotiationAction {
    Created,
    Countered,
    ReCountered,
    Accepted,
    Declined,
    Withdrawn,
    Resent,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub host_id: Uuid,
    pub creator_id: Uuid,
    pub property_id: Uuid,
    pub offer_type: OfferType,
    pub cash_amount_minor: i64,
    pub stay_nights: Option<i32>,
    pub traffic_bonus_enabled: bool,
    pub traffic_bonus_threshold_clicks: Option<i64>,
    pub traffic_bonus_amount_minor: Option<i64>,
    pub deliverables: Vec<String>,
    pub message: Option<String>,
    pub content_deadline_days: i32,
    pub counter_cash_amount_minor: Option<i64>,
    pub counter_message: Option<String>,
    pub status: OfferStatus,
    pub resent_from: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn expiry_from(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::days(OFFER_EXPIRY_DAYS)
    }

    /// The party on the other side of the table from `actor_id`.
    pub fn counterparty(&self, actor_id: Uuid) -> Option<Uuid> {
        if actor_id == self.host_id {
            Some(self.creator_id)
        } else if actor_id == self.creator_id {
            Some(self.host_id)
        } else {
            None
        }
    }
}

/// Append-only audit log of every negotiation move on an offer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NegotiationRound {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub round_number: i32,
    pub actor_id: Uuid,
    pub action: NegotiationAction,
    pub cash_amount_minor: Option<i64>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_awaits_the_creator_and_countered_awaits_the_host() {
        assert_eq!(
            OfferStatus::Pending.responder_role(),
            Some(PartyRole::Creator)
        );
        assert_eq!(
            OfferStatus::Countered.responder_role(),
            Some(PartyRole::Host)
        );
        for status in [
            OfferStatus::Accepted,
            OfferStatus::Declined,
            OfferStatus::Withdrawn,
            OfferStatus::Expired,
        ] {
            assert_eq!(status.responder_role(), None);
        }
    }

    #[test]
    fn terminal_statuses_are_closed_and_only_expired_or_declined_resend() {
        assert!(!OfferStatus::Pending.is_terminal());
        assert!(!OfferStatus::Countered.is_terminal());
        assert!(OfferStatus::Accepted.is_terminal());
        assert!(OfferStatus::Withdrawn.is_terminal());

        assert!(OfferStatus::Expired.is_resendable());
        assert!(OfferStatus::Declined.is_resendable());
        assert!(!OfferStatus::Accepted.is_resendable());
        assert!(!OfferStatus::Withdrawn.is_resendable());
        assert!(!OfferStatus::Pending.is_resendable());
    }

    #[test]
    fn expiry_is_fourteen_days_after_creation() {
        let created = Utc::now();
        assert_eq!(Offer::expiry_from(created) - created, Duration::days(14));
    }

    #[test]
    fn counterparty_resolves_the_other_side_only() {
        let host = Uuid::new_v4();
        let creator = Uuid::new_v4();
        let offer = Offer {
            id: Uuid::new_v4(),
            host_id: host,
            creator_id: creator,
            property_id: Uuid::new_v4(),
            offer_type: OfferType::Flat,
            cash_amount_minor: 50_000,
            stay_nights: None,
            traffic_bonus_enabled: false,
            traffic_bonus_threshold_clicks: None,
            traffic_bonus_amount_minor: None,
            deliverables: vec!["2 Instagram Reels".to_string()],
            message: None,
            content_deadline_days: 30,
            counter_cash_amount_minor: None,
            counter_message: None,
            status: OfferStatus::Pending,
            resent_from: None,
            version: 1,
            created_at: Utc::now(),
            expires_at: Offer::expiry_from(Utc::now()),
            responded_at: None,
            viewed_at: None,
            updated_at: Utc::now(),
        };

        assert_eq!(offer.counterparty(host), Some(creator));
        assert_eq!(offer.counterparty(creator), Some(host));
        assert_eq!(offer.counterparty(Uuid::new_v4()), None);
    }
}
