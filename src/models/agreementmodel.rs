use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::models::{offermodel::OfferType, partymodel::PartyRole};

/// The bilateral contract bound to one collaboration. `agreement_text` is an
/// immutable snapshot rendered from the accepted offer terms; a re-counter
/// before execution produces a new `version` with both signatures reset.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Agreement {
    pub id: Uuid,
    pub collaboration_id: Uuid,
    pub version: i32,
    pub agreement_text: String,
    pub deal_type: OfferType,
    pub cash_amount_minor: i64,
    pub stay_included: bool,
    pub stay_nights: Option<i32>,
    pub deliverables: Vec<String>,
    pub content_deadline: DateTime<Utc>,
    pub host_accepted_at: Option<DateTime<Utc>>,
    pub creator_accepted_at: Option<DateTime<Utc>>,
    pub is_fully_executed: bool,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agreement {
    pub fn signature_of(&self, role: PartyRole) -> Option<DateTime<Utc>> {
        match role {
            PartyRole::Host => self.host_accepted_at,
            PartyRole::Creator => self.creator_accepted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agreement() -> Agreement {
        Agreement {
            id: Uuid::new_v4(),
            collaboration_id: Uuid::new_v4(),
            version: 1,
            agreement_text: "terms".to_string(),
            deal_type: OfferType::Flat,
            cash_amount_minor: 50_000,
            stay_included: false,
            stay_nights: None,
            deliverables: vec!["1 Reel".to_string()],
            content_deadline: Utc::now(),
            host_accepted_at: None,
            creator_accepted_at: None,
            is_fully_executed: false,
            executed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn signature_lookup_is_per_role() {
        let mut a = agreement();
        let now = Utc::now();
        a.host_accepted_at = Some(now);

        assert_eq!(a.signature_of(PartyRole::Host), Some(now));
        assert_eq!(a.signature_of(PartyRole::Creator), None);
    }
}
