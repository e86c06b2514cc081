use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{agreementdb::AgreementExt, collabdb::CollabExt, db::DBClient},
    models::{
        agreementmodel::Agreement,
        collabmodel::host_total_minor,
        offermodel::Offer,
        partymodel::PartyRole,
    },
    service::{
        collaboration_service::CollaborationService, error::ServiceError,
        notification_service::NotificationService,
    },
};

/// Owns contract rendering, versioning, and the two-party signature
/// protocol. The second signature flips `is_fully_executed` and triggers
/// collaboration activation exactly once.
#[derive(Debug, Clone)]
pub struct AgreementService {
    db_client: Arc<DBClient>,
    collaboration_service: Arc<CollaborationService>,
    notification_service: Arc<NotificationService>,
}

impl AgreementService {
    pub fn new(
        db_client: Arc<DBClient>,
        collaboration_service: Arc<CollaborationService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            collaboration_service,
            notification_service,
        }
    }

    /// Re-draft after a re-counter while the contract is still unsigned or
    /// half-signed: bump the version, swap in the new terms, reset both
    /// signatures. An executed agreement is immutable.
    pub async fn redraft(
        &self,
        collaboration_id: Uuid,
        offer: &Offer,
    ) -> Result<Agreement, ServiceError> {
        let content_deadline = Utc::now() + Duration::days(offer.content_deadline_days as i64);
        let agreement_text = render_agreement_text(offer);

        let redrafted = self
            .db_client
            .redraft_agreement(
                collaboration_id,
                agreement_text,
                offer.offer_type,
                offer.cash_amount_minor,
                offer.offer_type.requires_stay(),
                offer.stay_nights,
                offer.deliverables.clone(),
                content_deadline,
            )
            .await?;

        match redrafted {
            Some(agreement) => Ok(agreement),
            None => {
                let existing = self
                    .db_client
                    .get_agreement_by_collaboration(collaboration_id)
                    .await?
                    .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;
                Err(ServiceError::AgreementExecuted(existing.id))
            }
        }
    }

    pub async fn get_agreement(
        &self,
        agreement_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Agreement, ServiceError> {
        let agreement = self
            .db_client
            .get_agreement_by_id(agreement_id)
            .await?
            .ok_or(ServiceError::AgreementNotFound(agreement_id))?;

        // Authorization rides on the collaboration's participant set.
        self.resolve_role(&agreement, actor_id).await?;

        Ok(agreement)
    }

    /// One signature per role, write-once. The database CAS only succeeds
    /// while this role's timestamp is NULL and computes "fully executed"
    /// from the other column in the same statement, so concurrent signers
    /// cannot both observe themselves as the second — activation fires
    /// exactly once, from the caller whose write flipped the flag.
    pub async fn sign(&self, agreement_id: Uuid, actor_id: Uuid) -> Result<Agreement, ServiceError> {
        let agreement = self
            .db_client
            .get_agreement_by_id(agreement_id)
            .await?
            .ok_or(ServiceError::AgreementNotFound(agreement_id))?;

        let (role, collaboration) = self.resolve_role(&agreement, actor_id).await?;

        let signed = match self.db_client.sign_agreement(agreement_id, role).await? {
            Some(agreement) => agreement,
            None => {
                // CAS refused: either the row vanished or this role already signed.
                let current = self
                    .db_client
                    .get_agreement_by_id(agreement_id)
                    .await?
                    .ok_or(ServiceError::AgreementNotFound(agreement_id))?;
                if current.signature_of(role).is_some() {
                    return Err(ServiceError::AlreadySigned(agreement_id, role));
                }
                return Err(ServiceError::ConcurrentModification(agreement_id));
            }
        };

        if let Some(counterparty) = collaboration.counterparty(actor_id) {
            self.notification_service
                .collaboration_event(
                    &collaboration,
                    counterparty,
                    "agreement_signed",
                    "Agreement signed",
                    format!("The {} has signed the collaboration agreement.", role.to_str()),
                )
                .await;
        }

        if signed.is_fully_executed {
            self.collaboration_service
                .activate(signed.collaboration_id, signed.deal_type)
                .await?;
        }

        Ok(signed)
    }

    async fn resolve_role(
        &self,
        agreement: &Agreement,
        actor_id: Uuid,
    ) -> Result<(PartyRole, crate::models::collabmodel::Collaboration), ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(agreement.collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(agreement.collaboration_id))?;

        let role = if actor_id == collaboration.host_id {
            PartyRole::Host
        } else if actor_id == collaboration.creator_id {
            PartyRole::Creator
        } else {
            return Err(ServiceError::Forbidden(actor_id, agreement.id));
        };

        Ok((role, collaboration))
    }
}

/// Render the immutable contract text from the final accepted terms.
pub fn render_agreement_text(offer: &Offer) -> String {
    let mut sections = vec![
        "COLLABORATION AGREEMENT".to_string(),
        format!("Deal type: {}", offer.offer_type.to_str()),
    ];

    if offer.offer_type.has_cash_compensation() {
        sections.push(format!(
            "Compensation: {} minor currency units, payable on content approval.",
            offer.cash_amount_minor
        ));
        sections.push(format!(
            "Host total at payment (including platform markup): {} minor currency units.",
            host_total_minor(offer.cash_amount_minor)
        ));
    }

    if let Some(nights) = offer.stay_nights {
        sections.push(format!(
            "Compensation: a complimentary stay of {} night(s) at the listed property.",
            nights
        ));
    }

    if offer.traffic_bonus_enabled {
        if let (Some(threshold), Some(amount)) = (
            offer.traffic_bonus_threshold_clicks,
            offer.traffic_bonus_amount_minor,
        ) {
            sections.push(format!(
                "Traffic bonus: {} minor currency units once the tracked affiliate link exceeds {} clicks.",
                amount, threshold
            ));
        }
    }

    sections.push(format!("Deliverables: {}.", offer.deliverables.join(", ")));
    sections.push(format!(
        "Content deadline: {} days from agreement execution.",
        offer.content_deadline_days
    ));
    sections.push(
        "This agreement takes effect when both the host and the creator have signed.".to_string(),
    );

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::offermodel::{OfferStatus, OfferType};
    use chrono::Utc;

    fn offer(offer_type: OfferType) -> Offer {
        Offer {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            offer_type,
            cash_amount_minor: 50_000,
            stay_nights: None,
            traffic_bonus_enabled: false,
            traffic_bonus_threshold_clicks: None,
            traffic_bonus_amount_minor: None,
            deliverables: vec!["2 Instagram Reels".to_string(), "1 TikTok".to_string()],
            message: None,
            content_deadline_days: 30,
            counter_cash_amount_minor: None,
            counter_message: None,
            status: OfferStatus::Accepted,
            resent_from: None,
            version: 1,
            created_at: Utc::now(),
            expires_at: Offer::expiry_from(Utc::now()),
            responded_at: None,
            viewed_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cash_deal_text_quotes_amount_and_markup_total() {
        let text = render_agreement_text(&offer(OfferType::Flat));
        assert!(text.contains("flat"));
        assert!(text.contains("50000"));
        assert!(text.contains("57500"));
        assert!(text.contains("2 Instagram Reels, 1 TikTok"));
    }

    #[test]
    fn stay_deal_text_quotes_nights_not_cash() {
        let mut o = offer(OfferType::PostForStay);
        o.cash_amount_minor = 0;
        o.stay_nights = Some(3);
        let text = render_agreement_text(&o);
        assert!(text.contains("3 night(s)"));
        assert!(!text.contains("payable on content approval"));
    }

    #[test]
    fn bonus_terms_appear_only_when_enabled() {
        let mut o = offer(OfferType::FlatWithBonus);
        o.traffic_bonus_enabled = true;
        o.traffic_bonus_threshold_clicks = Some(1_000);
        o.traffic_bonus_amount_minor = Some(10_000);
        let text = render_agreement_text(&o);
        assert!(text.contains("1000 clicks"));

        let plain = render_agreement_text(&offer(OfferType::Flat));
        assert!(!plain.contains("Traffic bonus"));
    }
}
