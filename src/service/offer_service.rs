use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{collabdb::CollabExt, db::DBClient, offerdb::OfferExt},
    dtos::offerdtos::{CreateOfferDto, RespondAction, RespondOfferDto},
    models::{
        offermodel::{NegotiationAction, Offer, OfferStatus},
        partymodel::PartyRole,
    },
    service::{
        agreement_service::{render_agreement_text, AgreementService},
        error::ServiceError,
        notification_service::NotificationService,
    },
};

/// Owns the offer state machine: creation, counter-negotiation,
/// accept/decline/withdraw/expire/resend. Acceptance settles the offer,
/// spawns the collaboration and drafts its agreement in one transaction.
#[derive(Debug, Clone)]
pub struct OfferService {
    db_client: Arc<DBClient>,
    agreement_service: Arc<AgreementService>,
    notification_service: Arc<NotificationService>,
}

impl OfferService {
    pub fn new(
        db_client: Arc<DBClient>,
        agreement_service: Arc<AgreementService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            agreement_service,
            notification_service,
        }
    }

    pub async fn create_offer(
        &self,
        host_id: Uuid,
        dto: CreateOfferDto,
    ) -> Result<Offer, ServiceError> {
        validate_offer_terms(&dto)?;

        let offer = self
            .db_client
            .create_offer(
                host_id,
                dto.creator_id,
                dto.property_id,
                dto.offer_type,
                dto.cash_amount_minor,
                dto.stay_nights,
                dto.traffic_bonus_enabled,
                dto.traffic_bonus_threshold_clicks,
                dto.traffic_bonus_amount_minor,
                dto.deliverables,
                dto.message.clone(),
                dto.content_deadline_days,
                None,
            )
            .await?;

        self.log_round(
            &offer,
            host_id,
            NegotiationAction::Created,
            Some(offer.cash_amount_minor),
            dto.message,
        )
        .await;

        self.notification_service
            .offer_event(
                &offer,
                offer.creator_id,
                "offer_received",
                "New collaboration offer",
                "A host has sent you a collaboration offer. It expires in 14 days.".to_string(),
            )
            .await;

        Ok(offer)
    }

    pub async fn get_offer(&self, offer_id: Uuid, actor_id: Uuid) -> Result<Offer, ServiceError> {
        let offer = self
            .db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        if offer.counterparty(actor_id).is_none() {
            return Err(ServiceError::Forbidden(actor_id, offer_id));
        }

        Ok(offer)
    }

    pub async fn list_for_host(&self, host_id: Uuid) -> Result<Vec<Offer>, ServiceError> {
        Ok(self.db_client.get_offers_by_host(host_id).await?)
    }

    pub async fn list_for_creator(&self, creator_id: Uuid) -> Result<Vec<Offer>, ServiceError> {
        Ok(self.db_client.get_offers_by_creator(creator_id).await?)
    }

    /// Creator-side read receipt. Advisory only; never fails on a re-view.
    pub async fn mark_viewed(&self, offer_id: Uuid, creator_id: Uuid) -> Result<Offer, ServiceError> {
        let offer = self
            .db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        if offer.creator_id != creator_id {
            return Err(ServiceError::Forbidden(creator_id, offer_id));
        }

        self.db_client
            .mark_offer_viewed(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))
    }

    pub async fn negotiation_history(
        &self,
        offer_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<crate::models::offermodel::NegotiationRound>, ServiceError> {
        let offer = self
            .db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        if offer.counterparty(actor_id).is_none() {
            return Err(ServiceError::Forbidden(actor_id, offer_id));
        }

        Ok(self.db_client.get_negotiation_rounds(offer_id).await?)
    }

    /// The negotiation table: pending offers are answered by the creator
    /// (accept / decline / counter), countered offers by the host
    /// (accept / decline / re-counter). Anything else is rejected with the
    /// offer's actual status so the caller can reconcile.
    pub async fn respond(
        &self,
        offer_id: Uuid,
        actor_id: Uuid,
        dto: RespondOfferDto,
    ) -> Result<Offer, ServiceError> {
        let offer = self
            .db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        if offer.counterparty(actor_id).is_none() {
            return Err(ServiceError::Forbidden(actor_id, offer_id));
        }

        let actor_role = if actor_id == offer.host_id {
            PartyRole::Host
        } else {
            PartyRole::Creator
        };

        let action = dto.action;
        if offer.status.responder_role() != Some(actor_role) {
            return Err(ServiceError::InvalidOfferTransition {
                offer_id,
                current: offer.status,
                action: action.to_str(),
            });
        }

        match (offer.status, action) {
            (OfferStatus::Pending, RespondAction::Counter) => {
                let amount = counter_amount(&dto)?;
                let updated = self
                    .db_client
                    .set_offer_countered(offer_id, offer.version, amount, dto.counter_message.clone())
                    .await?;
                let updated = self
                    .resolve_cas(updated, offer_id, offer.status, action.to_str())
                    .await?;

                self.log_round(
                    &updated,
                    actor_id,
                    NegotiationAction::Countered,
                    Some(amount),
                    dto.counter_message,
                )
                .await;

                self.notification_service
                    .offer_event(
                        &updated,
                        updated.host_id,
                        "offer_countered",
                        "Counter-offer received",
                        format!(
                            "The creator countered your offer with {} minor currency units.",
                            amount
                        ),
                    )
                    .await;

                Ok(updated)
            }

            (OfferStatus::Countered, RespondAction::ReCounter) => {
                let amount = counter_amount(&dto)?;
                let updated = self
                    .db_client
                    .set_offer_recountered(offer_id, offer.version, amount)
                    .await?;
                let updated = self
                    .resolve_cas(updated, offer_id, offer.status, action.to_str())
                    .await?;

                self.log_round(
                    &updated,
                    actor_id,
                    NegotiationAction::ReCountered,
                    Some(amount),
                    dto.counter_message,
                )
                .await;

                // A half-signed contract from an earlier round must be
                // re-drafted with the new terms; an executed one never is.
                if let Some(collaboration) =
                    self.db_client.get_collaboration_by_offer(offer_id).await?
                {
                    self.agreement_service
                        .redraft(collaboration.id, &updated)
                        .await?;
                }

                self.notification_service
                    .offer_event(
                        &updated,
                        updated.creator_id,
                        "offer_recountered",
                        "Offer updated",
                        format!(
                            "The host replied with a revised amount of {} minor currency units.",
                            amount
                        ),
                    )
                    .await;

                Ok(updated)
            }

            (OfferStatus::Pending, RespondAction::Accept)
            | (OfferStatus::Countered, RespondAction::Accept) => {
                // Render the contract from the terms as they will stand once
                // the pending counter (if any) is adopted.
                let mut final_terms = offer.clone();
                if let Some(counter) = final_terms.counter_cash_amount_minor.take() {
                    final_terms.cash_amount_minor = counter;
                }
                final_terms.counter_message = None;
                let agreement_text = render_agreement_text(&final_terms);
                let content_deadline =
                    Utc::now() + Duration::days(offer.content_deadline_days as i64);

                // Offer settlement, collaboration and draft agreement commit
                // or roll back as one unit.
                let (updated, _collaboration, _agreement) = match self
                    .db_client
                    .accept_offer_tx(offer_id, offer.version, agreement_text, content_deadline)
                    .await?
                {
                    Some(result) => result,
                    None => {
                        return Err(self
                            .cas_conflict(offer_id, offer.status, action.to_str())
                            .await)
                    }
                };

                self.log_round(
                    &updated,
                    actor_id,
                    NegotiationAction::Accepted,
                    Some(updated.cash_amount_minor),
                    None,
                )
                .await;

                if let Some(counterparty) = updated.counterparty(actor_id) {
                    self.notification_service
                        .offer_event(
                            &updated,
                            counterparty,
                            "offer_accepted",
                            "Offer accepted",
                            "The offer was accepted. Review and sign the collaboration agreement.".to_string(),
                        )
                        .await;
                }

                Ok(updated)
            }

            (OfferStatus::Pending, RespondAction::Decline)
            | (OfferStatus::Countered, RespondAction::Decline) => {
                let updated = self
                    .db_client
                    .set_offer_terminal(offer_id, offer.version, OfferStatus::Declined)
                    .await?;
                let updated = self
                    .resolve_cas(updated, offer_id, offer.status, action.to_str())
                    .await?;

                self.log_round(&updated, actor_id, NegotiationAction::Declined, None, None)
                    .await;

                if let Some(counterparty) = updated.counterparty(actor_id) {
                    self.notification_service
                        .offer_event(
                            &updated,
                            counterparty,
                            "offer_declined",
                            "Offer declined",
                            "The offer was declined.".to_string(),
                        )
                        .await;
                }

                Ok(updated)
            }

            _ => Err(ServiceError::InvalidOfferTransition {
                offer_id,
                current: offer.status,
                action: action.to_str(),
            }),
        }
    }

    pub async fn withdraw(&self, offer_id: Uuid, host_id: Uuid) -> Result<Offer, ServiceError> {
        let offer = self
            .db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        if offer.host_id != host_id {
            return Err(ServiceError::Forbidden(host_id, offer_id));
        }
        if !offer.status.is_open() {
            return Err(ServiceError::InvalidOfferTransition {
                offer_id,
                current: offer.status,
                action: "withdraw",
            });
        }

        let updated = self
            .db_client
            .set_offer_terminal(offer_id, offer.version, OfferStatus::Withdrawn)
            .await?;
        let updated = self
            .resolve_cas(updated, offer_id, offer.status, "withdraw")
            .await?;

        self.log_round(&updated, host_id, NegotiationAction::Withdrawn, None, None)
            .await;

        self.notification_service
            .offer_event(
                &updated,
                updated.creator_id,
                "offer_withdrawn",
                "Offer withdrawn",
                "The host has withdrawn their offer.".to_string(),
            )
            .await;

        Ok(updated)
    }

    /// Resurrect an expired or declined offer as a brand-new record with
    /// identical terms and a fresh 14-day expiry. The original is never
    /// mutated.
    pub async fn resend(&self, offer_id: Uuid, host_id: Uuid) -> Result<Offer, ServiceError> {
        let source = self
            .db_client
            .get_offer_by_id(offer_id)
            .await?
            .ok_or(ServiceError::OfferNotFound(offer_id))?;

        if source.host_id != host_id {
            return Err(ServiceError::Forbidden(host_id, offer_id));
        }
        if !source.status.is_resendable() {
            return Err(ServiceError::InvalidOfferTransition {
                offer_id,
                current: source.status,
                action: "resend",
            });
        }

        let resent = self
            .db_client
            .create_offer(
                source.host_id,
                source.creator_id,
                source.property_id,
                source.offer_type,
                source.cash_amount_minor,
                source.stay_nights,
                source.traffic_bonus_enabled,
                source.traffic_bonus_threshold_clicks,
                source.traffic_bonus_amount_minor,
                source.deliverables.clone(),
                source.message.clone(),
                source.content_deadline_days,
                Some(source.id),
            )
            .await?;

        self.log_round(
            &resent,
            host_id,
            NegotiationAction::Resent,
            Some(resent.cash_amount_minor),
            None,
        )
        .await;

        self.notification_service
            .offer_event(
                &resent,
                resent.creator_id,
                "offer_resent",
                "Offer re-sent",
                "A host has re-sent a previous collaboration offer with a fresh expiry.".to_string(),
            )
            .await;

        Ok(resent)
    }

    /// System-driven sweep: one idempotent statement flips every open offer
    /// past its expiry. Safe to run repeatedly and concurrently with user
    /// responses; the version bump makes racing responders re-read.
    pub async fn expire_sweep(&self) -> Result<usize, ServiceError> {
        let expired = self.db_client.expire_open_offers(Utc::now()).await?;

        for offer in &expired {
            for recipient in [offer.host_id, offer.creator_id] {
                self.notification_service
                    .offer_event(
                        offer,
                        recipient,
                        "offer_expired",
                        "Offer expired",
                        "The offer reached its 14-day expiry without an agreement.".to_string(),
                    )
                    .await;
            }
        }

        Ok(expired.len())
    }

    /// The audit log is best-effort relative to the transition it records;
    /// a logging failure must not undo a committed state change.
    async fn log_round(
        &self,
        offer: &Offer,
        actor_id: Uuid,
        action: NegotiationAction,
        cash_amount_minor: Option<i64>,
        message: Option<String>,
    ) {
        if let Err(e) = self
            .db_client
            .append_negotiation_round(offer.id, actor_id, action, cash_amount_minor, message)
            .await
        {
            tracing::warn!("failed to append negotiation round for offer {}: {}", offer.id, e);
        }
    }

    async fn resolve_cas(
        &self,
        cas_result: Option<Offer>,
        offer_id: Uuid,
        expected: OfferStatus,
        action: &'static str,
    ) -> Result<Offer, ServiceError> {
        match cas_result {
            Some(offer) => Ok(offer),
            None => Err(self.cas_conflict(offer_id, expected, action).await),
        }
    }

    /// A guarded write matched no row: re-read to tell a lost race on the
    /// same status apart from a transition that is no longer legal.
    async fn cas_conflict(
        &self,
        offer_id: Uuid,
        expected: OfferStatus,
        action: &'static str,
    ) -> ServiceError {
        match self.db_client.get_offer_by_id(offer_id).await {
            Err(e) => ServiceError::Database(e),
            Ok(None) => ServiceError::OfferNotFound(offer_id),
            Ok(Some(current)) if current.status != expected => {
                ServiceError::InvalidOfferTransition {
                    offer_id,
                    current: current.status,
                    action,
                }
            }
            Ok(Some(_)) => ServiceError::ConcurrentModification(offer_id),
        }
    }
}

fn counter_amount(dto: &RespondOfferDto) -> Result<i64, ServiceError> {
    let amount = dto.counter_cash_amount_minor.ok_or_else(|| {
        ServiceError::Validation("A counter requires a cash amount".to_string())
    })?;
    if amount <= 0 {
        return Err(ServiceError::InvalidAmount(amount));
    }
    Ok(amount)
}

/// Cross-field rules the derive-level validators cannot express: the
/// compensation shape must match the offer type, and bonus terms are
/// present exactly when the bonus is enabled.
fn validate_offer_terms(dto: &CreateOfferDto) -> Result<(), ServiceError> {
    if dto.offer_type.requires_stay() {
        if dto.stay_nights.unwrap_or(0) <= 0 {
            return Err(ServiceError::Validation(
                "Post-for-stay offers must include a positive number of nights".to_string(),
            ));
        }
        if dto.cash_amount_minor != 0 {
            return Err(ServiceError::Validation(
                "Post-for-stay offers cannot carry a cash amount".to_string(),
            ));
        }
    } else {
        if dto.cash_amount_minor <= 0 {
            return Err(ServiceError::Validation(
                "Cash offers must have a positive cash amount".to_string(),
            ));
        }
        if dto.stay_nights.is_some() {
            return Err(ServiceError::Validation(
                "Only post-for-stay offers may include stay nights".to_string(),
            ));
        }
    }

    if dto.traffic_bonus_enabled {
        if dto.traffic_bonus_threshold_clicks.is_none() || dto.traffic_bonus_amount_minor.is_none()
        {
            return Err(ServiceError::Validation(
                "Traffic bonus offers must set both a click threshold and a bonus amount"
                    .to_string(),
            ));
        }
    } else if dto.traffic_bonus_threshold_clicks.is_some()
        || dto.traffic_bonus_amount_minor.is_some()
    {
        return Err(ServiceError::Validation(
            "Bonus terms are only allowed when the traffic bonus is enabled".to_string(),
        ));
    }

    if dto.deliverables.iter().any(|d| d.trim().is_empty()) {
        return Err(ServiceError::Validation(
            "Deliverables cannot be blank".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::offermodel::OfferType;

    fn flat_dto() -> CreateOfferDto {
        CreateOfferDto {
            creator_id: Uuid::new_v4(),
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
        }
    }

    #[test]
    fn compensation_shape_must_match_the_offer_type() {
        assert!(validate_offer_terms(&flat_dto()).is_ok());

        let mut no_cash = flat_dto();
        no_cash.cash_amount_minor = 0;
        assert!(validate_offer_terms(&no_cash).is_err());

        let mut cash_with_nights = flat_dto();
        cash_with_nights.stay_nights = Some(3);
        assert!(validate_offer_terms(&cash_with_nights).is_err());

        let mut stay = flat_dto();
        stay.offer_type = OfferType::PostForStay;
        stay.cash_amount_minor = 0;
        stay.stay_nights = Some(3);
        assert!(validate_offer_terms(&stay).is_ok());

        let mut stay_with_cash = stay;
        stay_with_cash.cash_amount_minor = 10_000;
        assert!(validate_offer_terms(&stay_with_cash).is_err());
    }

    #[test]
    fn bonus_terms_travel_with_the_bonus_flag() {
        let mut bonus = flat_dto();
        bonus.offer_type = OfferType::FlatWithBonus;
        bonus.traffic_bonus_enabled = true;
        assert!(validate_offer_terms(&bonus).is_err());

        bonus.traffic_bonus_threshold_clicks = Some(1_000);
        bonus.traffic_bonus_amount_minor = Some(10_000);
        assert!(validate_offer_terms(&bonus).is_ok());

        let mut orphaned = flat_dto();
        orphaned.traffic_bonus_threshold_clicks = Some(1_000);
        assert!(validate_offer_terms(&orphaned).is_err());
    }

    #[test]
    fn counters_must_carry_a_positive_amount() {
        let dto = RespondOfferDto {
            action: RespondAction::Counter,
            counter_cash_amount_minor: Some(60_000),
            counter_message: None,
        };
        assert_eq!(counter_amount(&dto).unwrap(), 60_000);

        let zero = RespondOfferDto {
            action: RespondAction::Counter,
            counter_cash_amount_minor: Some(0),
            counter_message: None,
        };
        assert!(matches!(
            counter_amount(&zero),
            Err(ServiceError::InvalidAmount(0))
        ));

        let missing = RespondOfferDto {
            action: RespondAction::Counter,
            counter_cash_amount_minor: None,
            counter_message: None,
        };
        assert!(matches!(
            counter_amount(&missing),
            Err(ServiceError::Validation(_))
        ));
    }
}
