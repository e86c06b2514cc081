use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{agreementdb::AgreementExt, collabdb::CollabExt, db::DBClient},
    dtos::collabdtos::{CancellationDecision, ReviewDecision},
    models::{collabmodel::*, offermodel::OfferType},
    service::{
        error::ServiceError,
        notification_service::NotificationService,
        payment_gateway::{ChargePurpose, PaymentGatewayService},
    },
    utils::affiliate::mint_affiliate_token,
};

/// Owns the post-execution lifecycle: activation (with the post-for-stay fee
/// gate), content submission and review, payment, click accrual, and the
/// cooperative cancellation sub-protocol.
#[derive(Debug, Clone)]
pub struct CollaborationService {
    db_client: Arc<DBClient>,
    payment_gateway: Arc<PaymentGatewayService>,
    notification_service: Arc<NotificationService>,
}

impl CollaborationService {
    pub fn new(
        db_client: Arc<DBClient>,
        payment_gateway: Arc<PaymentGatewayService>,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            payment_gateway,
            notification_service,
        }
    }

    /// Invoked by the signing flow when the second signature lands.
    ///
    /// Cash deals activate immediately. Post-for-stay deals first charge the
    /// flat platform fee; a gateway failure parks the collaboration in
    /// `pending_agreement` with `fee_pending` instead of failing the signing
    /// transition, and activation resumes via retry or webhook.
    pub async fn activate(
        &self,
        collaboration_id: Uuid,
        deal_type: OfferType,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        let fee_status = if deal_type.requires_stay() {
            match self.charge_platform_fee(&collaboration).await {
                Ok(()) => PlatformFeeStatus::Paid,
                Err(e) => {
                    tracing::warn!(
                        "platform fee charge failed for collaboration {}: {}",
                        collaboration_id,
                        e
                    );
                    let parked = self
                        .db_client
                        .mark_fee_pending(collaboration_id)
                        .await?
                        .unwrap_or(collaboration);

                    self.notification_service
                        .collaboration_event(
                            &parked,
                            parked.host_id,
                            "platform_fee_pending",
                            "Platform fee payment needed",
                            "Your agreement is fully signed, but the platform fee could not be charged. Retry the payment to activate the collaboration.".to_string(),
                        )
                        .await;

                    return Ok(parked);
                }
            }
        } else {
            PlatformFeeStatus::NotRequired
        };

        self.finish_activation(collaboration_id, fee_status).await
    }

    /// Host-initiated retry of a failed post-for-stay platform fee.
    pub async fn retry_platform_fee(
        &self,
        collaboration_id: Uuid,
        host_id: Uuid,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if collaboration.host_id != host_id {
            return Err(ServiceError::Forbidden(host_id, collaboration_id));
        }
        if collaboration.platform_fee_status != PlatformFeeStatus::FeePending
            || collaboration.status != CollaborationStatus::PendingAgreement
        {
            return Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: collaboration.status,
                action: "retry-platform-fee",
            });
        }

        // Synchronous gate: surface the gateway failure so the host can retry.
        self.charge_platform_fee(&collaboration).await?;

        self.finish_activation(collaboration_id, PlatformFeeStatus::Paid)
            .await
    }

    /// Gateway webhook confirmed a platform-fee charge out of band.
    pub async fn resume_activation_from_webhook(
        &self,
        collaboration_id: Uuid,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if collaboration.status != CollaborationStatus::PendingAgreement
            || collaboration.platform_fee_status != PlatformFeeStatus::FeePending
        {
            // Already activated or not waiting on a fee; webhook replay is a no-op.
            return Ok(collaboration);
        }

        self.finish_activation(collaboration_id, PlatformFeeStatus::Paid)
            .await
    }

    async fn charge_platform_fee(&self, collaboration: &Collaboration) -> Result<(), ServiceError> {
        let idempotency_key = format!("fee-{}", collaboration.id);
        self.payment_gateway
            .charge(
                collaboration.host_id,
                POST_FOR_STAY_FEE_MINOR,
                ChargePurpose::PlatformFee,
                &idempotency_key,
            )
            .await?;
        Ok(())
    }

    /// The activation CAS only succeeds from `pending_agreement` with no
    /// affiliate token yet, so concurrent activation attempts (double
    /// webhook, webhook racing a retry) mint exactly one token and the
    /// losers observe the already-active row.
    async fn finish_activation(
        &self,
        collaboration_id: Uuid,
        fee_status: PlatformFeeStatus,
    ) -> Result<Collaboration, ServiceError> {
        let token = mint_affiliate_token();

        let activated = match self
            .db_client
            .activate_collaboration(collaboration_id, &token, fee_status)
            .await?
        {
            Some(collaboration) => collaboration,
            None => {
                return self
                    .db_client
                    .get_collaboration_by_id(collaboration_id)
                    .await?
                    .ok_or(ServiceError::CollaborationNotFound(collaboration_id));
            }
        };

        for recipient in [activated.host_id, activated.creator_id] {
            self.notification_service
                .collaboration_event(
                    &activated,
                    recipient,
                    "collaboration_activated",
                    "Collaboration is live",
                    "Both parties have signed and the collaboration is now active.".to_string(),
                )
                .await;
        }

        Ok(activated)
    }

    pub async fn get_collaboration(
        &self,
        collaboration_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if !collaboration.is_participant(actor_id) {
            return Err(ServiceError::Forbidden(actor_id, collaboration_id));
        }

        Ok(collaboration)
    }

    pub async fn list_for_party(&self, party_id: Uuid) -> Result<Vec<Collaboration>, ServiceError> {
        Ok(self.db_client.get_collaborations_for_party(party_id).await?)
    }

    pub async fn submit_content(
        &self,
        collaboration_id: Uuid,
        creator_id: Uuid,
        content_links: Vec<String>,
    ) -> Result<Collaboration, ServiceError> {
        if content_links.is_empty() {
            return Err(ServiceError::Validation(
                "At least one content link is required".to_string(),
            ));
        }

        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if collaboration.creator_id != creator_id {
            return Err(ServiceError::Forbidden(creator_id, collaboration_id));
        }
        if collaboration.status != CollaborationStatus::Active {
            return Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: collaboration.status,
                action: "submit-content",
            });
        }

        let updated = self
            .db_client
            .submit_content(collaboration_id, collaboration.version, content_links)
            .await?;
        let updated = self
            .resolve_cas(updated, collaboration_id, CollaborationStatus::Active, "submit-content")
            .await?;

        self.notification_service
            .collaboration_event(
                &updated,
                updated.host_id,
                "content_submitted",
                "Content submitted for review",
                "The creator has submitted content for your review.".to_string(),
            )
            .await;

        Ok(updated)
    }

    pub async fn review_content(
        &self,
        collaboration_id: Uuid,
        host_id: Uuid,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if collaboration.host_id != host_id {
            return Err(ServiceError::Forbidden(host_id, collaboration_id));
        }
        if collaboration.status != CollaborationStatus::ContentSubmitted {
            return Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: collaboration.status,
                action: "review-content",
            });
        }

        let (updated, event, headline, detail) = match decision {
            ReviewDecision::Approve => {
                let updated = self
                    .db_client
                    .approve_content(collaboration_id, collaboration.version)
                    .await?;
                (
                    updated,
                    "content_approved",
                    "Content approved",
                    "The host approved your content.".to_string(),
                )
            }
            ReviewDecision::RequestChanges => {
                let updated = self
                    .db_client
                    .request_changes(collaboration_id, collaboration.version, feedback.clone())
                    .await?;
                (
                    updated,
                    "changes_requested",
                    "Changes requested",
                    feedback.unwrap_or_else(|| "The host requested changes to your content.".to_string()),
                )
            }
        };

        let updated = self
            .resolve_cas(
                updated,
                collaboration_id,
                CollaborationStatus::ContentSubmitted,
                "review-content",
            )
            .await?;

        self.notification_service
            .collaboration_event(&updated, updated.creator_id, event, headline, detail)
            .await;

        Ok(updated)
    }

    /// Charge the host the cash compensation plus the 15% platform markup.
    /// Gateway failure leaves the collaboration in `approved` with payment
    /// pending; the host may retry without re-approving content.
    pub async fn pay(
        &self,
        collaboration_id: Uuid,
        host_id: Uuid,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if collaboration.host_id != host_id {
            return Err(ServiceError::Forbidden(host_id, collaboration_id));
        }
        if collaboration.status != CollaborationStatus::Approved {
            return Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: collaboration.status,
                action: "pay",
            });
        }

        let agreement = self
            .db_client
            .get_agreement_by_collaboration(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if !agreement.deal_type.has_cash_compensation() {
            return Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: collaboration.status,
                action: "pay",
            });
        }

        let pending = self
            .db_client
            .set_payment_pending(collaboration_id, collaboration.version)
            .await?;
        let pending = self
            .resolve_cas(pending, collaboration_id, CollaborationStatus::Approved, "pay")
            .await?;

        let host_total = host_total_minor(agreement.cash_amount_minor);
        let idempotency_key = format!("payment-{}", collaboration_id);

        // Synchronous gate: the completion transition waits for the gateway.
        self.payment_gateway
            .charge(
                pending.host_id,
                host_total,
                ChargePurpose::CollaborationPayment,
                &idempotency_key,
            )
            .await?;

        let completed = self
            .db_client
            .complete_payment(collaboration_id)
            .await?
            .ok_or(ServiceError::ConcurrentModification(collaboration_id))?;

        for recipient in [completed.host_id, completed.creator_id] {
            self.notification_service
                .collaboration_event(
                    &completed,
                    recipient,
                    "payment_completed",
                    "Payment completed",
                    format!(
                        "Payment of {} minor units (including platform markup) has been completed.",
                        host_total
                    ),
                )
                .await;
        }

        Ok(completed)
    }

    pub async fn request_cancellation(
        &self,
        collaboration_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if !collaboration.is_participant(actor_id) {
            return Err(ServiceError::Forbidden(actor_id, collaboration_id));
        }
        if !collaboration.status.can_request_cancellation() {
            return Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: collaboration.status,
                action: "request-cancellation",
            });
        }

        let updated = self
            .db_client
            .request_cancellation(collaboration_id, collaboration.version, actor_id, reason.clone())
            .await?;
        let updated = self
            .resolve_cas(updated, collaboration_id, collaboration.status, "request-cancellation")
            .await?;

        if let Some(counterparty) = updated.counterparty(actor_id) {
            self.notification_service
                .collaboration_event(
                    &updated,
                    counterparty,
                    "cancellation_requested",
                    "Cancellation requested",
                    reason.unwrap_or_else(|| {
                        "The other party has asked to cancel this collaboration.".to_string()
                    }),
                )
                .await;
        }

        Ok(updated)
    }

    /// Only the party who did NOT request the cancellation may respond.
    /// Decline provably restores the remembered prior status.
    pub async fn respond_cancellation(
        &self,
        collaboration_id: Uuid,
        actor_id: Uuid,
        decision: CancellationDecision,
    ) -> Result<Collaboration, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if collaboration.status != CollaborationStatus::CancellationRequested {
            return Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: collaboration.status,
                action: "respond-cancellation",
            });
        }
        if !collaboration.is_participant(actor_id)
            || collaboration.cancellation_requested_by == Some(actor_id)
        {
            return Err(ServiceError::Forbidden(actor_id, collaboration_id));
        }

        let requester = collaboration.cancellation_requested_by;

        let (updated, event, headline, detail) = match decision {
            CancellationDecision::Accept => {
                let updated = self
                    .db_client
                    .accept_cancellation(collaboration_id, collaboration.version)
                    .await?;
                (
                    updated,
                    "cancellation_accepted",
                    "Collaboration cancelled",
                    "Your cancellation request was accepted. The collaboration is now cancelled.".to_string(),
                )
            }
            CancellationDecision::Decline => {
                let updated = self
                    .db_client
                    .decline_cancellation(collaboration_id, collaboration.version)
                    .await?;
                (
                    updated,
                    "cancellation_declined",
                    "Cancellation declined",
                    "Your cancellation request was declined. The collaboration continues.".to_string(),
                )
            }
        };

        let updated = self
            .resolve_cas(
                updated,
                collaboration_id,
                CollaborationStatus::CancellationRequested,
                "respond-cancellation",
            )
            .await?;

        if let Some(requester) = requester {
            self.notification_service
                .collaboration_event(&updated, requester, event, headline, detail)
                .await;
        }

        Ok(updated)
    }

    /// Distinguish a failed CAS: the row may be gone, may have moved to a
    /// different status (report it, per the error contract), or may have
    /// been bumped by a concurrent writer at the same status.
    async fn resolve_cas(
        &self,
        cas_result: Option<Collaboration>,
        collaboration_id: Uuid,
        expected: CollaborationStatus,
        action: &'static str,
    ) -> Result<Collaboration, ServiceError> {
        if let Some(collaboration) = cas_result {
            return Ok(collaboration);
        }

        let current = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if current.status != expected {
            Err(ServiceError::InvalidCollaborationTransition {
                collaboration_id,
                current: current.status,
                action,
            })
        } else {
            Err(ServiceError::ConcurrentModification(collaboration_id))
        }
    }
}
