use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{collabdb::CollabExt, db::DBClient},
    dtos::collabdtos::TrafficStatsDto,
    models::collabmodel::Collaboration,
    service::{error::ServiceError, notification_service::NotificationService},
};

/// Accrues affiliate-link clicks against a collaboration and reports
/// bonus eligibility. Read-mostly satellite of the collaboration lifecycle.
#[derive(Debug, Clone)]
pub struct TrafficService {
    db_client: Arc<DBClient>,
    notification_service: Arc<NotificationService>,
}

impl TrafficService {
    pub fn new(db_client: Arc<DBClient>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            db_client,
            notification_service,
        }
    }

    /// Called by the external redirector on every affiliate-link hit.
    /// The increment is monotonic and the bonus-payable flag latches in
    /// the same statement, so concurrent hits never lose a click or
    /// re-trigger the bonus.
    pub async fn record_clicks(
        &self,
        affiliate_token: &str,
        delta: i64,
    ) -> Result<Collaboration, ServiceError> {
        if delta < 0 {
            return Err(ServiceError::Validation(
                "Click delta must be zero or greater".to_string(),
            ));
        }

        let collaboration = self
            .db_client
            .get_collaboration_by_affiliate_token(affiliate_token)
            .await?
            .ok_or_else(|| ServiceError::AffiliateTokenNotFound(affiliate_token.to_string()))?;

        let was_payable = collaboration.traffic_bonus_payable;

        let updated = self
            .db_client
            .record_clicks(collaboration.id, delta)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration.id))?;

        if updated.traffic_bonus_payable && !was_payable {
            self.notification_service
                .collaboration_event(
                    &updated,
                    updated.host_id,
                    "traffic_bonus_payable",
                    "Traffic bonus unlocked",
                    format!(
                        "The affiliate link crossed {} clicks. The agreed traffic bonus is now payable.",
                        updated.traffic_bonus_threshold_clicks.unwrap_or_default()
                    ),
                )
                .await;
            self.notification_service
                .collaboration_event(
                    &updated,
                    updated.creator_id,
                    "traffic_bonus_payable",
                    "Traffic bonus unlocked",
                    "Your affiliate link crossed the click threshold. The traffic bonus is now payable.".to_string(),
                )
                .await;
        }

        Ok(updated)
    }

    pub async fn traffic_stats(
        &self,
        collaboration_id: Uuid,
        actor_id: Uuid,
    ) -> Result<TrafficStatsDto, ServiceError> {
        let collaboration = self
            .db_client
            .get_collaboration_by_id(collaboration_id)
            .await?
            .ok_or(ServiceError::CollaborationNotFound(collaboration_id))?;

        if !collaboration.is_participant(actor_id) {
            return Err(ServiceError::Forbidden(actor_id, collaboration_id));
        }

        Ok(TrafficStatsDto {
            clicks_generated: collaboration.clicks_generated,
            traffic_bonus_threshold_clicks: collaboration.traffic_bonus_threshold_clicks,
            traffic_bonus_amount_minor: collaboration.traffic_bonus_amount_minor,
            traffic_bonus_payable: collaboration.traffic_bonus_payable,
            affiliate_token: collaboration.affiliate_token,
        })
    }
}
