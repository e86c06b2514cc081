use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::Config,
    db::{db::DBClient, notificationdb::NotificationExt, partydb::PartyExt},
    mail::mails,
    models::{collabmodel::Collaboration, notificationmodel::Notification, offermodel::Offer},
    service::error::ServiceError,
};

/// Informs parties of committed transitions. Strictly fire-and-forget: every
/// public method swallows and logs its own failures, so a notification
/// problem can never roll back or fail the transition that triggered it.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
    config: Config,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>, config: Config) -> Self {
        Self { db_client, config }
    }

    pub async fn offer_event(
        &self,
        offer: &Offer,
        recipient_id: Uuid,
        event_type: &str,
        headline: &str,
        detail: String,
    ) {
        let metadata = serde_json::json!({
            "offer_id": offer.id,
            "offer_type": offer.offer_type.to_str(),
            "status": offer.status.to_str(),
            "cash_amount_minor": offer.cash_amount_minor,
        });

        self.deliver(recipient_id, event_type, Some(offer.id), Some(metadata), headline, detail)
            .await;
    }

    pub async fn collaboration_event(
        &self,
        collaboration: &Collaboration,
        recipient_id: Uuid,
        event_type: &str,
        headline: &str,
        detail: String,
    ) {
        let metadata = serde_json::json!({
            "collaboration_id": collaboration.id,
            "status": collaboration.status.to_str(),
        });

        self.deliver(
            recipient_id,
            event_type,
            Some(collaboration.id),
            Some(metadata),
            headline,
            detail,
        )
        .await;
    }

    async fn deliver(
        &self,
        recipient_id: Uuid,
        event_type: &str,
        subject_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
        headline: &str,
        detail: String,
    ) {
        tracing::info!("notification '{}' for party {}", event_type, recipient_id);

        if let Err(e) = self
            .db_client
            .store_notification(recipient_id, event_type, subject_id, metadata, detail.clone())
            .await
        {
            tracing::warn!("failed to store notification '{}' for {}: {}", event_type, recipient_id, e);
        }

        match self.db_client.get_party(recipient_id).await {
            Ok(Some(party)) => {
                if let Err(e) = mails::send_event_email(
                    &self.config,
                    &party.email,
                    &party.name,
                    headline,
                    headline,
                    &detail,
                )
                .await
                {
                    tracing::warn!("failed to email {} about '{}': {}", party.email, event_type, e);
                }
            }
            Ok(None) => {
                tracing::warn!("no party record for notification recipient {}", recipient_id);
            }
            Err(e) => {
                tracing::warn!("party lookup failed for notification recipient {}: {}", recipient_id, e);
            }
        }
    }

    pub async fn get_party_notifications(
        &self,
        party_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ServiceError> {
        Ok(self
            .db_client
            .get_party_notifications(party_id, limit, offset)
            .await?)
    }

    pub async fn mark_read(&self, notification_id: Uuid, party_id: Uuid) -> Result<(), ServiceError> {
        Ok(self
            .db_client
            .mark_notification_read(notification_id, party_id)
            .await?)
    }

    pub async fn mark_all_read(&self, party_id: Uuid) -> Result<(), ServiceError> {
        Ok(self.db_client.mark_all_notifications_read(party_id).await?)
    }
}
