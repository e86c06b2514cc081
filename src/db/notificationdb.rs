use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::notificationmodel::Notification;

#[async_trait]
pub trait NotificationExt {
    async fn store_notification(
        &self,
        party_id: Uuid,
        event_type: &str,
        subject_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
        message: String,
    ) -> Result<(), Error>;

    async fn get_party_notifications(
        &self,
        party_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, Error>;

    async fn mark_notification_read(&self, notification_id: Uuid, party_id: Uuid)
        -> Result<(), Error>;

    async fn mark_all_notifications_read(&self, party_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn store_notification(
        &self,
        party_id: Uuid,
        event_type: &str,
        subject_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
        message: String,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications
            (party_id, event_type, subject_id, metadata, message, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(party_id)
        .bind(event_type)
        .bind(subject_id)
        .bind(metadata)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_party_notifications(
        &self,
        party_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, party_id, event_type, subject_id, metadata, message, is_read, created_at
            FROM notifications
            WHERE party_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(party_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        party_id: Uuid,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true
            WHERE id = $1 AND party_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(party_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_all_notifications_read(&self, party_id: Uuid) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true
            WHERE party_id = $1 AND is_read = false
            "#,
        )
        .bind(party_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
