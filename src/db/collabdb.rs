use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::collabmodel::*;

pub(super) const COLLAB_COLUMNS: &str = r#"
    id, offer_id, host_id, creator_id, property_id, agreement_id,
    status, payment_status, platform_fee_status, paid_at,
    content_links, content_submitted_at, content_approved_at, change_request_feedback,
    clicks_generated, traffic_bonus_threshold_clicks, traffic_bonus_amount_minor, traffic_bonus_payable,
    affiliate_token,
    cancellation_requested_by, cancellation_reason, cancellation_requested_at, prior_status,
    version, created_at, updated_at
"#;

#[async_trait]
pub trait CollabExt {
    async fn get_collaboration_by_id(
        &self,
        collaboration_id: Uuid,
    ) -> Result<Option<Collaboration>, Error>;

    async fn get_collaboration_by_offer(&self, offer_id: Uuid)
        -> Result<Option<Collaboration>, Error>;

    async fn get_collaboration_by_affiliate_token(
        &self,
        affiliate_token: &str,
    ) -> Result<Option<Collaboration>, Error>;

    async fn get_collaborations_for_party(
        &self,
        party_id: Uuid,
    ) -> Result<Vec<Collaboration>, Error>;

    /// Activation CAS: only fires from `pending_agreement` with no token
    /// minted yet, so the affiliate token is assigned exactly once.
    async fn activate_collaboration(
        &self,
        collaboration_id: Uuid,
        affiliate_token: &str,
        platform_fee_status: PlatformFeeStatus,
    ) -> Result<Option<Collaboration>, Error>;

    /// Park a post-for-stay collaboration while the platform fee is unpaid.
    async fn mark_fee_pending(&self, collaboration_id: Uuid)
        -> Result<Option<Collaboration>, Error>;

    async fn submit_content(
        &self,
        collaboration_id: Uuid,
        version: i64,
        content_links: Vec<String>,
    ) -> Result<Option<Collaboration>, Error>;

    async fn approve_content(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error>;

    async fn request_changes(
        &self,
        collaboration_id: Uuid,
        version: i64,
        feedback: Option<String>,
    ) -> Result<Option<Collaboration>, Error>;

    /// Mark the host charge as in flight before calling the gateway.
    async fn set_payment_pending(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error>;

    /// Gateway confirmed: payment completed, collaboration completed.
    async fn complete_payment(&self, collaboration_id: Uuid)
        -> Result<Option<Collaboration>, Error>;

    /// Monotonic click accrual. The bonus-payable flag latches on the first
    /// threshold crossing and never resets.
    async fn record_clicks(
        &self,
        collaboration_id: Uuid,
        delta: i64,
    ) -> Result<Option<Collaboration>, Error>;

    async fn request_cancellation(
        &self,
        collaboration_id: Uuid,
        version: i64,
        requested_by: Uuid,
        reason: Option<String>,
    ) -> Result<Option<Collaboration>, Error>;

    /// Terminal cancel; request fields are retained for audit.
    async fn accept_cancellation(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error>;

    /// Restore the remembered prior status and clear the request fields.
    async fn decline_cancellation(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error>;
}

#[async_trait]
impl CollabExt for DBClient {
    async fn get_collaboration_by_id(
        &self,
        collaboration_id: Uuid,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!("SELECT {} FROM collaborations WHERE id = $1", COLLAB_COLUMNS);

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_collaboration_by_offer(
        &self,
        offer_id: Uuid,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            "SELECT {} FROM collaborations WHERE offer_id = $1",
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_collaboration_by_affiliate_token(
        &self,
        affiliate_token: &str,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            "SELECT {} FROM collaborations WHERE affiliate_token = $1",
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(affiliate_token)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_collaborations_for_party(
        &self,
        party_id: Uuid,
    ) -> Result<Vec<Collaboration>, Error> {
        let query = format!(
            r#"
            SELECT {} FROM collaborations
            WHERE host_id = $1 OR creator_id = $1
            ORDER BY created_at DESC
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(party_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn activate_collaboration(
        &self,
        collaboration_id: Uuid,
        affiliate_token: &str,
        platform_fee_status: PlatformFeeStatus,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET status = 'active',
                affiliate_token = $2,
                platform_fee_status = $3,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending_agreement' AND affiliate_token IS NULL
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(affiliate_token)
            .bind(platform_fee_status)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_fee_pending(
        &self,
        collaboration_id: Uuid,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET platform_fee_status = 'fee_pending',
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending_agreement'
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn submit_content(
        &self,
        collaboration_id: Uuid,
        version: i64,
        content_links: Vec<String>,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET status = 'content_submitted',
                content_links = $3,
                content_submitted_at = NOW(),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'active'
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(version)
            .bind(content_links)
            .fetch_optional(&self.pool)
            .await
    }

    async fn approve_content(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET status = 'approved',
                content_approved_at = NOW(),
                change_request_feedback = NULL,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'content_submitted'
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
    }

    async fn request_changes(
        &self,
        collaboration_id: Uuid,
        version: i64,
        feedback: Option<String>,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET status = 'active',
                change_request_feedback = $3,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'content_submitted'
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(version)
            .bind(feedback)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_payment_pending(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET payment_status = 'pending',
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'approved'
              AND payment_status IN ('unpaid', 'pending')
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
    }

    async fn complete_payment(
        &self,
        collaboration_id: Uuid,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET status = 'completed',
                payment_status = 'completed',
                paid_at = NOW(),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND status = 'approved' AND payment_status = 'pending'
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn record_clicks(
        &self,
        collaboration_id: Uuid,
        delta: i64,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET clicks_generated = clicks_generated + $2,
                traffic_bonus_payable = traffic_bonus_payable OR (
                    traffic_bonus_threshold_clicks IS NOT NULL
                    AND clicks_generated + $2 >= traffic_bonus_threshold_clicks
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await
    }

    async fn request_cancellation(
        &self,
        collaboration_id: Uuid,
        version: i64,
        requested_by: Uuid,
        reason: Option<String>,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET prior_status = status,
                status = 'cancellation_requested',
                cancellation_requested_by = $3,
                cancellation_reason = $4,
                cancellation_requested_at = NOW(),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
              AND status NOT IN ('completed', 'cancelled', 'cancellation_requested')
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(version)
            .bind(requested_by)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await
    }

    async fn accept_cancellation(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET status = 'cancelled',
                prior_status = NULL,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'cancellation_requested'
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
    }

    async fn decline_cancellation(
        &self,
        collaboration_id: Uuid,
        version: i64,
    ) -> Result<Option<Collaboration>, Error> {
        let query = format!(
            r#"
            UPDATE collaborations
            SET status = prior_status,
                prior_status = NULL,
                cancellation_requested_by = NULL,
                cancellation_reason = NULL,
                cancellation_requested_at = NULL,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'cancellation_requested'
              AND prior_status IS NOT NULL
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaboration_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::offerdb::OfferExt;
    use crate::models::offermodel::OfferType;
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    async fn seed_party(pool: &PgPool, role: &str) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO parties (name, email, role) VALUES ($1, $2, $3::party_role) RETURNING id",
        )
        .bind(format!("{} under test", role))
        .bind(format!("{}-{}@example.com", role, Uuid::new_v4()))
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_collaboration(
        pool: &PgPool,
        db: &DBClient,
        offer_type: OfferType,
    ) -> Collaboration {
        let host_id = seed_party(pool, "host").await;
        let creator_id = seed_party(pool, "creator").await;

        let (cash, nights) = match offer_type {
            OfferType::PostForStay => (0, Some(3)),
            _ => (50_000, None),
        };

        let offer = db
            .create_offer(
                host_id,
                creator_id,
                Uuid::new_v4(),
                offer_type,
                cash,
                nights,
                false,
                None,
                None,
                vec!["2 Instagram Reels".to_string()],
                None,
                30,
                None,
            )
            .await
            .unwrap();

        let (_, collaboration, _) = db
            .accept_offer_tx(
                offer.id,
                offer.version,
                "terms".to_string(),
                Utc::now() + Duration::days(30),
            )
            .await
            .unwrap()
            .unwrap();
        collaboration
    }

    #[sqlx::test]
    async fn activation_mints_exactly_one_affiliate_token(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let collaboration = seed_collaboration(&pool, &db, OfferType::Flat).await;

        let activated = db
            .activate_collaboration(collaboration.id, "stay-abc123", PlatformFeeStatus::NotRequired)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(activated.status, CollaborationStatus::Active);
        assert_eq!(activated.affiliate_token.as_deref(), Some("stay-abc123"));

        // the loser of a double activation changes nothing
        let replay = db
            .activate_collaboration(collaboration.id, "stay-def456", PlatformFeeStatus::NotRequired)
            .await
            .unwrap();
        assert!(replay.is_none());

        let stored = db
            .get_collaboration_by_id(collaboration.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.affiliate_token.as_deref(), Some("stay-abc123"));
        assert_eq!(stored.version, activated.version);
    }

    #[sqlx::test]
    async fn fee_pending_parks_and_later_resumes_activation(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let collaboration = seed_collaboration(&pool, &db, OfferType::PostForStay).await;

        let parked = db
            .mark_fee_pending(collaboration.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parked.status, CollaborationStatus::PendingAgreement);
        assert_eq!(parked.platform_fee_status, PlatformFeeStatus::FeePending);
        assert_eq!(parked.affiliate_token, None);

        // the fee clears out of band and activation resumes
        let activated = db
            .activate_collaboration(collaboration.id, "stay-xyz789", PlatformFeeStatus::Paid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(activated.status, CollaborationStatus::Active);
        assert_eq!(activated.platform_fee_status, PlatformFeeStatus::Paid);
        assert!(activated.affiliate_token.is_some());

        // parking is only legal before activation
        assert!(db.mark_fee_pending(collaboration.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn declined_cancellation_restores_the_prior_status(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let collaboration = seed_collaboration(&pool, &db, OfferType::Flat).await;

        let active = db
            .activate_collaboration(collaboration.id, "stay-qrs321", PlatformFeeStatus::NotRequired)
            .await
            .unwrap()
            .unwrap();

        let requested = db
            .request_cancellation(
                collaboration.id,
                active.version,
                collaboration.host_id,
                Some("dates no longer work".into()),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(requested.status, CollaborationStatus::CancellationRequested);
        assert_eq!(requested.prior_status, Some(CollaborationStatus::Active));
        assert_eq!(
            requested.cancellation_requested_by,
            Some(collaboration.host_id)
        );

        let declined = db
            .decline_cancellation(collaboration.id, requested.version)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(declined.status, CollaborationStatus::Active);
        assert_eq!(declined.prior_status, None);
        assert_eq!(declined.cancellation_requested_by, None);
        assert_eq!(declined.cancellation_reason, None);
        assert_eq!(declined.cancellation_requested_at, None);

        // a decline without a pending request has nothing to restore
        assert!(db
            .decline_cancellation(collaboration.id, declined.version)
            .await
            .unwrap()
            .is_none());
    }
}
