use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::{
    agreementdb::AGREEMENT_COLUMNS,
    collabdb::COLLAB_COLUMNS,
    db::DBClient,
};
use crate::models::{agreementmodel::Agreement, collabmodel::Collaboration, offermodel::*};

const OFFER_COLUMNS: &str = r#"
    id, host_id, creator_id, property_id,
    offer_type, cash_amount_minor, stay_nights,
    traffic_bonus_enabled, traffic_bonus_threshold_clicks, traffic_bonus_amount_minor,
    deliverables, message, content_deadline_days,
    counter_cash_amount_minor, counter_message,
    status, resent_from, version,
    created_at, expires_at, responded_at, viewed_at, updated_at
"#;

#[async_trait]
pub trait OfferExt {
    #[allow(clippy::too_many_arguments)]
    async fn create_offer(
        &self,
        host_id: Uuid,
        creator_id: Uuid,
        property_id: Uuid,
        offer_type: OfferType,
        cash_amount_minor: i64,
        stay_nights: Option<i32>,
        traffic_bonus_enabled: bool,
        traffic_bonus_threshold_clicks: Option<i64>,
        traffic_bonus_amount_minor: Option<i64>,
        deliverables: Vec<String>,
        message: Option<String>,
        content_deadline_days: i32,
        resent_from: Option<Uuid>,
    ) -> Result<Offer, Error>;

    async fn get_offer_by_id(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    async fn get_offers_by_host(&self, host_id: Uuid) -> Result<Vec<Offer>, Error>;

    async fn get_offers_by_creator(&self, creator_id: Uuid) -> Result<Vec<Offer>, Error>;

    /// Advisory read receipt; first view wins, later calls are no-ops.
    async fn mark_offer_viewed(&self, offer_id: Uuid) -> Result<Option<Offer>, Error>;

    /// Version-checked transition to `countered` with the creator's terms.
    async fn set_offer_countered(
        &self,
        offer_id: Uuid,
        version: i64,
        counter_cash_amount_minor: i64,
        counter_message: Option<String>,
    ) -> Result<Option<Offer>, Error>;

    /// Version-checked host re-counter: back to `pending` with the new cash
    /// amount and both counter fields cleared.
    async fn set_offer_recountered(
        &self,
        offer_id: Uuid,
        version: i64,
        cash_amount_minor: i64,
    ) -> Result<Option<Offer>, Error>;

    /// Version-checked transition into a terminal status
    /// (accepted / declined / withdrawn). Counter fields are cleared so
    /// they are only ever populated while the offer sits in `countered`;
    /// the negotiation log keeps the history.
    async fn set_offer_terminal(
        &self,
        offer_id: Uuid,
        version: i64,
        status: OfferStatus,
    ) -> Result<Option<Offer>, Error>;

    /// Accept in one transaction: the version-checked offer transition, the
    /// collaboration insert, and the agreement insert/link commit together
    /// or not at all, so an `accepted` offer can never exist without its
    /// collaboration. From `countered`, the countered amount becomes the
    /// final cash amount in the same write. Returns None (after rollback)
    /// when the version check loses.
    async fn accept_offer_tx(
        &self,
        offer_id: Uuid,
        version: i64,
        agreement_text: String,
        content_deadline: DateTime<Utc>,
    ) -> Result<Option<(Offer, Collaboration, Agreement)>, Error>;

    /// One idempotent statement: every open offer past its expiry flips to
    /// `expired`. Returns the rows swept by this call only.
    async fn expire_open_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, Error>;

    async fn append_negotiation_round(
        &self,
        offer_id: Uuid,
        actor_id: Uuid,
        action: NegotiationAction,
        cash_amount_minor: Option<i64>,
        message: Option<String>,
    ) -> Result<NegotiationRound, Error>;

    async fn get_negotiation_rounds(&self, offer_id: Uuid) -> Result<Vec<NegotiationRound>, Error>;
}

#[async_trait]
impl OfferExt for DBClient {
    async fn create_offer(
        &self,
        host_id: Uuid,
        creator_id: Uuid,
        property_id: Uuid,
        offer_type: OfferType,
        cash_amount_minor: i64,
        stay_nights: Option<i32>,
        traffic_bonus_enabled: bool,
        traffic_bonus_threshold_clicks: Option<i64>,
        traffic_bonus_amount_minor: Option<i64>,
        deliverables: Vec<String>,
        message: Option<String>,
        content_deadline_days: i32,
        resent_from: Option<Uuid>,
    ) -> Result<Offer, Error> {
        let query = format!(
            r#"
            INSERT INTO offers
            (host_id, creator_id, property_id, offer_type, cash_amount_minor, stay_nights,
             traffic_bonus_enabled, traffic_bonus_threshold_clicks, traffic_bonus_amount_minor,
             deliverables, message, content_deadline_days, resent_from,
             status, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    'pending', NOW() + INTERVAL '{} days')
            RETURNING {}
            "#,
            OFFER_EXPIRY_DAYS, OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(host_id)
            .bind(creator_id)
            .bind(property_id)
            .bind(offer_type)
            .bind(cash_amount_minor)
            .bind(stay_nights)
            .bind(traffic_bonus_enabled)
            .bind(traffic_bonus_threshold_clicks)
            .bind(traffic_bonus_amount_minor)
            .bind(deliverables)
            .bind(message)
            .bind(content_deadline_days)
            .bind(resent_from)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_offer_by_id(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        let query = format!("SELECT {} FROM offers WHERE id = $1", OFFER_COLUMNS);

        sqlx::query_as::<_, Offer>(&query)
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_offers_by_host(&self, host_id: Uuid) -> Result<Vec<Offer>, Error> {
        let query = format!(
            "SELECT {} FROM offers WHERE host_id = $1 ORDER BY created_at DESC",
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(host_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_offers_by_creator(&self, creator_id: Uuid) -> Result<Vec<Offer>, Error> {
        let query = format!(
            "SELECT {} FROM offers WHERE creator_id = $1 ORDER BY created_at DESC",
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(creator_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn mark_offer_viewed(&self, offer_id: Uuid) -> Result<Option<Offer>, Error> {
        let query = format!(
            r#"
            UPDATE offers
            SET viewed_at = COALESCE(viewed_at, NOW()), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_offer_countered(
        &self,
        offer_id: Uuid,
        version: i64,
        counter_cash_amount_minor: i64,
        counter_message: Option<String>,
    ) -> Result<Option<Offer>, Error> {
        let query = format!(
            r#"
            UPDATE offers
            SET status = 'countered',
                counter_cash_amount_minor = $3,
                counter_message = $4,
                responded_at = NOW(),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'pending'
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(offer_id)
            .bind(version)
            .bind(counter_cash_amount_minor)
            .bind(counter_message)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_offer_recountered(
        &self,
        offer_id: Uuid,
        version: i64,
        cash_amount_minor: i64,
    ) -> Result<Option<Offer>, Error> {
        let query = format!(
            r#"
            UPDATE offers
            SET status = 'pending',
                cash_amount_minor = $3,
                counter_cash_amount_minor = NULL,
                counter_message = NULL,
                responded_at = NOW(),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'countered'
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(offer_id)
            .bind(version)
            .bind(cash_amount_minor)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_offer_terminal(
        &self,
        offer_id: Uuid,
        version: i64,
        status: OfferStatus,
    ) -> Result<Option<Offer>, Error> {
        let query = format!(
            r#"
            UPDATE offers
            SET status = $3,
                counter_cash_amount_minor = NULL,
                counter_message = NULL,
                responded_at = NOW(),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status IN ('pending', 'countered')
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(offer_id)
            .bind(version)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
    }

    async fn accept_offer_tx(
        &self,
        offer_id: Uuid,
        version: i64,
        agreement_text: String,
        content_deadline: DateTime<Utc>,
    ) -> Result<Option<(Offer, Collaboration, Agreement)>, Error> {
        let mut tx = self.pool.begin().await?;

        let offer_query = format!(
            r#"
            UPDATE offers
            SET status = 'accepted',
                cash_amount_minor = COALESCE(counter_cash_amount_minor, cash_amount_minor),
                counter_cash_amount_minor = NULL,
                counter_message = NULL,
                responded_at = NOW(),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status IN ('pending', 'countered')
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        let offer = match sqlx::query_as::<_, Offer>(&offer_query)
            .bind(offer_id)
            .bind(version)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(offer) => offer,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        let collab_query = format!(
            r#"
            INSERT INTO collaborations
            (offer_id, host_id, creator_id, property_id,
             traffic_bonus_threshold_clicks, traffic_bonus_amount_minor)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        let collaboration = sqlx::query_as::<_, Collaboration>(&collab_query)
            .bind(offer.id)
            .bind(offer.host_id)
            .bind(offer.creator_id)
            .bind(offer.property_id)
            .bind(offer.traffic_bonus_threshold_clicks)
            .bind(offer.traffic_bonus_amount_minor)
            .fetch_one(&mut *tx)
            .await?;

        let agreement_query = format!(
            r#"
            INSERT INTO agreements
            (collaboration_id, version, agreement_text, deal_type, cash_amount_minor,
             stay_included, stay_nights, deliverables, content_deadline)
            VALUES ($1, 1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            AGREEMENT_COLUMNS
        );

        let agreement = sqlx::query_as::<_, Agreement>(&agreement_query)
            .bind(collaboration.id)
            .bind(agreement_text)
            .bind(offer.offer_type)
            .bind(offer.cash_amount_minor)
            .bind(offer.offer_type.requires_stay())
            .bind(offer.stay_nights)
            .bind(offer.deliverables.clone())
            .bind(content_deadline)
            .fetch_one(&mut *tx)
            .await?;

        let link_query = format!(
            r#"
            UPDATE collaborations
            SET agreement_id = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLLAB_COLUMNS
        );

        let collaboration = sqlx::query_as::<_, Collaboration>(&link_query)
            .bind(collaboration.id)
            .bind(agreement.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some((offer, collaboration, agreement)))
    }

    async fn expire_open_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>, Error> {
        let query = format!(
            r#"
            UPDATE offers
            SET status = 'expired',
                counter_cash_amount_minor = NULL,
                counter_message = NULL,
                version = version + 1,
                updated_at = NOW()
            WHERE status IN ('pending', 'countered') AND expires_at <= $1
            RETURNING {}
            "#,
            OFFER_COLUMNS
        );

        sqlx::query_as::<_, Offer>(&query)
            .bind(now)
            .fetch_all(&self.pool)
            .await
    }

    async fn append_negotiation_round(
        &self,
        offer_id: Uuid,
        actor_id: Uuid,
        action: NegotiationAction,
        cash_amount_minor: Option<i64>,
        message: Option<String>,
    ) -> Result<NegotiationRound, Error> {
        sqlx::query_as::<_, NegotiationRound>(
            r#"
            INSERT INTO negotiation_rounds
            (offer_id, round_number, actor_id, action, cash_amount_minor, message)
            VALUES (
                $1,
                (SELECT COALESCE(MAX(round_number), 0) + 1 FROM negotiation_rounds WHERE offer_id = $1),
                $2, $3, $4, $5
            )
            RETURNING id, offer_id, round_number, actor_id, action, cash_amount_minor, message, created_at
            "#,
        )
        .bind(offer_id)
        .bind(actor_id)
        .bind(action)
        .bind(cash_amount_minor)
        .bind(message)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_negotiation_rounds(&self, offer_id: Uuid) -> Result<Vec<NegotiationRound>, Error> {
        sqlx::query_as::<_, NegotiationRound>(
            r#"
            SELECT id, offer_id, round_number, actor_id, action, cash_amount_minor, message, created_at
            FROM negotiation_rounds
            WHERE offer_id = $1
            ORDER BY round_number ASC
            "#,
        )
        .bind(offer_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collabmodel::CollaborationStatus;
    use chrono::Duration;
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

    async fn open_flat_offer(db: &DBClient, host_id: Uuid, creator_id: Uuid) -> Offer {
        db.create_offer(
            host_id,
            creator_id,
            Uuid::new_v4(),
            OfferType::Flat,
            50_000,
            None,
            false,
            None,
            None,
            vec!["2 Instagram Reels".to_string()],
            None,
            30,
            None,
        )
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn expiry_sweep_is_idempotent_and_clears_counter_fields(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let host_id = seed_party(&pool, "host").await;
        let creator_id = seed_party(&pool, "creator").await;

        let offer = open_flat_offer(&db, host_id, creator_id).await;
        let countered = db
            .set_offer_countered(offer.id, offer.version, 60_000, Some("60k or no deal".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(countered.counter_cash_amount_minor, Some(60_000));

        sqlx::query("UPDATE offers SET expires_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
            .bind(offer.id)
            .execute(&pool)
            .await
            .unwrap();

        let swept = db.expire_open_offers(Utc::now()).await.unwrap();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].status, OfferStatus::Expired);
        assert_eq!(swept[0].counter_cash_amount_minor, None);
        assert_eq!(swept[0].counter_message, None);

        // a repeated sweep matches nothing and bumps nothing
        let again = db.expire_open_offers(Utc::now()).await.unwrap();
        assert!(again.is_empty());
        let stored = db.get_offer_by_id(offer.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OfferStatus::Expired);
        assert_eq!(stored.version, swept[0].version);
    }

    #[sqlx::test]
    async fn accepting_commits_offer_collaboration_and_agreement_together(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let host_id = seed_party(&pool, "host").await;
        let creator_id = seed_party(&pool, "creator").await;

        let offer = open_flat_offer(&db, host_id, creator_id).await;
        let countered = db
            .set_offer_countered(offer.id, offer.version, 60_000, None)
            .await
            .unwrap()
            .unwrap();

        let deadline = Utc::now() + Duration::days(30);
        let (accepted, collaboration, agreement) = db
            .accept_offer_tx(offer.id, countered.version, "terms".to_string(), deadline)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(accepted.status, OfferStatus::Accepted);
        assert_eq!(accepted.cash_amount_minor, 60_000);
        assert_eq!(accepted.counter_cash_amount_minor, None);
        assert_eq!(accepted.counter_message, None);

        assert_eq!(collaboration.offer_id, offer.id);
        assert_eq!(collaboration.status, CollaborationStatus::PendingAgreement);
        assert_eq!(collaboration.agreement_id, Some(agreement.id));

        assert_eq!(agreement.collaboration_id, collaboration.id);
        assert_eq!(agreement.version, 1);
        assert_eq!(agreement.cash_amount_minor, 60_000);
        assert!(!agreement.is_fully_executed);

        // a stale version is refused whole: no second collaboration row
        let replay = db
            .accept_offer_tx(offer.id, countered.version, "terms".to_string(), deadline)
            .await
            .unwrap();
        assert!(replay.is_none());
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM collaborations WHERE offer_id = $1")
                .bind(offer.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    async fn losing_the_accept_race_leaves_no_partial_rows(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let host_id = seed_party(&pool, "host").await;
        let creator_id = seed_party(&pool, "creator").await;

        let offer = open_flat_offer(&db, host_id, creator_id).await;

        // another writer bumps the version before the accept lands
        let withdrawn = db
            .set_offer_terminal(offer.id, offer.version, OfferStatus::Withdrawn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(withdrawn.status, OfferStatus::Withdrawn);

        let deadline = Utc::now() + Duration::days(30);
        let result = db
            .accept_offer_tx(offer.id, offer.version, "terms".to_string(), deadline)
            .await
            .unwrap();
        assert!(result.is_none());

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM collaborations WHERE offer_id = $1")
                .bind(offer.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }
}
