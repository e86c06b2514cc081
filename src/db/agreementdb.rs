use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{agreementmodel::Agreement, offermodel::OfferType, partymodel::PartyRole};

pub(super) const AGREEMENT_COLUMNS: &str = r#"
    id, collaboration_id, version, agreement_text,
    deal_type, cash_amount_minor, stay_included, stay_nights,
    deliverables, content_deadline,
    host_accepted_at, creator_accepted_at,
    is_fully_executed, executed_at,
    created_at, updated_at
"#;

#[async_trait]
pub trait AgreementExt {
    async fn get_agreement_by_id(&self, agreement_id: Uuid) -> Result<Option<Agreement>, Error>;

    async fn get_agreement_by_collaboration(
        &self,
        collaboration_id: Uuid,
    ) -> Result<Option<Agreement>, Error>;

    /// NULL-guarded compare-and-set signature. The statement only succeeds
    /// while this role's column is still NULL, and it computes full
    /// execution from the other column in the same write, so two
    /// concurrent signers can never both observe themselves as the second.
    /// Returns None when the signature was already present.
    async fn sign_agreement(
        &self,
        agreement_id: Uuid,
        role: PartyRole,
    ) -> Result<Option<Agreement>, Error>;

    /// In-place redraft after a re-counter: bump the contract version,
    /// replace the text and terms, reset both signatures. Guarded on the
    /// agreement not being executed; returns None if the guard fails.
    #[allow(clippy::too_many_arguments)]
    async fn redraft_agreement(
        &self,
        collaboration_id: Uuid,
        agreement_text: String,
        deal_type: OfferType,
        cash_amount_minor: i64,
        stay_included: bool,
        stay_nights: Option<i32>,
        deliverables: Vec<String>,
        content_deadline: DateTime<Utc>,
    ) -> Result<Option<Agreement>, Error>;
}

#[async_trait]
impl AgreementExt for DBClient {
    async fn get_agreement_by_id(&self, agreement_id: Uuid) -> Result<Option<Agreement>, Error> {
        let query = format!("SELECT {} FROM agreements WHERE id = $1", AGREEMENT_COLUMNS);

        sqlx::query_as::<_, Agreement>(&query)
            .bind(agreement_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_agreement_by_collaboration(
        &self,
        collaboration_id: Uuid,
    ) -> Result<Option<Agreement>, Error> {
        let query = format!(
            "SELECT {} FROM agreements WHERE collaboration_id = $1",
            AGREEMENT_COLUMNS
        );

        sqlx::query_as::<_, Agreement>(&query)
            .bind(collaboration_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn sign_agreement(
        &self,
        agreement_id: Uuid,
        role: PartyRole,
    ) -> Result<Option<Agreement>, Error> {
        let query = match role {
            PartyRole::Host => format!(
                r#"
                UPDATE agreements
                SET host_accepted_at = NOW(),
                    is_fully_executed = (creator_accepted_at IS NOT NULL),
                    executed_at = CASE WHEN creator_accepted_at IS NOT NULL THEN NOW() ELSE executed_at END,
                    updated_at = NOW()
                WHERE id = $1 AND host_accepted_at IS NULL
                RETURNING {}
                "#,
                AGREEMENT_COLUMNS
            ),
            PartyRole::Creator => format!(
                r#"
                UPDATE agreements
                SET creator_accepted_at = NOW(),
                    is_fully_executed = (host_accepted_at IS NOT NULL),
                    executed_at = CASE WHEN host_accepted_at IS NOT NULL THEN NOW() ELSE executed_at END,
                    updated_at = NOW()
                WHERE id = $1 AND creator_accepted_at IS NULL
                RETURNING {}
                "#,
                AGREEMENT_COLUMNS
            ),
        };

        sqlx::query_as::<_, Agreement>(&query)
            .bind(agreement_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn redraft_agreement(
        &self,
        collaboration_id: Uuid,
        agreement_text: String,
        deal_type: OfferType,
        cash_amount_minor: i64,
        stay_included: bool,
        stay_nights: Option<i32>,
        deliverables: Vec<String>,
        content_deadline: DateTime<Utc>,
    ) -> Result<Option<Agreement>, Error> {
        let query = format!(
            r#"
            UPDATE agreements
            SET version = version + 1,
                agreement_text = $2,
                deal_type = $3,
                cash_amount_minor = $4,
                stay_included = $5,
                stay_nights = $6,
                deliverables = $7,
                content_deadline = $8,
                host_accepted_at = NULL,
                creator_accepted_at = NULL,
                updated_at = NOW()
            WHERE collaboration_id = $1 AND is_fully_executed = FALSE
            RETURNING {}
            "#,
            AGREEMENT_COLUMNS
        );

        sqlx::query_as::<_, Agreement>(&query)
            .bind(collaboration_id)
            .bind(agreement_text)
            .bind(deal_type)
            .bind(cash_amount_minor)
            .bind(stay_included)
            .bind(stay_nights)
            .bind(deliverables)
            .bind(content_deadline)
            .fetch_optional(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::offerdb::OfferExt;
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

    async fn seed_agreement(pool: &PgPool, db: &DBClient) -> Agreement {
        let host_id = seed_party(pool, "host").await;
        let creator_id = seed_party(pool, "creator").await;

        let offer = db
            .create_offer(
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
            .unwrap();

        let (_, _, agreement) = db
            .accept_offer_tx(
                offer.id,
                offer.version,
                "terms".to_string(),
                Utc::now() + Duration::days(30),
            )
            .await
            .unwrap()
            .unwrap();
        agreement
    }

    #[sqlx::test]
    async fn concurrent_signatures_execute_exactly_once(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let agreement = seed_agreement(&pool, &db).await;

        let (host_signed, creator_signed) = tokio::join!(
            db.sign_agreement(agreement.id, PartyRole::Host),
            db.sign_agreement(agreement.id, PartyRole::Creator),
        );
        let host_signed = host_signed.unwrap().unwrap();
        let creator_signed = creator_signed.unwrap().unwrap();

        // both writes land, but only one of them observes the flip
        let flips = [&host_signed, &creator_signed]
            .iter()
            .filter(|a| a.is_fully_executed)
            .count();
        assert_eq!(flips, 1);

        let stored = db.get_agreement_by_id(agreement.id).await.unwrap().unwrap();
        assert!(stored.is_fully_executed);
        assert!(stored.executed_at.is_some());
        assert!(stored.host_accepted_at.is_some());
        assert!(stored.creator_accepted_at.is_some());

        // signatures are write-once per role
        assert!(db
            .sign_agreement(agreement.id, PartyRole::Host)
            .await
            .unwrap()
            .is_none());
    }

    #[sqlx::test]
    async fn executed_agreements_refuse_a_redraft(pool: PgPool) {
        let db = DBClient::new(pool.clone());
        let agreement = seed_agreement(&pool, &db).await;

        db.sign_agreement(agreement.id, PartyRole::Host)
            .await
            .unwrap()
            .unwrap();
        let executed = db
            .sign_agreement(agreement.id, PartyRole::Creator)
            .await
            .unwrap()
            .unwrap();
        assert!(executed.is_fully_executed);

        let redrafted = db
            .redraft_agreement(
                agreement.collaboration_id,
                "revised terms".to_string(),
                OfferType::Flat,
                70_000,
                false,
                None,
                vec!["3 Instagram Reels".to_string()],
                Utc::now() + Duration::days(30),
            )
            .await
            .unwrap();
        assert!(redrafted.is_none());

        let stored = db.get_agreement_by_id(agreement.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.cash_amount_minor, 50_000);
    }
}
