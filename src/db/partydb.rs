use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::partymodel::Party;

/// Read-only view of the external profile store. Referential integrity of
/// host/creator/property ids is that collaborator's job; we only resolve
/// principals and notification addresses here.
#[async_trait]
pub trait PartyExt {
    async fn get_party(&self, party_id: Uuid) -> Result<Option<Party>, Error>;
}

#[async_trait]
impl PartyExt for DBClient {
    async fn get_party(&self, party_id: Uuid) -> Result<Option<Party>, Error> {
        sqlx::query_as::<_, Party>(
            r#"
            SELECT id, name, email, role, created_at
            FROM parties
            WHERE id = $1
            "#,
        )
        .bind(party_id)
        .fetch_optional(&self.pool)
        .await
    }
}
