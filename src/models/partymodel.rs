use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "party_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Host,
    Creator,
}

impl PartyRole {
    pub fn to_str(&self) -> &str {
        match self {
            PartyRole::Host => "host",
            PartyRole::Creator => "creator",
        }
    }
}

/// A row in the read-only `parties` table maintained by the external
/// profile store. This service never writes it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: PartyRole,
    pub created_at: Option<DateTime<Utc>>,
}
