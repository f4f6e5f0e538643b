use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Peer ratings: rater username → grade in [0,5], last write wins per rater.
pub type RatingMap = BTreeMap<String, f32>;

/// Account record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,                          // numeric primary key, immutable
    pub username: String,                 // unique, mutable
    pub email: String,                    // unique, immutable
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,    // None for OAuth-only accounts
    pub full_name: String,
    pub location: Option<String>,
    pub image: Option<String>,            // object-storage key
    pub badge: bool,
    pub ratings: sqlx::types::Json<RatingMap>,
    pub created_at: OffsetDateTime,
}
