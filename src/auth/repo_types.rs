use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,                      // serial user ID
    pub name: String,                 // display name
    pub email: String,                // unique, lower-cased
    pub password_hash: String,        // bcrypt hash, or plaintext for legacy seeded rows
    pub created_at: OffsetDateTime,   // creation timestamp
}
