use sqlx::FromRow;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,            // login identifier, stored lower-cased
    pub password_hash: String,    // Argon2 PHC string
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_key: Option<String>, // object key under avatars/
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
