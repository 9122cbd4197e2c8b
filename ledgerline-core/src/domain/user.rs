//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user who can own accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    /// Argon2id PHC string, never the clear-text password
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A user row about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            username: self.username,
            hashed_password: self.hashed_password,
            full_name: self.full_name,
            email: self.email,
            created_at: Utc::now(),
        }
    }
}
