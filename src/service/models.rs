use serde::{Deserialize, Serialize};

use super::auth::PasswordHash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

/// A user row together with its stored password digest. Never serialized.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password: PasswordHash,
}
