//! User entity

use serde::{Deserialize, Serialize};

use crate::repository::Entity;
use crate::types::{Credential, Salt, UserId};

/// A registered member of the network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    credential: Credential,
    salt: Salt,
    email: String,
}

impl User {
    /// Create a user; the id is derived from the username
    pub fn new(
        username: impl Into<String>,
        credential: Credential,
        salt: Salt,
        email: impl Into<String>,
    ) -> Self {
        let username = username.into();
        let id = UserId::from_username(&username);
        Self {
            id,
            username,
            credential,
            salt,
            email: email.into(),
        }
    }

    /// Get the surrogate key
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Get the username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the stored credential
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Get the salt mixed into the credential
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Get the email address
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Collision equality: two users are equal when their usernames match OR
/// their emails match. Deliberately looser than the primary key so that
/// duplicate checks catch either kind of clash. Not transitive, so `User`
/// must never be used as a map key; identity lookups go through [`UserId`].
impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username || self.email == other.email
    }
}

impl Entity for User {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.id
    }

    fn describe() -> &'static str {
        "user"
    }
}
