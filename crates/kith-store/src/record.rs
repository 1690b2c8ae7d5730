//! Line-oriented record codec for the file backend
//!
//! One entity per line, fields separated by [`FIELD_SEPARATOR`]. Friendship
//! records embed both participant snapshots in full, which is why profile
//! updates must be propagated into them. Decoded users are re-validated;
//! any failure is a [`NetworkError::CorruptedData`] integrity fault.

use kith_core::{
    Credential, Friendship, FriendshipStatus, NetworkError, Result, Salt, Timestamp, User,
    UserValidator, FIELD_SEPARATOR,
};

const USER_FIELDS: usize = 5;
const FRIENDSHIP_FIELDS: usize = 2 * USER_FIELDS + 2;

/// A one-line textual record
pub trait Record: Sized {
    /// Encode the entity as a single line (without the trailing newline)
    fn encode(&self) -> String;

    /// Decode one line back into the entity
    fn decode(line: &str) -> Result<Self>;
}

// ----------------------------------------------------------------------------
// User Records
// ----------------------------------------------------------------------------

// id,username,credential-hex,salt-hex,email

impl Record for User {
    fn encode(&self) -> String {
        encode_user(self)
    }

    fn decode(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != USER_FIELDS {
            return Err(NetworkError::corrupted(format!(
                "user record has {} fields, expected {USER_FIELDS}",
                fields.len()
            )));
        }
        decode_user(&fields)
    }
}

fn encode_user(user: &User) -> String {
    let separator = FIELD_SEPARATOR.to_string();
    [
        user.id().as_u64().to_string(),
        user.username().to_string(),
        user.credential().to_string(),
        user.salt().to_string(),
        user.email().to_string(),
    ]
    .join(&separator)
}

fn decode_user(fields: &[&str]) -> Result<User> {
    let id: u64 = fields[0]
        .parse()
        .map_err(|_| NetworkError::corrupted("user record has a non-numeric id"))?;
    let credential: Credential = fields[2].parse()?;
    let salt: Salt = fields[3].parse()?;

    let user = User::new(fields[1], credential, salt, fields[4]);
    UserValidator::new()
        .validate(&user)
        .map_err(|_| NetworkError::corrupted("stored user fails validation"))?;
    if user.id().as_u64() != id {
        return Err(NetworkError::corrupted(
            "stored user id does not match its username",
        ));
    }
    Ok(user)
}

// ----------------------------------------------------------------------------
// Friendship Records
// ----------------------------------------------------------------------------

// <user 1 fields>,<user 2 fields>,since-millis,status

impl Record for Friendship {
    fn encode(&self) -> String {
        let separator = FIELD_SEPARATOR.to_string();
        [
            encode_user(self.u1()),
            encode_user(self.u2()),
            self.since().as_millis().to_string(),
            self.status().as_str().to_string(),
        ]
        .join(&separator)
    }

    fn decode(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != FRIENDSHIP_FIELDS {
            return Err(NetworkError::corrupted(format!(
                "friendship record has {} fields, expected {FRIENDSHIP_FIELDS}",
                fields.len()
            )));
        }

        let u1 = decode_user(&fields[..USER_FIELDS])?;
        let u2 = decode_user(&fields[USER_FIELDS..2 * USER_FIELDS])?;
        let since: u64 = fields[2 * USER_FIELDS]
            .parse()
            .map_err(|_| NetworkError::corrupted("friendship record has a non-numeric timestamp"))?;
        let status: FriendshipStatus = fields[2 * USER_FIELDS + 1].parse()?;

        Friendship::new(u1, u2, Timestamp::new(since), status)
            .map_err(|_| NetworkError::corrupted("friendship record is self-referential"))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
