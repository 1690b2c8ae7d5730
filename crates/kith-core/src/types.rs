//! Core types for the kith network
//!
//! Newtype wrappers for the identity and credential values that flow through
//! the service: deterministic user ids, millisecond timestamps, per-user
//! salts and opaque password credentials.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::NetworkError;

/// Field separator used by line-oriented storage records. User-supplied
/// fields must never contain it; the validator enforces this.
pub const FIELD_SEPARATOR: char = ',';

/// Length of a per-user salt in bytes
pub const SALT_LEN: usize = 8;

// ----------------------------------------------------------------------------
// User Identifier
// ----------------------------------------------------------------------------

/// Stable surrogate key for a user, derived deterministically from the
/// username (first 8 bytes of its SHA-256 digest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(u64);

impl UserId {
    /// Create a UserId from a raw value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Derive the id for a username
    pub fn from_username(username: &str) -> Self {
        let digest = Sha256::digest(username.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(bytes))
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Millisecond timestamp since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from raw milliseconds
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the current timestamp
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as u64)
    }

    /// Get the raw milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

// ----------------------------------------------------------------------------
// Salt
// ----------------------------------------------------------------------------

/// Opaque per-user random value mixed into the stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Create a salt from raw bytes
    pub fn new(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random salt
    pub fn generate() -> Self {
        use rand_core::RngCore;
        let mut bytes = [0u8; SALT_LEN];
        rand_core::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Salt {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| NetworkError::corrupted("invalid hex in salt"))?;
        if bytes.len() != SALT_LEN {
            return Err(NetworkError::corrupted("salt must be exactly 8 bytes"));
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes);
        Ok(Self(salt))
    }
}

// ----------------------------------------------------------------------------
// Credential
// ----------------------------------------------------------------------------

/// Opaque comparable credential: SHA-256 of the password concatenated with
/// the user's salt. The plaintext is never stored.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential([u8; 32]);

impl Credential {
    /// Derive a credential from a plaintext password and a salt
    pub fn derive(password: &str, salt: &Salt) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(salt.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Check a plaintext password against this credential
    pub fn matches(&self, password: &str, salt: &Salt) -> bool {
        Self::derive(password, salt) == *self
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never echo credential material into logs.
        write!(f, "Credential(..)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Credential {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes =
            hex::decode(s).map_err(|_| NetworkError::corrupted("invalid hex in credential"))?;
        if bytes.len() != 32 {
            return Err(NetworkError::corrupted("credential must be exactly 32 bytes"));
        }
        let mut credential = [0u8; 32];
        credential.copy_from_slice(&bytes);
        Ok(Self(credential))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
