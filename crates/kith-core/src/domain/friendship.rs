//! Friendship entity and its unordered-pair identity

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::user::User;
use crate::errors::{NetworkError, Result};
use crate::repository::Entity;
use crate::types::{Timestamp, UserId};

// ----------------------------------------------------------------------------
// Friendship Status
// ----------------------------------------------------------------------------

/// Lifecycle status of a friendship edge.
///
/// A request starts in `Sent`, moves to `Accepted` on acceptance, and is
/// deleted on rejection or unfriending. There is no transition from
/// `Accepted` back to `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FriendshipStatus {
    /// Request sent, awaiting an answer
    Sent,
    /// Symmetric, established friendship
    Accepted,
    /// Request turned down
    Rejected,
}

impl FriendshipStatus {
    /// Stable textual form used by storage backends
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Sent => "sent",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FriendshipStatus {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sent" => Ok(FriendshipStatus::Sent),
            "accepted" => Ok(FriendshipStatus::Accepted),
            "rejected" => Ok(FriendshipStatus::Rejected),
            other => Err(NetworkError::corrupted(format!(
                "unknown friendship status: {other}"
            ))),
        }
    }
}

// ----------------------------------------------------------------------------
// Friendship Key
// ----------------------------------------------------------------------------

/// Canonical identity of a friendship: the two user ids sorted ascending.
///
/// `FriendshipKey::new(a, b)` and `FriendshipKey::new(b, a)` are identical,
/// which makes `Friendship(A, B)` and `Friendship(B, A)` the same entity for
/// lookup, update and removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FriendshipKey(UserId, UserId);

impl FriendshipKey {
    /// Create the canonical key for a pair of users
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Smaller id of the pair
    pub fn lower(&self) -> UserId {
        self.0
    }

    /// Larger id of the pair
    pub fn upper(&self) -> UserId {
        self.1
    }
}

// ----------------------------------------------------------------------------
// Friendship
// ----------------------------------------------------------------------------

/// An edge between two distinct users.
///
/// The participants are stored as full snapshots; backends that keep
/// normalized rows materialize them on read instead. `u1` is the side that
/// initiated the request while the status is `Sent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    u1: User,
    u2: User,
    since: Timestamp,
    status: FriendshipStatus,
}

impl Friendship {
    /// Create a friendship; fails if both sides are the same user
    pub fn new(u1: User, u2: User, since: Timestamp, status: FriendshipStatus) -> Result<Self> {
        if u1 == u2 {
            return Err(NetworkError::invalid_friendship(
                "a user cannot befriend themselves",
            ));
        }
        Ok(Self {
            u1,
            u2,
            since,
            status,
        })
    }

    /// First participant (the requester while the status is `Sent`)
    pub fn u1(&self) -> &User {
        &self.u1
    }

    /// Second participant
    pub fn u2(&self) -> &User {
        &self.u2
    }

    /// When the edge was created or last changed status
    pub fn since(&self) -> Timestamp {
        self.since
    }

    /// Current lifecycle status
    pub fn status(&self) -> FriendshipStatus {
        self.status
    }

    /// The unordered-pair identity of this edge
    pub fn key(&self) -> FriendshipKey {
        FriendshipKey::new(self.u1.id(), self.u2.id())
    }

    /// Does this edge touch the given user (on either side)?
    pub fn involves(&self, user: &User) -> bool {
        &self.u1 == user || &self.u2 == user
    }

    /// The participant on the opposite side from `user`, if `user` is a
    /// participant at all
    pub fn other(&self, user: &User) -> Option<&User> {
        if &self.u1 == user {
            Some(&self.u2)
        } else if &self.u2 == user {
            Some(&self.u1)
        } else {
            None
        }
    }

    /// Replace whichever participant snapshot matches `user` with the given
    /// newer snapshot. Used to keep denormalized backends consistent after a
    /// profile update.
    pub fn refresh_participant(&mut self, user: &User) {
        if &self.u1 == user {
            self.u1 = user.clone();
        } else if &self.u2 == user {
            self.u2 = user.clone();
        }
    }
}

/// Friendships are equal when their unordered-pair identities are equal,
/// regardless of argument order, timestamp or status.
impl PartialEq for Friendship {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Entity for Friendship {
    type Key = FriendshipKey;

    fn key(&self) -> FriendshipKey {
        Friendship::key(self)
    }

    fn describe() -> &'static str {
        "friendship"
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
