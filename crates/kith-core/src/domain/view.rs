//! Per-user projections of friendship state

use serde::{Deserialize, Serialize};

use super::friendship::FriendshipStatus;
use crate::types::Timestamp;

/// Lightweight, one-sided view of a friendship: the other participant's
/// username, when the edge was established, and its status. Returned by the
/// service's per-user queries instead of full entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendshipView {
    /// Username of the participant on the other side
    pub friend_username: String,
    /// When the edge was created or last changed status
    pub since: Timestamp,
    /// Current status of the edge
    pub status: FriendshipStatus,
}

impl FriendshipView {
    /// Create a view
    pub fn new(
        friend_username: impl Into<String>,
        since: Timestamp,
        status: FriendshipStatus,
    ) -> Self {
        Self {
            friend_username: friend_username.into(),
            since,
            status,
        }
    }
}
