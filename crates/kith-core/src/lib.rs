//! Kith Network Domain Service
//!
//! This crate provides the core of the kith social network: the user and
//! friendship entity model, the friendship request/accept lifecycle, the
//! persistence contract that interchangeable storage backends implement,
//! and the graph engine that derives community structure from the
//! friendship relation.
//!
//! Persistence adapters beyond the in-memory backend (file, SQLite) live in
//! the sibling `kith-store` crate; front ends consume the [`Network`]
//! service and register observers for change notifications.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod domain;
pub mod errors;
pub mod graph;
pub mod network;
pub mod repository;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use domain::{Friendship, FriendshipKey, FriendshipStatus, FriendshipView, User, UserValidator};
pub use errors::{NetworkError, Result};
pub use graph::SocialGraph;
pub use network::{Network, ObserverId};
pub use repository::{Entity, InMemoryRepository, Repository};
pub use types::{Credential, Salt, Timestamp, UserId, FIELD_SEPARATOR};
