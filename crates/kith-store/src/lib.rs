//! Persistence adapters for the kith social network
//!
//! Implements the `kith-core` repository contract over two backends beyond
//! the in-memory one: line-oriented files and SQLite. Backend selection is a
//! configuration concern (see [`StoreConfig`] and [`build_repositories`]);
//! the service never knows which backend it runs on.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod file;
pub mod record;
pub mod sqlite;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{build_repositories, RepositoryPair, StoreConfig};
pub use file::FileRepository;
pub use record::Record;
pub use sqlite::{open_pair, open_pair_in_memory, FriendshipSqliteRepository, UserSqliteRepository};
