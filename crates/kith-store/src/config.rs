//! Backend selection configuration
//!
//! Which backend the network runs on is pure configuration: the factory
//! returns boxed repository trait objects and the service never learns what
//! is behind them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use kith_core::{Friendship, InMemoryRepository, Repository, Result, User};

use crate::file::FileRepository;
use crate::sqlite;

/// Persistence backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreConfig {
    /// Volatile in-memory storage
    Memory,
    /// Line-oriented files, one per entity type
    File {
        users_path: PathBuf,
        friendships_path: PathBuf,
    },
    /// A single SQLite database holding both tables
    Sqlite { path: PathBuf },
}

/// Repository pair for the network service
pub type RepositoryPair = (
    Box<dyn Repository<User>>,
    Box<dyn Repository<Friendship>>,
);

/// Build the repository pair selected by the configuration
pub fn build_repositories(config: &StoreConfig) -> Result<RepositoryPair> {
    match config {
        StoreConfig::Memory => Ok((
            Box::new(InMemoryRepository::new()),
            Box::new(InMemoryRepository::new()),
        )),
        StoreConfig::File {
            users_path,
            friendships_path,
        } => Ok((
            Box::new(FileRepository::new(users_path.clone())),
            Box::new(FileRepository::new(friendships_path.clone())),
        )),
        StoreConfig::Sqlite { path } => {
            let (users, friendships) = sqlite::open_pair(path)?;
            Ok((Box::new(users), Box::new(friendships)))
        }
    }
}
