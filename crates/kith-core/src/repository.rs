//! Persistence contract and the in-memory backend
//!
//! Every storage backend (in-memory here, file and SQLite in `kith-store`)
//! implements [`Repository`] with byte-for-byte the same success/failure
//! behavior, so swapping backends never changes service semantics.

use crate::errors::{NetworkError, Result};

// ----------------------------------------------------------------------------
// Entity Trait
// ----------------------------------------------------------------------------

/// A storable domain entity.
///
/// `Key` is the identity used by `find`. Whole-entity equality (`PartialEq`)
/// is what `add` checks for collisions, and it may be looser than the key:
/// users collide on username OR email, friendships on the unordered pair.
pub trait Entity: Clone + PartialEq {
    /// Identity used for lookups
    type Key: PartialEq;

    /// The entity's identity
    fn key(&self) -> Self::Key;

    /// Human-readable noun for error messages
    fn describe() -> &'static str;
}

// ----------------------------------------------------------------------------
// Repository Trait
// ----------------------------------------------------------------------------

/// Uniform CRUD contract over an entity type
pub trait Repository<E: Entity> {
    /// Number of stored entities
    fn size(&self) -> Result<usize>;

    /// All stored entities, in a stable order (insertion order for the
    /// in-memory and file backends)
    fn get_all(&self) -> Result<Vec<E>>;

    /// Store a new entity; fails with [`NetworkError::Duplicate`] if an
    /// equal entity already exists
    fn add(&mut self, entity: E) -> Result<()>;

    /// Remove the stored entity equal to the given one; fails with
    /// [`NetworkError::NotFound`] if there is none
    fn remove(&mut self, entity: &E) -> Result<()>;

    /// Look up an entity by key; fails with [`NetworkError::NotFound`] if
    /// absent
    fn find(&self, key: &E::Key) -> Result<E>;

    /// Replace the stored entity equal to the given one; fails with
    /// [`NetworkError::NotFound`] if there is none
    fn update(&mut self, entity: E) -> Result<()>;
}

// ----------------------------------------------------------------------------
// In-Memory Backend
// ----------------------------------------------------------------------------

/// Vec-backed repository preserving insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository<E> {
    entities: Vec<E>,
}

impl<E: Entity> InMemoryRepository<E> {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }
}

impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    fn size(&self) -> Result<usize> {
        Ok(self.entities.len())
    }

    fn get_all(&self) -> Result<Vec<E>> {
        Ok(self.entities.clone())
    }

    fn add(&mut self, entity: E) -> Result<()> {
        if self.entities.iter().any(|e| *e == entity) {
            return Err(NetworkError::duplicate(E::describe()));
        }
        self.entities.push(entity);
        Ok(())
    }

    fn remove(&mut self, entity: &E) -> Result<()> {
        match self.entities.iter().position(|e| e == entity) {
            Some(index) => {
                self.entities.remove(index);
                Ok(())
            }
            None => Err(NetworkError::not_found(E::describe())),
        }
    }

    fn find(&self, key: &E::Key) -> Result<E> {
        self.entities
            .iter()
            .find(|e| e.key() == *key)
            .cloned()
            .ok_or_else(|| NetworkError::not_found(E::describe()))
    }

    fn update(&mut self, entity: E) -> Result<()> {
        match self.entities.iter().position(|e| *e == entity) {
            Some(index) => {
                self.entities[index] = entity;
                Ok(())
            }
            None => Err(NetworkError::not_found(E::describe())),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
