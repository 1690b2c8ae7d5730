//! File-backed repositories
//!
//! The backing file is reloaded in full before **every** operation, reads
//! included, and rewritten synchronously after every mutation, so external
//! edits are always observed and no state is held between calls. There is no
//! partial-write recovery; a record that fails to decode or validate aborts
//! the operation with [`NetworkError::CorruptedData`].

use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::error;

use kith_core::{Entity, InMemoryRepository, NetworkError, Repository, Result};

use crate::record::Record;

/// Repository persisted to a line-oriented file, one entity per line.
///
/// A missing backing file is an empty repository; the file is created on the
/// first mutation.
pub struct FileRepository<E> {
    path: PathBuf,
    _entity: PhantomData<E>,
}

impl<E: Entity + Record> FileRepository<E> {
    /// Create a repository backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _entity: PhantomData,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<InMemoryRepository<E>> {
        let mut snapshot = InMemoryRepository::new();
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(snapshot),
            Err(err) => return Err(err.into()),
        };

        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let entity = E::decode(line).map_err(|err| {
                error!(path = %self.path.display(), %err, "corrupted record in backing file");
                err
            })?;
            snapshot.add(entity).map_err(|_| {
                NetworkError::corrupted(format!(
                    "duplicate {} record in backing file",
                    E::describe()
                ))
            })?;
        }
        Ok(snapshot)
    }

    fn persist(&self, snapshot: &InMemoryRepository<E>) -> Result<()> {
        let mut contents = String::new();
        for entity in snapshot.get_all()? {
            contents.push_str(&entity.encode());
            contents.push('\n');
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl<E: Entity + Record> Repository<E> for FileRepository<E> {
    fn size(&self) -> Result<usize> {
        self.load()?.size()
    }

    fn get_all(&self) -> Result<Vec<E>> {
        self.load()?.get_all()
    }

    fn add(&mut self, entity: E) -> Result<()> {
        let mut snapshot = self.load()?;
        snapshot.add(entity)?;
        self.persist(&snapshot)
    }

    fn remove(&mut self, entity: &E) -> Result<()> {
        let mut snapshot = self.load()?;
        snapshot.remove(entity)?;
        self.persist(&snapshot)
    }

    fn find(&self, key: &E::Key) -> Result<E> {
        self.load()?.find(key)
    }

    fn update(&mut self, entity: E) -> Result<()> {
        let mut snapshot = self.load()?;
        snapshot.update(entity)?;
        self.persist(&snapshot)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
