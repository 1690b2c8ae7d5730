//! SQLite-backed repositories
//!
//! Normalized storage: `users` rows carry the profile fields, `friendships`
//! rows carry foreign keys plus the canonical sorted id pair as their
//! primary key. Because friendships reference users instead of embedding
//! snapshots, participant users must exist in the same database (the
//! network service guarantees this by resolving both users before creating
//! an edge) and profile updates need no propagation here.
//!
//! Both repositories can share one connection (see [`open_pair`]); rows that
//! fail validation on read surface as [`NetworkError::CorruptedData`].

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use kith_core::{
    Credential, Friendship, FriendshipKey, FriendshipStatus, NetworkError, Repository, Result,
    Salt, Timestamp, User, UserId, UserValidator,
};

const USERS_DDL: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    credential TEXT NOT NULL,
    salt TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE
)";

const FRIENDSHIPS_DDL: &str = "CREATE TABLE IF NOT EXISTS friendships (
    id_lo INTEGER NOT NULL,
    id_hi INTEGER NOT NULL,
    u1_id INTEGER NOT NULL REFERENCES users(id),
    u2_id INTEGER NOT NULL REFERENCES users(id),
    since INTEGER NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (id_lo, id_hi)
)";

fn db_err(err: rusqlite::Error) -> NetworkError {
    NetworkError::storage(format!("sqlite: {err}"))
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(USERS_DDL, []).map_err(db_err)?;
    conn.execute(FRIENDSHIPS_DDL, []).map_err(db_err)?;
    Ok(())
}

/// Open both repositories over one shared connection to the same database
pub fn open_pair(
    path: impl AsRef<Path>,
) -> Result<(UserSqliteRepository, FriendshipSqliteRepository)> {
    let conn = Connection::open(path).map_err(db_err)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));
    Ok((
        UserSqliteRepository { conn: Arc::clone(&conn) },
        FriendshipSqliteRepository { conn },
    ))
}

/// Open both repositories over one shared in-memory database (for tests)
pub fn open_pair_in_memory() -> Result<(UserSqliteRepository, FriendshipSqliteRepository)> {
    let conn = Connection::open_in_memory().map_err(db_err)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));
    Ok((
        UserSqliteRepository { conn: Arc::clone(&conn) },
        FriendshipSqliteRepository { conn },
    ))
}

/// Rebuild a user from consecutive row columns starting at `offset`,
/// re-validating it the same way the file backend does on load
fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Result<User>> {
    let id: i64 = row.get(offset)?;
    let username: String = row.get(offset + 1)?;
    let credential: String = row.get(offset + 2)?;
    let salt: String = row.get(offset + 3)?;
    let email: String = row.get(offset + 4)?;
    Ok(build_user(id, &username, &credential, &salt, &email))
}

fn build_user(id: i64, username: &str, credential: &str, salt: &str, email: &str) -> Result<User> {
    let credential: Credential = credential.parse()?;
    let salt: Salt = salt.parse()?;
    let user = User::new(username, credential, salt, email);
    UserValidator::new()
        .validate(&user)
        .map_err(|_| NetworkError::corrupted("stored user fails validation"))?;
    if user.id().as_u64() != id as u64 {
        return Err(NetworkError::corrupted(
            "stored user id does not match its username",
        ));
    }
    Ok(user)
}

// ----------------------------------------------------------------------------
// User Repository
// ----------------------------------------------------------------------------

/// Users stored in a `users` table, keyed by the derived id
pub struct UserSqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserSqliteRepository {
    /// Open (and initialize if needed) a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for tests)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| NetworkError::storage("sqlite connection mutex poisoned"))
    }

    /// Rowid of the first stored user colliding with `user` under the loose
    /// username-or-email equality, mirroring the in-memory duplicate check
    fn colliding_rowid(conn: &Connection, user: &User) -> Result<Option<i64>> {
        conn.query_row(
            "SELECT rowid FROM users WHERE username = ?1 OR email = ?2 ORDER BY rowid LIMIT 1",
            params![user.username(), user.email()],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }
}

impl Repository<User> for UserSqliteRepository {
    fn size(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }

    fn get_all(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut statement = conn
            .prepare("SELECT id, username, credential, salt, email FROM users ORDER BY rowid")
            .map_err(db_err)?;
        let rows = statement
            .query_map([], |row| user_from_row(row, 0))
            .map_err(db_err)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(db_err)??);
        }
        Ok(users)
    }

    fn add(&mut self, user: User) -> Result<()> {
        let conn = self.conn()?;
        if Self::colliding_rowid(&conn, &user)?.is_some() {
            return Err(NetworkError::duplicate("user"));
        }
        conn.execute(
            "INSERT INTO users (id, username, credential, salt, email) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id().as_u64() as i64,
                user.username(),
                user.credential().to_string(),
                user.salt().to_string(),
                user.email(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn remove(&mut self, user: &User) -> Result<()> {
        let conn = self.conn()?;
        match Self::colliding_rowid(&conn, user)? {
            Some(rowid) => {
                conn.execute("DELETE FROM users WHERE rowid = ?1", params![rowid])
                    .map_err(db_err)?;
                Ok(())
            }
            None => Err(NetworkError::not_found("user")),
        }
    }

    fn find(&self, key: &UserId) -> Result<User> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, credential, salt, email FROM users WHERE id = ?1",
                params![key.as_u64() as i64],
                |row| user_from_row(row, 0),
            )
            .optional()
            .map_err(db_err)?;
        match user {
            Some(user) => user,
            None => Err(NetworkError::not_found("user")),
        }
    }

    fn update(&mut self, user: User) -> Result<()> {
        let conn = self.conn()?;
        match Self::colliding_rowid(&conn, &user)? {
            Some(rowid) => {
                conn.execute(
                    "UPDATE users SET id = ?1, username = ?2, credential = ?3, salt = ?4, \
                     email = ?5 WHERE rowid = ?6",
                    params![
                        user.id().as_u64() as i64,
                        user.username(),
                        user.credential().to_string(),
                        user.salt().to_string(),
                        user.email(),
                        rowid,
                    ],
                )
                .map_err(db_err)?;
                Ok(())
            }
            None => Err(NetworkError::not_found("user")),
        }
    }
}

// ----------------------------------------------------------------------------
// Friendship Repository
// ----------------------------------------------------------------------------

/// Friendships stored as foreign-key rows keyed by the canonical sorted id
/// pair; participant snapshots are materialized by joining the `users` table
pub struct FriendshipSqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

const FRIENDSHIP_SELECT: &str = "SELECT \
    a.id, a.username, a.credential, a.salt, a.email, \
    b.id, b.username, b.credential, b.salt, b.email, \
    f.since, f.status \
    FROM friendships f \
    JOIN users a ON a.id = f.u1_id \
    JOIN users b ON b.id = f.u2_id";

impl FriendshipSqliteRepository {
    /// Open (and initialize if needed) a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| NetworkError::storage("sqlite connection mutex poisoned"))
    }

    fn friendship_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Friendship>> {
        let u1 = user_from_row(row, 0)?;
        let u2 = user_from_row(row, 5)?;
        let since: i64 = row.get(10)?;
        let status: String = row.get(11)?;
        Ok(Self::build_friendship(u1, u2, since, &status))
    }

    fn build_friendship(
        u1: Result<User>,
        u2: Result<User>,
        since: i64,
        status: &str,
    ) -> Result<Friendship> {
        let status: FriendshipStatus = status.parse()?;
        Friendship::new(u1?, u2?, Timestamp::new(since as u64), status)
            .map_err(|_| NetworkError::corrupted("friendship row is self-referential"))
    }
}

impl Repository<Friendship> for FriendshipSqliteRepository {
    fn size(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM friendships", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as usize)
    }

    fn get_all(&self) -> Result<Vec<Friendship>> {
        let conn = self.conn()?;
        let query = format!("{FRIENDSHIP_SELECT} ORDER BY f.rowid");
        let mut statement = conn.prepare(&query).map_err(db_err)?;
        let rows = statement
            .query_map([], Self::friendship_from_row)
            .map_err(db_err)?;

        let mut friendships = Vec::new();
        for row in rows {
            friendships.push(row.map_err(db_err)??);
        }
        Ok(friendships)
    }

    fn add(&mut self, friendship: Friendship) -> Result<()> {
        let key = friendship.key();
        let conn = self.conn()?;
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM friendships WHERE id_lo = ?1 AND id_hi = ?2)",
                params![key.lower().as_u64() as i64, key.upper().as_u64() as i64],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if exists {
            return Err(NetworkError::duplicate("friendship"));
        }

        conn.execute(
            "INSERT INTO friendships (id_lo, id_hi, u1_id, u2_id, since, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.lower().as_u64() as i64,
                key.upper().as_u64() as i64,
                friendship.u1().id().as_u64() as i64,
                friendship.u2().id().as_u64() as i64,
                friendship.since().as_millis() as i64,
                friendship.status().as_str(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn remove(&mut self, friendship: &Friendship) -> Result<()> {
        let key = friendship.key();
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "DELETE FROM friendships WHERE id_lo = ?1 AND id_hi = ?2",
                params![key.lower().as_u64() as i64, key.upper().as_u64() as i64],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(NetworkError::not_found("friendship"));
        }
        Ok(())
    }

    fn find(&self, key: &FriendshipKey) -> Result<Friendship> {
        let conn = self.conn()?;
        let query = format!("{FRIENDSHIP_SELECT} WHERE f.id_lo = ?1 AND f.id_hi = ?2");
        let friendship = conn
            .query_row(
                &query,
                params![key.lower().as_u64() as i64, key.upper().as_u64() as i64],
                Self::friendship_from_row,
            )
            .optional()
            .map_err(db_err)?;
        match friendship {
            Some(friendship) => friendship,
            None => Err(NetworkError::not_found("friendship")),
        }
    }

    fn update(&mut self, friendship: Friendship) -> Result<()> {
        let key = friendship.key();
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE friendships SET u1_id = ?1, u2_id = ?2, since = ?3, status = ?4 \
                 WHERE id_lo = ?5 AND id_hi = ?6",
                params![
                    friendship.u1().id().as_u64() as i64,
                    friendship.u2().id().as_u64() as i64,
                    friendship.since().as_millis() as i64,
                    friendship.status().as_str(),
                    key.lower().as_u64() as i64,
                    key.upper().as_u64() as i64,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(NetworkError::not_found("friendship"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
