//! Local store of user profiles and their want and sell lists.
//!
//! A user owns at most one list membership per set: adding a set to the
//! sell list moves it off the want list. Set rows are shared between users
//! and upserted on every add.

mod schema;

use std::{
    fmt,
    str::FromStr,
    sync::{Mutex, PoisonError},
};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use schema::SCHEMA_VERSION;

/// Which of a user's lists a set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListType {
    /// Sets the user wants to acquire.
    WantList,
    /// Sets the user offers for sale.
    SellList,
}

impl ListType {
    /// Stored representation (`"WANT_LIST"` or `"SELL_LIST"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WantList => "WANT_LIST",
            Self::SellList => "SELL_LIST",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = UserStoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "WANT_LIST" | "WANT" => Ok(Self::WantList),
            "SELL_LIST" | "SELL" => Ok(Self::SellList),
            _ => Err(UserStoreError::UnknownListType {
                value: value.to_owned(),
            }),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// Local row identifier.
    pub user_id: i64,
    /// Identifier issued by the authentication provider.
    pub uid: String,
    /// Display name.
    pub username: String,
    /// Contact address.
    pub email: String,
}

/// A set as it appears on a user's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedSet {
    /// Reference-store `set_id`.
    pub set_id: i64,
    /// Display name.
    pub name: String,
    /// Price the user attached to the set.
    pub price: f64,
    /// Identifier of the set's artwork, zero when unknown.
    #[serde(default)]
    pub image_id: i64,
}

/// Errors raised by [`UserStore`].
#[derive(Debug, Error)]
pub enum UserStoreError {
    /// The database file could not be opened.
    #[error("failed to open user database at {path}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// Foreign key enforcement could not be enabled.
    #[error("failed to enable foreign keys")]
    ForeignKeys {
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// A schema step failed.
    #[error("schema step '{step}' failed")]
    Migration {
        /// Step being applied.
        step: &'static str,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// The database was written by an incompatible version.
    #[error("user database schema version {found} does not match expected {expected}")]
    VersionMismatch {
        /// Version this crate writes.
        expected: i64,
        /// Version found on disk.
        found: i64,
    },
    /// A query failed.
    #[error("user store {operation} failed")]
    Query {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// No user exists with the given identifier.
    #[error("unknown user {user_id}")]
    UnknownUser {
        /// Identifier that was looked up.
        user_id: i64,
    },
    /// A list name did not match any [`ListType`].
    #[error("unknown list type '{value}'")]
    UnknownListType {
        /// Rejected input.
        value: String,
    },
}

fn query_error(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> UserStoreError {
    move |source| UserStoreError::Query { operation, source }
}

/// SQLite-backed user store.
///
/// All access goes through one connection guarded by a mutex, so writes are
/// serialised and every list update is a single transaction.
pub struct UserStore {
    connection: Mutex<Connection>,
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStore").finish_non_exhaustive()
    }
}

impl UserStore {
    /// Open or create the user database at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or carries an incompatible schema.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, UserStoreError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| UserStoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("opened user database at {path}");
        Self::from_connection(connection)
    }

    /// Create a store that lives only as long as the returned value.
    ///
    /// # Errors
    ///
    /// Fails when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, UserStoreError> {
        let connection = Connection::open_in_memory().map_err(|source| UserStoreError::Open {
            path: Utf8PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, UserStoreError> {
        schema::initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a user or refresh the name and email of an existing one.
    ///
    /// Users are matched on `uid`; the local `user_id` never changes.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Query`] when the write fails.
    pub fn upsert_user(
        &self,
        uid: &str,
        username: &str,
        email: &str,
    ) -> Result<UserProfile, UserStoreError> {
        let connection = self.connection();
        connection
            .execute(
                "INSERT INTO users (user_uid, username, email) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_uid) DO UPDATE
                 SET username = excluded.username, email = excluded.email",
                params![uid, username, email],
            )
            .map_err(query_error("upsert user"))?;
        connection
            .query_row(
                "SELECT user_id, user_uid, username, email FROM users WHERE user_uid = ?1",
                [uid],
                map_user,
            )
            .map_err(query_error("upsert user"))
    }

    /// Look up a user by provider identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Query`] when the read fails.
    pub fn user_by_uid(&self, uid: &str) -> Result<Option<UserProfile>, UserStoreError> {
        self.connection()
            .query_row(
                "SELECT user_id, user_uid, username, email FROM users WHERE user_uid = ?1",
                [uid],
                map_user,
            )
            .optional()
            .map_err(query_error("find user"))
    }

    /// Put `set` on `user_id`'s `list`.
    ///
    /// The set row and the list membership are written in one transaction.
    /// A set already on the user's other list is moved.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::UnknownUser`] when `user_id` does not exist
    /// and [`UserStoreError::Query`] when the write fails.
    pub fn add_to_list(
        &self,
        user_id: i64,
        set: &OwnedSet,
        list: ListType,
    ) -> Result<(), UserStoreError> {
        let mut connection = self.connection();
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error("begin list update"))?;

        let known: bool = transaction
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
                [user_id],
                |row| row.get(0),
            )
            .map_err(query_error("check user"))?;
        if !known {
            return Err(UserStoreError::UnknownUser { user_id });
        }

        transaction
            .execute(
                "INSERT INTO owned_sets (set_id, name, price, image_id) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(set_id) DO UPDATE
                 SET name = excluded.name, price = excluded.price, image_id = excluded.image_id",
                params![set.set_id, set.name, set.price, set.image_id],
            )
            .map_err(query_error("store set"))?;
        transaction
            .execute(
                "INSERT INTO user_set_lists (user_id, set_id, list_type) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, set_id) DO UPDATE SET list_type = excluded.list_type",
                params![user_id, set.set_id, list.as_str()],
            )
            .map_err(query_error("store list entry"))?;

        transaction.commit().map_err(query_error("commit list update"))
    }

    /// Take `set_id` off whichever list of `user_id` holds it.
    ///
    /// Returns `false` when the set was not listed.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Query`] when the write fails.
    pub fn remove_from_list(&self, user_id: i64, set_id: i64) -> Result<bool, UserStoreError> {
        let removed = self
            .connection()
            .execute(
                "DELETE FROM user_set_lists WHERE user_id = ?1 AND set_id = ?2",
                params![user_id, set_id],
            )
            .map_err(query_error("remove list entry"))?;
        Ok(removed > 0)
    }

    /// Sets on `user_id`'s `list`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`UserStoreError::Query`] when the read fails.
    pub fn list_sets(
        &self,
        user_id: i64,
        list: ListType,
    ) -> Result<Vec<OwnedSet>, UserStoreError> {
        let connection = self.connection();
        let mut statement = connection
            .prepare(
                "SELECT s.set_id, s.name, s.price, s.image_id
                 FROM owned_sets s
                 JOIN user_set_lists l ON l.set_id = s.set_id
                 WHERE l.user_id = ?1 AND l.list_type = ?2
                 ORDER BY s.name, s.set_id",
            )
            .map_err(query_error("list sets"))?;
        let rows = statement
            .query_map(params![user_id, list.as_str()], map_set)
            .map_err(query_error("list sets"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error("list sets"))?;
        Ok(rows)
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        uid: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
    })
}

fn map_set(row: &Row<'_>) -> rusqlite::Result<OwnedSet> {
    Ok(OwnedSet {
        set_id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        image_id: row.get(3)?,
    })
}
