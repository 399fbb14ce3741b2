//! Versioned schema of the user-data database.

use rusqlite::{Connection, OptionalExtension, Transaction};

use super::UserStoreError;

/// Schema version written by this crate.
pub const SCHEMA_VERSION: i64 = 1;

/// Create the user-data tables inside `connection` and record the version.
///
/// Foreign keys are enabled on the connection. An existing database must
/// already carry [`SCHEMA_VERSION`]; anything else is rejected.
pub fn initialise_schema(connection: &mut Connection) -> Result<(), UserStoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| UserStoreError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| UserStoreError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| UserStoreError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), UserStoreError> {
    run_migration_step(
        transaction,
        "create users",
        "CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_uid TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT ''
        )",
    )?;
    run_migration_step(
        transaction,
        "create owned_sets",
        "CREATE TABLE IF NOT EXISTS owned_sets (
            set_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            image_id INTEGER NOT NULL DEFAULT 0
        )",
    )?;
    run_migration_step(
        transaction,
        "create user_set_lists",
        "CREATE TABLE IF NOT EXISTS user_set_lists (
            user_id INTEGER NOT NULL,
            set_id INTEGER NOT NULL,
            list_type TEXT NOT NULL CHECK (list_type IN ('WANT_LIST', 'SELL_LIST')),
            PRIMARY KEY (user_id, set_id),
            FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE,
            FOREIGN KEY (set_id) REFERENCES owned_sets(set_id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "index user_set_lists",
        "CREATE INDEX IF NOT EXISTS idx_user_set_lists_set ON user_set_lists(set_id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), UserStoreError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS user_store_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing: Option<i64> = transaction
        .query_row(
            "SELECT version FROM user_store_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| UserStoreError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(UserStoreError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO user_store_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| UserStoreError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), UserStoreError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| UserStoreError::Migration { step, source })
}
