//! Device-local preferences port.
//!
//! # Responsibility
//! - Persist small key/value settings owned by UI collaborators (language,
//!   emergency-contact country, install prompt dismissal).
//!
//! # Invariants
//! - Keys are non-empty after trimming.
//! - Preferences never participate in case/observation transactions.

use crate::repo::case_repo::{table_exists, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Selected UI language code.
pub const PREF_LANGUAGE: &str = "language";
/// Country used for emergency-contact numbers.
pub const PREF_EMERGENCY_COUNTRY: &str = "emergency_country";
pub const PREF_INSTALL_PROMPT_DISMISSED: &str = "install_prompt_dismissed";
pub const PREF_IOS_INSTALL_HINT_DISMISSED: &str = "ios_install_hint_dismissed";

/// Key/value settings storage injected into UI collaborators.
pub trait PreferencesStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Removes `key`; returns whether it was present.
    fn remove(&self, key: &str) -> RepoResult<bool>;

    /// Reads a `"true"`/`"false"` flag, treating absence as `false`.
    fn flag(&self, key: &str) -> RepoResult<bool> {
        Ok(self.get(key)?.as_deref() == Some("true"))
    }

    fn set_flag(&self, key: &str, value: bool) -> RepoResult<()> {
        self.set(key, if value { "true" } else { "false" })
    }
}

/// SQLite-backed preferences on the `preferences` table.
pub struct SqlitePreferences<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePreferences<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        if !table_exists(conn, "preferences")? {
            return Err(RepoError::MissingRequiredTable("preferences"));
        }
        Ok(Self { conn })
    }
}

impl PreferencesStore for SqlitePreferences<'_> {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let key = normalize_key(key)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        let key = normalize_key(key)?;
        self.conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now');",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        let key = normalize_key(key)?;
        let changed = self
            .conn
            .execute("DELETE FROM preferences WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }
}

fn normalize_key(key: &str) -> RepoResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidData(
            "preference key must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}
