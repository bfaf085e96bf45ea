//! Sync checkpoint persistence

use rusqlite::{params, OptionalExtension};

use crate::error::{Error, Result};
use crate::sync::SyncCheckpoint;

use super::Database;

const LAST_SYNC_AT_KEY: &str = "last_sync_at";

/// `last_sync_at` watermark stored in the `sync_meta` key/value table.
pub struct SqliteCheckpoint {
    db: Database,
}

impl SqliteCheckpoint {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

impl SyncCheckpoint for SqliteCheckpoint {
    fn last_sync_at(&self) -> Result<i64> {
        let conn = self.db.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?",
                params![LAST_SYNC_AT_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            None => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Database(format!("corrupt checkpoint value: {raw}"))),
        }
    }

    fn set_last_sync_at(&self, timestamp: i64) -> Result<()> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            params![LAST_SYNC_AT_KEY, timestamp.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_checkpoint_reads_as_zero() {
        let checkpoint = SqliteCheckpoint::new(Database::open_in_memory().unwrap());
        assert_eq!(checkpoint.last_sync_at().unwrap(), 0);
    }

    #[test]
    fn checkpoint_round_trips_and_overwrites() {
        let checkpoint = SqliteCheckpoint::new(Database::open_in_memory().unwrap());
        checkpoint.set_last_sync_at(1_700_000_000_123).unwrap();
        assert_eq!(checkpoint.last_sync_at().unwrap(), 1_700_000_000_123);

        checkpoint.set_last_sync_at(1_700_000_999_999).unwrap();
        assert_eq!(checkpoint.last_sync_at().unwrap(), 1_700_000_999_999);
    }
}
