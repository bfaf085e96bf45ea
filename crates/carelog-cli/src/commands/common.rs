//! Shared helpers for CLI commands.

use std::env;
use std::path::{Path, PathBuf};

use carelog_core::db::Database;
use carelog_core::models::SyncStatus;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::CliError;

/// Resolve the database path: flag, then env, then the platform data dir.
pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(carelog_core::config::DB_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("carelog")
        .join("carelog.db")
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path)?)
}

/// Parse a `YYYY-MM-DD` date into Unix milliseconds at local midnight UTC.
pub fn parse_date(raw: &str) -> Result<i64, CliError> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(raw.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidDate(raw.to_string()))?;
    Ok(midnight.and_utc().timestamp_millis())
}

/// Render Unix milliseconds as `YYYY-MM-DD`.
pub fn format_date(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}

/// Short status badge for list output.
pub const fn sync_badge(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Synced => "synced",
        SyncStatus::Pending => "pending",
        SyncStatus::Conflict => "conflict",
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Print a list either as pretty JSON or through a per-row formatter.
pub fn print_list<T: serde::Serialize>(
    rows: &[T],
    as_json: bool,
    line: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("Nothing recorded yet.");
        return Ok(());
    }
    for row in rows {
        println!("{}", line(row));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_date_accepts_iso_dates() {
        let ms = parse_date("2026-08-07").unwrap();
        assert_eq!(format_date(ms), "2026-08-07");
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(matches!(parse_date("yesterday"), Err(CliError::InvalidDate(_))));
        assert!(matches!(parse_date("2026-13-40"), Err(CliError::InvalidDate(_))));
    }

    #[test]
    fn format_relative_time_units() {
        let now = 10_000_000;
        assert_eq!(format_relative_time(now - 30_000, now), "just now");
        assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
        assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    }

    #[test]
    fn resolve_db_path_prefers_explicit_flag() {
        let explicit = PathBuf::from("/tmp/override.db");
        assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
    }
}
