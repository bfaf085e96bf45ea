//! Entity repository over the shared records table
//!
//! Sync metadata (remote id, version, timestamps, status) lives in real
//! columns so collection and merging never deserialize anything; the domain
//! fields travel in the `payload` column as the exact JSON that goes on the
//! wire. Every write path rewrites the payload so the two never drift apart.

use std::marker::PhantomData;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::models::{SyncStatus, Syncable};
use crate::sync::{RecordSnapshot, SyncStore};
use crate::util::unix_timestamp_millis;

use super::Database;

/// Typed repository for one entity kind.
pub struct EntityRepository<T: Syncable> {
    db: Database,
    _entity: PhantomData<fn() -> T>,
}

/// Column values of one row, before payload decoding.
struct RawRecord {
    local_id: i64,
    remote_id: Option<String>,
    version: i64,
    created_at: i64,
    updated_at: i64,
    deleted_at: Option<i64>,
    sync_status: String,
    payload: String,
}

fn raw_from_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        local_id: row.get(0)?,
        remote_id: row.get(1)?,
        version: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        deleted_at: row.get(5)?,
        sync_status: row.get(6)?,
        payload: row.get(7)?,
    })
}

impl<T: Syncable> EntityRepository<T> {
    /// Create a repository over the given database handle.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// Insert a record created on this device. The stored record is `Pending`
    /// with a fresh monotonic local id and no remote identity yet.
    pub fn insert(&self, mut entity: T) -> Result<T> {
        let now = unix_timestamp_millis();
        {
            let meta = entity.meta_mut();
            meta.local_id = 0;
            meta.remote_id = None;
            meta.version = 1;
            meta.created_at = now;
            meta.updated_at = now;
            meta.deleted_at = None;
            meta.sync_status = SyncStatus::Pending;
        }

        let conn = self.db.lock()?;
        let payload = serde_json::to_string(&entity)?;
        conn.execute(
            "INSERT INTO records (entity_type, remote_id, version, created_at, updated_at, deleted_at, sync_status, payload)
             VALUES (?, NULL, 1, ?, ?, NULL, ?, ?)",
            params![
                T::ENTITY_TYPE.as_str(),
                now,
                now,
                SyncStatus::Pending.as_str(),
                payload
            ],
        )?;

        entity.meta_mut().local_id = conn.last_insert_rowid();
        // Rewrite so the stored payload carries its own local id.
        Self::persist_locked(&conn, &entity)?;
        Ok(entity)
    }

    /// Get a live (not soft-deleted) record by local id.
    pub fn get(&self, local_id: i64) -> Result<Option<T>> {
        let conn = self.db.lock()?;
        match Self::load_raw(&conn, local_id)? {
            Some(raw) if raw.deleted_at.is_none() => Ok(Some(Self::hydrate(&raw)?)),
            _ => Ok(None),
        }
    }

    /// List live records, most recently updated first.
    pub fn list(&self) -> Result<Vec<T>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT local_id, remote_id, version, created_at, updated_at, deleted_at, sync_status, payload
             FROM records
             WHERE entity_type = ? AND deleted_at IS NULL
             ORDER BY updated_at DESC",
        )?;
        let raws = stmt
            .query_map(params![T::ENTITY_TYPE.as_str()], raw_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raws.iter().map(Self::hydrate).collect()
    }

    /// Update a record's domain fields. The record goes back to `Pending`;
    /// identity and lineage (remote id, version) stay what the store says,
    /// not what the caller passed.
    pub fn update(&self, entity: &T) -> Result<T> {
        let mut entity = entity.clone();
        let local_id = entity.meta().local_id;
        if local_id == 0 {
            return Err(Error::InvalidInput("record has no local id".to_string()));
        }

        let conn = self.db.lock()?;
        let existing = Self::load_raw(&conn, local_id)?
            .filter(|raw| raw.deleted_at.is_none())
            .ok_or_else(|| Self::not_found(local_id))?;

        let now = unix_timestamp_millis();
        {
            let meta = entity.meta_mut();
            meta.remote_id = existing.remote_id.clone();
            meta.version = existing.version;
            meta.created_at = existing.created_at;
            meta.updated_at = now;
            meta.deleted_at = None;
            meta.sync_status = SyncStatus::Pending;
        }
        Self::persist_locked(&conn, &entity)?;
        Ok(entity)
    }

    /// Soft-delete a record so the deletion itself is propagated on the next
    /// sync instead of silently vanishing.
    pub fn delete(&self, local_id: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let raw = Self::load_raw(&conn, local_id)?
            .filter(|raw| raw.deleted_at.is_none())
            .ok_or_else(|| Self::not_found(local_id))?;

        let mut entity = Self::hydrate(&raw)?;
        let now = unix_timestamp_millis();
        {
            let meta = entity.meta_mut();
            meta.deleted_at = Some(now);
            meta.updated_at = now;
            meta.sync_status = SyncStatus::Pending;
        }
        Self::persist_locked(&conn, &entity)
    }

    fn load_raw(conn: &Connection, local_id: i64) -> Result<Option<RawRecord>> {
        conn.query_row(
            "SELECT local_id, remote_id, version, created_at, updated_at, deleted_at, sync_status, payload
             FROM records
             WHERE entity_type = ? AND local_id = ?",
            params![T::ENTITY_TYPE.as_str(), local_id],
            raw_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Decode the payload and overlay the authoritative column metadata.
    fn hydrate(raw: &RawRecord) -> Result<T> {
        let mut entity: T = serde_json::from_str(&raw.payload)?;
        let status: SyncStatus = raw.sync_status.parse()?;
        let meta = entity.meta_mut();
        meta.local_id = raw.local_id;
        meta.remote_id = raw.remote_id.clone();
        meta.version = raw.version;
        meta.created_at = raw.created_at;
        meta.updated_at = raw.updated_at;
        meta.deleted_at = raw.deleted_at;
        meta.sync_status = status;
        Ok(entity)
    }

    fn snapshot(raw: RawRecord) -> Result<RecordSnapshot> {
        Ok(RecordSnapshot {
            entity_type: T::ENTITY_TYPE,
            local_id: raw.local_id,
            remote_id: raw.remote_id,
            version: raw.version,
            updated_at: raw.updated_at,
            deleted_at: raw.deleted_at,
            sync_status: raw.sync_status.parse()?,
            payload: raw.payload,
        })
    }

    /// Write the record's columns and payload from its in-memory state.
    fn persist_locked(conn: &Connection, entity: &T) -> Result<()> {
        let payload = serde_json::to_string(entity)?;
        let meta = entity.meta();
        let rows = conn.execute(
            "UPDATE records
             SET remote_id = ?, version = ?, created_at = ?, updated_at = ?, deleted_at = ?, sync_status = ?, payload = ?
             WHERE entity_type = ? AND local_id = ?",
            params![
                meta.remote_id,
                meta.version,
                meta.created_at,
                meta.updated_at,
                meta.deleted_at,
                meta.sync_status.as_str(),
                payload,
                T::ENTITY_TYPE.as_str(),
                meta.local_id
            ],
        )?;

        if rows == 0 {
            return Err(Self::not_found(meta.local_id));
        }
        Ok(())
    }

    fn not_found(local_id: i64) -> Error {
        Error::NotFound(format!("{} {local_id}", T::ENTITY_TYPE.as_str()))
    }
}

impl<T: Syncable> SyncStore for EntityRepository<T> {
    fn entity_type(&self) -> crate::models::EntityType {
        T::ENTITY_TYPE
    }

    fn list_pending(&self) -> Result<Vec<RecordSnapshot>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT local_id, remote_id, version, created_at, updated_at, deleted_at, sync_status, payload
             FROM records
             WHERE entity_type = ? AND sync_status != 'SYNCED'
             ORDER BY local_id ASC",
        )?;
        let raws = stmt
            .query_map(params![T::ENTITY_TYPE.as_str()], raw_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raws.into_iter().map(Self::snapshot).collect()
    }

    fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<RecordSnapshot>> {
        let conn = self.db.lock()?;
        let raw = conn
            .query_row(
                "SELECT local_id, remote_id, version, created_at, updated_at, deleted_at, sync_status, payload
                 FROM records
                 WHERE entity_type = ? AND remote_id = ?",
                params![T::ENTITY_TYPE.as_str(), remote_id],
                raw_from_row,
            )
            .optional()?;

        raw.map(Self::snapshot).transpose()
    }

    fn adopt_remote(&self, payload: &str, remote_id: &str, version: i64) -> Result<i64> {
        let mut entity: T = serde_json::from_str(payload)?;
        {
            let meta = entity.meta_mut();
            meta.local_id = 0;
            meta.remote_id = Some(remote_id.to_string());
            meta.version = version;
            meta.sync_status = SyncStatus::Synced;
            // created_at/updated_at/deleted_at stay as authored remotely.
        }

        let conn = self.db.lock()?;
        let stored = serde_json::to_string(&entity)?;
        let meta = entity.meta();
        conn.execute(
            "INSERT INTO records (entity_type, remote_id, version, created_at, updated_at, deleted_at, sync_status, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                T::ENTITY_TYPE.as_str(),
                remote_id,
                version,
                meta.created_at,
                meta.updated_at,
                meta.deleted_at,
                SyncStatus::Synced.as_str(),
                stored
            ],
        )?;

        let local_id = conn.last_insert_rowid();
        entity.meta_mut().local_id = local_id;
        Self::persist_locked(&conn, &entity)?;
        Ok(local_id)
    }

    fn overwrite_with_remote(
        &self,
        local_id: i64,
        payload: &str,
        remote_id: &str,
        version: i64,
    ) -> Result<()> {
        let mut entity: T = serde_json::from_str(payload)?;
        {
            let meta = entity.meta_mut();
            meta.local_id = local_id;
            meta.remote_id = Some(remote_id.to_string());
            meta.version = version;
            meta.sync_status = SyncStatus::Synced;
        }

        let conn = self.db.lock()?;
        Self::persist_locked(&conn, &entity)
    }

    fn apply_remote_delete(&self, local_id: i64, remote_id: &str, version: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let raw = Self::load_raw(&conn, local_id)?.ok_or_else(|| Self::not_found(local_id))?;

        let mut entity = Self::hydrate(&raw)?;
        let now = unix_timestamp_millis();
        {
            let meta = entity.meta_mut();
            if meta.deleted_at.is_none() {
                meta.deleted_at = Some(now);
            }
            meta.updated_at = now;
            meta.remote_id = Some(remote_id.to_string());
            meta.version = version;
            meta.sync_status = SyncStatus::Synced;
        }
        Self::persist_locked(&conn, &entity)
    }

    fn mark_synced(&self, local_id: i64, remote_id: &str, version: i64) -> Result<()> {
        let conn = self.db.lock()?;
        let raw = Self::load_raw(&conn, local_id)?.ok_or_else(|| Self::not_found(local_id))?;

        let mut entity = Self::hydrate(&raw)?;
        {
            let meta = entity.meta_mut();
            meta.remote_id = Some(remote_id.to_string());
            meta.version = version;
            meta.sync_status = SyncStatus::Synced;
        }
        Self::persist_locked(&conn, &entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{EntityType, Visit};
    use pretty_assertions::assert_eq;

    fn setup() -> EntityRepository<Visit> {
        EntityRepository::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn insert_assigns_local_id_and_pending_status() {
        let repo = setup();
        let visit = repo.insert(Visit::new(1_700_000_000_000, "General")).unwrap();

        assert!(visit.meta.local_id > 0);
        assert_eq!(visit.meta.sync_status, SyncStatus::Pending);
        assert!(visit.meta.remote_id.is_none());

        let fetched = repo.get(visit.meta.local_id).unwrap().unwrap();
        assert_eq!(fetched, visit);
    }

    #[test]
    fn stored_payload_carries_its_own_local_id() {
        let repo = setup();
        let visit = repo.insert(Visit::new(1_700_000_000_000, "General")).unwrap();

        let pending = repo.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        let payload: serde_json::Value = serde_json::from_str(&pending[0].payload).unwrap();
        assert_eq!(payload["localId"], visit.meta.local_id);
    }

    #[test]
    fn local_ids_are_monotonic_and_never_reused() {
        let repo = setup();
        let first = repo.insert(Visit::new(1, "A")).unwrap().meta.local_id;
        repo.delete(first).unwrap();
        let second = repo.insert(Visit::new(2, "B")).unwrap().meta.local_id;
        assert!(second > first);
    }

    #[test]
    fn update_keeps_lineage_and_goes_back_to_pending() {
        let repo = setup();
        let visit = repo.insert(Visit::new(1, "A")).unwrap();
        repo.mark_synced(visit.meta.local_id, "srv-1", 3).unwrap();

        let mut edited = repo.get(visit.meta.local_id).unwrap().unwrap();
        edited.hospital = "B".to_string();
        // A caller-tampered version must not stick.
        edited.meta.version = 99;
        let stored = repo.update(&edited).unwrap();

        assert_eq!(stored.hospital, "B");
        assert_eq!(stored.meta.version, 3);
        assert_eq!(stored.meta.remote_id.as_deref(), Some("srv-1"));
        assert_eq!(stored.meta.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn delete_is_soft_and_stays_collectable() {
        let repo = setup();
        let visit = repo.insert(Visit::new(1, "A")).unwrap();
        repo.delete(visit.meta.local_id).unwrap();

        assert!(repo.get(visit.meta.local_id).unwrap().is_none());
        assert!(repo.list().unwrap().is_empty());

        let pending = repo.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].deleted_at.is_some());
        assert!(pending[0].remote_id.is_none());
    }

    #[test]
    fn delete_twice_reports_not_found() {
        let repo = setup();
        let visit = repo.insert(Visit::new(1, "A")).unwrap();
        repo.delete(visit.meta.local_id).unwrap();
        assert!(matches!(
            repo.delete(visit.meta.local_id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn adopt_remote_materializes_synced_record() {
        let repo = setup();
        let mut remote = Visit::new(1_700_000_000_000, "Remote Hospital");
        remote.meta.local_id = 42; // other device's id, must be ignored
        let payload = serde_json::to_string(&remote).unwrap();

        let local_id = repo.adopt_remote(&payload, "srv-9", 5).unwrap();
        assert_ne!(local_id, 42);

        let stored = repo.get(local_id).unwrap().unwrap();
        assert_eq!(stored.meta.sync_status, SyncStatus::Synced);
        assert_eq!(stored.meta.remote_id.as_deref(), Some("srv-9"));
        assert_eq!(stored.meta.version, 5);
        assert_eq!(stored.hospital, "Remote Hospital");

        let found = repo.find_by_remote_id("srv-9").unwrap().unwrap();
        assert_eq!(found.local_id, local_id);
        // Nothing pending: an adopted record is not re-pushed.
        assert!(repo.list_pending().unwrap().is_empty());
    }

    #[test]
    fn apply_remote_delete_leaves_synced_tombstone() {
        let repo = setup();
        let visit = repo.insert(Visit::new(1, "A")).unwrap();
        repo.apply_remote_delete(visit.meta.local_id, "srv-1", 7)
            .unwrap();

        assert!(repo.get(visit.meta.local_id).unwrap().is_none());
        assert!(repo.list_pending().unwrap().is_empty());

        let tombstone = repo.find_by_remote_id("srv-1").unwrap().unwrap();
        assert_eq!(tombstone.sync_status, SyncStatus::Synced);
        assert_eq!(tombstone.version, 7);
        assert!(tombstone.deleted_at.is_some());
    }

    #[test]
    fn mark_synced_records_confirmation() {
        let repo = setup();
        let visit = repo.insert(Visit::new(1, "A")).unwrap();
        repo.mark_synced(visit.meta.local_id, "srv-1", 2).unwrap();

        let stored = repo.get(visit.meta.local_id).unwrap().unwrap();
        assert_eq!(stored.meta.sync_status, SyncStatus::Synced);
        assert_eq!(stored.meta.version, 2);
        assert!(repo.list_pending().unwrap().is_empty());
    }

    #[test]
    fn repositories_share_one_table_without_cross_talk() {
        let db = Database::open_in_memory().unwrap();
        let visits: EntityRepository<Visit> = EntityRepository::new(db.clone());
        let members: EntityRepository<crate::models::FamilyMember> =
            EntityRepository::new(db);

        visits.insert(Visit::new(1, "A")).unwrap();
        assert!(members.list().unwrap().is_empty());
        assert_eq!(members.entity_type(), EntityType::FamilyMember);
        assert!(members.list_pending().unwrap().is_empty());
    }
}
