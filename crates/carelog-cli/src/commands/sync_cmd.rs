use std::path::Path;
use std::sync::Arc;

use carelog_core::auth::AuthClient;
use carelog_core::config::ClientConfig;
use carelog_core::db::{Database, EntityRepository, SqliteCheckpoint};
use carelog_core::models::{CheckupPlan, ChronicCondition, Document, FamilyMember, Visit};
use carelog_core::sync::{HttpSyncTransport, SyncCheckpoint, SyncStore};
use carelog_core::{ConflictPolicy, SyncEngine};

use crate::commands::common::open_database;
use crate::error::CliError;
use crate::session_store::KeyringSessionStore;

pub async fn run_sync(policy: ConflictPolicy, db_path: &Path) -> Result<(), CliError> {
    let config = ClientConfig::from_env();
    let base_url = config.require_api_base_url().map_err(CliError::Config)?;

    let auth = AuthClient::new(&base_url, KeyringSessionStore::default())?;
    if auth.restore_session().await?.is_none() {
        return Err(CliError::Config(
            "Not signed in. Run `carelog auth login` first.".to_string(),
        ));
    }

    let db = open_database(db_path)?;
    let transport = HttpSyncTransport::new(base_url.as_str(), auth)?;
    let checkpoint: Arc<dyn SyncCheckpoint> = Arc::new(SqliteCheckpoint::new(db.clone()));
    let engine = SyncEngine::new(transport, entity_stores(&db), checkpoint, policy);

    let report = engine.sync().await?;
    println!(
        "Synced: pulled {} ({} applied), pushed {} ({} confirmed)",
        report.pulled, report.applied, report.pushed, report.confirmed
    );
    Ok(())
}

/// One sync-facing store per entity type, in collection order.
fn entity_stores(db: &Database) -> Vec<Arc<dyn SyncStore>> {
    vec![
        Arc::new(EntityRepository::<Visit>::new(db.clone())),
        Arc::new(EntityRepository::<Document>::new(db.clone())),
        Arc::new(EntityRepository::<ChronicCondition>::new(db.clone())),
        Arc::new(EntityRepository::<CheckupPlan>::new(db.clone())),
        Arc::new(EntityRepository::<FamilyMember>::new(db.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelog_core::models::EntityType;

    #[test]
    fn stores_cover_every_entity_type() {
        let db = Database::open_in_memory().unwrap();
        let stores = entity_stores(&db);
        let covered: Vec<EntityType> = stores.iter().map(|store| store.entity_type()).collect();
        assert_eq!(covered, EntityType::ALL);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_without_configuration_explains_the_env_var() {
        // Isolate from any ambient environment.
        std::env::remove_var(carelog_core::config::API_URL_ENV);
        let error = run_sync(ConflictPolicy::LastWriteWins, Path::new("/tmp/unused.db"))
            .await
            .unwrap_err();
        assert!(error
            .to_string()
            .contains(carelog_core::config::API_URL_ENV));
    }
}
