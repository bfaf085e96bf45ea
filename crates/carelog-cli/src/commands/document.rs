use std::path::Path;

use carelog_core::db::EntityRepository;
use carelog_core::models::Document;
use chrono::Utc;

use crate::cli::DocumentCommands;
use crate::commands::common::{
    format_relative_time, open_database, print_list, sync_badge,
};
use crate::error::CliError;

pub fn run(command: DocumentCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        DocumentCommands::Add {
            title,
            doc_type,
            pages,
            visit,
            path,
            tags,
        } => {
            let repo = repo(db_path)?;
            let mut document = Document::new(title, doc_type);
            document.pages = pages;
            document.visit_id = visit;
            document.local_path = path;
            document.tags = tags;

            let document = repo.insert(document)?;
            println!("{}", document.meta.local_id);
        }
        DocumentCommands::List { json } => {
            let repo = repo(db_path)?;
            let documents = repo.list()?;
            let now_ms = Utc::now().timestamp_millis();
            print_list(&documents, json, |document| {
                format!(
                    "{:<5} {:<28} {:<14} {:>3}p {:<8} {}",
                    document.meta.local_id,
                    document.title,
                    document.doc_type,
                    document.pages,
                    sync_badge(document.meta.sync_status),
                    format_relative_time(document.meta.updated_at, now_ms)
                )
            })?;
        }
        DocumentCommands::Delete { id } => {
            repo(db_path)?.delete(id)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn repo(db_path: &Path) -> Result<EntityRepository<Document>, CliError> {
    Ok(EntityRepository::new(open_database(db_path)?))
}
