use std::path::Path;

use carelog_core::db::EntityRepository;
use carelog_core::models::Visit;
use chrono::Utc;

use crate::cli::VisitCommands;
use crate::commands::common::{
    format_date, format_relative_time, open_database, parse_date, print_list, sync_badge,
};
use crate::error::CliError;

pub fn run(command: VisitCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        VisitCommands::Add {
            date,
            hospital,
            department,
            doctor,
            items,
            cost,
            note,
        } => {
            let repo = repo(db_path)?;
            let mut visit = Visit::new(parse_date(&date)?, hospital);
            visit.department = department;
            visit.doctor = doctor;
            visit.items = items;
            visit.cost = cost;
            visit.note = note;

            let visit = repo.insert(visit)?;
            println!("{}", visit.meta.local_id);
        }
        VisitCommands::List { limit, json } => {
            let repo = repo(db_path)?;
            let mut visits = repo.list()?;
            visits.truncate(limit);
            let now_ms = Utc::now().timestamp_millis();
            print_list(&visits, json, |visit| {
                format!(
                    "{:<5} {}  {:<24} {:<10} {:<8} {}",
                    visit.meta.local_id,
                    format_date(visit.date),
                    visit.hospital,
                    visit.department.as_deref().unwrap_or("-"),
                    sync_badge(visit.meta.sync_status),
                    format_relative_time(visit.meta.updated_at, now_ms)
                )
            })?;
        }
        VisitCommands::Delete { id } => {
            repo(db_path)?.delete(id)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn repo(db_path: &Path) -> Result<EntityRepository<Visit>, CliError> {
    Ok(EntityRepository::new(open_database(db_path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_list_delete_round_trip() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("carelog.db");

        run(
            VisitCommands::Add {
                date: "2026-08-01".to_string(),
                hospital: "General".to_string(),
                department: Some("Cardiology".to_string()),
                doctor: None,
                items: None,
                cost: Some(80.0),
                note: None,
            },
            &db_path,
        )
        .unwrap();

        let repo = repo(&db_path).unwrap();
        let visits = repo.list().unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].hospital, "General");

        run(
            VisitCommands::Delete {
                id: visits[0].meta.local_id,
            },
            &db_path,
        )
        .unwrap();
        assert!(repo.list().unwrap().is_empty());
    }
}
