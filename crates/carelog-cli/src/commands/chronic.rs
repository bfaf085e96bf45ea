use std::path::Path;

use carelog_core::db::EntityRepository;
use carelog_core::models::{CheckupPlan, ChronicCondition};
use chrono::Utc;

use crate::cli::{ChronicCommands, PlanCommands};
use crate::commands::common::{
    format_date, format_relative_time, open_database, parse_date, print_list, sync_badge,
};
use crate::error::CliError;

pub fn run(command: ChronicCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        ChronicCommands::Add {
            name,
            diagnosed,
            department,
            note,
        } => {
            let repo = conditions(db_path)?;
            let mut condition = ChronicCondition::new(name);
            condition.diagnosed_at = diagnosed.as_deref().map(parse_date).transpose()?;
            condition.department = department;
            condition.note = note;

            let condition = repo.insert(condition)?;
            println!("{}", condition.meta.local_id);
        }
        ChronicCommands::List { json } => {
            let repo = conditions(db_path)?;
            let records = repo.list()?;
            let now_ms = Utc::now().timestamp_millis();
            print_list(&records, json, |condition| {
                format!(
                    "{:<5} {:<24} {:<12} {:<8} {}",
                    condition.meta.local_id,
                    condition.name,
                    condition.diagnosed_at.map_or_else(|| "-".to_string(), format_date),
                    sync_badge(condition.meta.sync_status),
                    format_relative_time(condition.meta.updated_at, now_ms)
                )
            })?;
        }
        ChronicCommands::Delete { id } => {
            conditions(db_path)?.delete(id)?;
            println!("{id}");
        }
        ChronicCommands::Plan { command } => run_plan(command, db_path)?,
    }
    Ok(())
}

fn run_plan(command: PlanCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        PlanCommands::Add {
            condition,
            every,
            items,
            start,
            remind_before,
        } => {
            // The plan must point at a live condition.
            conditions(db_path)?
                .get(condition)?
                .ok_or_else(|| carelog_core::Error::NotFound(format!("chronic_condition {condition}")))?;

            let repo = plans(db_path)?;
            let mut plan = CheckupPlan::new(condition, every);
            plan.items = items;
            plan.start_date = start.as_deref().map(parse_date).transpose()?;
            plan.remind_days_before = remind_before;

            let plan = repo.insert(plan)?;
            println!("{}", plan.meta.local_id);
        }
        PlanCommands::List { json } => {
            let repo = plans(db_path)?;
            let records = repo.list()?;
            print_list(&records, json, |plan| {
                format!(
                    "{:<5} condition {:<5} every {:>2} months  {:<8}",
                    plan.meta.local_id,
                    plan.condition_id,
                    plan.interval_months,
                    sync_badge(plan.meta.sync_status)
                )
            })?;
        }
        PlanCommands::Delete { id } => {
            plans(db_path)?.delete(id)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn conditions(db_path: &Path) -> Result<EntityRepository<ChronicCondition>, CliError> {
    Ok(EntityRepository::new(open_database(db_path)?))
}

fn plans(db_path: &Path) -> Result<EntityRepository<CheckupPlan>, CliError> {
    Ok(EntityRepository::new(open_database(db_path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plan_requires_existing_condition() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("carelog.db");

        let orphan = run_plan(
            PlanCommands::Add {
                condition: 99,
                every: 3,
                items: None,
                start: None,
                remind_before: None,
            },
            &db_path,
        );
        assert!(orphan.is_err());

        run(
            ChronicCommands::Add {
                name: "Hypertension".to_string(),
                diagnosed: Some("2024-01-15".to_string()),
                department: None,
                note: None,
            },
            &db_path,
        )
        .unwrap();
        let condition_id = conditions(&db_path).unwrap().list().unwrap()[0].meta.local_id;

        run_plan(
            PlanCommands::Add {
                condition: condition_id,
                every: 3,
                items: Some("blood pressure".to_string()),
                start: None,
                remind_before: Some(5),
            },
            &db_path,
        )
        .unwrap();
        assert_eq!(plans(&db_path).unwrap().list().unwrap().len(), 1);
    }
}
