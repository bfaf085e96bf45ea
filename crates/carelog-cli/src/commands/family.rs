use std::path::Path;

use carelog_core::db::EntityRepository;
use carelog_core::models::FamilyMember;

use crate::cli::MemberCommands;
use crate::commands::common::{open_database, parse_date, print_list, sync_badge};
use crate::error::CliError;

pub fn run(command: MemberCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        MemberCommands::Add {
            name,
            relationship,
            birth,
            card,
            default,
        } => {
            let repo = repo(db_path)?;
            let mut member = FamilyMember::new(name, relationship.into());
            member.birth_date = birth.as_deref().map(parse_date).transpose()?;
            member.medical_card_no = card;
            member.is_default = default;

            let member = repo.insert(member)?;
            println!("{}", member.meta.local_id);
        }
        MemberCommands::List { json } => {
            let repo = repo(db_path)?;
            let members = repo.list()?;
            print_list(&members, json, |member| {
                let relationship = format!("{:?}", member.relationship).to_lowercase();
                format!(
                    "{:<5} {:<20} {:<10} {:<8}{}",
                    member.meta.local_id,
                    member.name,
                    relationship,
                    sync_badge(member.meta.sync_status),
                    if member.is_default { "  (default)" } else { "" }
                )
            })?;
        }
        MemberCommands::Delete { id } => {
            repo(db_path)?.delete(id)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn repo(db_path: &Path) -> Result<EntityRepository<FamilyMember>, CliError> {
    Ok(EntityRepository::new(open_database(db_path)?))
}
