use carelog_core::auth::AuthClient;
use carelog_core::config::ClientConfig;
use chrono::{DateTime, Utc};

use crate::cli::AuthCommands;
use crate::error::CliError;
use crate::session_store::KeyringSessionStore;

pub async fn run(command: AuthCommands) -> Result<(), CliError> {
    let config = ClientConfig::from_env();
    let base_url = config.require_api_base_url().map_err(CliError::Config)?;
    let client = AuthClient::new(&base_url, KeyringSessionStore::default())?;

    match command {
        AuthCommands::Login { email, password } => {
            let session = client.sign_in(&email, &password).await?;
            println!(
                "Signed in as {}",
                session.user.email.as_deref().unwrap_or(&session.user.id)
            );
        }
        AuthCommands::Status => match client.restore_session().await? {
            Some(session) => {
                println!(
                    "Signed in as {}",
                    session.user.email.as_deref().unwrap_or(&session.user.id)
                );
                let expires = DateTime::<Utc>::from_timestamp(session.expires_at, 0)
                    .map_or_else(|| session.expires_at.to_string(), |dt| dt.to_rfc3339());
                println!("Token expires at {expires}");
            }
            None => println!("Not signed in."),
        },
        AuthCommands::Logout => {
            client.sign_out().await?;
            println!("Signed out.");
        }
    }
    Ok(())
}
