use std::sync::Arc;

use anyhow::{Result, anyhow};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::calendar::GoogleCalendar;
use crate::conversation::{Agent, Session, UserProfile, validate_email};
use crate::core::AppConfig;
use crate::core::db::{async_db, initialize_db};

pub async fn run(name: String, email: String, config: &AppConfig) -> Result<()> {
    super::init_logging();

    if !validate_email(&email) {
        return Err(anyhow!("Invalid email address: {}", email));
    }
    let user = UserProfile { name, email };

    let db = async_db(&config.db_path()).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    let agent = Agent::from_config(config, Arc::new(GoogleCalendar::new(db, config)));

    let mut rl = DefaultEditor::new()?;
    let mut session = Session::new();
    println!("Hi {}! What would you like to book?", user.name);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                let outcome = agent.process_turn(session, &user, &line).await;
                for reply in &outcome.replies {
                    println!("{}\n", reply);
                }
                session = outcome.session;
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
