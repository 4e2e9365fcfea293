use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;

pub mod auth;
pub mod chat;
pub mod init;
pub mod serve;
pub mod slots;

#[derive(Subcommand)]
enum Command {
    /// Create the database used to store calendar credentials
    Init {},
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Authorize access to a Google Calendar and store the refresh token
    Auth {
        #[arg(long)]
        email: String,
    },
    /// Start a booking conversation
    Chat {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Print free slots from the calendar
    Slots {
        #[arg(long)]
        email: String,
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        min_minutes: Option<i64>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

/// Logs go to stderr so they don't interleave with the conversation.
pub(crate) fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::default();

    // Handle each sub command
    match args.command {
        Some(Command::Init {}) => {
            init::run(&config).await?;
        }
        Some(Command::Serve { host, port }) => {
            serve::run(host, port, config).await?;
        }
        Some(Command::Auth { email }) => {
            auth::run(&email, &config).await?;
        }
        Some(Command::Chat { name, email }) => {
            chat::run(name, email, &config).await?;
        }
        Some(Command::Slots {
            email,
            days,
            min_minutes,
        }) => {
            slots::run(&email, days, min_minutes, &config).await?;
        }
        None => {}
    }

    Ok(())
}
