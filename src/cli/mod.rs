use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod chat;
pub mod migrate;
pub mod serve;

use crate::core::AppConfig;

#[derive(Subcommand)]
enum Command {
    /// Migrate the db schema
    Migrate {
        #[arg(long, action, default_value = "false")]
        db: bool,
    },
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Find a meeting time interactively
    Chat {
        /// User the meeting is requested for
        #[arg(long)]
        user_id: String,

        /// IANA timezone of the user, e.g. America/New_York
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Continue an existing conversation
        #[arg(long)]
        conversation_id: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::default();

    // Handle each sub command
    match args.command {
        Some(Command::Migrate { db }) => {
            migrate::run(db, &config.db_path).await?;
        }
        Some(Command::Serve { host, port }) => {
            serve::run(host, port, config).await;
        }
        Some(Command::Chat {
            user_id,
            timezone,
            conversation_id,
        }) => {
            chat::run(&user_id, &timezone, conversation_id, config).await?;
        }
        None => {}
    }

    Ok(())
}
