use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "studybuddy", version, about = "StudyBuddy chat relay server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file path globally
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP relay server
    Serve,

    /// Enter interactive terminal chat against a running relay
    Chat {
        /// The UUID of the session to connect to
        #[arg(short, long)]
        session: Uuid,

        /// Relay base URL; defaults to the configured server address
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a new session
    Create {
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List all sessions
    List,

    /// Delete a session and its messages
    Delete { id: Uuid },
}
