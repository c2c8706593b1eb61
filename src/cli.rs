use clap::{Parser, Subcommand};

/// extgate — extension token service
#[derive(Parser)]
#[command(name = "extgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to EXTGATE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Keep all state in process memory instead of Postgres (local development only)
        #[arg(long)]
        in_memory: bool,
    },

    /// Manage extension tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a token for a user
    Issue {
        #[arg(long)]
        user_id: String,
    },
    /// Revoke a token
    Revoke {
        #[arg(long)]
        token: String,
    },
    /// Delete tokens that expired before the retention window
    Purge {
        #[arg(long, default_value = "24", value_parser = clap::value_parser!(i64).range(0..))]
        older_than_hours: i64,
    },
}
