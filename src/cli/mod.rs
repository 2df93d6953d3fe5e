//! Command-line interface for Keyforge.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::cmd_status;

/// Keyforge - multi-tenant game key distribution backend
#[derive(Parser)]
#[command(name = "keyforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API server (default when no command is given)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Show server configuration and database health
    Status,
}
