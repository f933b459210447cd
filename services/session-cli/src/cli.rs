//! Command-line parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use session_auth::UserRole;

#[derive(Parser, Debug)]
#[command(name = "session-cli", version, about = "Command-line client for the session API")]
pub struct Cli {
    /// Config file (defaults to $CONFIG_PATH, then ./session-cli.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Log in and store the credential pair
    Login { email: String, password: String },
    /// Create an account and store the credential pair
    Register {
        email: String,
        password: String,
        display_name: Option<String>,
    },
    /// End the session and clear stored credentials
    Logout,
    /// Show the current user
    Me,
    /// Rotate the credential pair now
    Refresh,
    /// GET an arbitrary path under the API prefix
    Get { path: String },
    /// List documents
    Documents,
    /// Show one document
    Document { id: String },
    /// List a document's chunks
    Chunks { id: String },
    /// Delete a document
    Delete { id: String },
    /// Document service health
    Health,
    /// Upload one or more documents (pdf, txt, md)
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        chunk_size: Option<u32>,
        #[arg(long)]
        chunk_overlap: Option<u32>,
    },
    /// Fetch the role dashboard
    Dashboard {
        #[arg(value_enum)]
        role: UserRole,
    },
}
