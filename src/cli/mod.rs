//! Command-line front end for keygate.

pub mod commands;

use clap::{Parser, Subcommand};

/// Keygate session CLI
#[derive(Parser, Debug)]
#[command(name = "keygate", version, about = "Keygate: sessions and authenticated requests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and reconcile the session
    Login(LoginArgs),
    /// Create an account, signing in when no verification is needed
    Register(RegisterArgs),
    /// Confirm a pending registration with the emailed code
    Confirm(ConfirmArgs),
    /// Sign out and clear local tokens
    Logout,
    /// Show the reconciled session
    Status,
    /// Send a request carrying the current credential
    Request(RequestArgs),
}

#[derive(Parser, Debug)]
pub struct LoginArgs {
    pub email: String,

    /// Password (read from stdin when omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RegisterArgs {
    pub email: String,

    pub username: String,

    /// Password (read from stdin when omitted)
    #[arg(short, long)]
    pub password: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ConfirmArgs {
    pub email: String,

    /// Verification code
    pub code: String,
}

#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// Path relative to the API base URL, or an absolute URL
    pub target: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Extra header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// JSON request body
    #[arg(short = 'd', long)]
    pub data: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
