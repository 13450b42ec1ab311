//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{login, logout, register, status, whoami};

/// Log in to an API backend and inspect the stored session.
#[derive(Parser, Debug)]
#[command(name = "wicket")]
#[command(author, version = env!("WICKET_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// API base URL. Defaults to the URL used at the last login.
    #[arg(long, env = "WICKET_API_URL", global = true)]
    pub api: Option<String>,

    /// Directory holding credentials and the cached profile
    #[arg(long, env = "WICKET_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with email and password
    Login(login::LoginArgs),

    /// Create an account and log in to it
    Register(register::RegisterArgs),

    /// End the session and clear local state
    Logout(logout::LogoutArgs),

    /// Fetch and display the current user's profile
    Whoami(whoami::WhoamiArgs),

    /// Show the locally stored session without contacting the server
    Status(status::StatusArgs),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "wicket",
            "status",
            "--api",
            "http://localhost:3000",
            "--state-dir",
            "/tmp/wicket",
        ])
        .unwrap();
        assert_eq!(cli.api.as_deref(), Some("http://localhost:3000"));
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/wicket")));
        assert!(matches!(cli.command, Commands::Status(_)));
    }
}
