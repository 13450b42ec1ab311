//! Subcommand implementations.

pub mod login;
pub mod logout;
pub mod register;
pub mod status;
pub mod whoami;

use anyhow::Result;

use crate::cli::Commands;
use crate::context::AppContext;

pub async fn handle(cmd: Commands, ctx: &AppContext) -> Result<()> {
    match cmd {
        Commands::Login(args) => login::run(args, ctx).await,
        Commands::Register(args) => register::run(args, ctx).await,
        Commands::Logout(args) => logout::run(args, ctx).await,
        Commands::Whoami(args) => whoami::run(args, ctx).await,
        Commands::Status(args) => status::run(args, ctx).await,
    }
}
