//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use wicket_core::LoginCredentials;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "WICKET_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, ctx: &AppContext) -> Result<()> {
    let session = ctx.session()?;
    let credentials = LoginCredentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let profile = session.login(credentials).await.context("Failed to login")?;
    let api = session.client().config().base_url.clone();
    ctx.remember_api_url(&api);

    output::success("Logged in successfully");
    println!();
    output::profile(&profile);
    output::field("API", api.as_str());

    Ok(())
}
