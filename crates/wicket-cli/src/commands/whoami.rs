//! Whoami command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the full profile as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, ctx: &AppContext) -> Result<()> {
    let session = ctx.session()?;

    let Some(revalidation) = session.initialize() else {
        bail!("No active session. Run 'wicket login' first.");
    };

    let profile = if session.is_authenticated() {
        // The explicit fetch below supersedes startup revalidation.
        revalidation.abort();
        session
            .refresh_profile()
            .await
            .context("Failed to fetch profile")?
    } else {
        revalidation.await.context("Session revalidation failed")?;
        let state = session.state();
        match state.user {
            Some(user) if state.is_authenticated() => user,
            _ => bail!("Session expired. Run 'wicket login' again."),
        }
    };

    if args.json {
        output::json_pretty(&profile)?;
    } else {
        output::profile(&profile);
    }

    Ok(())
}
