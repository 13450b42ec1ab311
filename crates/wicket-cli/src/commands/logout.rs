//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, ctx: &AppContext) -> Result<()> {
    let store = ctx.store();
    if store.credentials().get().is_empty() {
        store.clear();
        output::success("Not logged in");
        return Ok(());
    }

    match ctx.session() {
        Ok(session) => session.logout().await,
        Err(e) => {
            output::warning(&format!("{:#}; clearing local session only", e));
            store.clear();
        }
    }

    output::success("Logged out");
    Ok(())
}
