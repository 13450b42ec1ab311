//! Status command implementation.
//!
//! Reports what is stored locally. Never contacts the server.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use wicket_core::Profile;
use wicket_http::SessionStatus;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    status: &'static str,
    state_dir: String,
    api: Option<String>,
    user: Option<Profile>,
    cached_at: Option<String>,
}

pub async fn run(args: StatusArgs, ctx: &AppContext) -> Result<()> {
    let store = ctx.store();
    let credentials = store.credentials().get();
    let cached = store.profile().load();

    let status = match (&credentials.access, &credentials.refresh) {
        (_, None) => SessionStatus::Unauthenticated,
        (Some(_), Some(_)) => SessionStatus::Authenticated,
        (None, Some(_)) => SessionStatus::Initializing,
    };
    let user = match status {
        SessionStatus::Authenticated => cached.as_ref().map(|c| c.profile.clone()),
        _ => None,
    };

    let report = StatusReport {
        status: match status {
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::Initializing => "pending refresh",
        },
        state_dir: ctx.state_dir().display().to_string(),
        api: ctx.api_url().ok().map(|url| url.to_string()),
        cached_at: user
            .as_ref()
            .and(cached.as_ref())
            .map(|c| c.cached_at.to_rfc3339()),
        user,
    };

    if args.json {
        return output::json_pretty(&report);
    }

    output::field("Status", report.status);
    output::field("State", &report.state_dir);
    if let Some(api) = &report.api {
        output::field("API", api);
    }
    if let Some(user) = &report.user {
        output::profile(user);
    } else if status == SessionStatus::Authenticated {
        output::warning("No cached profile; run 'wicket whoami' to fetch it");
    }
    if let Some(cached_at) = &report.cached_at {
        output::field("Cached", cached_at);
    }

    Ok(())
}
