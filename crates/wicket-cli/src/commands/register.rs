//! Register command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use wicket_core::Registration;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "WICKET_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    /// Additional profile field as KEY=VALUE (repeatable). VALUE is parsed
    /// as JSON when possible, otherwise sent as a string.
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

pub async fn run(args: RegisterArgs, ctx: &AppContext) -> Result<()> {
    let mut registration = Registration::new(&args.email, &args.password);
    if let Some(first_name) = args.first_name {
        registration = registration.with_first_name(first_name);
    }
    if let Some(last_name) = args.last_name {
        registration = registration.with_last_name(last_name);
    }
    for field in &args.fields {
        let (key, value) = parse_field(field)?;
        registration = registration.with_field(key, value);
    }

    let session = ctx.session()?;
    eprintln!("{}", "Creating account...".dimmed());

    let profile = session
        .register(registration)
        .await
        .context("Failed to register")?;
    let api = session.client().config().base_url.clone();
    ctx.remember_api_url(&api);

    output::success("Account created and logged in");
    println!();
    output::profile(&profile);
    output::field("API", api.as_str());

    Ok(())
}

fn parse_field(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid field '{}': expected KEY=VALUE", raw);
    };
    if key.is_empty() {
        bail!("Invalid field '{}': key is empty", raw);
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_string_and_json_values() {
        assert_eq!(
            parse_field("company=Acme").unwrap(),
            ("company".to_string(), json!("Acme"))
        );
        assert_eq!(
            parse_field("seats=5").unwrap(),
            ("seats".to_string(), json!(5))
        );
        assert_eq!(
            parse_field("note=a=b").unwrap(),
            ("note".to_string(), json!("a=b"))
        );
    }

    #[test]
    fn rejects_malformed_fields() {
        assert!(parse_field("no-separator").is_err());
        assert!(parse_field("=value").is_err());
    }
}
