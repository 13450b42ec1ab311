//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use wicket_core::Profile;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning to stderr.
pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print the fields of a profile worth showing a human.
pub fn profile(profile: &Profile) {
    field("ID", &profile.id.to_string());
    field("Name", &profile.display_name());
    if let Some(email) = &profile.email {
        field("Email", email);
    }
    if !profile.entitlements.is_empty() {
        field("Licenses", &profile.entitlements.len().to_string());
    }
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
