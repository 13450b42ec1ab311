//! User profile snapshot returned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The backend's user record.
///
/// Fields this layer does not interpret are kept in `extra` so that a
/// cached snapshot round-trips exactly what the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Licenses or subscriptions the user holds.
    #[serde(default, alias = "licenses", skip_serializing_if = "Vec::is_empty")]
    pub entitlements: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// Name to show for this user, falling back to the email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self
                .email
                .clone()
                .unwrap_or_else(|| format!("user {}", self.id)),
        }
    }
}

/// A profile snapshot together with the time it was cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub profile: Profile,
    pub cached_at: DateTime<Utc>,
}

impl CachedProfile {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            cached_at: Utc::now(),
        }
    }

    /// How long ago this snapshot was taken.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.cached_at)
    }
}
