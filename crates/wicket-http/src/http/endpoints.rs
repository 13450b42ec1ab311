//! Request/response bodies exchanged with the backend.

use serde::{Deserialize, Serialize};

use wicket_core::Profile;
use wicket_core::error::{ApiError, Error};

fn default_success() -> bool {
    true
}

/// Backend failure body: `{success: false, message, code}`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Token pair embedded in login and registration responses.
#[derive(Debug, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "accessToken", alias = "access_token")]
    pub access: String,
    #[serde(alias = "refreshToken", alias = "refresh_token")]
    pub refresh: String,
}

/// Response from login and registration.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub user: Option<Profile>,
    #[serde(default)]
    pub tokens: Option<TokenPair>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Request body for the refresh and logout endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from the refresh endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Present only when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Response from the profile endpoint.
#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub user: Option<Profile>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Reject a 2xx response whose envelope reports `success: false`.
pub fn ensure_success(
    status: u16,
    success: bool,
    message: &Option<String>,
    code: &Option<String>,
) -> Result<(), Error> {
    if success {
        Ok(())
    } else {
        Err(ApiError::new(status, code.clone(), message.clone(), "").into())
    }
}
