//! API base URL type.

use std::fmt;

use url::{Host, Url};

use crate::error::{Error, InvalidInputError};

/// A validated base URL for the backend API.
///
/// Plain HTTP is accepted only for loopback hosts. The base may carry a
/// path prefix (`https://example.com/api`); endpoint paths are appended to
/// it.
///
/// # Example
///
/// ```
/// use wicket_core::ApiUrl;
///
/// let api = ApiUrl::new("https://example.com/api/").unwrap();
/// assert_eq!(api.endpoint_url("/auth/login"), "https://example.com/api/auth/login");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Parse and validate a base URL. Query and fragment are dropped.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let raw = s.as_ref();
        let invalid = |reason: &str| -> Error {
            InvalidInputError::ApiUrl {
                value: raw.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        let mut url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

        let loopback = match url.host() {
            None => return Err(invalid("must have a host")),
            Some(Host::Domain(domain)) => domain == "localhost",
            Some(Host::Ipv4(ip)) => ip.is_loopback(),
            Some(Host::Ipv6(ip)) => ip.is_loopback(),
        };
        match url.scheme() {
            "https" => {}
            "http" if loopback => {}
            _ => return Err(invalid("must use HTTPS (HTTP allowed only for localhost)")),
        }

        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self(url))
    }

    /// Returns the full URL for an endpoint path.
    ///
    /// The endpoint's own trailing slash is kept, since some backends
    /// route `/profile/` and `/profile` differently.
    pub fn endpoint_url(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_and_loopback_http() {
        assert_eq!(
            ApiUrl::new("https://api.example.com").unwrap().host(),
            Some("api.example.com")
        );
        assert!(ApiUrl::new("http://127.0.0.1:8080").is_ok());
        assert!(ApiUrl::new("http://localhost:3000").is_ok());
        assert!(ApiUrl::new("http://[::1]:3000").is_ok());
    }

    #[test]
    fn rejects_plain_http_to_remote_hosts() {
        let err = ApiUrl::new("http://api.example.com").unwrap_err();
        assert!(err.to_string().contains("HTTPS"));
        assert!(ApiUrl::new("ftp://api.example.com").is_err());
    }

    #[test]
    fn rejects_relative_and_hostless_urls() {
        assert!(ApiUrl::new("/auth/login").is_err());
        assert!(ApiUrl::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn endpoint_keeps_its_trailing_slash() {
        let api = ApiUrl::new("https://api.example.com").unwrap();
        assert_eq!(
            api.endpoint_url("/auth/refresh-token"),
            "https://api.example.com/auth/refresh-token"
        );
        assert_eq!(
            api.endpoint_url("/profile/"),
            "https://api.example.com/profile/"
        );
    }

    #[test]
    fn path_prefix_is_preserved() {
        let api = ApiUrl::new("https://example.com/api/v1/?debug=1#top").unwrap();
        assert_eq!(
            api.endpoint_url("auth/login"),
            "https://example.com/api/v1/auth/login"
        );
    }
}
