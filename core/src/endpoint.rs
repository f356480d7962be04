//! Base URL handling.

use std::fmt;

use url::Url;

use crate::error::ConfigError;

/// Production API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://api-pay.line.me";

/// Sandbox API base URL.
pub const SANDBOX_ENDPOINT: &str = "https://sandbox-api-pay.line.me";

/// An absolute base URL that request paths are resolved against.
///
/// The stored path always ends in `/`, so `"v3/payments"` resolves under the
/// base path instead of replacing its last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut base = Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint {
            url: raw.to_string(),
            source,
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::UnsupportedEndpoint {
                url: raw.to_string(),
            });
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn url(&self) -> &Url {
        &self.base
    }

    /// Resolve `path` against the base with standard reference resolution.
    ///
    /// Relative paths land under the base path, paths starting with `/`
    /// replace it, and absolute URLs are returned as given.
    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt(f)
    }
}
