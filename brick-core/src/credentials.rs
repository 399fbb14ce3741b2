//! Secret API keys for third-party services.

use std::fmt;

use thiserror::Error;

/// Value substituted for a geocoding key that was never configured.
///
/// Requests signed with the placeholder reach the provider and fail there, so
/// the pipelines degrade to their "not found" results rather than refusing to
/// start.
pub const PLACEHOLDER_API_KEY: &str = "DEFAULT_GEOAPIFY";

/// A non-blank API key.
///
/// `Debug` output is redacted so keys never leak into logs.
///
/// # Examples
///
/// ```
/// use brick_core::ApiKey;
///
/// # fn main() -> Result<(), brick_core::ApiKeyError> {
/// let key = ApiKey::new("secret-123")?;
/// assert_eq!(key.expose(), "secret-123");
/// assert_eq!(format!("{key:?}"), "ApiKey(<redacted>)");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

/// Errors returned by [`ApiKey::new`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiKeyError {
    /// The supplied key was empty or whitespace.
    #[error("API key must not be blank")]
    Blank,
}

impl ApiKey {
    /// Validate and wrap a key, trimming surrounding whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, ApiKeyError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ApiKeyError::Blank);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the secret for signing a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether this key is the unconfigured placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_API_KEY
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn rejects_blank_keys(#[case] raw: &str) {
        assert_eq!(ApiKey::new(raw), Err(ApiKeyError::Blank));
    }

    #[rstest]
    fn trims_whitespace() {
        let key = ApiKey::new("  abc  ").expect("valid key");
        assert_eq!(key.expose(), "abc");
    }

    #[rstest]
    fn recognises_placeholder() {
        let key = ApiKey::new(PLACEHOLDER_API_KEY).expect("valid key");
        assert!(key.is_placeholder());
    }
}
