//! Token issuance configuration.
//!
//! An `AuthConfig` is built once by the caller and read by every operation.
//! Nothing in this crate mutates it. Callers that change fields after
//! construction must serialize those writes against concurrent calls themselves.

use std::time::Duration;

/// Default name of the refresh token cookie.
pub const DEFAULT_COOKIE_NAME: &str = "refresh_token";

/// Default path of the refresh token cookie.
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Access token lifetime: 15 minutes
pub const DEFAULT_TOKEN_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime: 24 hours
pub const DEFAULT_REFRESH_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration shared by token issuance, verification and cookie policy.
#[derive(Clone)]
pub struct AuthConfig {
    /// Value of the `iss` claim, and the only issuer accepted on verification
    pub issuer: String,
    /// Value of the `aud` claim (issued, not verified)
    pub audience: String,
    /// HMAC secret
    pub secret: Vec<u8>,
    /// Access token lifetime
    pub token_expiry: Duration,
    /// Refresh token lifetime, should be longer than `token_expiry`. The cookie
    /// lifetime is capped so it never expires after the year 9999.
    pub refresh_expiry: Duration,
    pub cookie_domain: String,
    pub cookie_path: String,
    pub cookie_name: String,
}

impl AuthConfig {
    /// Create a configuration where issuer, audience and cookie domain are all `domain`.
    ///
    /// The secret is left empty and must be set before tokens can be signed.
    pub fn new(domain: &str) -> Self {
        Self {
            issuer: domain.to_string(),
            audience: domain.to_string(),
            secret: Vec::new(),
            token_expiry: DEFAULT_TOKEN_EXPIRY,
            refresh_expiry: DEFAULT_REFRESH_EXPIRY,
            cookie_domain: domain.to_string(),
            cookie_path: DEFAULT_COOKIE_PATH.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }
}

// Keep the secret out of debug output.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("secret", &"<redacted>")
            .field("token_expiry", &self.token_expiry)
            .field("refresh_expiry", &self.refresh_expiry)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_path", &self.cookie_path)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}
