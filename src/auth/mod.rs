//! Access/refresh token issuance and bearer authentication.
//!
//! Short-lived access tokens travel in the `Authorization` header. Refresh
//! tokens travel in an HttpOnly, Secure, SameSite=Strict cookie. Every
//! operation is a synchronous function of the configuration, its inputs and
//! the current time.

mod cookie;
mod errors;
mod header;
mod types;

pub use cookie::{
    MAX_COOKIE_EXPIRES, RefreshCookie, SameSite, get_cookie, issue_cookie, issue_expired_cookie,
};
pub use errors::AuthError;
pub use header::{BEARER_SCHEME, extract_bearer_token};
pub use types::{TokenPair, User};

use axum::http::HeaderMap;
use tracing::debug;

use crate::config::AuthConfig;
use crate::jwt::{
    AccessClaims, HmacSigner, RefreshClaims, TokenSigner, VerifiedClaims, unix_now,
    verify_access_token,
};

/// Entry point composing claim construction, signing, verification and cookie policy.
#[derive(Debug, Clone)]
pub struct Auth<S = HmacSigner> {
    pub config: AuthConfig,
    signer: S,
}

impl Auth {
    /// Create an `Auth` signing with HMAC-SHA256.
    pub fn new(config: AuthConfig) -> Self {
        Self::with_signer(config, HmacSigner)
    }
}

impl<S: TokenSigner> Auth<S> {
    pub fn with_signer(config: AuthConfig, signer: S) -> Self {
        Self { config, signer }
    }

    /// Issue an access token and a refresh token for `user`.
    ///
    /// Either both tokens are signed or an error is returned.
    pub fn generate_token_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let now = unix_now();

        let access_claims = AccessClaims::new(user, &self.config, now);
        let token = self.signer.sign(&access_claims, &self.config.secret)?;

        let refresh_claims = RefreshClaims::new(user, &self.config, now);
        let refresh_token = self.signer.sign(&refresh_claims, &self.config.secret)?;

        debug!(sub = %access_claims.sub, "Issued token pair");

        Ok(TokenPair {
            token,
            refresh_token,
        })
    }

    /// Extract the bearer token from `request` and verify it.
    ///
    /// Adds `Vary: Authorization` to `response` on every call. Returns the raw
    /// token and its claims.
    pub fn get_token_from_header_and_verify(
        &self,
        response: &mut HeaderMap,
        request: &HeaderMap,
    ) -> Result<(String, VerifiedClaims), AuthError> {
        let token = extract_bearer_token(request, response)?;
        let claims = verify_access_token(&self.signer, token, &self.config, unix_now())?;

        debug!(sub = %claims.sub, "Verified access token");

        Ok((token.to_string(), claims))
    }

    /// Cookie carrying `refresh_token`, valid for the refresh token lifetime.
    pub fn get_refresh_cookie(&self, refresh_token: &str) -> RefreshCookie {
        issue_cookie(&self.config, refresh_token, chrono::Utc::now())
    }

    /// Cookie telling the client to discard its refresh token.
    pub fn get_expired_refresh_cookie(&self) -> RefreshCookie {
        issue_expired_cookie(&self.config)
    }

    /// Value of the refresh token cookie in a request's `Cookie` header.
    pub fn get_refresh_token_from_cookie<'a>(&self, request: &'a HeaderMap) -> Option<&'a str> {
        get_cookie(request, &self.config.cookie_name)
    }
}
