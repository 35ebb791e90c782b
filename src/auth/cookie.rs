//! Refresh token cookie policy and `Cookie` header parsing.

use std::fmt;

use axum::http::{HeaderMap, HeaderValue, header, header::InvalidHeaderValue};
use chrono::{DateTime, Utc};

use crate::config::AuthConfig;

/// Latest `Expires` a cookie is issued with: 9999-12-31T23:59:59Z, the last
/// instant an IMF-fixdate can express.
pub const MAX_COOKIE_EXPIRES: i64 = 253_402_300_799;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Cookie carrying a refresh token, or instructing the client to drop it.
///
/// `Display` renders the value of a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCookie {
    pub name: String,
    pub path: String,
    /// Omitted from the header when empty
    pub domain: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    /// Seconds; negative means delete now
    pub max_age: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl RefreshCookie {
    fn from_config(
        config: &AuthConfig,
        value: String,
        expires: DateTime<Utc>,
        max_age: i64,
    ) -> Self {
        Self {
            name: config.cookie_name.clone(),
            path: config.cookie_path.clone(),
            domain: config.cookie_domain.clone(),
            value,
            expires,
            max_age,
            http_only: true,
            secure: true,
            same_site: SameSite::Strict,
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }

    /// Append as a `Set-Cookie` header.
    pub fn append_to(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        headers.append(header::SET_COOKIE, self.to_header_value()?);
        Ok(())
    }
}

impl fmt::Display for RefreshCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if !self.domain.is_empty() {
            write!(f, "; Domain={}", self.domain)?;
        }
        write!(
            f,
            "; Expires={}; Max-Age={}",
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.max_age
        )?;
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        write!(f, "; SameSite={}", self.same_site)
    }
}

/// Live refresh cookie: expires `refresh_expiry` after `now`, but never later
/// than [`MAX_COOKIE_EXPIRES`].
pub fn issue_cookie(
    config: &AuthConfig,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> RefreshCookie {
    let remaining = MAX_COOKIE_EXPIRES.saturating_sub(now.timestamp()).max(0);
    let max_age = i64::try_from(config.refresh_expiry.as_secs())
        .unwrap_or(i64::MAX)
        .min(remaining);
    let expires = chrono::TimeDelta::try_seconds(max_age)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(now);

    RefreshCookie::from_config(config, refresh_token.to_string(), expires, max_age)
}

/// Deletion cookie: empty value, `Max-Age=-1` and an expiry at the Unix epoch.
pub fn issue_expired_cookie(config: &AuthConfig) -> RefreshCookie {
    // DateTime<Utc>::default() is the Unix epoch
    RefreshCookie::from_config(config, String::new(), DateTime::<Utc>::default(), -1)
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}
