//! Stateless JWT access/refresh token issuance and verification.
//!
//! ```no_run
//! use jot::{Auth, AuthConfig, User};
//!
//! let auth = Auth::new(AuthConfig {
//!     secret: b"a-long-random-secret-of-at-least-32-bytes".to_vec(),
//!     ..AuthConfig::new("example.com")
//! });
//!
//! let user = User { id: 1, first_name: "Ada".into(), last_name: "Lovelace".into() };
//! let pair = auth.generate_token_pair(&user)?;
//! let cookie = auth.get_refresh_cookie(&pair.refresh_token);
//! # Ok::<(), jot::AuthError>(())
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod jwt;

pub use auth::{Auth, AuthError, RefreshCookie, TokenPair, User};
pub use config::AuthConfig;
pub use jwt::{HmacSigner, TokenSigner, VerifiedClaims};
