//! Authentication user and token types.

use serde::{Deserialize, Serialize};

/// The minimal user data needed to issue tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// Signed access and refresh tokens issued together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "access_token")]
    pub token: String,
    pub refresh_token: String,
}
