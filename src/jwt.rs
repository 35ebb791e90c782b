//! JWT claim sets, HMAC signing and access token verification.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::auth::{AuthError, User};
use crate::config::AuthConfig;

/// Value of the `typ` claim. Only access tokens carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
}

/// Algorithms accepted on verification. Tokens are always issued with HS256.
pub const HMAC_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Current time as Unix seconds (UTC).
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn expires_at(issued_at: i64, ttl: Duration) -> i64 {
    let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    issued_at.saturating_add(ttl)
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (stringified user id)
    pub sub: String,
    /// First and last name
    pub name: String,
    pub aud: String,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub typ: TokenType,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    pub fn new(user: &User, config: &AuthConfig, now: i64) -> Self {
        Self {
            sub: user.id.to_string(),
            name: format!("{} {}", user.first_name, user.last_name),
            aud: config.audience.clone(),
            iss: config.issuer.clone(),
            iat: now,
            typ: TokenType::Access,
            exp: expires_at(now, config.token_expiry),
        }
    }
}

/// JWT claims for refresh tokens: only who it was granted to and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(user: &User, config: &AuthConfig, now: i64) -> Self {
        Self {
            sub: user.id.to_string(),
            iat: now,
            exp: expires_at(now, config.refresh_expiry),
        }
    }
}

/// Claims decoded from a token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub sub: String,
    /// Audience, accepted as a single string or an array
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub nbf: Option<i64>,
    #[serde(deserialize_with = "deserialize_numeric_date")]
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(aud) => aud,
    })
}

/// JWT NumericDate: integer or fractional seconds, truncated to whole seconds.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Seconds(i64),
    Fractional(f64),
}

impl From<NumericDate> for i64 {
    fn from(date: NumericDate) -> Self {
        match date {
            NumericDate::Seconds(secs) => secs,
            // `as` saturates, and NaN becomes 0
            NumericDate::Fractional(secs) => secs.trunc() as i64,
        }
    }
}

fn deserialize_numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    NumericDate::deserialize(deserializer).map(i64::from)
}

fn deserialize_optional_numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NumericDate>::deserialize(deserializer)?.map(i64::from))
}

/// Signing primitive behind token issuance and verification.
pub trait TokenSigner {
    /// Serialize `claims` and sign them into a compact token.
    fn sign<T: Serialize>(&self, claims: &T, secret: &[u8]) -> Result<String, AuthError>;

    /// Check the algorithm and signature of `token` and decode its claims.
    /// Time based claims are left to the caller.
    fn verify<T: DeserializeOwned>(&self, token: &str, secret: &[u8]) -> Result<T, AuthError>;
}

/// HMAC-SHA2 signer backed by `jsonwebtoken`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl TokenSigner for HmacSigner {
    fn sign<T: Serialize>(&self, claims: &T, secret: &[u8]) -> Result<String, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Signing("secret is empty".to_string()));
        }

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str, secret: &[u8]) -> Result<T, AuthError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| classify_header_error(token, e))?;

        if !HMAC_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::UnexpectedSigningMethod(format!(
                "{:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(header.alg);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))
    }
}

/// Classify a header `jsonwebtoken` could not parse. Algorithms it does not
/// know at all, such as `none`, are still an unexpected signing method.
fn classify_header_error(token: &str, err: jsonwebtoken::errors::Error) -> AuthError {
    #[derive(Deserialize)]
    struct RawHeader {
        alg: String,
    }

    let alg = token
        .split('.')
        .next()
        .and_then(|segment| URL_SAFE_NO_PAD.decode(segment).ok())
        .and_then(|bytes| serde_json::from_slice::<RawHeader>(&bytes).ok())
        .map(|header| header.alg);

    match alg {
        Some(alg) if !alg.starts_with("HS") => AuthError::UnexpectedSigningMethod(alg),
        _ => AuthError::MalformedToken(err.to_string()),
    }
}

/// Verify an access token at time `now` (Unix seconds).
///
/// Checks run in order: algorithm and signature, expiry, `iat` and `nbf` not
/// in the future, issuer. The audience is not checked.
pub fn verify_access_token<S: TokenSigner>(
    signer: &S,
    token: &str,
    config: &AuthConfig,
    now: i64,
) -> Result<VerifiedClaims, AuthError> {
    let claims: VerifiedClaims = signer.verify(token, &config.secret)?;

    if claims.exp < now {
        return Err(AuthError::ExpiredToken);
    }

    if claims.iat.is_some_and(|iat| iat > now) {
        return Err(AuthError::MalformedToken("token used before issued".to_string()));
    }

    if claims.nbf.is_some_and(|nbf| nbf > now) {
        return Err(AuthError::MalformedToken("token is not valid yet".to_string()));
    }

    if claims.iss != config.issuer {
        return Err(AuthError::IncorrectIssuer);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn test_config() -> AuthConfig {
        AuthConfig {
            secret: b"test-secret-key-for-testing".to_vec(),
            ..AuthConfig::new("example.com")
        }
    }

    fn test_user() -> User {
        User {
            id: 1,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
        }
    }

    fn unsigned_token(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_access_claims() {
        let config = test_config();
        let claims = AccessClaims::new(&test_user(), &config, NOW);

        assert_eq!(claims.sub, "1");
        assert_eq!(claims.name, "Admin User");
        assert_eq!(claims.aud, "example.com");
        assert_eq!(claims.iss, "example.com");
        assert_eq!(claims.typ, TokenType::Access);
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 15 * 60);
    }

    #[test]
    fn test_refresh_claims_are_reduced() {
        let config = test_config();
        let claims = RefreshClaims::new(&test_user(), &config, NOW);

        assert_eq!(claims.exp, NOW + 24 * 60 * 60);

        let json = serde_json::to_value(&claims).unwrap();
        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys.len(), 3);
        for key in ["sub", "iat", "exp"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let config = test_config();
        let token = HmacSigner
            .sign(&AccessClaims::new(&test_user(), &config, NOW), &config.secret)
            .unwrap();

        assert_eq!(token.split('.').count(), 3);

        let claims = verify_access_token(&HmacSigner, &token, &config, NOW).unwrap();
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.iss, "example.com");
        assert_eq!(claims.aud, vec!["example.com".to_string()]);
        assert_eq!(claims.iat, Some(NOW));
        assert_eq!(claims.name.as_deref(), Some("Admin User"));
        assert_eq!(claims.typ.as_deref(), Some("access"));
    }

    #[test]
    fn test_issued_with_hs256() {
        let config = test_config();
        let token = HmacSigner
            .sign(&RefreshClaims::new(&test_user(), &config, NOW), &config.secret)
            .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_empty_secret_fails_signing() {
        let config = AuthConfig::new("example.com");
        let result = HmacSigner.sign(&AccessClaims::new(&test_user(), &config, NOW), &[]);

        assert!(matches!(result, Err(AuthError::Signing(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let config = test_config();
        let token = HmacSigner
            .sign(&AccessClaims::new(&test_user(), &config, NOW), b"secret-1")
            .unwrap();

        let result = verify_access_token(&HmacSigner, &token, &config, NOW);
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();

        for token in ["", "invalid-token", "a.b", "a.b.c"] {
            let result = verify_access_token(&HmacSigner, token, &config, NOW);
            assert!(
                matches!(result, Err(AuthError::MalformedToken(_))),
                "{:?} should be malformed, got {:?}",
                token,
                result
            );
        }
    }

    #[test]
    fn test_tampered_signature() {
        let config = test_config();
        let token = HmacSigner
            .sign(&AccessClaims::new(&test_user(), &config, NOW), &config.secret)
            .unwrap();
        let signature_start = token.rfind('.').unwrap() + 1;

        for i in signature_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            let result = verify_access_token(&HmacSigner, &tampered, &config, NOW);
            assert!(
                matches!(result, Err(AuthError::MalformedToken(_))),
                "flip at {} should be rejected, got {:?}",
                i,
                result
            );
        }
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let config = test_config();
        let token = unsigned_token(
            r#"{"alg":"none","typ":"JWT"}"#,
            &format!(r#"{{"sub":"1","iss":"example.com","exp":{}}}"#, NOW + 60),
        );

        let result = verify_access_token(&HmacSigner, &token, &config, NOW);
        assert!(matches!(result, Err(AuthError::UnexpectedSigningMethod(_))));
    }

    #[test]
    fn test_asymmetric_algorithm_rejected() {
        let config = test_config();
        let token = unsigned_token(
            r#"{"alg":"RS256","typ":"JWT"}"#,
            &format!(r#"{{"sub":"1","iss":"example.com","exp":{}}}"#, NOW + 60),
        );

        let result = verify_access_token(&HmacSigner, &token, &config, NOW);
        assert!(matches!(result, Err(AuthError::UnexpectedSigningMethod(_))));
    }

    #[test]
    fn test_other_hmac_algorithms_accepted() {
        let config = test_config();
        let claims = AccessClaims::new(&test_user(), &config, NOW);

        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = jsonwebtoken::encode(
                &Header::new(alg),
                &claims,
                &EncodingKey::from_secret(&config.secret),
            )
            .unwrap();

            let verified = verify_access_token(&HmacSigner, &token, &config, NOW).unwrap();
            assert_eq!(verified.sub, "1");
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let config = test_config();
        let claims = AccessClaims::new(&test_user(), &config, NOW);
        let token = HmacSigner.sign(&claims, &config.secret).unwrap();

        assert!(verify_access_token(&HmacSigner, &token, &config, claims.exp - 1).is_ok());
        assert!(verify_access_token(&HmacSigner, &token, &config, claims.exp).is_ok());
        assert_eq!(
            verify_access_token(&HmacSigner, &token, &config, claims.exp + 1),
            Err(AuthError::ExpiredToken)
        );
    }

    fn sign_json(config: &AuthConfig, claims: serde_json::Value) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&config.secret),
        )
        .unwrap()
    }

    #[test]
    fn test_not_before_boundary() {
        let config = test_config();
        let token = sign_json(
            &config,
            serde_json::json!({ "iss": "example.com", "nbf": NOW, "exp": NOW + 60 }),
        );

        assert!(matches!(
            verify_access_token(&HmacSigner, &token, &config, NOW - 1),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(verify_access_token(&HmacSigner, &token, &config, NOW).is_ok());
        assert!(verify_access_token(&HmacSigner, &token, &config, NOW + 1).is_ok());
    }

    #[test]
    fn test_issued_in_future_boundary() {
        let config = test_config();
        let claims = AccessClaims::new(&test_user(), &config, NOW);
        let token = HmacSigner.sign(&claims, &config.secret).unwrap();

        let result = verify_access_token(&HmacSigner, &token, &config, NOW - 1);
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
        assert!(result.unwrap_err().is_malformed_token());
        assert!(verify_access_token(&HmacSigner, &token, &config, NOW).is_ok());
    }

    #[test]
    fn test_fractional_numeric_dates() {
        let config = test_config();
        let token = sign_json(
            &config,
            serde_json::json!({
                "iss": "example.com",
                "iat": NOW as f64 - 0.25,
                "nbf": NOW as f64 + 0.5,
                "exp": NOW as f64 + 60.5,
            }),
        );

        let claims = verify_access_token(&HmacSigner, &token, &config, NOW).unwrap();
        assert_eq!(claims.exp, NOW + 60);
        assert_eq!(claims.iat, Some(NOW - 1));
        assert_eq!(claims.nbf, Some(NOW));
        assert!(verify_access_token(&HmacSigner, &token, &config, NOW + 60).is_ok());
        assert_eq!(
            verify_access_token(&HmacSigner, &token, &config, NOW + 61),
            Err(AuthError::ExpiredToken)
        );
    }

    #[test]
    fn test_numeric_date_must_be_a_number() {
        let config = test_config();
        let token = sign_json(
            &config,
            serde_json::json!({ "iss": "example.com", "exp": "tomorrow" }),
        );

        let result = verify_access_token(&HmacSigner, &token, &config, NOW);
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_expired_checked_before_issuer() {
        let config = test_config();
        let other = AuthConfig {
            issuer: "other.org".to_string(),
            ..test_config()
        };
        let claims = AccessClaims::new(&test_user(), &other, NOW);
        let token = HmacSigner.sign(&claims, &other.secret).unwrap();

        assert_eq!(
            verify_access_token(&HmacSigner, &token, &config, claims.exp + 60),
            Err(AuthError::ExpiredToken)
        );
    }

    #[test]
    fn test_incorrect_issuer() {
        let issuer_a = AuthConfig {
            issuer: "other.org".to_string(),
            ..test_config()
        };
        let issuer_b = test_config();
        let token = HmacSigner
            .sign(&AccessClaims::new(&test_user(), &issuer_a, NOW), &issuer_a.secret)
            .unwrap();

        assert!(verify_access_token(&HmacSigner, &token, &issuer_a, NOW).is_ok());
        assert_eq!(
            verify_access_token(&HmacSigner, &token, &issuer_b, NOW),
            Err(AuthError::IncorrectIssuer)
        );
    }

    #[test]
    fn test_issuer_is_case_sensitive() {
        let config = test_config();
        let upper = AuthConfig {
            issuer: "Example.com".to_string(),
            ..test_config()
        };
        let token = HmacSigner
            .sign(&AccessClaims::new(&test_user(), &config, NOW), &config.secret)
            .unwrap();

        assert_eq!(
            verify_access_token(&HmacSigner, &token, &upper, NOW),
            Err(AuthError::IncorrectIssuer)
        );
    }

    #[test]
    fn test_audience_not_verified() {
        let issuing = AuthConfig {
            audience: "api.example.com".to_string(),
            ..test_config()
        };
        let verifying = AuthConfig {
            audience: "somewhere-else".to_string(),
            ..test_config()
        };
        let token = HmacSigner
            .sign(&AccessClaims::new(&test_user(), &issuing, NOW), &issuing.secret)
            .unwrap();

        let claims = verify_access_token(&HmacSigner, &token, &verifying, NOW).unwrap();
        assert_eq!(claims.aud, vec!["api.example.com".to_string()]);
    }

    #[test]
    fn test_audience_array_accepted() {
        let config = test_config();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({
                "sub": "1",
                "iss": "example.com",
                "aud": ["a.example.com", "b.example.com"],
                "exp": NOW + 60,
            }),
            &EncodingKey::from_secret(&config.secret),
        )
        .unwrap();

        let claims = verify_access_token(&HmacSigner, &token, &config, NOW).unwrap();
        assert_eq!(claims.aud.len(), 2);
        assert_eq!(claims.iat, None);
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let config = test_config();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": "1", "iss": "example.com" }),
            &EncodingKey::from_secret(&config.secret),
        )
        .unwrap();

        let result = verify_access_token(&HmacSigner, &token, &config, NOW);
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_refresh_token_fails_access_verification() {
        let config = test_config();
        let token = HmacSigner
            .sign(&RefreshClaims::new(&test_user(), &config, NOW), &config.secret)
            .unwrap();

        assert_eq!(
            verify_access_token(&HmacSigner, &token, &config, NOW),
            Err(AuthError::IncorrectIssuer)
        );
    }
}
