//! Authentication error types.

/// Errors returned by token issuance, header extraction and verification.
///
/// None of these are transient. Callers typically answer every variant except
/// `Signing` with a 401, and `Signing` with a 500.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or an empty one
    MissingAuthHeader,
    /// Header does not split into exactly two space separated parts
    MalformedAuthHeader,
    /// First part of the header is not exactly `Bearer`
    MissingBearerScheme,
    /// Token failed to parse, failed the signature check, or lacks required claims
    MalformedToken(String),
    /// Token header advertises an algorithm outside the HMAC family
    UnexpectedSigningMethod(String),
    /// Signature is valid but `exp` is in the past
    ExpiredToken,
    /// Signature and expiry are valid but `iss` does not match the configuration
    IncorrectIssuer,
    /// Signing primitive rejected the secret or payload
    Signing(String),
}

impl AuthError {
    /// True for every failure that means "this token cannot be trusted as sent",
    /// including an unexpected signing algorithm.
    pub fn is_malformed_token(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedToken(_) | AuthError::UnexpectedSigningMethod(_)
        )
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "No auth header"),
            AuthError::MalformedAuthHeader => write!(f, "Invalid auth header"),
            AuthError::MissingBearerScheme => write!(f, "Unauthorized - no bearer"),
            AuthError::MalformedToken(e) => write!(f, "Malformed token: {}", e),
            AuthError::UnexpectedSigningMethod(alg) => {
                write!(f, "Unexpected signing method: {}", alg)
            }
            AuthError::ExpiredToken => write!(f, "Expired token"),
            AuthError::IncorrectIssuer => write!(f, "Incorrect issuer"),
            AuthError::Signing(e) => write!(f, "Failed to sign token: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_malformed_token() {
        assert!(AuthError::MalformedToken("bad".into()).is_malformed_token());
        assert!(AuthError::UnexpectedSigningMethod("none".into()).is_malformed_token());
        assert!(!AuthError::ExpiredToken.is_malformed_token());
        assert!(!AuthError::IncorrectIssuer.is_malformed_token());
    }

    #[test]
    fn test_display() {
        assert_eq!(AuthError::ExpiredToken.to_string(), "Expired token");
        assert_eq!(
            AuthError::UnexpectedSigningMethod("RS256".into()).to_string(),
            "Unexpected signing method: RS256"
        );
    }
}
