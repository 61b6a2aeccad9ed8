/// JWT Claims structures
///
/// `Claims` is the signed payload on the wire. `TokenClaims` is what callers
/// see after verification; it has no public constructor outside this crate's
/// codec, so holding one means the token was checked.

use serde::{Deserialize, Serialize};

/// Which secret and lifetime a token was issued under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Access,
    Refresh,
}

impl TokenPurpose {
    /// Audience claim value for this purpose
    pub fn audience(&self) -> &'static str {
        match self {
            TokenPurpose::Access => "access",
            TokenPurpose::Refresh => "refresh",
        }
    }
}

/// Signed token payload (RFC 7519 registered claims plus email)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub(crate) struct Claims {
    /// Subject (user id as decimal string)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
    pub aud: String,
    /// Unique token id; keeps two tokens minted in the same second distinct
    pub jti: String,
}

impl Claims {
    pub(crate) fn new(
        subject_id: i64,
        email: &str,
        purpose: TokenPurpose,
        issuer: &str,
        now: i64,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            sub: subject_id.to_string(),
            email: email.to_string(),
            exp: now.saturating_add(ttl_seconds),
            iat: now,
            iss: issuer.to_string(),
            aud: purpose.audience().to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Verified contents of a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    subject_id: i64,
    email: String,
    expires_at: i64,
}

impl TokenClaims {
    pub(crate) fn from_verified(claims: Claims) -> Option<Self> {
        let subject_id = claims.sub.parse::<i64>().ok()?;
        Some(Self {
            subject_id,
            email: claims.email,
            expires_at: claims.exp,
        })
    }

    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Expiry as a Unix timestamp
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(42, "a@x.com", TokenPurpose::Refresh, "test", 1_000, 60);

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_060);
        assert_eq!(claims.aud, "refresh");
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_wrapping() {
        let claims = Claims::new(1, "a@x.com", TokenPurpose::Access, "test", 1_000, i64::MAX);

        assert_eq!(claims.exp, i64::MAX);
    }

    #[test]
    fn test_each_claims_gets_a_fresh_id() {
        let first = Claims::new(1, "a@x.com", TokenPurpose::Access, "test", 0, 60);
        let second = Claims::new(1, "a@x.com", TokenPurpose::Access, "test", 0, 60);

        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let mut claims = Claims::new(1, "a@x.com", TokenPurpose::Access, "test", 0, 60);
        claims.sub = "not-a-number".to_string();

        assert!(TokenClaims::from_verified(claims).is_none());
    }

    #[test]
    fn test_verified_claims_accessors() {
        let claims = Claims::new(7, "a@x.com", TokenPurpose::Access, "test", 100, 900);
        let verified = TokenClaims::from_verified(claims).expect("numeric subject");

        assert_eq!(verified.subject_id(), 7);
        assert_eq!(verified.email(), "a@x.com");
        assert_eq!(verified.expires_at(), 1_000);
    }
}
