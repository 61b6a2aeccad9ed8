/// JWT Token Issuance and Verification
///
/// Access and refresh tokens are HS256 JWTs signed with independent secrets
/// and carrying distinct audiences. Verification failures of any kind
/// collapse into [`TokenError::Invalid`].

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::auth::claims::{Claims, TokenClaims, TokenPurpose};
use crate::configuration::JwtSettings;
use crate::error::{AppError, TokenError};

/// Source of the current time in Unix seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Access/refresh token pair handed to the client once per issuance
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl SigningKey {
    fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }
}

/// Signs and verifies bearer tokens for both purposes
pub struct TokenCodec {
    access: SigningKey,
    refresh: SigningKey,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            access: SigningKey::new(&config.access_token_secret, config.access_token_expiry),
            refresh: SigningKey::new(&config.refresh_token_secret, config.refresh_token_expiry),
            issuer: config.issuer.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for `iat`/`exp` and expiry checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn key(&self, purpose: TokenPurpose) -> &SigningKey {
        match purpose {
            TokenPurpose::Access => &self.access,
            TokenPurpose::Refresh => &self.refresh,
        }
    }

    /// Issue a token with the configured lifetime for `purpose`
    ///
    /// # Errors
    /// Returns error if signing fails
    pub fn issue(
        &self,
        purpose: TokenPurpose,
        subject_id: i64,
        email: &str,
    ) -> Result<String, AppError> {
        self.issue_with_ttl(purpose, subject_id, email, self.key(purpose).ttl_seconds)
    }

    /// Issue a token expiring `ttl_seconds` from now
    ///
    /// # Errors
    /// Returns error if signing fails
    pub fn issue_with_ttl(
        &self,
        purpose: TokenPurpose,
        subject_id: i64,
        email: &str,
        ttl_seconds: i64,
    ) -> Result<String, AppError> {
        let claims = Claims::new(
            subject_id,
            email,
            purpose,
            &self.issuer,
            self.clock.now(),
            ttl_seconds,
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.key(purpose).encoding)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Issue a fresh access/refresh pair for a subject
    ///
    /// # Errors
    /// Returns error if signing fails
    pub fn issue_pair(&self, subject_id: i64, email: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(TokenPurpose::Access, subject_id, email)?,
            refresh_token: self.issue(TokenPurpose::Refresh, subject_id, email)?,
        })
    }

    /// Verify a token issued for `purpose`
    ///
    /// Checks signature, issuer, audience and expiry (`exp <= now` is expired).
    ///
    /// # Errors
    /// Returns [`TokenError::Invalid`] for every kind of failure
    pub fn verify(&self, purpose: TokenPurpose, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[purpose.audience()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        // Expiry is checked below against the injected clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.key(purpose).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(purpose = purpose.audience(), error = %e, "Token rejected");
                TokenError::Invalid
            })?;

        if claims.exp <= self.clock.now() {
            tracing::debug!(purpose = purpose.audience(), "Token rejected: expired");
            return Err(TokenError::Invalid);
        }

        TokenClaims::from_verified(claims).ok_or(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn at(now: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(now)))
        }

        fn advance(&self, seconds: i64) {
            self.0.fetch_add(seconds, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_token_secret: "access-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify_token() {
        let codec = TokenCodec::new(&get_test_config());

        let token = codec
            .issue(TokenPurpose::Access, 42, "a@x.com")
            .expect("Failed to generate token");
        let claims = codec
            .verify(TokenPurpose::Access, &token)
            .expect("Failed to validate token");

        assert_eq!(claims.subject_id(), 42);
        assert_eq!(claims.email(), "a@x.com");
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let codec = TokenCodec::new(&get_test_config());
        let token = codec
            .issue(TokenPurpose::Access, 1, "a@x.com")
            .expect("Failed to generate token");

        let mut other = get_test_config();
        other.access_token_secret = "another-secret-key-at-least-32-characters".to_string();
        let other_codec = TokenCodec::new(&other);

        assert_eq!(
            other_codec.verify(TokenPurpose::Access, &token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_purposes_do_not_cross_verify() {
        let codec = TokenCodec::new(&get_test_config());
        let pair = codec.issue_pair(1, "a@x.com").expect("Failed to generate pair");

        assert_eq!(
            codec.verify(TokenPurpose::Refresh, &pair.access_token),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            codec.verify(TokenPurpose::Access, &pair.refresh_token),
            Err(TokenError::Invalid)
        );
        assert!(codec.verify(TokenPurpose::Refresh, &pair.refresh_token).is_ok());
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let codec = TokenCodec::new(&get_test_config());
        let token = codec
            .issue_with_ttl(TokenPurpose::Refresh, 1, "a@x.com", 0)
            .expect("Failed to generate token");

        assert_eq!(
            codec.verify(TokenPurpose::Refresh, &token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_expiry_follows_injected_clock() {
        let clock = ManualClock::at(1_700_000_000);
        let codec = TokenCodec::new(&get_test_config()).with_clock(clock.clone());
        let token = codec
            .issue(TokenPurpose::Access, 1, "a@x.com")
            .expect("Failed to generate token");

        clock.advance(899);
        let claims = codec
            .verify(TokenPurpose::Access, &token)
            .expect("token valid before expiry");
        assert_eq!(claims.expires_at(), 1_700_000_900);

        clock.advance(1);
        assert_eq!(
            codec.verify(TokenPurpose::Access, &token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_pair_tokens_are_distinct() {
        let codec = TokenCodec::new(&get_test_config());
        let first = codec.issue_pair(1, "a@x.com").expect("Failed to generate pair");
        let second = codec.issue_pair(1, "a@x.com").expect("Failed to generate pair");

        assert_ne!(first.access_token, first.refresh_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_malformed_and_tampered_tokens() {
        let codec = TokenCodec::new(&get_test_config());
        assert_eq!(
            codec.verify(TokenPurpose::Access, "invalid.token.here"),
            Err(TokenError::Invalid)
        );

        let token = codec
            .issue(TokenPurpose::Access, 1, "a@x.com")
            .expect("Failed to generate token");
        let tampered = format!("{}X", token);
        assert_eq!(
            codec.verify(TokenPurpose::Access, &tampered),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_wrong_issuer() {
        let codec = TokenCodec::new(&get_test_config());
        let token = codec
            .issue(TokenPurpose::Access, 1, "a@x.com")
            .expect("Failed to generate token");

        let mut config = get_test_config();
        config.issuer = "wrong-issuer".to_string();
        let other = TokenCodec::new(&config);

        assert_eq!(
            other.verify(TokenPurpose::Access, &token),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_pair_debug_is_redacted() {
        let codec = TokenCodec::new(&get_test_config());
        let pair = codec.issue_pair(1, "a@x.com").expect("Failed to generate pair");

        let debug = format!("{:?}", pair);
        assert!(!debug.contains(&pair.refresh_token));
    }
}
