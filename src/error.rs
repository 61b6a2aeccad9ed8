/// Unified Error Handling Module
///
/// Every failure the service can produce maps into [`AppError`]:
/// 1. Domain-specific error types (validation, auth, token, store, config)
/// 2. A central error type used for control flow with `?`
/// 3. HTTP response mapping with structured logging
/// 4. Request context for log correlation
///
/// No variant carries a password, a password hash or a refresh-token hash.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::logger::RequestId;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    SuspiciousContent(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Session and credential errors raised by the auth core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Email is already registered
    Conflict,
    /// No user matches the given email or id
    NotFound,
    /// Password did not verify
    InvalidCredentials,
    /// User has no active refresh session
    NotLoggedIn,
    /// Presented refresh token does not match the stored hash
    AccessDenied,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Conflict => write!(f, "Email already registered"),
            AuthError::NotFound => write!(f, "User not found"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::NotLoggedIn => write!(f, "You are not logged in"),
            AuthError::AccessDenied => write!(f, "Access denied"),
        }
    }
}

impl StdError for AuthError {}

/// Bearer token errors raised by the codec and the guards.
///
/// `Invalid` is deliberately a single outcome: expired, forged, malformed
/// and wrong-purpose tokens are indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Missing,
    Invalid,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Missing => write!(f, "Missing authentication token"),
            TokenError::Invalid => write!(f, "Invalid or expired token"),
        }
    }
}

impl StdError for TokenError {}

/// User store errors (infrastructure, never retried by the core)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique email constraint violated
    Duplicate,
    /// The store did not answer within the configured timeout
    Timeout,
    /// Connection-level failure
    Unavailable(String),
    Unexpected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate => write!(f, "Duplicate entry"),
            StoreError::Timeout => write!(f, "User store timed out"),
            StoreError::Unavailable(msg) => write!(f, "User store unavailable: {}", msg),
            StoreError::Unexpected(msg) => write!(f, "User store error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Duplicate
            }
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Unexpected(err.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Token(TokenError),
    Store(StoreError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Token(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Token(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Auth(e) => match e {
                AuthError::Conflict => (StatusCode::CONFLICT, "DUPLICATE_ENTRY"),
                AuthError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                AuthError::InvalidCredentials => (StatusCode::BAD_REQUEST, "INVALID_CREDENTIALS"),
                AuthError::NotLoggedIn => (StatusCode::BAD_REQUEST, "NOT_LOGGED_IN"),
                AuthError::AccessDenied => (StatusCode::BAD_REQUEST, "ACCESS_DENIED"),
            },
            AppError::Token(e) => match e {
                TokenError::Missing => (StatusCode::UNAUTHORIZED, "MISSING_TOKEN"),
                TokenError::Invalid => (StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
            },
            AppError::Store(e) => match e {
                StoreError::Duplicate => (StatusCode::CONFLICT, "DUPLICATE_ENTRY"),
                StoreError::Timeout | StoreError::Unavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
                }
                StoreError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            },
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message safe to hand to a client
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::Token(e) => e.to_string(),
            AppError::Store(StoreError::Duplicate) => AuthError::Conflict.to_string(),
            AppError::Store(StoreError::Timeout) | AppError::Store(StoreError::Unavailable(_)) => {
                "User store temporarily unavailable".to_string()
            }
            AppError::Store(StoreError::Unexpected(_)) => "User store error occurred".to_string(),
            AppError::Config(_) => "Server configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code) = self.status_and_code();
        let error_response = ErrorResponse::new(
            request_id.to_string(),
            self.public_message(),
            code.to_string(),
            status.as_u16(),
        );
        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(AuthError::AccessDenied) => {
                tracing::warn!(
                    request_id = request_id,
                    "Refresh token rejected (stale or forged)"
                );
            }
            AppError::Auth(e) => {
                tracing::info!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Token(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Token rejected");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "User store error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // Reuse the request-logging id so error_id matches the x-request-id header
        let request_id = RequestId::current()
            .map(|id| id.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }
}

// ============================================================================
// 4. REQUEST CONTEXT
// ============================================================================

/// Per-request context carried into structured log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<i64>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(request_id: &RequestId, operation: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}
