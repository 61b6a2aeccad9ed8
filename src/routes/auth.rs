/// Authentication Routes
///
/// Thin JSON handlers over [`AuthCore`]. `logout` and `refresh` sit behind
/// token guards, so they receive already-verified claims.

use actix_web::{web, HttpResponse};

use crate::auth::{AuthCore, Credentials, TokenClaims};
use crate::error::{AppError, ErrorContext};
use crate::logger::RequestId;
use crate::middleware::PresentedRefreshToken;

/// POST /auth/local/signup
///
/// # Errors
/// - 400: Invalid email or empty password
/// - 409: Email already registered
pub async fn signup(
    form: web::Json<Credentials>,
    auth: web::Data<AuthCore>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "local_signup");
    let tokens = auth.signup(form.into_inner()).await?;

    tracing::info!(request_id = %context.request_id, operation = %context.operation, "Signup completed");
    Ok(HttpResponse::Created().json(tokens))
}

/// POST /auth/local/signin
///
/// # Errors
/// - 400: Wrong password or invalid input
/// - 404: Unknown email
pub async fn signin(
    form: web::Json<Credentials>,
    auth: web::Data<AuthCore>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "local_signin");
    let tokens = auth.signin(form.into_inner()).await?;

    tracing::info!(request_id = %context.request_id, operation = %context.operation, "Signin completed");
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/logout
///
/// **Requires a valid access token.** Always 200 once the guard passes.
pub async fn logout(
    claims: web::ReqData<TokenClaims>,
    auth: web::Data<AuthCore>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "logout").with_user_id(claims.subject_id());
    auth.logout(claims.subject_id()).await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = ?context.user_id,
        "Logout completed"
    );
    Ok(HttpResponse::Ok().finish())
}

/// POST /auth/refresh
///
/// **Requires a valid refresh token.** Rotates the session.
///
/// # Errors
/// - 400: Not logged in, or the token is stale/forged
/// - 404: Unknown user
pub async fn refresh(
    claims: web::ReqData<TokenClaims>,
    presented: web::ReqData<PresentedRefreshToken>,
    auth: web::Data<AuthCore>,
    request_id: web::ReqData<RequestId>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new(&request_id, "token_refresh").with_user_id(claims.subject_id());
    let tokens = auth
        .refresh_token(claims.subject_id(), &presented.0)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        operation = %context.operation,
        user_id = ?context.user_id,
        "Refresh completed"
    );
    Ok(HttpResponse::Ok().json(tokens))
}
