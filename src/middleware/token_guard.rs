/// Bearer Token Guard
///
/// Verifies the `Authorization: Bearer <token>` header for one token purpose
/// and injects the verified [`TokenClaims`] into request extensions. The
/// refresh guard also injects the raw token as [`PresentedRefreshToken`] so
/// the handler can compare it with the stored hash.
///
/// Rejections are rendered here as `401` responses rather than returned as
/// errors, so outer middleware still sees a response to tag and log.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{TokenCodec, TokenPurpose};
use crate::error::{AppError, TokenError};

/// Raw refresh token that passed verification
#[derive(Clone)]
pub struct PresentedRefreshToken(pub String);

/// Guard for routes that require a verified bearer token
pub struct TokenGuard {
    codec: Arc<TokenCodec>,
    purpose: TokenPurpose,
}

impl TokenGuard {
    /// Accept access tokens only
    pub fn access(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            purpose: TokenPurpose::Access,
        }
    }

    /// Accept refresh tokens only
    pub fn refresh(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            purpose: TokenPurpose::Refresh,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TokenGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = TokenGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(TokenGuardService {
            service: Rc::new(service),
            codec: self.codec.clone(),
            purpose: self.purpose,
        }))
    }
}

pub struct TokenGuardService<S> {
    service: Rc<S>,
    codec: Arc<TokenCodec>,
    purpose: TokenPurpose,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for TokenGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match bearer_token(&req) {
            Some(token) => token,
            None => {
                tracing::warn!(
                    purpose = self.purpose.audience(),
                    "Missing or invalid Authorization header"
                );
                let res = req.error_response(AppError::Token(TokenError::Missing));
                return Box::pin(async move { Ok::<_, Error>(res.map_into_right_body::<B>()) });
            }
        };

        match self.codec.verify(self.purpose, &token) {
            Ok(claims) => {
                tracing::debug!(
                    user_id = claims.subject_id(),
                    purpose = self.purpose.audience(),
                    "Bearer token verified"
                );
                req.extensions_mut().insert(claims);
                if self.purpose == TokenPurpose::Refresh {
                    req.extensions_mut().insert(PresentedRefreshToken(token));
                }

                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(e) => {
                let res = req.error_response(AppError::Token(e));
                Box::pin(async move { Ok::<_, Error>(res.map_into_right_body::<B>()) })
            }
        }
    }
}
