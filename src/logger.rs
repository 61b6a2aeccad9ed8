use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static CURRENT_REQUEST_ID: RequestId;
}

/// 요청 식별자
/// 응답 헤더, 로그 span, 에러 응답의 `error_id`에 같은 값이 사용됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 현재 처리 중인 요청의 식별자 (미들웨어 밖에서는 `None`)
    pub fn current() -> Option<RequestId> {
        CURRENT_REQUEST_ID.try_with(|id| id.clone()).ok()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 커스텀 요청 로깅 미들웨어
/// 요청마다 식별자를 부여하고 method, path, status, 처리 시간을 span 안에서 기록합니다.
/// 식별자는 `x-request-id` 헤더로 돌려줍니다.
/// 본문과 헤더는 인증 정보를 담고 있으므로 기록하지 않습니다.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLoggerService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLoggerService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = RequestId::generate();
        let span = tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
        );

        req.extensions_mut().insert(request_id.clone());
        let service = self.service.clone();
        let header_value = HeaderValue::from_str(request_id.as_str()).ok();

        let handled = async move {
            tracing::info!("Request started");

            // 토큰 가드는 거부 응답을 Ok로 돌려주므로 여기서 헤더가 붙습니다.
            // 그 외 내부 에러는 요청이 이미 소비되어 헤더 없이 전달됩니다.
            let mut res = match service.call(req).await {
                Ok(res) => res,
                Err(e) => {
                    tracing::warn!(
                        status = e.as_response_error().status_code().as_u16(),
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %e,
                        "Request failed in middleware"
                    );
                    return Err(e);
                }
            };

            tracing::info!(
                status = res.status().as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Request completed"
            );

            if let Some(value) = header_value {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            Ok(res)
        };

        Box::pin(CURRENT_REQUEST_ID.scope(request_id, handled).instrument(span))
    }
}
