use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// 구조화된 로깅을 초기화합니다.
/// JSON 형식으로 현재 span(request_id 포함)과 함께 출력하며,
/// RUST_LOG 환경 변수로 로그 레벨을 제어합니다 (기본값 `info`).
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .json()
                .with_current_span(true),
        )
        .init();
}

/// 잘못된 지시어는 무시하고 기본 필터를 사용합니다.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
