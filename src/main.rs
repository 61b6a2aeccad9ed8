use std::net::TcpListener;
use auth_service::configuration::get_configuration;
use auth_service::startup::{build_auth_core, build_user_store, run};
use auth_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry();

    tracing::info!("Starting application");

    // 설정 로드 및 검증 (저장소 연결 전에 실패하도록)
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    if let Err(e) = configuration.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Configuration error",
        ));
    }

    // 사용자 저장소 생성
    let store = build_user_store(&configuration).await.map_err(|e| {
        tracing::error!("Failed to open user store: {}", e);
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "User store error")
    })?;

    let auth = build_auth_core(&configuration, store).map_err(|e| {
        tracing::error!("Failed to build auth core: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    // 서버 주소 설정
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    // 서버 실행
    run(listener, auth)?.await
}
