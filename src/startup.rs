use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthCore, SecretHasher, TokenCodec};
use crate::configuration::{Settings, StoreBackend};
use crate::error::{AppError, StoreError};
use crate::logger::RequestLogger;
use crate::middleware::TokenGuard;
use crate::routes::{health_check, logout, refresh, signin, signup};
use crate::store::{InMemoryUserStore, PgUserStore, UserStore};

/// Wire the auth core from a store and settings that already passed
/// [`Settings::validate`]
pub fn build_auth_core(
    settings: &Settings,
    store: Arc<dyn UserStore>,
) -> Result<AuthCore, AppError> {
    let codec = Arc::new(TokenCodec::new(&settings.jwt));
    let hasher = SecretHasher::new(settings.hashing.cost)?;

    Ok(AuthCore::new(store, codec, hasher).with_store_timeout(settings.store.timeout()))
}

/// Open the configured user store
pub async fn build_user_store(settings: &Settings) -> Result<Arc<dyn UserStore>, AppError> {
    match settings.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user store; users are lost on restart");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
        StoreBackend::Postgres => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(settings.store.timeout())
                .connect(&settings.database.connection_string())
                .await
                .map_err(StoreError::from)?;

            let store = PgUserStore::new(pool);
            store.migrate().await?;
            tracing::info!("Database connection pool created and migrated");
            Ok(Arc::new(store))
        }
    }
}

pub fn run(listener: TcpListener, auth: AuthCore) -> Result<Server, std::io::Error> {
    let codec = auth.codec();
    let auth = web::Data::new(auth);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .wrap(Logger::default())
            .app_data(auth.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    // Public routes
                    .route("/local/signup", web::post().to(signup))
                    .route("/local/signin", web::post().to(signin))
                    // Guarded routes
                    .service(
                        web::resource("/logout")
                            .route(web::post().to(logout))
                            .wrap(TokenGuard::access(codec.clone())),
                    )
                    .service(
                        web::resource("/refresh")
                            .route(web::post().to(refresh))
                            .wrap(TokenGuard::refresh(codec.clone())),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
