//! Cozum Var server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit};
use cozum_api::{AppState, app};
use cozum_common::{Config, build_storage, config::{LogFormat, StorageKind}};
use cozum_core::{
    AccountService, AuthService, CategoryService, CommentService, MediaConfig, MediaService,
    ReportService, TeamService, UserService,
};
use cozum_db::repositories::{
    CategoryRepository, CommentRepository, MediaRepository, ReportRepository, TeamRepository,
    UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cozum=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration decides the log format, so it loads first
    let config = Config::load()?;
    init_tracing(config.logging.format);

    info!("Starting cozum-var server...");

    let db = cozum_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    cozum_db::migrate(&db).await?;
    info!("Migrations completed");

    let storage = build_storage(&config.storage).await?;
    info!(
        backend = storage.kind(),
        location = %storage.location(),
        "Storage ready"
    );

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let team_repo = TeamRepository::new(Arc::clone(&db));
    let category_repo = CategoryRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let media_repo = MediaRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));

    // Initialize services
    let auth = AuthService::new(&config.auth)?;
    let account_service = AccountService::new(user_repo.clone(), team_repo.clone(), auth);
    let user_service = UserService::new(user_repo.clone(), team_repo.clone());
    let category_service = CategoryService::new(category_repo.clone());
    let team_service = TeamService::new(team_repo.clone(), user_repo.clone());
    let comment_service = CommentService::new(
        comment_repo.clone(),
        report_repo.clone(),
        user_repo.clone(),
        team_repo.clone(),
    );
    let media_service = MediaService::new(MediaConfig::from(&config.media));
    let report_service = ReportService::new(
        report_repo,
        user_repo,
        category_repo,
        team_repo,
        media_repo,
        comment_repo,
        comment_service.clone(),
        Arc::clone(&storage),
        media_service,
    );

    if let Some(admin) = &config.bootstrap_admin {
        let user = account_service.ensure_bootstrap_admin(admin).await?;
        info!(user_id = %user.id, email = %user.email, "Bootstrap administrator ready");
    }

    let state = AppState {
        account_service,
        user_service,
        category_service,
        team_service,
        report_service,
        comment_service,
        storage,
        db,
        server_url: config.server.url.clone(),
    };

    // Build router
    let mut router: Router = app(state);

    if config.storage.backend == StorageKind::Local {
        let local = &config.storage.local;
        info!(
            path = %local.base_path.display(),
            url = %local.base_url,
            "Serving uploaded media"
        );
        router = router.nest_service(&local.base_url, ServeDir::new(&local.base_path));
    }

    let router = router
        .layer(DefaultBodyLimit::max(config.media.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
