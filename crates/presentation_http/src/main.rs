//! InboxSight HTTP Server
//!
//! Main entry point: wires configuration, persistence, the mailbox adapter,
//! the check engine, the recovery sweep scheduler, and the axum API.

use std::sync::Arc;

use application::ports::NotifierPort;
use application::services::{CheckService, SweepService, TestService, TestServiceConfig};
use infrastructure::{
    AppConfig, Scheduler, SmtpNotifier, SqliteTestStore, create_pool,
    scheduled_tasks::{
        RECOVERY_SWEEP_TASK, RETENTION_PURGE_CRON, RETENTION_PURGE_TASK, create_retention_purge_task,
        create_sweep_task,
    },
};
use integration_mail::ImapMailbox;
use presentation_http::{routes, state::AppState};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inboxsight_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("InboxSight v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    info!(
        host = %config.server.host,
        port = %config.server.port,
        database = %config.database.path,
        "Configuration loaded"
    );
    config.accounts.log_summary();

    // Persistence
    let pool = create_pool(&config.database)?;
    let store = Arc::new(SqliteTestStore::new(Arc::new(pool)));

    // Monitored accounts and the mailbox adapter
    let accounts = Arc::new(config.accounts.to_directory());
    if accounts.is_empty() {
        warn!("No monitored mailboxes configured; tests will complete with empty results");
    }
    let mailbox = Arc::new(ImapMailbox::hosted());

    // Check engine, with the completion notifier when configured
    let mut check_service = CheckService::new(
        Arc::clone(&store),
        mailbox,
        Arc::clone(&accounts),
        config.checker.service_config(),
    );
    if config.notifier.is_configured() {
        match SmtpNotifier::new(config.notifier.smtp_config()) {
            Ok(notifier) => {
                let notifier: Arc<dyn NotifierPort> = Arc::new(notifier);
                check_service = check_service.with_notifier(notifier);
                info!("Completion notifier enabled");
            },
            Err(e) => warn!(error = %e, "Completion notifier disabled"),
        }
    } else {
        info!("Completion notifier not configured, skipping summary emails");
    }
    let check_service = Arc::new(check_service);

    // Test lifecycle service
    let test_service = Arc::new(TestService::new(
        Arc::clone(&store),
        Arc::clone(&accounts),
        TestServiceConfig {
            report_base_url: config.server.frontend_url.clone(),
            ..TestServiceConfig::default()
        },
    ));

    // Recovery sweep + retention purge on the scheduler
    let sweep_service = Arc::new(SweepService::new(
        Arc::clone(&store),
        Arc::clone(&check_service),
        config.sweep.sweep_config(),
    ));

    let mut scheduler = Scheduler::new().await?;
    scheduler
        .add_task(
            RECOVERY_SWEEP_TASK,
            &config.sweep.cron_expression(),
            Arc::new(create_sweep_task(sweep_service)),
        )
        .await?;
    scheduler
        .add_task(
            RETENTION_PURGE_TASK,
            RETENTION_PURGE_CRON,
            Arc::new(create_retention_purge_task(
                Arc::clone(&store),
                config.sweep.retention_window(),
            )),
        )
        .await?;
    scheduler.start().await?;

    // App state and router
    let state = AppState {
        test_service,
        check_service,
        store,
        config: Arc::new(config.clone()),
    };
    let app = routes::create_router(state);

    // CORS: open in development, restricted when origins are configured
    let cors_layer = if config.server.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use axum::http::{HeaderValue, Method};
        let origins: Vec<HeaderValue> = config
            .server
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
    };

    let app = app.layer(TraceLayer::new_for_http()).layer(cors_layer);

    // Serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await.ok();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sigterm) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            sigterm.recv().await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
