//! Quizhub - studyset GraphQL API server.
//!
//! # Usage
//!
//! ```bash
//! # Start against PostgreSQL
//! DATABASE_URL=postgres://localhost/quizhub quizhub
//!
//! # Start with in-memory storage (data is lost on exit)
//! quizhub --ephemeral
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use tracing_subscriber::{fmt, EnvFilter};

use quizhub_core::config::{
    Limits, DEFAULT_MAX_BATCH_MUTATION_SIZE, DEFAULT_MAX_FOLDER_NAME_LEN, DEFAULT_MAX_PAGE_SIZE,
    DEFAULT_PAGE_SIZE,
};
use quizhub_core::metrics::init_metrics;
use quizhub_core::ports::{IdentityProvider, Repositories};
use quizhub_core::services::ContentService;
use quizhub_graphql::{build_schema, serve_with_shutdown, ServerConfig};
use quizhub_storage::{
    Database, DatabaseConfig, InMemoryRepositories, PgIdentityProvider, PgRepositories,
};

/// Interval between two expired-session sweeps.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Quizhub CLI.
#[derive(Parser, Debug)]
#[command(name = "quizhub")]
#[command(about = "Quizhub - studysets, folders and learning progress over GraphQL")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/quizhub"
    )]
    database_url: String,

    /// GraphQL server port.
    #[arg(long, env = "PORT", default_value = "4000")]
    port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Use in-memory storage instead of PostgreSQL.
    ///
    /// A development user is created and its bearer token is logged.
    #[arg(long, env = "EPHEMERAL")]
    ephemeral: bool,

    /// Disable the GraphiQL playground.
    #[arg(long, env = "DISABLE_PLAYGROUND")]
    disable_playground: bool,

    /// Maximum rows accepted by one bulk mutation.
    #[arg(
        long,
        env = "MAX_BATCH_MUTATION_SIZE",
        default_value_t = DEFAULT_MAX_BATCH_MUTATION_SIZE,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_batch_mutation_size: usize,

    /// Maximum folder name length, in characters.
    #[arg(long, env = "MAX_FOLDER_NAME_LEN", default_value_t = DEFAULT_MAX_FOLDER_NAME_LEN)]
    max_folder_name_len: usize,

    /// Largest page a client may request.
    #[arg(
        long,
        env = "MAX_PAGE_SIZE",
        default_value_t = DEFAULT_MAX_PAGE_SIZE,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_page_size: usize,
}

impl Cli {
    fn limits(&self) -> Limits {
        Limits {
            max_batch_mutation_size: self.max_batch_mutation_size,
            max_folder_name_len: self.max_folder_name_len,
            max_page_size: self.max_page_size,
            default_page_size: DEFAULT_PAGE_SIZE.min(self.max_page_size),
            ..Limits::default()
        }
    }
}

/// The storage backend selected at startup.
enum Backend {
    Postgres(Arc<Database>),
    Memory(Arc<InMemoryRepositories>),
}

impl Backend {
    async fn cleanup_expired_sessions(&self) -> Result<u64> {
        match self {
            Backend::Postgres(db) => Ok(db.cleanup_expired_sessions().await?),
            Backend::Memory(repos) => Ok(repos.cleanup_expired_sessions().await),
        }
    }

    async fn close(&self) {
        if let Backend::Postgres(db) = self {
            db.close().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled =
        match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
            Ok(metrics_addr) => {
                match PrometheusBuilder::new()
                    .with_http_listener(metrics_addr)
                    .install()
                {
                    Ok(()) => {
                        init_metrics();
                        true
                    }
                    Err(e) => {
                        warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
                        false
                    }
                }
            }
            Err(e) => {
                warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
                false
            }
        };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Quizhub");
    let limits = cli.limits();
    debug!(?limits, "Request limits");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ STORAGE
    // ─────────────────────────────────────────────────────────────────────────
    let (backend, repositories, identity): (
        Backend,
        Arc<dyn Repositories>,
        Arc<dyn IdentityProvider>,
    ) = if cli.ephemeral {
        warn!("🧪 Ephemeral mode: data lives in memory and is lost on exit");
        let repos = Arc::new(InMemoryRepositories::new());
        let dev = repos.create_user("dev", false).await;
        let token = repos
            .create_session(dev.id, SESSION_CLEANUP_INTERVAL)
            .await;
        info!(user_id = %dev.id, "🔑 Development token: Bearer {}", token);
        let repositories: Arc<dyn Repositories> = repos.clone();
        let identity: Arc<dyn IdentityProvider> = repos.clone();
        (Backend::Memory(repos), repositories, identity)
    } else {
        debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

        info!("🗄️  Connecting to database...");
        let db = Database::connect(&DatabaseConfig::for_api(&cli.database_url))
            .await
            .context("Failed to connect to database")?;

        db.migrate().await.context("Failed to run migrations")?;
        info!("🗄️  Database ready (migrations applied)");

        if cli.migrate_only {
            info!("🛑 --migrate-only flag set, exiting");
            db.close().await;
            return Ok(());
        }

        let db = Arc::new(db);
        let repositories: Arc<dyn Repositories> = Arc::new(PgRepositories::new(db.clone()));
        let identity: Arc<dyn IdentityProvider> = Arc::new(PgIdentityProvider::new(&db));
        (Backend::Postgres(db), repositories, identity)
    };
    let backend = Arc::new(backend);

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut graphql_shutdown_rx = shutdown_tx.subscribe();

    let graphql_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: cli.port,
        enable_playground: !cli.disable_playground,
    };

    let schema = build_schema(ContentService::new(repositories, limits));
    let graphql_handle = tokio::spawn(
        async move {
            let shutdown_signal = async move {
                while !*graphql_shutdown_rx.borrow() {
                    if graphql_shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            };

            if let Err(e) = serve_with_shutdown(schema, identity, graphql_config, shutdown_signal).await {
                error!(error = %e, "❌ Server error");
            }
            debug!("Server stopped");
        }
        .instrument(info_span!("graphql")),
    );

    let cleanup_handle = tokio::spawn(
        run_session_cleanup(backend.clone(), shutdown_rx).instrument(info_span!("session_cleanup")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Quizhub ready");
    info!("   ⚡ GraphQL:  http://localhost:{}/graphql", cli.port);
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(10), graphql_handle).await {
        Ok(_) => debug!("GraphQL stopped"),
        Err(_) => warn!("⚠️  GraphQL shutdown timed out"),
    }

    match tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await {
        Ok(_) => debug!("Session cleanup stopped"),
        Err(_) => warn!("⚠️  Session cleanup shutdown timed out"),
    }

    backend.close().await;

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Sweep expired sessions once a day until shutdown.
async fn run_session_cleanup(backend: Arc<Backend>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match backend.cleanup_expired_sessions().await {
                    Ok(removed) => info!(removed, "🧹 Expired sessions removed"),
                    Err(e) => error!(error = ?e, "❌ Session cleanup failed"),
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
