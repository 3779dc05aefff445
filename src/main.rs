use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use atelier::config::Config;
use atelier::email::SmtpMailer;
use atelier::scheduler;
use atelier::state::AppState;
use atelier::stores::blob::S3BlobStore;
use atelier::stores::identity::HttpIdentityProvider;
use atelier::stores::queue::SqsQueue;
use atelier::stores::record::PgRecordStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!("Starting Atelier lifecycle service");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations applied");

    let mailer = config.smtp.as_ref().and_then(|smtp| match SmtpMailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!("SMTP configured");
            Some(Arc::new(mailer) as Arc<dyn atelier::email::Mailer>)
        }
        Err(e) => {
            tracing::warn!("SMTP not available: {e}");
            None
        }
    });

    let state = Arc::new(AppState {
        records: Arc::new(PgRecordStore::new(pool)),
        blobs: Arc::new(S3BlobStore::connect(&config.s3).await),
        identity: Arc::new(HttpIdentityProvider::new(&config.identity)),
        mailer,
        config: config.clone(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut background = vec![scheduler::spawn_cleanup_loop(
        state.clone(),
        shutdown_rx.clone(),
    )];

    if let Some(queue_url) = &config.rejection_queue_url {
        let queue = Arc::new(SqsQueue::connect(queue_url).await);
        background.push(scheduler::spawn_rejection_consumer(
            state.clone(),
            queue,
            shutdown_rx.clone(),
        ));
    } else {
        tracing::warn!("ATELIER_REJECTION_QUEUE_URL not set; rejection consumer disabled");
    }

    let addr = SocketAddr::new(config.host, config.port);
    let app = atelier::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    for handle in background {
        let _ = handle.await;
    }

    Ok(())
}

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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
