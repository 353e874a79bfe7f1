use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use scribe::config::{Cli, Config};
use scribe::posts::{PostFile, PostStore};
use scribe::routes;
use scribe::state::AppState;
use scribe::uploads::{UploadNamer, UploadStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    // Storage must be usable before we serve anything
    let posts = PostStore::open(PostFile::new(config.posts_path()))?;
    tracing::info!("Posts file: {}", config.posts_path().display());

    let uploads = if config.uploads.enabled {
        let dir = config.uploads_path();
        std::fs::create_dir_all(&dir)?;
        tracing::info!("Uploads directory: {}", dir.display());
        Some(Arc::new(UploadStore::new(dir, UploadNamer::default())))
    } else {
        tracing::warn!("Uploads are disabled; POST /upload will fail until enabled");
        None
    };

    tracing::info!(
        "Serving static files from {}",
        config.public_path().display()
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        posts: Arc::new(posts),
        uploads,
        config,
    };
    let app = routes::build_router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}
