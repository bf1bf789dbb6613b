use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use fluxis_deployment::{Config, Deployment};
use fluxis_server::routes;

/// How long the listener and the workers are given to drain on shutdown
/// before the process exits anyway.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let config = Config::from_env()?;
    let port = config.port;
    let deployment = Deployment::new(config).await?;
    let app = routes::router(deployment.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .context("failed to bind server port")?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let shutdown = deployment.shutdown_token();
    tokio::spawn(watch_signals(shutdown.clone()));

    let server = {
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }
    };

    tokio::select! {
        result = server => result.context("server error")?,
        () = drain_deadline(&shutdown) => {
            tracing::error!("listener did not drain within {SHUTDOWN_DEADLINE:?}, forcing shutdown");
        }
    }

    match tokio::time::timeout(SHUTDOWN_DEADLINE, deployment.shutdown()).await {
        Ok(()) => tracing::info!("workers drained, exiting"),
        Err(_) => {
            tracing::error!("workers did not drain within {SHUTDOWN_DEADLINE:?}, forcing exit")
        }
    }

    Ok(())
}

/// Resolves once the shutdown deadline has elapsed after cancellation.
async fn drain_deadline(shutdown: &CancellationToken) {
    shutdown.cancelled().await;
    tokio::time::sleep(SHUTDOWN_DEADLINE).await;
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("failed to listen for SIGTERM: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received, draining");
    shutdown.cancel();
}
