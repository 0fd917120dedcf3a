//! HTTP endpoint exposing the gauge at `/metrics`.

use crate::metrics::OpenPortGauge;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::future::IntoFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long in-flight scrapes may take to finish after shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Build the router.
pub fn router(gauge: Arc<OpenPortGauge>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(gauge)
}

async fn metrics(State(gauge): State<Arc<OpenPortGauge>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], gauge.render())
}

/// Expand the `:port` shorthand to a bindable address on all interfaces.
pub fn bind_address(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    }
}

/// Serve until `shutdown` fires, then allow `grace` for open connections.
pub async fn serve(
    listener: TcpListener,
    gauge: Arc<OpenPortGauge>,
    shutdown: CancellationToken,
    grace: Duration,
) -> io::Result<()> {
    let server = axum::serve(listener, router(gauge))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();

    let deadline = async {
        shutdown.cancelled().await;
        info!("shutting down server");
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result,
        _ = deadline => {
            warn!(grace = ?grace, "server did not drain in time, closing");
            Ok(())
        }
    }
}
