//! Triage API server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::triage_router;
use crate::api::types::ApiContext;
use crate::config::AllowedOrigins;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Metadata for a running server instance. `instance_id` and `started_at`
/// match what `GET /health` reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSession {
    pub instance_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running triage server.
pub struct TriageServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TriageServer {
    /// Signal graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Triage server shutdown signal sent");
        }
    }

    /// Wait until the serve task has exited.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Triage server task failed: {e}");
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `addr`, mount the triage router and serve it in a background task.
pub async fn start_server(
    ctx: ApiContext,
    origins: &AllowedOrigins,
    addr: SocketAddr,
) -> std::io::Result<TriageServer> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let session = ServerSession {
        instance_id: ctx.instance_id.clone(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: ctx.started_at.to_rfc3339(),
    };

    let app = triage_router(ctx, origins);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let instance_id = session.instance_id.clone();
    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Triage server received shutdown signal");
        };

        tracing::info!(%addr, %instance_id, "Triage server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Triage server error: {e}");
        }

        tracing::info!("Triage server stopped");
    });

    Ok(TriageServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
