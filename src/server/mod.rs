//! HTTP server implementation using Axum.

pub mod handlers;

use crate::core::flow::{FlowPlan, FlowRunner};
use crate::domain::ports::{AudioProcessor, Storage};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use handlers::{handle_health, list_flows, merge_upload, mix_upload, run_flow};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState<P: AudioProcessor, S: Storage> {
    pub runner: FlowRunner<P, S>,
    pub plans: Vec<FlowPlan>,
    /// Flows write to fixed output names, so only one runs at a time
    pub flow_lock: Mutex<()>,
    pub max_upload_bytes: usize,
}

impl<P: AudioProcessor, S: Storage> AppState<P, S> {
    pub fn new(runner: FlowRunner<P, S>, plans: Vec<FlowPlan>, max_upload_bytes: usize) -> Self {
        Self {
            runner,
            plans,
            flow_lock: Mutex::new(()),
            max_upload_bytes,
        }
    }

    pub fn plan(&self, name: &str) -> Option<&FlowPlan> {
        self.plans.iter().find(|plan| plan.name == name)
    }
}

pub fn router<P, S>(state: Arc<AppState<P, S>>) -> Router
where
    P: AudioProcessor + 'static,
    S: Storage + 'static,
{
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/audio/test", get(list_flows::<P, S>))
        .route("/audio/test/:flow", get(run_flow::<P, S>))
        .route("/audio/merge", post(merge_upload::<P, S>))
        .route("/audio/mix", post(mix_upload::<P, S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server<P, S>(state: AppState<P, S>, host: &str, port: u16) -> anyhow::Result<SocketAddr>
where
    P: AudioProcessor + 'static,
    S: Storage + 'static,
{
    let app = router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
