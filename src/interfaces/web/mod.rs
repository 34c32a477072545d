pub(crate) mod auth;
mod handlers;
mod router;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::core::autopilot::Autopilot;
use crate::core::images::FreeImageChain;
use crate::core::lifecycle::LifecycleComponent;

/// Control API for a running autopilot.
pub struct ApiServer {
    state: AppState,
}

pub struct ApiServerConfig {
    pub autopilot: Arc<Autopilot>,
    pub images: Arc<FreeImageChain>,
    pub log_tx: broadcast::Sender<String>,
    pub api_host: String,
    pub api_port: u16,
    pub api_token: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub autopilot: Arc<Autopilot>,
    pub images: Arc<FreeImageChain>,
    pub log_tx: broadcast::Sender<String>,
    pub api_host: String,
    pub api_port: u16,
    pub api_token: Option<String>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        let api_token = config
            .api_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            state: AppState {
                autopilot: config.autopilot,
                images: config.images,
                log_tx: config.log_tx,
                api_host: config.api_host,
                api_port: config.api_port,
                api_token,
            },
        }
    }
}

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(line) => Ok(Event::default().data(line)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream)
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("API Server initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.state.api_host, self.state.api_port);
        // a taken port fails startup here rather than inside the spawned task
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let app = router::build_api_router(self.state.clone());

        tokio::spawn(async move {
            info!("API Server running at http://{addr}");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API Server crashed: {}", e);
            }
        });
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server shutting down...");
        Ok(())
    }
}
