mod routes;

use deepchat_shared::config::parse_flag;
use deepchat_shared::{ChatConfig, ChatSession};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use routes::AppState;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ChatConfig::from_env();
    let session = ChatSession::from_config(&config);
    if !session.is_ready() {
        warn!("Starting without credentials; /api/chat will answer with an error payload");
    }

    let lenient_errors = parse_flag(std::env::var("DEEPCHAT_LENIENT_ERRORS").ok().as_deref(), true);
    info!("Using model: {} (lenient errors: {})", session.model(), lenient_errors);

    let state = AppState {
        session: Arc::new(session),
        lenient_errors,
    };
    let app = routes::router(state);

    let addr: SocketAddr = std::env::var("DEEPCHAT_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
