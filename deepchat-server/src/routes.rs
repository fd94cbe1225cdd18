use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Router,
};
use deepchat_shared::{ChatError, ChatSession, PromptRequest, StreamFrame};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ChatSession>,
    /// Answer failed calls with 200 and the error text in the body.
    pub lenient_errors: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post({
            let state = state.clone();
            move |form| chat(form, state)
        }))
        .route("/ws/chat", get({
            let session = state.session.clone();
            move |ws| ws_handler(ws, session)
        }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "OK"
}

async fn chat(Form(request): Form<PromptRequest>, state: AppState) -> (StatusCode, String) {
    info!("Chat request: {} chars of prompt", request.prompt.len());

    match state
        .session
        .try_respond(&request.prompt, request.system_prompt.as_deref())
        .await
    {
        Ok(result) => (StatusCode::OK, result.text_or_sentinel().to_string()),
        Err(e) => (error_status(&e, state.lenient_errors), e.to_payload()),
    }
}

fn error_status(err: &ChatError, lenient: bool) -> StatusCode {
    if lenient {
        return StatusCode::OK;
    }
    match err {
        ChatError::MissingCredentials => StatusCode::SERVICE_UNAVAILABLE,
        ChatError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ChatError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

async fn ws_handler(ws: WebSocketUpgrade, session: Arc<ChatSession>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

async fn handle_socket(mut socket: WebSocket, session: Arc<ChatSession>) {
    info!("WebSocket connection established");

    while let Some(msg) = socket.recv().await {
        let Ok(Message::Text(text)) = msg else {
            continue;
        };

        let mut frames = match serde_json::from_str::<PromptRequest>(&text) {
            Ok(prompt) => frame_stream(&session, prompt).await,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let frame = StreamFrame {
                    delta: Some(format!("Invalid request format: {}", e)),
                    done: true,
                    ..Default::default()
                };
                stream::iter([frame]).boxed()
            }
        };

        while let Some(frame) = frames.next().await {
            let Ok(payload) = serde_json::to_string(&frame) else {
                error!("Failed to serialize frame");
                continue;
            };
            if let Err(e) = socket.send(Message::Text(payload)).await {
                error!("Failed to send frame: {}", e);
                return;
            }
        }
    }
}

/// Frames for one prompt: a frame per fragment, closed by a `done` frame,
/// or by an error frame if the call fails at any point.
pub(crate) async fn frame_stream(
    session: &ChatSession,
    prompt: PromptRequest,
) -> BoxStream<'static, StreamFrame> {
    let opened = match session.request(prompt.system_prompt.as_deref(), &prompt.prompt) {
        Ok(request) => session.complete_stream(request).await,
        Err(e) => Err(e),
    };

    let fragments = match opened {
        Ok(fragments) => fragments,
        Err(e) => {
            error!("Failed to open chat stream: {}", e);
            return stream::iter([StreamFrame::error(&e)]).boxed();
        }
    };

    stream::unfold(Some(fragments), |state| async move {
        let mut fragments = state?;
        match fragments.next().await {
            Some(Ok(fragment)) => Some((StreamFrame::from(fragment), Some(fragments))),
            Some(Err(e)) => {
                error!("Chat stream failed: {}", e);
                Some((StreamFrame::error(&e), None))
            }
            None => Some((StreamFrame::done(), None)),
        }
    })
    .boxed()
}
