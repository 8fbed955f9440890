// src/test_utils/mock_llm_server.rs
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A canned reply for one `generateContent` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    NoCandidates,
    Error { status: u16, message: String },
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn no_candidates() -> Self {
        MockReply::NoCandidates
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        MockReply::Error {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Final path segment, e.g. `gemini-pro:generateContent`.
    pub model_call: String,
    /// Taken from the `x-goog-api-key` header.
    pub api_key: Option<String>,
    pub key_in_query: bool,
    pub body: Value,
}

#[derive(Clone)]
struct MockServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn generate_content_handler(
    State(state): State<MockServerState>,
    Path(model_call): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    log::debug!("Mock Gemini server received request for {}", model_call);
    state.requests.lock().unwrap().push(RecordedRequest {
        model_call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        key_in_query: query.contains_key("key"),
        body,
    });

    match state.replies.lock().unwrap().pop_front() {
        Some(MockReply::Text(text)) => (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": text}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {
                    "promptTokenCount": 8,
                    "candidatesTokenCount": 4,
                    "totalTokenCount": 12
                }
            })),
        ),
        Some(MockReply::NoCandidates) => (StatusCode::OK, Json(json!({ "candidates": [] }))),
        Some(MockReply::Error { status, message }) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({
                "error": {"code": status, "message": message, "status": "ERROR"}
            })),
        ),
        None => {
            log::error!("Mock Gemini server ran out of replies!");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": {"code": 503, "message": "no more replies"}})),
            )
        }
    }
}

pub struct MockGeminiServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    recorded_requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockGeminiServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = MockServerState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let recorded_requests = state.requests.clone();

        let app = Router::new()
            .route("/models/{model_call}", post(generate_content_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| log::error!("Mock Gemini server error: {}", e));
        });

        MockGeminiServer {
            addr,
            shutdown_tx,
            recorded_requests,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock Gemini server shutdown signal already sent or receiver dropped.");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }
}
