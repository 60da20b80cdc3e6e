//! The `/v1` JSON API behind the browser UI.
//!
//! Endpoints:
//! - `POST   /v1/chat`         : run a query, return the answer and its progress events
//! - `POST   /v1/chat/stream`  : same, as an SSE stream of step events plus `done`
//! - `GET    /v1/transcript`   : the chat transcript
//! - `GET    /v1/files`        : created files with previews
//! - `GET    /v1/files/{name}` : download one created file
//! - `DELETE /v1/session`      : clear transcript and files
//! - `GET    /v1/examples`     : canned example queries
//! - `GET    /v1/tools`        : available tools

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use stepwise_agent::{Answer, EXAMPLE_QUERIES, EventSink, StepEvent, TranscriptEntry};
use stepwise_tools::CreatedFile;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::info;

use crate::SharedState;

const PREVIEW_CHARS: usize = 1000;

/// Build the `/v1` router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/transcript", get(transcript_handler))
        .route("/files", get(list_files_handler))
        .route("/files/{name}", get(download_file_handler))
        .route("/session", axum::routing::delete(clear_session_handler))
        .route("/examples", get(examples_handler))
        .route("/tools", get(tools_handler))
        .with_state(state)
}

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    /// "finished", "incomplete", or "failed"
    pub outcome: String,
    pub rounds: u32,
    pub tool_calls: u32,
    pub events: Vec<StepEvent>,
    pub new_files: Vec<CreatedFile>,
}

impl ChatResponse {
    fn new(answer: Answer, events: Vec<StepEvent>) -> Self {
        Self {
            outcome: answer.outcome.label().to_string(),
            answer: answer.text,
            rounds: answer.rounds,
            tool_calls: answer.tool_calls,
            events,
            new_files: answer.new_files,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileSummary {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    pub preview: String,
}

impl From<&CreatedFile> for FileSummary {
    fn from(file: &CreatedFile) -> Self {
        let preview = match file.content.char_indices().nth(PREVIEW_CHARS) {
            Some((idx, _)) => format!("{}\n\n... (truncated)", &file.content[..idx]),
            None => file.content.clone(),
        };
        Self {
            name: file.name.clone(),
            mime_type: file.mime_type().to_string(),
            size: file.content.len(),
            preview,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub count: usize,
    pub tools: Vec<ToolInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn validate_message(payload: &ChatRequest) -> Result<(), ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }
    Ok(())
}

// ── Chat ──────────────────────────────────────────────────────────────────

/// `POST /v1/chat`: run one query to completion.
///
/// Holds the session for the whole loop, so queries run one at a time.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    validate_message(&payload)?;
    info!(message_len = payload.message.len(), "v1/chat request");

    let mut session = state.session.lock().await;
    let (sink, mut rx) = EventSink::channel();
    let answer = state.agent.ask(&mut session, &payload.message, &sink).await;
    drop(sink);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    Ok(Json(ChatResponse::new(answer, events)))
}

enum StreamItem {
    Step(StepEvent),
    Done(ChatResponse),
}

impl StreamItem {
    fn into_sse(self) -> SseEvent {
        match self {
            StreamItem::Step(event) => SseEvent::default()
                .event(event.event_type())
                .data(serde_json::to_string(&event).unwrap_or_default()),
            StreamItem::Done(response) => SseEvent::default()
                .event("done")
                .data(serde_json::to_string(&response).unwrap_or_default()),
        }
    }
}

/// `POST /v1/chat/stream`: run one query, streaming step events as SSE.
///
/// The last event is `done`, carrying the same payload as `/v1/chat`.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    validate_message(&payload)?;
    info!(message_len = payload.message.len(), "v1/chat/stream SSE request");

    let (out_tx, out_rx) = mpsc::unbounded_channel::<StreamItem>();

    tokio::spawn(async move {
        let mut session = state.session.lock().await;
        let (sink, mut rx) = EventSink::channel();

        let run = async {
            let answer = state.agent.ask(&mut session, &payload.message, &sink).await;
            drop(sink);
            answer
        };
        let forward = async {
            let mut seen = Vec::new();
            while let Some(event) = rx.recv().await {
                let _ = out_tx.send(StreamItem::Step(event.clone()));
                seen.push(event);
            }
            seen
        };

        let (answer, events) = tokio::join!(run, forward);
        let _ = out_tx.send(StreamItem::Done(ChatResponse::new(answer, events)));
    });

    let stream =
        UnboundedReceiverStream::new(out_rx).map(|item| Ok::<_, Infallible>(item.into_sse()));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ── Session ───────────────────────────────────────────────────────────────

async fn transcript_handler(State(state): State<SharedState>) -> Json<Vec<TranscriptEntry>> {
    let session = state.session.lock().await;
    Json(session.transcript.clone())
}

async fn list_files_handler(State(state): State<SharedState>) -> Json<Vec<FileSummary>> {
    let session = state.session.lock().await;
    Json(session.created_files.iter().map(FileSummary::from).collect())
}

/// `GET /v1/files/{name}`: the latest file with that name, as an attachment.
async fn download_file_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let session = state.session.lock().await;
    let file = session
        .created_files
        .get(&name)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("No file named '{name}'")))?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        file.name.replace(['"', '\\'], "_")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format!("{}; charset=utf-8", file.mime_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.content.clone(),
    )
        .into_response())
}

/// `DELETE /v1/session`: clear everything.
async fn clear_session_handler(State(state): State<SharedState>) -> StatusCode {
    state.session.lock().await.clear();
    info!("Session cleared");
    StatusCode::NO_CONTENT
}

async fn examples_handler() -> Json<Vec<&'static str>> {
    Json(EXAMPLE_QUERIES.to_vec())
}

async fn tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools: Vec<ToolInfo> = state
        .agent
        .tools()
        .tools()
        .iter()
        .map(|t| ToolInfo {
            name: t.name().to_string(),
            description: t.description().to_string(),
        })
        .collect();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}
