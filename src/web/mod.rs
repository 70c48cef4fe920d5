// Browser front end
// Upload a PDF, ask questions about it and optionally inspect the retrieved chunks

pub mod page;


use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::document::is_pdf_file_name;
use crate::pipeline::Pipeline;
use crate::qa::Answer;
use crate::session::{SessionId, SessionStore};
use crate::{AppError, Result};
use page::{PageView, render};

pub const SESSION_COOKIE: &str = "session_id";

/// State shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    #[inline]
    pub const fn new(pipeline: Arc<Pipeline>, sessions: Arc<SessionStore>) -> Self {
        Self { pipeline, sessions }
    }
}

#[inline]
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/ask", post(ask))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
    pub show_sources: Option<String>,
}

/// Session id from the request cookie, or a fresh one that must be set on the response
struct Session {
    id: SessionId,
    is_new: bool,
}

impl Session {
    fn from_headers(headers: &HeaderMap) -> Self {
        match session_from_cookies(headers) {
            Some(id) => Self { id, is_new: false },
            None => {
                let id = Uuid::new_v4();
                debug!("Starting session {}", id);
                Self { id, is_new: true }
            }
        }
    }

    fn respond(&self, status: StatusCode, body: String) -> Response {
        let mut response = (status, Html(body)).into_response();
        if self.is_new {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
        }
        response
    }
}

/// Find a well-formed session id among the request's cookies
#[inline]
pub fn session_from_cookies(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find_map(|id| Uuid::parse_str(id.trim()).ok())
}

fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::InvalidInput(_) | AppError::Document(_) | AppError::EmptyDocument => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run blocking pipeline work off the async workers
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Other(anyhow::anyhow!("Background task failed: {e}")))?
}

async fn health() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = Session::from_headers(&headers);
    let summary = state.sessions.summary(session.id).ok().flatten();

    session.respond(
        StatusCode::OK,
        render(&PageView {
            document: summary.as_ref(),
            ..PageView::default()
        }),
    )
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let session = Session::from_headers(&headers);

    let (status, status_line, error) = match handle_upload(&state, session.id, multipart).await {
        Ok(line) => (StatusCode::OK, Some(line), None),
        Err(e) => {
            warn!("Upload failed for session {}: {}", session.id, e);
            (status_for(&e), None, Some(e.to_string()))
        }
    };

    let summary = state.sessions.summary(session.id).ok().flatten();
    session.respond(
        status,
        render(&PageView {
            document: summary.as_ref(),
            status: status_line.as_deref(),
            error: error.as_deref(),
            ..PageView::default()
        }),
    )
}

async fn handle_upload(
    state: &AppState,
    session_id: SessionId,
    mut multipart: Multipart,
) -> Result<String> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::InvalidInput("No file was uploaded".to_string()))?;
    if !is_pdf_file_name(&file_name) {
        return Err(AppError::InvalidInput(format!(
            "{file_name:?} is not a PDF; please upload a .pdf file"
        )));
    }

    info!(
        "Session {} uploaded {} ({} bytes)",
        session_id,
        file_name,
        bytes.len()
    );

    // Index from memory first; the session's file and document change only on success
    let sessions = Arc::clone(&state.sessions);
    let pipeline = Arc::clone(&state.pipeline);
    let name = file_name.clone();
    let document = run_blocking(move || {
        let document = Arc::new(pipeline.ingest_bytes(&bytes)?);
        sessions.store_upload(session_id, &name, &bytes, Arc::clone(&document))?;
        Ok(document)
    })
    .await?;

    let status_line = format!(
        "Indexed {} pages into {} chunks from {}",
        document.page_count,
        document.chunk_count(),
        file_name
    );
    Ok(status_line)
}

async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let session = Session::from_headers(&headers);
    let show_sources = form.show_sources.is_some();
    let question = form.question.trim().to_string();

    let current = state.sessions.document(session.id).ok().flatten();
    let summary = state.sessions.summary(session.id).ok().flatten();

    let outcome: Result<Option<Answer>> = match current {
        _ if question.is_empty() => Ok(None),
        None => Err(AppError::InvalidInput(
            "Upload a PDF before asking questions".to_string(),
        )),
        Some(current) => {
            let pipeline = Arc::clone(&state.pipeline);
            let asked = question.clone();
            run_blocking(move || pipeline.ask(&current.document, &asked))
                .await
                .map(Some)
        }
    };

    let (status, answer, error) = match outcome {
        Ok(answer) => (StatusCode::OK, answer, None),
        Err(e) => {
            error!("Question failed for session {}: {}", session.id, e);
            (status_for(&e), None, Some(e.to_string()))
        }
    };

    session.respond(
        status,
        render(&PageView {
            document: summary.as_ref(),
            error: error.as_deref(),
            question: Some(&question),
            answer: answer.as_ref(),
            show_sources,
            ..PageView::default()
        }),
    )
}
