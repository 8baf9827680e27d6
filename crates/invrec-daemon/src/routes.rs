//! Axum router and all HTTP handlers for invrec-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.

use std::{convert::Infallible, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use invrec_artifacts::RunDir;
use invrec_engine::AllocationStrategy;
use invrec_records::DEFAULT_INSPECT_LINES;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api_types::{
        CleanupQuery, CleanupResponse, DeleteResponse, HealthResponse, ListQuery,
        ProcessQuery, ProcessResponse, SessionListResponse, UploadQuery,
    },
    error::ApiError,
    pipeline,
    sessions::{SessionRecord, SessionStatus},
    state::{cleanup_expired, hours, AppState, BusMsg},
};

const DEFAULT_LIST_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    // One byte over the cap so the handler, not the extractor, reports the
    // exact size limit.
    let body_limit = state.max_file_size().saturating_add(1);

    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/sessions", get(list_sessions).post(upload))
        .route("/v1/sessions/cleanup", post(cleanup))
        .route("/v1/sessions/:id", get(get_session).delete(delete_session))
        .route("/v1/sessions/:id/template", get(download_template))
        .route("/v1/sessions/:id/process", post(process))
        .route("/v1/sessions/:id/final", get(download_final))
        .route("/v1/sessions/:id/analyze", get(analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = st.sessions.read().await.len();
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            config_hash: st.config_hash.clone(),
            sessions,
        }),
    )
}

// ---------------------------------------------------------------------------
// /v1/sessions
// ---------------------------------------------------------------------------

/// Body is the raw export; `?filename=` names it in the session record.
pub(crate) async fn upload(
    State(st): State<Arc<AppState>>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let text = pipeline::validate_upload(&body, st.max_file_size())?.to_string();
    let filename = pipeline::sanitize_filename(q.filename.as_deref());

    let root = st.storage_root();
    let config_hash = st.config_hash.clone();
    let opts = st.options.clone();
    let rec = tokio::task::spawn_blocking(move || {
        pipeline::create_session(&root, &config_hash, &opts, &filename, &text)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("upload task failed: {e}")))??;

    st.sessions.write().await.insert(rec.clone());
    st.publish(BusMsg::Session {
        session_id: rec.id,
        event: "uploaded".to_string(),
        status: Some(rec.status.as_str().to_string()),
    });
    Ok((StatusCode::CREATED, Json(rec)).into_response())
}

pub(crate) async fn list_sessions(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> impl IntoResponse {
    let reg = st.sessions.read().await;
    let sessions = reg.list(
        q.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        q.include_expired.unwrap_or(false),
        st.session_expiry(),
        Utc::now(),
    );
    Json(SessionListResponse {
        total: reg.len(),
        sessions,
    })
}

pub(crate) async fn get_session(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionRecord>, ApiError> {
    Ok(Json(touch(&st, id).await?))
}

pub(crate) async fn delete_session(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    {
        let mut reg = st.sessions.write().await;
        match reg.get_mut(id) {
            None => return Err(ApiError::NotFound(id)),
            Some(r) if r.status == SessionStatus::Processing => {
                return Err(ApiError::Conflict(format!("session {id} is being processed")))
            }
            Some(_) => {
                reg.remove(id);
            }
        }
    }

    let run = RunDir::at(&st.storage_root(), id);
    tokio::task::spawn_blocking(move || invrec_artifacts::remove_run_artifacts(&run))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("delete task failed: {e}")))??;

    info!(session_id = %id, "session deleted");
    st.publish(BusMsg::Session {
        session_id: id,
        event: "deleted".to_string(),
        status: None,
    });
    Ok(Json(DeleteResponse {
        deleted: true,
        session_id: id,
    }))
}

pub(crate) async fn cleanup(
    State(st): State<Arc<AppState>>,
    Query(q): Query<CleanupQuery>,
) -> impl IntoResponse {
    let max_age = q
        .max_age_hours
        .map(hours)
        .unwrap_or_else(|| st.session_expiry());
    let removed = cleanup_expired(&st, max_age).await;
    Json(CleanupResponse { removed })
}

// ---------------------------------------------------------------------------
// /v1/sessions/:id/template  /final
// ---------------------------------------------------------------------------

pub(crate) async fn download_template(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let rec = touch(&st, id).await?;
    let run = RunDir::at(&st.storage_root(), id);
    let text = read_blocking(run.template_path()).await?;
    let name = format!("{}_template.csv", stem(&rec.original_filename));
    Ok(attachment("text/csv; charset=utf-8", &name, text))
}

pub(crate) async fn download_final(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let rec = touch(&st, id).await?;
    if rec.status != SessionStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "session {id} is {}; process a completed template first",
            rec.status.as_str()
        )));
    }
    let run = RunDir::at(&st.storage_root(), id);
    let text = read_blocking(run.final_path()).await?;
    let name = format!("{}_final.csv", stem(&rec.original_filename));
    Ok(attachment("text/plain; charset=utf-8", &name, text))
}

// ---------------------------------------------------------------------------
// POST /v1/sessions/:id/process
// ---------------------------------------------------------------------------

/// Body is the completed template CSV. Reprocessing a completed session is
/// allowed and replaces its final file.
pub(crate) async fn process(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(q): Query<ProcessQuery>,
    body: Bytes,
) -> Result<Json<ProcessResponse>, ApiError> {
    let completed = pipeline::validate_upload(&body, st.max_file_size())?.to_string();
    let strategy = match q.strategy.as_deref() {
        Some(s) => s
            .parse::<AllocationStrategy>()
            .map_err(ApiError::BadRequest)?,
        None => st.options.strategy,
    };

    // Claim the session so two process calls never write the same run dir.
    let previous = {
        let mut reg = st.sessions.write().await;
        let rec = reg.get_mut(id).ok_or(ApiError::NotFound(id))?;
        if rec.status == SessionStatus::Processing {
            return Err(ApiError::Conflict(format!("session {id} is already being processed")));
        }
        let prev = rec.status;
        rec.status = SessionStatus::Processing;
        rec.last_accessed_utc = Utc::now();
        prev
    };

    let run = RunDir::at(&st.storage_root(), id);
    let opts = st.options.clone().with_strategy(strategy);
    let result = tokio::task::spawn_blocking(move || pipeline::process_session(&run, &opts, &completed))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("process task failed: {e}")))
        .and_then(|r| r);

    let mut reg = st.sessions.write().await;
    let rec = reg.get_mut(id).ok_or(ApiError::NotFound(id))?;
    rec.updated_at_utc = Utc::now();
    match result {
        Ok(report) => {
            rec.status = SessionStatus::Completed;
            rec.strategy = Some(strategy);
            rec.report = Some(report.clone());
            let session = rec.clone();
            drop(reg);

            st.publish(BusMsg::Session {
                session_id: id,
                event: "processed".to_string(),
                status: Some(session.status.as_str().to_string()),
            });
            Ok(Json(ProcessResponse { session, report }))
        }
        Err(e) => {
            rec.status = previous;
            drop(reg);

            warn!(session_id = %id, error = %e, "process failed");
            st.publish(BusMsg::Session {
                session_id: id,
                event: "failed".to_string(),
                status: Some(previous.as_str().to_string()),
            });
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/sessions/:id/analyze
// ---------------------------------------------------------------------------

pub(crate) async fn analyze(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    touch(&st, id).await?;
    let run = RunDir::at(&st.storage_root(), id);
    let delimiter = st.options.delimiter;
    let inspection = tokio::task::spawn_blocking(move || {
        pipeline::analyze_session(&run, delimiter, DEFAULT_INSPECT_LINES)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("analyze task failed: {e}")))??;

    let well_formed = inspection.stock_lines_well_formed();
    let mut body = serde_json::to_value(&inspection)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("serialize inspection failed: {e}")))?;
    body["stock_lines_well_formed"] = serde_json::Value::Bool(well_formed);
    Ok(Json(body).into_response())
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Session { .. } => "session",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn touch(st: &AppState, id: Uuid) -> Result<SessionRecord, ApiError> {
    let mut reg = st.sessions.write().await;
    reg.touch(id, Utc::now())
        .cloned()
        .ok_or(ApiError::NotFound(id))
}

async fn read_blocking(path: std::path::PathBuf) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || pipeline::read_artifact(&path))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("read task failed: {e}")))?
}

fn stem(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(s, _)| s)
        .filter(|s| !s.is_empty())
        .unwrap_or(filename)
}

fn attachment(content_type: &'static str, filename: &str, body: String) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(v) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    (StatusCode::OK, headers, body).into_response()
}
