//! Request and response types for all invrec-daemon HTTP endpoints.
//!
//! No business logic lives here.

use invrec_engine::ReconcileReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sessions::SessionRecord;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub config_hash: String,
    pub sessions: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. `VALIDATION_FAILED`.
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// /v1/sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub include_expired: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionListResponse {
    pub total: usize,
    pub sessions: Vec<SessionRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanupQuery {
    /// Defaults to `sessions.expiry_hours`.
    pub max_age_hours: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub removed: Vec<Uuid>,
}

// ---------------------------------------------------------------------------
// /v1/sessions/:id/process
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessQuery {
    /// FIFO | LIFO; defaults to `engine.strategy`.
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub session: SessionRecord,
    pub report: ReconcileReport,
}
