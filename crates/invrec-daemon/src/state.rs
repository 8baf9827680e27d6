//! Shared runtime state for invrec-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The engine options are
//! built once from config; the session registry is the only mutable state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use invrec_config::{LoadedConfig, ReconcileConfig};
use invrec_engine::ReconcileOptions;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::sessions::SessionRegistry;

/// Upper bound for configured ages, keeps chrono arithmetic in range.
const MAX_AGE_HOURS: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    /// A session changed: uploaded, processed, failed, deleted, expired.
    Session {
        session_id: Uuid,
        event: String,
        status: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub config: Arc<ReconcileConfig>,
    pub config_hash: String,
    /// Engine options derived from `config`; per-request strategy overrides
    /// are applied to a copy.
    pub options: ReconcileOptions,
    pub sessions: Arc<RwLock<SessionRegistry>>,
}

impl AppState {
    pub fn new(config: ReconcileConfig, config_hash: impl Into<String>) -> anyhow::Result<Self> {
        config.validate()?;
        let options = ReconcileOptions::from_config(&config)
            .context("config cannot be turned into engine options")?;
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Ok(Self {
            bus,
            build: BuildInfo {
                service: "invrec-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config: Arc::new(config),
            config_hash: config_hash.into(),
            options,
            sessions: Arc::new(RwLock::new(SessionRegistry::new())),
        })
    }

    pub fn from_loaded(loaded: &LoadedConfig) -> anyhow::Result<Self> {
        Self::new(loaded.settings()?, loaded.config_hash.clone())
    }

    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.root)
    }

    pub fn max_file_size(&self) -> usize {
        usize::try_from(self.config.files.max_file_size).unwrap_or(usize::MAX)
    }

    pub fn session_expiry(&self) -> chrono::Duration {
        hours(self.config.sessions.expiry_hours)
    }

    pub fn publish(&self, msg: BusMsg) {
        // No subscribers is fine.
        let _ = self.bus.send(msg);
    }
}

pub fn hours(h: u64) -> chrono::Duration {
    chrono::Duration::hours(h.min(MAX_AGE_HOURS) as i64)
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Drop sessions idle for longer than `max_age` and delete their run
/// directories. Returns the removed ids.
pub async fn cleanup_expired(st: &AppState, max_age: chrono::Duration) -> Vec<Uuid> {
    let drained = {
        let mut reg = st.sessions.write().await;
        reg.drain_expired(max_age, chrono::Utc::now())
    };

    let mut removed = Vec::with_capacity(drained.len());
    for rec in drained {
        let run = invrec_artifacts::RunDir::at(&st.storage_root(), rec.id);
        match tokio::task::spawn_blocking(move || invrec_artifacts::remove_run_artifacts(&run))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(session_id = %rec.id, error = %e, "run dir removal failed"),
            Err(e) => warn!(session_id = %rec.id, error = %e, "run dir removal task failed"),
        }
        st.publish(BusMsg::Session {
            session_id: rec.id,
            event: "expired".to_string(),
            status: None,
        });
        removed.push(rec.id);
    }

    if !removed.is_empty() {
        info!(removed = removed.len(), "expired sessions cleaned up");
    }
    removed
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn a background task that runs [`cleanup_expired`] every `interval`
/// with the configured session expiry.
pub fn spawn_session_cleanup(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            cleanup_expired(&state, state.session_expiry()).await;
        }
    });
}
