//! In-memory session registry.
//!
//! One entry per uploaded file, keyed by UUID. The registry only does
//! bookkeeping; every file lives in the session's run directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use invrec_engine::{AllocationStrategy, ReconcileReport};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    TemplateGenerated,
    /// A completed template is being applied; a second process call is refused.
    Processing,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::TemplateGenerated => "template_generated",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub status: SessionStatus,
    pub original_filename: String,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    pub last_accessed_utc: DateTime<Utc>,
    /// From the first inventory list id (`DDMM` before `INV`), if present.
    pub inventory_date: Option<NaiveDate>,
    pub session_ids: Vec<String>,
    pub stock_lines: usize,
    pub articles: usize,
    pub lots: usize,
    pub total_theoretical: Decimal,
    pub template_rows: usize,
    pub strategy: Option<AllocationStrategy>,
    pub report: Option<ReconcileReport>,
    pub run_dir: PathBuf,
}

impl SessionRecord {
    pub fn is_expired(&self, expiry: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_accessed_utc > expiry
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<Uuid, SessionRecord>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn insert(&mut self, record: SessionRecord) {
        self.sessions.insert(record.id, record);
    }

    /// Look up a session and mark it as accessed.
    pub fn touch(&mut self, id: Uuid, now: DateTime<Utc>) -> Option<&SessionRecord> {
        let rec = self.sessions.get_mut(&id)?;
        rec.last_accessed_utc = now;
        Some(rec)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut SessionRecord> {
        self.sessions.get_mut(&id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<SessionRecord> {
        self.sessions.remove(&id)
    }

    /// Most recently created first.
    pub fn list(
        &self,
        limit: usize,
        include_expired: bool,
        expiry: Duration,
        now: DateTime<Utc>,
    ) -> Vec<SessionRecord> {
        let mut out: Vec<SessionRecord> = self
            .sessions
            .values()
            .filter(|s| include_expired || !s.is_expired(expiry, now))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc).then(a.id.cmp(&b.id)));
        out.truncate(limit);
        out
    }

    /// Remove every session idle for longer than `max_age`. Sessions being
    /// processed are left alone.
    pub fn drain_expired(&mut self, max_age: Duration, now: DateTime<Utc>) -> Vec<SessionRecord> {
        let ids: Vec<Uuid> = self
            .sessions
            .values()
            .filter(|s| s.status != SessionStatus::Processing && s.is_expired(max_age, now))
            .map(|s| s.id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(created: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            status: SessionStatus::TemplateGenerated,
            original_filename: "export.csv".to_string(),
            created_at_utc: created,
            updated_at_utc: created,
            last_accessed_utc: created,
            inventory_date: None,
            session_ids: vec!["SES1".to_string()],
            stock_lines: 1,
            articles: 1,
            lots: 1,
            total_theoretical: Decimal::ONE,
            template_rows: 1,
            strategy: None,
            report: None,
            run_dir: PathBuf::from("unused"),
        }
    }

    #[test]
    fn list_hides_expired_unless_asked() {
        let now = Utc::now();
        let mut reg = SessionRegistry::new();
        reg.insert(rec(now - Duration::hours(30)));
        reg.insert(rec(now - Duration::hours(1)));

        assert_eq!(reg.list(50, false, Duration::hours(24), now).len(), 1);
        assert_eq!(reg.list(50, true, Duration::hours(24), now).len(), 2);
        assert_eq!(reg.list(1, true, Duration::hours(24), now).len(), 1);
    }

    #[test]
    fn touch_refreshes_access_time() {
        let now = Utc::now();
        let mut reg = SessionRegistry::new();
        let old = rec(now - Duration::hours(30));
        let id = old.id;
        reg.insert(old);

        reg.touch(id, now).expect("present");
        assert!(reg.drain_expired(Duration::hours(24), now).is_empty());
    }

    #[test]
    fn drain_skips_processing_sessions() {
        let now = Utc::now();
        let mut reg = SessionRegistry::new();
        let mut busy = rec(now - Duration::hours(48));
        busy.status = SessionStatus::Processing;
        reg.insert(busy);
        reg.insert(rec(now - Duration::hours(48)));

        assert_eq!(reg.drain_expired(Duration::hours(24), now).len(), 1);
        assert_eq!(reg.len(), 1);
    }
}
