use rust_decimal::Decimal;
use thiserror::Error;

/// What exactly is wrong with a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationKind {
    /// Fewer fields than the record type requires.
    #[error("'{record_type}' record needs at least {expected} fields, found {found}")]
    FieldCount {
        record_type: String,
        expected: usize,
        found: usize,
    },
    /// First field is not `E`, `L` or `S`.
    #[error("unknown record type '{0}'")]
    UnknownRecordType(String),
    /// A numeric field could not be parsed.
    #[error("cannot parse {field} quantity from '{raw}'")]
    InvalidQuantity { field: &'static str, raw: String },
    /// A quantity field holds a negative value.
    #[error("{field} quantity must not be negative (got {value})")]
    NegativeQuantity { field: &'static str, value: Decimal },
    /// Reconciliation needs a counted quantity and the field is empty.
    #[error("counted quantity is empty")]
    MissingCount,
    /// `L` or `S` record references a session with no `E` header.
    #[error("unknown session '{0}'")]
    UnknownSession(String),
    /// `S` record references an inventory id absent from its session.
    #[error("unknown inventory list '{0}'")]
    UnknownInventoryList(String),
    /// Two `L` records of one session share an inventory id.
    #[error("duplicate inventory list '{0}'")]
    DuplicateInventoryList(String),
    /// Two `E` records share a session id.
    #[error("duplicate session '{0}'")]
    DuplicateSession(String),
}

/// A malformed record. Always carries the offending physical line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}{}", context(.session_id, .article, .lot))]
pub struct ValidationError {
    /// 1-based physical line number in the source file.
    pub line: usize,
    pub session_id: Option<String>,
    pub article: Option<String>,
    pub lot: Option<String>,
    pub kind: ValidationKind,
}

impl ValidationError {
    pub fn new(line: usize, kind: ValidationKind) -> Self {
        Self {
            line,
            session_id: None,
            article: None,
            lot: None,
            kind,
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn at_lot(mut self, article: impl Into<String>, lot: impl Into<String>) -> Self {
        self.article = Some(article.into());
        self.lot = Some(lot.into());
        self
    }
}

/// ` (session=.. article=.. lot='..')`, empty without a session.
fn context(session_id: &Option<String>, article: &Option<String>, lot: &Option<String>) -> String {
    let Some(s) = session_id else {
        return String::new();
    };
    let mut out = format!(" (session={s}");
    if let Some(a) = article {
        out.push_str(&format!(" article={a}"));
    }
    if let Some(l) = lot {
        out.push_str(&format!(" lot='{l}'"));
    }
    out.push(')');
    out
}

/// Errors produced while loading a file into the Record Model.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A session has no `L` record; rejected before any computation.
    #[error("session '{session_id}' (header at line {line}) has no inventory list record")]
    EmptySession { session_id: String, line: usize },

    #[error("file contains no session header record")]
    NoSessions,

    #[error("io error: {0}")]
    Io(String),
}

impl RecordError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RecordError::Validation(_) | RecordError::EmptySession { .. } | RecordError::NoSessions
        )
    }
}
