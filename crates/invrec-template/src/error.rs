use invrec_engine::EngineError;
use rust_decimal::Decimal;
use thiserror::Error;

/// `row` is the 1-based line of the CSV text; the header is line 1.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("template is missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: counted quantity is empty")]
    EmptyCount { row: u64 },

    #[error("row {row}: cannot parse counted quantity '{raw}'")]
    InvalidCount { row: u64, raw: String },

    #[error("row {row}: counted quantity must not be negative (got {value})")]
    NegativeCount { row: u64, value: Decimal },

    #[error("row {row}: aggregate {aggregate} of session '{session_id}' appears twice")]
    DuplicateRow {
        row: u64,
        session_id: String,
        aggregate: String,
    },

    #[error("row {row}: unknown session '{session_id}'")]
    UnknownSession { row: u64, session_id: String },

    #[error("template has no data rows")]
    Empty,

    #[error(transparent)]
    Engine(#[from] EngineError),
}
