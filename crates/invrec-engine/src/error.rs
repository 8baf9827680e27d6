use invrec_records::{RecordError, ValidationError};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Sum of adjusted quantities drifted from the sum of counts. Always an
    /// engine defect.
    #[error(
        "consistency check failed (session={session_id} article={article} site={site}): \
         adjusted total {adjusted_total} != counted total {counted_total}"
    )]
    Consistency {
        session_id: String,
        article: String,
        site: String,
        adjusted_total: Decimal,
        counted_total: Decimal,
    },

    /// A template aggregate of the session received no count.
    #[error("no count provided for aggregate {aggregate} in session '{session_id}'")]
    MissingAggregateCount { session_id: String, aggregate: String },

    /// A count was provided for an aggregate the session does not have.
    #[error("count provided for unknown aggregate {aggregate} in session '{session_id}'")]
    UnknownAggregate { session_id: String, aggregate: String },

    #[error("invalid engine configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// True when the caller's input is at fault (as opposed to the engine or
    /// its configuration).
    pub fn is_validation(&self) -> bool {
        match self {
            EngineError::Record(e) => e.is_validation(),
            EngineError::Validation(_)
            | EngineError::MissingAggregateCount { .. }
            | EngineError::UnknownAggregate { .. } => true,
            EngineError::Consistency { .. } | EngineError::Config(_) => false,
        }
    }
}
