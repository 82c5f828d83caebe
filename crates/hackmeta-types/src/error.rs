use thiserror::Error;

/// Errors produced while building, validating, or encoding records.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("invalid content identifier: {0:?}")]
    InvalidContentId(String),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("no weight defined for criterion {0}")]
    UnknownCriterion(String),

    #[error("score {score} for {criterion} outside 0..={max}")]
    ScoreOutOfRange {
        criterion: String,
        score: f64,
        max: f64,
    },

    #[error("weight {weight} for {criterion} must be finite and non-negative")]
    InvalidWeight { criterion: String, weight: f64 },

    #[error("overall score mismatch: expected {expected}, recorded {recorded}")]
    ScoreMismatch { expected: f64, recorded: f64 },

    #[error("serialization error: {0}")]
    Serialization(String),
}
