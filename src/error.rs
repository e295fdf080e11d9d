use std::fmt;
use thiserror::Error;

/// Errors raised by the benchmark model and aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BenchError {
    #[error("invalid database profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("scale profile has no row count for table '{0}'")]
    InvalidScale(String),

    #[error("invalid query catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("no measurements for {0}")]
    NoData(String),

    #[error("{0}")]
    RowRejected(RejectedRow),
}

pub type Result<T> = std::result::Result<T, BenchError>;

/// Why an externally ingested row was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    EmptyIdentifier(&'static str),
    NegativeField(&'static str),
    NonFiniteField(&'static str),
    /// execution_time_ms does not equal query_time_ms + return_time_ms
    Additivity {
        execution_ms: f64,
        query_ms: f64,
        return_ms: f64,
    },
    UnknownCategory(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyIdentifier(field) => write!(f, "{} is empty", field),
            RejectReason::NegativeField(field) => write!(f, "{} is negative", field),
            RejectReason::NonFiniteField(field) => write!(f, "{} is not a finite number", field),
            RejectReason::Additivity {
                execution_ms,
                query_ms,
                return_ms,
            } => write!(
                f,
                "execution_time_ms {} != query_time_ms {} + return_time_ms {}",
                execution_ms, query_ms, return_ms
            ),
            RejectReason::UnknownCategory(raw) => write!(f, "unknown category '{}'", raw),
        }
    }
}

/// A single skipped ingestion row, identified by its 0-based position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: RejectReason,
}

impl fmt::Display for RejectedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} rejected: {}", self.row, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_row_message() {
        let err = BenchError::RowRejected(RejectedRow {
            row: 3,
            reason: RejectReason::NegativeField("query_time_ms"),
        });
        assert_eq!(err.to_string(), "row 3 rejected: query_time_ms is negative");
    }

    #[test]
    fn test_no_data_message() {
        let err = BenchError::NoData("Q1 on DuckDB".to_string());
        assert_eq!(err.to_string(), "no measurements for Q1 on DuckDB");
    }
}
