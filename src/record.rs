use crate::catalog::QueryCategory;
use crate::error::RejectReason;
use serde::{Deserialize, Serialize};

/// Additivity tolerance for externally produced rows. Covers two-decimal
/// rounding of each of the three time columns.
pub const INGEST_TOLERANCE_MS: f64 = 0.015;

/// One timed trial of one query on one database.
///
/// Fields are only reachable through accessors so every record in memory has
/// passed validation: non-negative finite times and
/// `execution_time_ms == query_time_ms + return_time_ms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRecord {
    query_id: String,
    database_name: String,
    execution_time_ms: f64,
    query_time_ms: f64,
    return_time_ms: f64,
    rows_returned: u64,
    category: QueryCategory,
}

impl BenchmarkRecord {
    /// Build a record from an execution time and the share spent in the query engine.
    pub(crate) fn split(
        query_id: &str,
        database_name: &str,
        category: QueryCategory,
        execution_time_ms: f64,
        query_share: f64,
        rows_returned: u64,
    ) -> Self {
        let query_time_ms = execution_time_ms * query_share;
        Self {
            query_id: query_id.to_string(),
            database_name: database_name.to_string(),
            execution_time_ms,
            query_time_ms,
            return_time_ms: execution_time_ms - query_time_ms,
            rows_returned,
            category,
        }
    }

    /// Validate an ingested row and map it into a record.
    pub fn from_row(row: &ExternalRow) -> Result<Self, RejectReason> {
        if row.query_id.trim().is_empty() {
            return Err(RejectReason::EmptyIdentifier("query_id"));
        }
        if row.database_name.trim().is_empty() {
            return Err(RejectReason::EmptyIdentifier("database_name"));
        }

        let times = [
            ("execution_time_ms", row.execution_time_ms),
            ("query_time_ms", row.query_time_ms),
            ("return_time_ms", row.return_time_ms),
        ];
        for (field, value) in times {
            if !value.is_finite() {
                return Err(RejectReason::NonFiniteField(field));
            }
            if value < 0.0 {
                return Err(RejectReason::NegativeField(field));
            }
        }
        if row.rows_returned < 0 {
            return Err(RejectReason::NegativeField("rows_returned"));
        }

        let drift = row.execution_time_ms - (row.query_time_ms + row.return_time_ms);
        if drift.abs() > INGEST_TOLERANCE_MS {
            return Err(RejectReason::Additivity {
                execution_ms: row.execution_time_ms,
                query_ms: row.query_time_ms,
                return_ms: row.return_time_ms,
            });
        }

        let category = row
            .category
            .parse::<QueryCategory>()
            .map_err(RejectReason::UnknownCategory)?;

        Ok(Self {
            query_id: row.query_id.trim().to_string(),
            database_name: row.database_name.trim().to_string(),
            execution_time_ms: row.execution_time_ms,
            query_time_ms: row.query_time_ms,
            return_time_ms: row.return_time_ms,
            rows_returned: row.rows_returned as u64,
            category,
        })
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn execution_time_ms(&self) -> f64 {
        self.execution_time_ms
    }

    pub fn query_time_ms(&self) -> f64 {
        self.query_time_ms
    }

    pub fn return_time_ms(&self) -> f64 {
        self.return_time_ms
    }

    pub fn rows_returned(&self) -> u64 {
        self.rows_returned
    }

    pub fn category(&self) -> QueryCategory {
        self.category
    }

    /// Share of execution time spent returning results; `None` when execution time is zero.
    pub fn return_ratio(&self) -> Option<f64> {
        if self.execution_time_ms > 0.0 {
            Some((self.return_time_ms / self.execution_time_ms).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// The canonical interchange row for this record.
    pub fn to_row(&self) -> ExternalRow {
        ExternalRow {
            query_id: self.query_id.clone(),
            database_name: self.database_name.clone(),
            execution_time_ms: self.execution_time_ms,
            query_time_ms: self.query_time_ms,
            return_time_ms: self.return_time_ms,
            rows_returned: self.rows_returned as i64,
            category: self.category.name().to_string(),
        }
    }
}

/// An unvalidated row as supplied by an ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRow {
    pub query_id: String,
    pub database_name: String,
    pub execution_time_ms: f64,
    pub query_time_ms: f64,
    pub return_time_ms: f64,
    pub rows_returned: i64,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(exec: f64, query: f64, ret: f64) -> ExternalRow {
        ExternalRow {
            query_id: "Q1".to_string(),
            database_name: "DuckDB".to_string(),
            execution_time_ms: exec,
            query_time_ms: query,
            return_time_ms: ret,
            rows_returned: 120,
            category: "simple".to_string(),
        }
    }

    #[test]
    fn test_valid_row_maps() {
        let record = BenchmarkRecord::from_row(&row(10.0, 7.5, 2.5)).unwrap();
        assert_eq!(record.query_id(), "Q1");
        assert_eq!(record.category(), QueryCategory::Simple);
        assert_eq!(record.rows_returned(), 120);
        assert_eq!(record.return_ratio(), Some(0.25));
    }

    #[test]
    fn test_additivity_violation() {
        let err = BenchmarkRecord::from_row(&row(10.0, 4.0, 8.0)).unwrap_err();
        assert!(matches!(err, RejectReason::Additivity { .. }));
    }

    #[test]
    fn test_rounded_rows_within_tolerance() {
        // 123.46 = round(123.456), parts rounded independently
        assert!(BenchmarkRecord::from_row(&row(123.46, 92.59, 30.86)).is_ok());
    }

    #[test]
    fn test_negative_and_non_finite_fields() {
        assert_eq!(
            BenchmarkRecord::from_row(&row(-1.0, -0.5, -0.5)).unwrap_err(),
            RejectReason::NegativeField("execution_time_ms")
        );
        assert_eq!(
            BenchmarkRecord::from_row(&row(f64::NAN, 1.0, 1.0)).unwrap_err(),
            RejectReason::NonFiniteField("execution_time_ms")
        );

        let mut negative_rows = row(10.0, 5.0, 5.0);
        negative_rows.rows_returned = -3;
        assert_eq!(
            BenchmarkRecord::from_row(&negative_rows).unwrap_err(),
            RejectReason::NegativeField("rows_returned")
        );
    }

    #[test]
    fn test_unknown_category() {
        let mut crud = row(10.0, 5.0, 5.0);
        crud.category = "crud".to_string();
        assert_eq!(
            BenchmarkRecord::from_row(&crud).unwrap_err(),
            RejectReason::UnknownCategory("crud".to_string())
        );
    }

    #[test]
    fn test_zero_execution_has_no_ratio() {
        let record = BenchmarkRecord::from_row(&row(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(record.return_ratio(), None);
    }

    #[test]
    fn test_split_is_additive() {
        let record = BenchmarkRecord::split("Q1", "A", QueryCategory::Simple, 123.456, 0.8, 7);
        let sum = record.query_time_ms() + record.return_time_ms();
        assert!((record.execution_time_ms() - sum).abs() < 1e-9);
        assert_eq!(BenchmarkRecord::from_row(&record.to_row()).unwrap(), record);
    }
}
