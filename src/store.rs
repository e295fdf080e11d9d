use crate::catalog::QueryCategory;
use crate::error::{BenchError, RejectedRow};
use crate::record::{BenchmarkRecord, ExternalRow};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Outcome of an `extend_from` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRow>,
}

impl IngestReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    /// The rejections as errors, for callers that surface them individually.
    pub fn errors(&self) -> impl Iterator<Item = BenchError> + '_ {
        self.rejected.iter().cloned().map(BenchError::RowRejected)
    }
}

/// A store-level invariant that does not hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Record at `index` has execution time not equal to query + return time.
    Additivity { index: usize, drift_ms: f64 },
    /// Record at `index` has a negative or non-finite time.
    InvalidTime { index: usize },
    /// The same query id was recorded under two categories.
    CategoryConflict {
        query_id: String,
        first: QueryCategory,
        second: QueryCategory,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Additivity { index, drift_ms } => write!(
                f,
                "record {}: execution time differs from query + return time by {} ms",
                index, drift_ms
            ),
            Violation::InvalidTime { index } => {
                write!(f, "record {}: negative or non-finite time", index)
            }
            Violation::CategoryConflict {
                query_id,
                first,
                second,
            } => write!(
                f,
                "query {} recorded as both {} and {}",
                query_id, first, second
            ),
        }
    }
}

/// Append-only, insertion-ordered collection of benchmark records for one
/// reporting session. Repeated (query, database) pairs are separate trials.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkStore {
    records: Vec<BenchmarkRecord>,
}

impl BenchmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: BenchmarkRecord) {
        self.records.push(record);
    }

    /// Map ingested rows into records. Invalid rows are skipped and reported;
    /// a row is either accepted whole or not at all.
    pub fn extend_from<I>(&mut self, rows: I) -> IngestReport
    where
        I: IntoIterator<Item = ExternalRow>,
    {
        let mut report = IngestReport::default();

        for (row_index, row) in rows.into_iter().enumerate() {
            match BenchmarkRecord::from_row(&row) {
                Ok(record) => {
                    self.records.push(record);
                    report.accepted += 1;
                }
                Err(reason) => {
                    warn!(row = row_index, query_id = %row.query_id, database = %row.database_name, %reason, "skipping ingested row");
                    report.rejected.push(RejectedRow {
                        row: row_index,
                        reason,
                    });
                }
            }
        }

        report
    }

    pub fn all(&self) -> &[BenchmarkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check every invariant the aggregation layer relies on.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut categories: HashMap<&str, QueryCategory> = HashMap::new();

        for (index, record) in self.records.iter().enumerate() {
            let times = [
                record.execution_time_ms(),
                record.query_time_ms(),
                record.return_time_ms(),
            ];
            if times.iter().any(|t| !t.is_finite() || *t < 0.0) {
                violations.push(Violation::InvalidTime { index });
                continue;
            }

            let drift = record.execution_time_ms()
                - (record.query_time_ms() + record.return_time_ms());
            if drift.abs() > crate::record::INGEST_TOLERANCE_MS {
                violations.push(Violation::Additivity {
                    index,
                    drift_ms: drift,
                });
            }

            match categories.get(record.query_id()) {
                Some(&first) if first != record.category() => {
                    violations.push(Violation::CategoryConflict {
                        query_id: record.query_id().to_string(),
                        first,
                        second: record.category(),
                    });
                }
                Some(_) => {}
                None => {
                    categories.insert(record.query_id(), record.category());
                }
            }
        }

        violations
    }
}

impl FromIterator<BenchmarkRecord> for BenchmarkStore {
    fn from_iter<T: IntoIterator<Item = BenchmarkRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectReason;

    fn row(query_id: &str, exec: f64, query: f64, ret: f64, category: &str) -> ExternalRow {
        ExternalRow {
            query_id: query_id.to_string(),
            database_name: "PostgreSQL".to_string(),
            execution_time_ms: exec,
            query_time_ms: query,
            return_time_ms: ret,
            rows_returned: 10,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_extend_from_skips_non_additive_row() {
        let mut store = BenchmarkStore::new();
        let report = store.extend_from(vec![
            row("Q1", 10.0, 7.0, 3.0, "simple"),
            row("Q2", 10.0, 4.0, 8.0, "simple"),
        ]);

        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(report.rejected[0].row, 1);
        assert!(matches!(
            report.rejected[0].reason,
            RejectReason::Additivity { .. }
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].query_id(), "Q1");
    }

    #[test]
    fn test_extend_from_keeps_order_and_duplicates() {
        let mut store = BenchmarkStore::new();
        store.extend_from(vec![
            row("Q2", 4.0, 2.0, 2.0, "simple"),
            row("Q1", 10.0, 7.0, 3.0, "simple"),
            row("Q2", 6.0, 3.0, 3.0, "simple"),
        ]);

        let ids: Vec<&str> = store.all().iter().map(|r| r.query_id()).collect();
        assert_eq!(ids, vec!["Q2", "Q1", "Q2"]);
    }

    #[test]
    fn test_rejections_convert_to_errors() {
        let mut store = BenchmarkStore::new();
        let report = store.extend_from(vec![row("Q1", -1.0, 0.0, 0.0, "simple")]);
        let errors: Vec<BenchError> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], BenchError::RowRejected(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_validate_clean_store() {
        let mut store = BenchmarkStore::new();
        store.extend_from(vec![
            row("Q1", 10.0, 7.0, 3.0, "simple"),
            row("C1", 50.0, 40.0, 10.0, "complex"),
        ]);
        assert!(store.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_category_conflict() {
        let mut store = BenchmarkStore::new();
        store.extend_from(vec![
            row("Q1", 10.0, 7.0, 3.0, "simple"),
            row("Q1", 50.0, 40.0, 10.0, "complex"),
        ]);
        let violations = store.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0],
            Violation::CategoryConflict {
                query_id: "Q1".to_string(),
                first: QueryCategory::Simple,
                second: QueryCategory::Complex,
            }
        );
    }
}
