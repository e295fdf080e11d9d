use crate::catalog::QueryCategory;
use crate::error::{BenchError, Result};
use crate::record::BenchmarkRecord;
use crate::store::BenchmarkStore;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// query_id -> database_name -> value
pub type QueryDatabaseMap = BTreeMap<String, BTreeMap<String, f64>>;

/// Averaged execution time per query and database.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub rows: QueryDatabaseMap,
}

impl ComparisonTable {
    pub fn get(&self, query_id: &str, database_name: &str) -> Option<f64> {
        self.rows.get(query_id)?.get(database_name).copied()
    }

    pub fn queries(&self) -> Vec<&str> {
        self.rows.keys().map(String::as_str).collect()
    }

    pub fn databases(&self) -> Vec<&str> {
        column_names(&self.rows)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.values().flat_map(|row| row.values().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Share of execution time spent returning results, for one query on one database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioPoint {
    pub query_id: String,
    pub database_name: String,
    pub ratio: f64,
}

/// Min-max normalized execution times for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapMatrix {
    pub category: QueryCategory,
    pub cells: QueryDatabaseMap,
    /// The averaged times that map to 0 and 1.
    pub min_ms: f64,
    pub max_ms: f64,
}

impl HeatmapMatrix {
    pub fn get(&self, query_id: &str, database_name: &str) -> Option<f64> {
        self.cells.get(query_id)?.get(database_name).copied()
    }

    pub fn queries(&self) -> Vec<&str> {
        self.cells.keys().map(String::as_str).collect()
    }

    pub fn databases(&self) -> Vec<&str> {
        column_names(&self.cells)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Session-wide overview printed after every report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_records: usize,
    pub categories: Vec<QueryCategory>,
    pub databases: Vec<String>,
    pub mean_execution_ms: f64,
    /// Ascending.
    pub mean_by_database: Vec<(String, f64)>,
    pub fastest: BenchmarkRecord,
    pub slowest: BenchmarkRecord,
    /// Descending.
    pub return_ratio_by_database: Vec<(String, f64)>,
    /// Number of queries each database ranked first on, descending.
    pub wins: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Pure, read-only derivations over a snapshot of benchmark records.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    records: &'a [BenchmarkRecord],
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a BenchmarkStore) -> Self {
        Self {
            records: store.all(),
        }
    }

    pub fn from_records(records: &'a [BenchmarkRecord]) -> Self {
        Self { records }
    }

    fn pair_records<'s>(
        &'s self,
        query_id: &'s str,
        database_name: &'s str,
    ) -> impl Iterator<Item = &'a BenchmarkRecord> + 's {
        self.records
            .iter()
            .filter(move |r| r.query_id() == query_id && r.database_name() == database_name)
    }

    /// Mean of `value` per (query, database) over the records accepted by `filter`.
    fn pair_means<F, V>(&self, filter: F, value: V) -> QueryDatabaseMap
    where
        F: Fn(&BenchmarkRecord) -> bool,
        V: Fn(&BenchmarkRecord) -> f64,
    {
        let mut acc: BTreeMap<&str, BTreeMap<&str, Mean>> = BTreeMap::new();
        for record in self.records.iter().filter(|r| filter(*r)) {
            acc.entry(record.query_id())
                .or_default()
                .entry(record.database_name())
                .or_default()
                .add(value(record));
        }

        acc.into_iter()
            .map(|(query, row)| {
                let row = row
                    .into_iter()
                    .map(|(db, mean)| (db.to_string(), mean.value()))
                    .collect();
                (query.to_string(), row)
            })
            .collect()
    }

    /// Mean execution time across every trial of a (query, database) pair.
    pub fn average_by(&self, query_id: &str, database_name: &str) -> Result<f64> {
        let mut mean = Mean::default();
        for record in self.pair_records(query_id, database_name) {
            mean.add(record.execution_time_ms());
        }
        if mean.count == 0 {
            return Err(no_data(query_id, database_name));
        }
        Ok(mean.value())
    }

    pub fn comparison_table(&self, category: QueryCategory) -> ComparisonTable {
        self.comparison_table_any(&[category])
    }

    /// Comparison table over records in any of `categories`.
    pub fn comparison_table_any(&self, categories: &[QueryCategory]) -> ComparisonTable {
        ComparisonTable {
            rows: self.pair_means(
                |r| categories.contains(&r.category()),
                BenchmarkRecord::execution_time_ms,
            ),
        }
    }

    /// Averaged return time over averaged execution time, in [0, 1].
    pub fn return_time_ratio(&self, query_id: &str, database_name: &str) -> Result<f64> {
        let mut execution = Mean::default();
        let mut returned = Mean::default();
        for record in self.pair_records(query_id, database_name) {
            execution.add(record.execution_time_ms());
            returned.add(record.return_time_ms());
        }

        if execution.count == 0 || execution.value() <= 0.0 {
            return Err(no_data(query_id, database_name));
        }
        Ok((returned.value() / execution.value()).clamp(0.0, 1.0))
    }

    /// Every defined return-time ratio in a category, by query then database.
    pub fn return_ratio_series(&self, category: QueryCategory) -> Vec<RatioPoint> {
        let table = self.comparison_table(category);
        let mut points = Vec::new();
        for (query_id, row) in &table.rows {
            for database_name in row.keys() {
                if let Ok(ratio) = self.return_time_ratio(query_id, database_name) {
                    points.push(RatioPoint {
                        query_id: query_id.clone(),
                        database_name: database_name.clone(),
                        ratio,
                    });
                }
            }
        }
        points
    }

    /// Execution times of one category, min-max normalized across all of its
    /// (query, database) pairs. A single distinct value maps everything to 0.
    pub fn heatmap_matrix(&self, category: QueryCategory) -> HeatmapMatrix {
        let table = self.comparison_table(category);
        let (min_ms, max_ms) = bounds(table.values()).unwrap_or((0.0, 0.0));

        let cells = table
            .rows
            .into_iter()
            .map(|(query, row)| {
                let row = row
                    .into_iter()
                    .map(|(db, ms)| (db, normalize(ms, min_ms, max_ms)))
                    .collect();
                (query, row)
            })
            .collect();

        HeatmapMatrix {
            category,
            cells,
            min_ms,
            max_ms,
        }
    }

    /// Databases for one query, fastest first; ties in name order.
    pub fn ranking(&self, query_id: &str) -> Result<Vec<(String, f64)>> {
        let means = self.pair_means(|r| r.query_id() == query_id, BenchmarkRecord::execution_time_ms);
        let row = means
            .into_iter()
            .next()
            .map(|(_, row)| row)
            .ok_or_else(|| BenchError::NoData(format!("query {}", query_id)))?;

        Ok(sorted_ascending(row.into_iter().collect()))
    }

    /// Mean of this database's per-query min-max normalized execution time.
    /// Lower is better.
    pub fn overall_score(&self, database_name: &str) -> Result<f64> {
        let means = self.pair_means(|_| true, BenchmarkRecord::execution_time_ms);
        overall_score_in(&means, database_name)
            .ok_or_else(|| BenchError::NoData(format!("database {}", database_name)))
    }

    /// Every measured database with its overall score, best first.
    pub fn overall_ranking(&self) -> Vec<(String, f64)> {
        let means = self.pair_means(|_| true, BenchmarkRecord::execution_time_ms);
        let scores = column_names(&means)
            .into_iter()
            .filter_map(|db| overall_score_in(&means, db).map(|score| (db.to_string(), score)))
            .collect();
        sorted_ascending(scores)
    }

    /// Mean execution time per database and category.
    pub fn category_averages(&self) -> BTreeMap<String, BTreeMap<QueryCategory, f64>> {
        let mut acc: BTreeMap<&str, BTreeMap<QueryCategory, Mean>> = BTreeMap::new();
        for record in self.records {
            acc.entry(record.database_name())
                .or_default()
                .entry(record.category())
                .or_default()
                .add(record.execution_time_ms());
        }

        acc.into_iter()
            .map(|(db, row)| {
                let row = row.into_iter().map(|(c, mean)| (c, mean.value())).collect();
                (db.to_string(), row)
            })
            .collect()
    }

    /// `None` when there are no records.
    pub fn summary(&self) -> Option<Summary> {
        let fastest = self
            .records
            .iter()
            .min_by(|a, b| a.execution_time_ms().total_cmp(&b.execution_time_ms()))?;
        let slowest = self
            .records
            .iter()
            .max_by(|a, b| a.execution_time_ms().total_cmp(&b.execution_time_ms()))?;

        let categories: BTreeSet<QueryCategory> =
            self.records.iter().map(BenchmarkRecord::category).collect();

        let mut overall = Mean::default();
        let mut by_db: BTreeMap<&str, (Mean, Mean)> = BTreeMap::new();
        for record in self.records {
            overall.add(record.execution_time_ms());
            let (execution, returned) = by_db.entry(record.database_name()).or_default();
            execution.add(record.execution_time_ms());
            returned.add(record.return_time_ms());
        }

        let mean_by_database = sorted_ascending(
            by_db
                .iter()
                .map(|(db, (execution, _))| (db.to_string(), execution.value()))
                .collect(),
        );

        let mut return_ratio_by_database: Vec<(String, f64)> = by_db
            .iter()
            .filter(|(_, (execution, _))| execution.value() > 0.0)
            .map(|(db, (execution, returned))| {
                (
                    db.to_string(),
                    (returned.value() / execution.value()).clamp(0.0, 1.0),
                )
            })
            .collect();
        return_ratio_by_database.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let query_ids: BTreeSet<&str> = self.records.iter().map(BenchmarkRecord::query_id).collect();
        let mut win_counts: BTreeMap<String, usize> = BTreeMap::new();
        for query_id in query_ids {
            if let Some((winner, _)) = self.ranking(query_id).ok().and_then(|r| r.into_iter().next()) {
                *win_counts.entry(winner).or_default() += 1;
            }
        }
        let mut wins: Vec<(String, usize)> = win_counts.into_iter().collect();
        wins.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Some(Summary {
            total_records: self.records.len(),
            categories: categories.into_iter().collect(),
            databases: by_db.keys().map(|db| db.to_string()).collect(),
            mean_execution_ms: overall.value(),
            mean_by_database,
            fastest: fastest.clone(),
            slowest: slowest.clone(),
            return_ratio_by_database,
            wins,
        })
    }
}

fn no_data(query_id: &str, database_name: &str) -> BenchError {
    BenchError::NoData(format!("query {} on {}", query_id, database_name))
}

fn column_names(map: &QueryDatabaseMap) -> Vec<&str> {
    let names: BTreeSet<&str> = map
        .values()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    names.into_iter().collect()
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

fn sorted_ascending(mut entries: Vec<(String, f64)>) -> Vec<(String, f64)> {
    entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

fn overall_score_in(means: &QueryDatabaseMap, database_name: &str) -> Option<f64> {
    let mut score = Mean::default();
    for row in means.values() {
        let Some(&ms) = row.get(database_name) else {
            continue;
        };
        let (min, max) = bounds(row.values().copied())?;
        score.add(normalize(ms, min, max));
    }
    (score.count > 0).then(|| score.value())
}
