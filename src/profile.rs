use crate::catalog::QueryCategory;
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Performance characteristics of one database engine under comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProfile {
    pub name: String,
    /// Multiplier on the base cost; lower is faster.
    pub relative_speed_factor: f64,
    /// Fraction of execution time spent in the query engine, in (0, 1).
    /// The remainder is result transfer.
    pub query_vs_return_ratio: f64,
    /// Categories this engine cannot run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsupported: Vec<QueryCategory>,
}

impl DatabaseProfile {
    pub fn new(name: &str, relative_speed_factor: f64, query_vs_return_ratio: f64) -> Self {
        Self {
            name: name.to_string(),
            relative_speed_factor,
            query_vs_return_ratio,
            unsupported: Vec::new(),
        }
    }

    pub fn with_unsupported(mut self, categories: &[QueryCategory]) -> Self {
        self.unsupported = categories.to_vec();
        self
    }

    pub fn supports(&self, category: QueryCategory) -> bool {
        !self.unsupported.contains(&category)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| BenchError::InvalidProfile {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if !self.relative_speed_factor.is_finite() || self.relative_speed_factor <= 0.0 {
            return Err(invalid(format!(
                "relative_speed_factor must be positive, got {}",
                self.relative_speed_factor
            )));
        }
        if !(self.query_vs_return_ratio > 0.0 && self.query_vs_return_ratio < 1.0) {
            return Err(invalid(format!(
                "query_vs_return_ratio must be in (0, 1), got {}",
                self.query_vs_return_ratio
            )));
        }
        Ok(())
    }

    /// Two relational engines, each with and without indexes, plus a time-series engine.
    pub fn defaults() -> Vec<DatabaseProfile> {
        vec![
            DatabaseProfile::new("PostgreSQL", 1.0, 0.75),
            DatabaseProfile::new("PostgreSQL_indexed", 0.5, 0.75),
            DatabaseProfile::new("DuckDB", 0.375, 0.75),
            DatabaseProfile::new("DuckDB_indexed", 0.35, 0.75),
            DatabaseProfile::new("InfluxDB", 1.25, 0.55)
                .with_unsupported(&[QueryCategory::Update, QueryCategory::Delete]),
        ]
    }
}

/// Validate a list of profiles as a unit: every profile valid and names unique.
pub fn validate_profiles(profiles: &[DatabaseProfile]) -> Result<()> {
    if profiles.is_empty() {
        return Err(BenchError::InvalidProfile {
            name: String::new(),
            reason: "no database profiles configured".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for profile in profiles {
        profile.validate()?;
        if !seen.insert(profile.name.as_str()) {
            return Err(BenchError::InvalidProfile {
                name: profile.name.clone(),
                reason: "duplicate name".to_string(),
            });
        }
    }
    Ok(())
}
