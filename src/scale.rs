use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row counts per logical table of the ingested dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScaleProfile {
    tables: BTreeMap<String, u64>,
}

impl ScaleProfile {
    /// Build a scale profile; every row count must be positive.
    pub fn new(tables: BTreeMap<String, u64>) -> Result<Self> {
        if let Some((name, _)) = tables.iter().find(|(_, &rows)| rows == 0) {
            return Err(BenchError::InvalidScale(format!("{} (row count is zero)", name)));
        }
        Ok(Self { tables })
    }

    pub fn from_pairs(pairs: &[(&str, u64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|(name, rows)| (name.to_string(), *rows))
                .collect(),
        )
    }

    /// Cardinalities of the Brazilian e-commerce dataset the default catalog targets.
    pub fn ecommerce() -> Self {
        let tables = [
            ("orders", 99_441),
            ("customers", 99_441),
            ("sellers", 3_095),
            ("payments", 103_886),
            ("order_items", 112_650),
        ]
        .into_iter()
        .map(|(name, rows)| (name.to_string(), rows))
        .collect();
        Self { tables }
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        self.tables
            .get(table)
            .copied()
            .ok_or_else(|| BenchError::InvalidScale(table.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, u64)> {
        self.tables.iter().map(|(name, rows)| (name.as_str(), *rows))
    }

    /// Copy of this profile with one table's row count replaced.
    pub fn with_table(&self, table: &str, rows: u64) -> Result<Self> {
        let mut tables = self.tables.clone();
        tables.insert(table.to_string(), rows);
        Self::new(tables)
    }
}

impl Default for ScaleProfile {
    fn default() -> Self {
        Self::ecommerce()
    }
}

impl<'de> Deserialize<'de> for ScaleProfile {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tables = BTreeMap::<String, u64>::deserialize(deserializer)?;
        ScaleProfile::new(tables).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_lookup() {
        let scale = ScaleProfile::from_pairs(&[("orders", 99_443)]).unwrap();
        assert_eq!(scale.row_count("orders").unwrap(), 99_443);
        assert_eq!(
            scale.row_count("sellers").unwrap_err(),
            BenchError::InvalidScale("sellers".to_string())
        );
    }

    #[test]
    fn test_zero_rows_rejected() {
        assert!(ScaleProfile::from_pairs(&[("orders", 10), ("sellers", 0)]).is_err());
        assert!(serde_json::from_str::<ScaleProfile>(r#"{"orders": 0}"#).is_err());
    }

    #[test]
    fn test_with_table_replaces() {
        let scale = ScaleProfile::ecommerce().with_table("orders", 5).unwrap();
        assert_eq!(scale.row_count("orders").unwrap(), 5);
        assert_eq!(scale.row_count("sellers").unwrap(), 3_095);
    }
}
