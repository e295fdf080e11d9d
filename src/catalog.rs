use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Query classification, used to pick the cost model and to filter aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Simple,
    Complex,
    Insert,
    Update,
    Delete,
}

impl QueryCategory {
    pub fn all() -> &'static [QueryCategory] {
        &[
            QueryCategory::Simple,
            QueryCategory::Complex,
            QueryCategory::Insert,
            QueryCategory::Update,
            QueryCategory::Delete,
        ]
    }

    /// The write operations, charted together as CRUD.
    pub fn crud() -> &'static [QueryCategory] {
        &[
            QueryCategory::Insert,
            QueryCategory::Update,
            QueryCategory::Delete,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryCategory::Simple => "simple",
            QueryCategory::Complex => "complex",
            QueryCategory::Insert => "insert",
            QueryCategory::Update => "update",
            QueryCategory::Delete => "delete",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            QueryCategory::Insert | QueryCategory::Update | QueryCategory::Delete
        )
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        QueryCategory::all()
            .iter()
            .copied()
            .find(|c| c.name() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

/// A named benchmark query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub id: String,
    pub description: String,
    pub category: QueryCategory,
    /// Fixed result cardinality when `table` is `None`, otherwise rows returned
    /// per 1,000 rows of `table`.
    pub base_row_estimate: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl QueryDefinition {
    pub fn fixed(id: &str, description: &str, category: QueryCategory, rows: u64) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            category,
            base_row_estimate: rows,
            table: None,
        }
    }

    pub fn scaled(
        id: &str,
        description: &str,
        category: QueryCategory,
        rows_per_thousand: u64,
        table: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            category,
            base_row_estimate: rows_per_thousand,
            table: Some(table.to_string()),
        }
    }
}

/// Validated, immutable list of query definitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryCatalog {
    queries: Vec<QueryDefinition>,
}

impl QueryCatalog {
    /// Build a catalog, rejecting the whole list if any entry is invalid.
    pub fn new(queries: Vec<QueryDefinition>) -> Result<Self> {
        if queries.is_empty() {
            return Err(BenchError::InvalidCatalog("catalog is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for query in &queries {
            if query.id.trim().is_empty() {
                return Err(BenchError::InvalidCatalog(
                    "query with empty id".to_string(),
                ));
            }
            if !seen.insert(query.id.as_str()) {
                return Err(BenchError::InvalidCatalog(format!(
                    "duplicate query id '{}'",
                    query.id
                )));
            }
            if let Some(table) = &query.table {
                if query.base_row_estimate == 0 {
                    return Err(BenchError::InvalidCatalog(format!(
                        "query '{}' scales with '{}' but has a zero row estimate",
                        query.id, table
                    )));
                }
            }
        }

        Ok(Self { queries })
    }

    /// The e-commerce workload: eight simple reads, five analytical queries and
    /// one insert, update and delete.
    pub fn ecommerce() -> Self {
        use QueryCategory::*;
        let queries = vec![
            QueryDefinition::scaled("Q1", "Orders within a date range", Simple, 300, "orders"),
            QueryDefinition::fixed("Q2", "Order count per state", Simple, 27),
            QueryDefinition::scaled("Q3", "Orders paid with a given method", Simple, 600, "orders"),
            QueryDefinition::fixed("Q4", "Sales volume per seller", Simple, 3_000),
            QueryDefinition::scaled("Q5", "High-value orders", Simple, 100, "orders"),
            QueryDefinition::fixed("Q6", "Monthly order trend", Simple, 24),
            QueryDefinition::scaled("Q7", "Late deliveries", Simple, 50, "orders"),
            QueryDefinition::fixed("Q8", "Orders grouped by city", Simple, 4_000),
            QueryDefinition::scaled(
                "C1",
                "Customer order details across five joined tables",
                Complex,
                1_000,
                "order_items",
            ),
            QueryDefinition::fixed("C2", "Seller sales ranking and rating", Complex, 3_000),
            QueryDefinition::scaled("C3", "Delivery lead-time analysis", Complex, 800, "orders"),
            QueryDefinition::fixed("C4", "Frequent buyers", Complex, 5_000),
            QueryDefinition::scaled(
                "C5",
                "Payment method versus order value",
                Complex,
                1_000,
                "orders",
            ),
            QueryDefinition::fixed("I1", "Insert a new order", Insert, 1),
            QueryDefinition::fixed("U1", "Update an order status", Update, 1),
            QueryDefinition::fixed("D1", "Delete an order", Delete, 1),
        ];
        Self { queries }
    }

    pub fn queries(&self) -> &[QueryDefinition] {
        &self.queries
    }

    pub fn get(&self, id: &str) -> Option<&QueryDefinition> {
        self.queries.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl Default for QueryCatalog {
    fn default() -> Self {
        Self::ecommerce()
    }
}

impl<'de> Deserialize<'de> for QueryCatalog {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let queries = Vec::<QueryDefinition>::deserialize(deserializer)?;
        QueryCatalog::new(queries).map_err(serde::de::Error::custom)
    }
}
