use crate::catalog::QueryCatalog;
use crate::error::{BenchError, Result};
use crate::profile::{validate_profiles, DatabaseProfile};
use crate::scale::ScaleProfile;
use crate::store::BenchmarkStore;
use crate::timing::TimingModel;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a synthetic session needs, loaded once and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub queries: QueryCatalog,
    pub databases: Vec<DatabaseProfile>,
    pub scale: ScaleProfile,
    /// Records generated per (query, database) pair.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Random seed for reproducibility
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_trials() -> usize {
    3
}

fn default_seed() -> u64 {
    42
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queries: QueryCatalog::ecommerce(),
            databases: DatabaseProfile::defaults(),
            scale: ScaleProfile::ecommerce(),
            trials: default_trials(),
            seed: default_seed(),
        }
    }
}

impl SessionConfig {
    /// Check the whole configuration; the first invalid entry fails it.
    pub fn validate(&self) -> Result<()> {
        validate_profiles(&self.databases)?;

        for query in self.queries.queries() {
            if let Some(table) = &query.table {
                self.scale.row_count(table)?;
            }
        }

        if self.trials == 0 {
            return Err(BenchError::InvalidConfig(
                "trials must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Read, parse and validate a JSON session config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: SessionConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Run the synthetic timing model over every configured pair.
    pub fn generate(&self, model: &TimingModel) -> Result<BenchmarkStore> {
        self.validate()?;
        model.generate_all(
            &self.queries,
            &self.databases,
            &self.scale,
            self.trials,
            self.seed,
        )
    }
}
