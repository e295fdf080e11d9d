use crate::catalog::{QueryCategory, QueryCatalog, QueryDefinition};
use crate::error::{BenchError, Result};
use crate::profile::DatabaseProfile;
use crate::record::BenchmarkRecord;
use crate::scale::ScaleProfile;
use crate::store::BenchmarkStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

/// Rows per unit of `base_row_estimate` on scaled queries.
const ROWS_PER_ESTIMATE_UNIT: f64 = 1_000.0;

/// Synthetic cost model: per-category cost per decade of rows, and the noise band.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingModel {
    pub simple_cost_ms: f64,
    pub complex_cost_ms: f64,
    pub write_cost_ms: f64,
    pub noise_min: f64,
    pub noise_max: f64,
}

impl Default for TimingModel {
    fn default() -> Self {
        Self {
            simple_cost_ms: 40.0,
            complex_cost_ms: 120.0,
            write_cost_ms: 60.0,
            noise_min: 0.9,
            noise_max: 1.1,
        }
    }
}

/// One (query, database, trial) unit of synthetic work.
#[derive(Debug, Clone, Copy)]
struct Job {
    query_index: usize,
    db_index: usize,
    trial: usize,
}

impl TimingModel {
    /// Cost coefficients must be finite and positive, and the noise band a
    /// non-empty range of positive factors.
    pub fn validate(&self) -> Result<()> {
        let costs = [
            ("simple_cost_ms", self.simple_cost_ms),
            ("complex_cost_ms", self.complex_cost_ms),
            ("write_cost_ms", self.write_cost_ms),
        ];
        for (field, cost) in costs {
            if !cost.is_finite() || cost <= 0.0 {
                return Err(BenchError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    field, cost
                )));
            }
        }

        if !self.noise_min.is_finite() || !self.noise_max.is_finite() {
            return Err(BenchError::InvalidConfig(
                "noise band must be finite".to_string(),
            ));
        }
        if self.noise_min <= 0.0 || self.noise_min > self.noise_max {
            return Err(BenchError::InvalidConfig(format!(
                "noise band [{}, {}] must satisfy 0 < min <= max",
                self.noise_min, self.noise_max
            )));
        }
        Ok(())
    }

    pub fn cost_coefficient(&self, category: QueryCategory) -> f64 {
        match category {
            QueryCategory::Simple => self.simple_cost_ms,
            QueryCategory::Complex => self.complex_cost_ms,
            QueryCategory::Insert | QueryCategory::Update | QueryCategory::Delete => {
                self.write_cost_ms
            }
        }
    }

    /// Unfloored row estimate for a query at the given scale.
    pub fn scaled_rows(query: &QueryDefinition, scale: &ScaleProfile) -> Result<f64> {
        match &query.table {
            Some(table) => {
                let rows = scale.row_count(table)?;
                Ok(query.base_row_estimate as f64 * rows as f64 / ROWS_PER_ESTIMATE_UNIT)
            }
            None => Ok(query.base_row_estimate as f64),
        }
    }

    /// Rows the query is expected to return, rounded and never less than one.
    pub fn estimated_rows(query: &QueryDefinition, scale: &ScaleProfile) -> Result<u64> {
        let rows = Self::scaled_rows(query, scale)?;
        Ok((rows.round() as u64).max(1))
    }

    /// Noise-free cost of a query before the engine's speed factor.
    /// Strictly increasing in the row count of the query's table.
    pub fn base_time_ms(&self, query: &QueryDefinition, scale: &ScaleProfile) -> Result<f64> {
        let rows = Self::scaled_rows(query, scale)?;
        Ok(self.cost_coefficient(query.category) * (rows + 1.0).log10())
    }

    /// Produce one synthetic record. Identical arguments give identical records.
    pub fn generate(
        &self,
        query: &QueryDefinition,
        db: &DatabaseProfile,
        scale: &ScaleProfile,
        seed: u64,
    ) -> Result<BenchmarkRecord> {
        self.validate()?;
        db.validate()?;

        let estimated_rows = Self::estimated_rows(query, scale)?;
        let base_time = self.base_time_ms(query, scale)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let noise = rng.gen_range(self.noise_min..=self.noise_max);
        let execution_time_ms = base_time * db.relative_speed_factor * noise;

        Ok(BenchmarkRecord::split(
            &query.id,
            &db.name,
            query.category,
            execution_time_ms,
            db.query_vs_return_ratio,
            estimated_rows,
        ))
    }

    /// Generate `trials` records for every supported (query, database) pair, in
    /// catalog order then database order then trial order.
    ///
    /// Each record's seed is derived from `seed` and its coordinates, so the
    /// parallel fan-out produces the same store as a sequential pass.
    pub fn generate_all(
        &self,
        catalog: &QueryCatalog,
        databases: &[DatabaseProfile],
        scale: &ScaleProfile,
        trials: usize,
        seed: u64,
    ) -> Result<BenchmarkStore> {
        if trials == 0 {
            return Err(BenchError::InvalidConfig(
                "trials must be at least 1".to_string(),
            ));
        }
        self.validate()?;

        let mut jobs = Vec::with_capacity(catalog.len() * databases.len() * trials);
        for (query_index, query) in catalog.queries().iter().enumerate() {
            for (db_index, db) in databases.iter().enumerate() {
                if !db.supports(query.category) {
                    debug!(query = %query.id, database = %db.name, category = %query.category, "skipping unsupported pair");
                    continue;
                }
                for trial in 0..trials {
                    jobs.push(Job {
                        query_index,
                        db_index,
                        trial,
                    });
                }
            }
        }

        let records: Vec<BenchmarkRecord> = jobs
            .into_par_iter()
            .map(|job| {
                let query = &catalog.queries()[job.query_index];
                let db = &databases[job.db_index];
                let record = self.generate(query, db, scale, derive_seed(seed, job))?;
                debug!(
                    query = %record.query_id(),
                    database = %record.database_name(),
                    trial = job.trial,
                    execution_ms = record.execution_time_ms(),
                    "generated record"
                );
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            records = records.len(),
            queries = catalog.len(),
            databases = databases.len(),
            trials,
            "synthetic session generated"
        );

        Ok(records.into_iter().collect())
    }
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn derive_seed(seed: u64, job: Job) -> u64 {
    [job.query_index, job.db_index, job.trial]
        .into_iter()
        .fold(mix(seed), |acc, coordinate| mix(acc ^ coordinate as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use proptest::prelude::*;

    fn orders_query(rows_per_thousand: u64, category: QueryCategory) -> QueryDefinition {
        QueryDefinition::scaled("Q1", "orders scan", category, rows_per_thousand, "orders")
    }

    fn category_strategy() -> impl Strategy<Value = QueryCategory> {
        prop::sample::select(QueryCategory::all().to_vec())
    }

    #[test]
    fn test_two_engine_scenario() {
        let catalog = QueryCatalog::new(vec![orders_query(1_000, QueryCategory::Simple)]).unwrap();
        let scale = ScaleProfile::from_pairs(&[("orders", 99_443)]).unwrap();
        let a = DatabaseProfile::new("A", 1.0, 0.8);
        let b = DatabaseProfile::new("B", 0.5, 0.95);
        let model = TimingModel::default();

        let mut store = BenchmarkStore::new();
        for db in [&a, &b] {
            store.append(model.generate(&catalog.queries()[0], db, &scale, 42).unwrap());
        }

        let engine = Aggregator::new(&store);
        let ranking = engine.ranking("Q1").unwrap();
        let names: Vec<&str> = ranking.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);

        for db in ["A", "B"] {
            let ratio = engine.return_time_ratio("Q1", db).unwrap();
            assert!((0.0..=1.0).contains(&ratio));
        }
        assert_eq!(store.all()[0].rows_returned(), 99_443);
    }

    #[test]
    fn test_missing_table_is_invalid_scale() {
        let scale = ScaleProfile::from_pairs(&[("customers", 10)]).unwrap();
        let db = DatabaseProfile::new("A", 1.0, 0.5);
        let err = TimingModel::default()
            .generate(&orders_query(100, QueryCategory::Simple), &db, &scale, 1)
            .unwrap_err();
        assert_eq!(err, BenchError::InvalidScale("orders".to_string()));
    }

    #[test]
    fn test_bad_profile_is_rejected() {
        let scale = ScaleProfile::ecommerce();
        let query = orders_query(100, QueryCategory::Simple);
        let model = TimingModel::default();

        let slow = DatabaseProfile::new("A", 0.0, 0.5);
        assert!(matches!(
            model.generate(&query, &slow, &scale, 1),
            Err(BenchError::InvalidProfile { .. })
        ));
        let lopsided = DatabaseProfile::new("A", 1.0, 1.0);
        assert!(matches!(
            model.generate(&query, &lopsided, &scale, 1),
            Err(BenchError::InvalidProfile { .. })
        ));
    }

    #[test]
    fn test_fixed_queries_ignore_scale_and_floor_at_one() {
        let query = QueryDefinition::fixed("Q2", "per state", QueryCategory::Simple, 27);
        let small = ScaleProfile::from_pairs(&[("orders", 10)]).unwrap();
        assert_eq!(TimingModel::estimated_rows(&query, &small).unwrap(), 27);

        let tiny = orders_query(1, QueryCategory::Simple);
        assert_eq!(TimingModel::estimated_rows(&tiny, &small).unwrap(), 1);
    }

    #[test]
    fn test_estimated_rows_round_to_nearest() {
        let query = orders_query(3, QueryCategory::Simple);
        let scale = ScaleProfile::from_pairs(&[("orders", 500)]).unwrap();
        assert_eq!(TimingModel::scaled_rows(&query, &scale).unwrap(), 1.5);
        assert_eq!(TimingModel::estimated_rows(&query, &scale).unwrap(), 2);

        let scale = ScaleProfile::from_pairs(&[("orders", 1_400)]).unwrap();
        assert_eq!(TimingModel::estimated_rows(&query, &scale).unwrap(), 4);
    }

    #[test]
    fn test_invalid_noise_band_is_rejected() {
        let query = orders_query(100, QueryCategory::Simple);
        let db = DatabaseProfile::new("A", 1.0, 0.5);
        let scale = ScaleProfile::ecommerce();

        let inverted = TimingModel {
            noise_min: 1.2,
            noise_max: 1.0,
            ..TimingModel::default()
        };
        let negative = TimingModel {
            noise_min: -2.0,
            noise_max: -1.0,
            ..TimingModel::default()
        };
        let free = TimingModel {
            write_cost_ms: 0.0,
            ..TimingModel::default()
        };

        for model in [inverted, negative, free] {
            assert!(matches!(model.validate(), Err(BenchError::InvalidConfig(_))));
            assert!(matches!(
                model.generate(&query, &db, &scale, 42),
                Err(BenchError::InvalidConfig(_))
            ));
            assert!(matches!(
                model.generate_all(
                    &QueryCatalog::ecommerce(),
                    &DatabaseProfile::defaults(),
                    &scale,
                    1,
                    42
                ),
                Err(BenchError::InvalidConfig(_))
            ));
        }
        TimingModel::default().validate().unwrap();
    }

    #[test]
    fn test_adjacent_seeds_share_no_records() {
        let catalog = QueryCatalog::ecommerce();
        let databases = DatabaseProfile::defaults();
        let scale = ScaleProfile::ecommerce();
        let model = TimingModel::default();

        let first = model.generate_all(&catalog, &databases, &scale, 3, 42).unwrap();
        let second = model.generate_all(&catalog, &databases, &scale, 3, 43).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.all().iter().zip(second.all()) {
            assert_eq!((a.query_id(), a.database_name()), (b.query_id(), b.database_name()));
            assert_ne!(a.execution_time_ms().to_bits(), b.execution_time_ms().to_bits());
        }
    }

    #[test]
    fn test_job_seeds_are_distinct() {
        let mut seeds = std::collections::HashSet::new();
        for query_index in 0..4 {
            for db_index in 0..4 {
                for trial in [0, 1, 65_536, 65_537] {
                    let job = Job {
                        query_index,
                        db_index,
                        trial,
                    };
                    assert!(seeds.insert(derive_seed(42, job)));
                }
            }
        }
    }

    #[test]
    fn test_heavier_categories_cost_more() {
        let scale = ScaleProfile::ecommerce();
        let model = TimingModel::default();
        let simple = model
            .base_time_ms(&orders_query(300, QueryCategory::Simple), &scale)
            .unwrap();
        for &category in &[
            QueryCategory::Complex,
            QueryCategory::Insert,
            QueryCategory::Update,
            QueryCategory::Delete,
        ] {
            let heavier = model.base_time_ms(&orders_query(300, category), &scale).unwrap();
            assert!(heavier > simple);
        }
    }

    #[test]
    fn test_generate_all_counts_and_skips() {
        let catalog = QueryCatalog::ecommerce();
        let databases = DatabaseProfile::defaults();
        let store = TimingModel::default()
            .generate_all(&catalog, &databases, &ScaleProfile::ecommerce(), 3, 42)
            .unwrap();

        // 16 queries x 5 engines, minus InfluxDB's update and delete, x 3 trials
        assert_eq!(store.len(), (16 * 5 - 2) * 3);
        assert!(!store.all().iter().any(|r| r.database_name() == "InfluxDB"
            && matches!(r.category(), QueryCategory::Update | QueryCategory::Delete)));
        assert!(store.validate().is_empty());
    }

    #[test]
    fn test_generate_all_is_reproducible() {
        let catalog = QueryCatalog::ecommerce();
        let databases = DatabaseProfile::defaults();
        let scale = ScaleProfile::ecommerce();
        let model = TimingModel::default();

        let first = model.generate_all(&catalog, &databases, &scale, 2, 7).unwrap();
        let second = model.generate_all(&catalog, &databases, &scale, 2, 7).unwrap();
        assert_eq!(first.all(), second.all());

        let other = model.generate_all(&catalog, &databases, &scale, 2, 8).unwrap();
        assert_ne!(first.all(), other.all());
    }

    #[test]
    fn test_zero_trials_rejected() {
        let result = TimingModel::default().generate_all(
            &QueryCatalog::ecommerce(),
            &DatabaseProfile::defaults(),
            &ScaleProfile::ecommerce(),
            0,
            42,
        );
        assert!(matches!(result, Err(BenchError::InvalidConfig(_))));
    }

    proptest! {
        #[test]
        fn prop_generate_is_deterministic(
            estimate in 1u64..5_000,
            rows in 1u64..10_000_000,
            speed in 0.01f64..10.0,
            ratio in 0.01f64..0.99,
            seed in any::<u64>(),
            category in category_strategy(),
        ) {
            let query = orders_query(estimate, category);
            let db = DatabaseProfile::new("A", speed, ratio);
            let scale = ScaleProfile::from_pairs(&[("orders", rows)]).unwrap();
            let model = TimingModel::default();

            let first = model.generate(&query, &db, &scale, seed).unwrap();
            let second = model.generate(&query, &db, &scale, seed).unwrap();
            prop_assert_eq!(first.execution_time_ms().to_bits(), second.execution_time_ms().to_bits());
            prop_assert_eq!(first.query_time_ms().to_bits(), second.query_time_ms().to_bits());
            prop_assert_eq!(first.return_time_ms().to_bits(), second.return_time_ms().to_bits());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_generated_times_are_additive(
            estimate in 1u64..5_000,
            rows in 1u64..10_000_000,
            speed in 0.01f64..10.0,
            ratio in 0.01f64..0.99,
            seed in any::<u64>(),
        ) {
            let db = DatabaseProfile::new("A", speed, ratio);
            let scale = ScaleProfile::from_pairs(&[("orders", rows)]).unwrap();
            let record = TimingModel::default()
                .generate(&orders_query(estimate, QueryCategory::Complex), &db, &scale, seed)
                .unwrap();

            let sum = record.query_time_ms() + record.return_time_ms();
            prop_assert!((record.execution_time_ms() - sum).abs() < 1e-6);
            prop_assert!(record.query_time_ms() >= 0.0);
            prop_assert!(record.return_time_ms() >= 0.0);
            let ratio = record.return_ratio().unwrap();
            prop_assert!((0.0..=1.0).contains(&ratio));
        }

        #[test]
        fn prop_noise_stays_in_band(seed in any::<u64>()) {
            let query = QueryDefinition::fixed("Q2", "per state", QueryCategory::Simple, 27);
            let db = DatabaseProfile::new("A", 1.0, 0.5);
            let scale = ScaleProfile::ecommerce();
            let model = TimingModel::default();

            let base = model.base_time_ms(&query, &scale).unwrap();
            let record = model.generate(&query, &db, &scale, seed).unwrap();
            prop_assert!(record.execution_time_ms() >= base * 0.9 - 1e-9);
            prop_assert!(record.execution_time_ms() <= base * 1.1 + 1e-9);
        }

        #[test]
        fn prop_base_time_increases_with_scale(
            estimate in 1u64..5_000,
            rows in 1u64..100_000_000,
            extra in 1u64..1_000_000,
            category in category_strategy(),
        ) {
            let query = orders_query(estimate, category);
            let model = TimingModel::default();
            let smaller = ScaleProfile::from_pairs(&[("orders", rows)]).unwrap();
            let larger = smaller.with_table("orders", rows + extra).unwrap();

            let before = model.base_time_ms(&query, &smaller).unwrap();
            let after = model.base_time_ms(&query, &larger).unwrap();
            prop_assert!(after > before);
        }
    }
}
