//! What each chart needs from the aggregation layer.
//!
//! Renderers only see `ChartDataset`s, so a static-image exporter and a
//! dashboard feed draw from exactly the same numbers.

use crate::aggregate::{Aggregator, ComparisonTable, HeatmapMatrix, RatioPoint};
use crate::catalog::QueryCategory;
use anyhow::Result;
use serde::Serialize;
use tracing::info;

/// The six report charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    SimpleQueries,
    ComplexQueries,
    CrudOperations,
    ReturnTimeRatio,
    PerformanceHeatmap,
    DatabaseComparison,
}

/// Result shape a chart kind consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartShape {
    Table,
    RatioSeries,
    Matrix,
    Ranking,
}

impl ChartKind {
    pub fn all() -> &'static [ChartKind] {
        &[
            ChartKind::SimpleQueries,
            ChartKind::ComplexQueries,
            ChartKind::CrudOperations,
            ChartKind::ReturnTimeRatio,
            ChartKind::PerformanceHeatmap,
            ChartKind::DatabaseComparison,
        ]
    }

    /// Output file name without extension.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ChartKind::SimpleQueries => "simple_query_performance",
            ChartKind::ComplexQueries => "complex_query_performance",
            ChartKind::CrudOperations => "crud_performance",
            ChartKind::ReturnTimeRatio => "return_time_ratio",
            ChartKind::PerformanceHeatmap => "performance_heatmap",
            ChartKind::DatabaseComparison => "database_comparison",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::SimpleQueries => "Simple Query Performance (log scale)",
            ChartKind::ComplexQueries => "Complex Query Performance",
            ChartKind::CrudOperations => "CRUD Operations Performance",
            ChartKind::ReturnTimeRatio => "Return Time Share of Execution Time",
            ChartKind::PerformanceHeatmap => "Normalized Execution Time per Category",
            ChartKind::DatabaseComparison => "Overall Database Score (lower is better)",
        }
    }

    pub fn shape(&self) -> ChartShape {
        match self {
            ChartKind::SimpleQueries | ChartKind::ComplexQueries | ChartKind::CrudOperations => {
                ChartShape::Table
            }
            ChartKind::ReturnTimeRatio => ChartShape::RatioSeries,
            ChartKind::PerformanceHeatmap => ChartShape::Matrix,
            ChartKind::DatabaseComparison => ChartShape::Ranking,
        }
    }

    /// Pull this chart's dataset out of the aggregation layer.
    pub fn dataset(&self, engine: &Aggregator<'_>) -> ChartDataset {
        match self {
            ChartKind::SimpleQueries => {
                ChartDataset::Table(engine.comparison_table(QueryCategory::Simple))
            }
            ChartKind::ComplexQueries => {
                ChartDataset::Table(engine.comparison_table(QueryCategory::Complex))
            }
            ChartKind::CrudOperations => {
                ChartDataset::Table(engine.comparison_table_any(QueryCategory::crud()))
            }
            ChartKind::ReturnTimeRatio => {
                ChartDataset::RatioSeries(engine.return_ratio_series(QueryCategory::Simple))
            }
            ChartKind::PerformanceHeatmap => ChartDataset::Matrix(
                QueryCategory::all()
                    .iter()
                    .map(|&category| engine.heatmap_matrix(category))
                    .filter(|matrix| !matrix.is_empty())
                    .collect(),
            ),
            ChartKind::DatabaseComparison => ChartDataset::Ranking(engine.overall_ranking()),
        }
    }
}

/// Chart-ready data, one variant per `ChartShape`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "data", rename_all = "snake_case")]
pub enum ChartDataset {
    Table(ComparisonTable),
    RatioSeries(Vec<RatioPoint>),
    Matrix(Vec<HeatmapMatrix>),
    Ranking(Vec<(String, f64)>),
}

impl ChartDataset {
    pub fn shape(&self) -> ChartShape {
        match self {
            ChartDataset::Table(_) => ChartShape::Table,
            ChartDataset::RatioSeries(_) => ChartShape::RatioSeries,
            ChartDataset::Matrix(_) => ChartShape::Matrix,
            ChartDataset::Ranking(_) => ChartShape::Ranking,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ChartDataset::Table(table) => table.is_empty(),
            ChartDataset::RatioSeries(points) => points.is_empty(),
            ChartDataset::Matrix(matrices) => matrices.is_empty(),
            ChartDataset::Ranking(entries) => entries.is_empty(),
        }
    }
}

/// A rendering collaborator: turns one chart's dataset into an artifact.
pub trait ChartRenderer {
    /// Render a single chart.
    fn render(&mut self, kind: ChartKind, dataset: &ChartDataset) -> Result<()>;

    /// Get the name of this renderer for display purposes.
    fn renderer_name(&self) -> &'static str;
}

/// Render every chart kind with data; empty datasets are skipped.
/// Returns the kinds that were rendered.
pub fn render_all<R: ChartRenderer + ?Sized>(
    renderer: &mut R,
    engine: &Aggregator<'_>,
) -> Result<Vec<ChartKind>> {
    let mut rendered = Vec::new();
    for &kind in ChartKind::all() {
        let dataset = kind.dataset(engine);
        if dataset.is_empty() {
            info!(chart = kind.file_stem(), "no data, skipping chart");
            continue;
        }
        renderer.render(kind, &dataset)?;
        rendered.push(kind);
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::timing::TimingModel;

    #[derive(Default)]
    struct Recording {
        seen: Vec<(ChartKind, ChartShape)>,
    }

    impl ChartRenderer for Recording {
        fn render(&mut self, kind: ChartKind, dataset: &ChartDataset) -> Result<()> {
            self.seen.push((kind, dataset.shape()));
            Ok(())
        }

        fn renderer_name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn test_datasets_match_declared_shapes() {
        let store = SessionConfig::default()
            .generate(&TimingModel::default())
            .unwrap();
        let engine = Aggregator::new(&store);

        let mut renderer = Recording::default();
        let rendered = render_all(&mut renderer, &engine).unwrap();

        assert_eq!(rendered, ChartKind::all().to_vec());
        for (kind, shape) in renderer.seen {
            assert_eq!(kind.shape(), shape);
        }
    }

    #[test]
    fn test_crud_chart_merges_write_categories() {
        let store = SessionConfig::default()
            .generate(&TimingModel::default())
            .unwrap();
        let engine = Aggregator::new(&store);

        let ChartDataset::Table(table) = ChartKind::CrudOperations.dataset(&engine) else {
            panic!("crud chart must be a table");
        };
        assert_eq!(table.queries(), vec!["D1", "I1", "U1"]);
        assert_eq!(table.get("U1", "InfluxDB"), None);
        assert!(table.get("I1", "InfluxDB").is_some());
    }

    #[test]
    fn test_heatmap_has_one_matrix_per_measured_category() {
        let store = SessionConfig::default()
            .generate(&TimingModel::default())
            .unwrap();
        let engine = Aggregator::new(&store);

        let ChartDataset::Matrix(matrices) = ChartKind::PerformanceHeatmap.dataset(&engine) else {
            panic!("heatmap chart must be a matrix");
        };
        let categories: Vec<QueryCategory> = matrices.iter().map(|m| m.category).collect();
        assert_eq!(categories, QueryCategory::all().to_vec());
    }

    #[test]
    fn test_empty_store_renders_nothing() {
        let store = crate::store::BenchmarkStore::new();
        let mut renderer = Recording::default();
        let rendered = render_all(&mut renderer, &Aggregator::new(&store)).unwrap();
        assert!(rendered.is_empty());
        assert!(renderer.seen.is_empty());
    }

    #[test]
    fn test_file_stems_are_unique() {
        let mut stems: Vec<&str> = ChartKind::all().iter().map(|k| k.file_stem()).collect();
        stems.sort_unstable();
        stems.dedup();
        assert_eq!(stems.len(), 6);
    }
}
