pub mod aggregate;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod error;
pub mod profile;
pub mod record;
pub mod render;
pub mod report;
pub mod scale;
pub mod store;
pub mod tabular;
pub mod timing;

pub use aggregate::Aggregator;
pub use chart::{ChartDataset, ChartKind, ChartRenderer};
pub use config::SessionConfig;
pub use error::{BenchError, Result};
pub use record::{BenchmarkRecord, ExternalRow};
pub use store::BenchmarkStore;
pub use timing::TimingModel;
