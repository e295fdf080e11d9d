use crate::chart::{ChartDataset, ChartKind, ChartRenderer};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ChartDocument<'a> {
    kind: &'static str,
    title: &'static str,
    #[serde(flatten)]
    dataset: &'a ChartDataset,
}

/// Writes each chart's dataset as a JSON document, for dashboards that
/// draw their own figures.
pub struct JsonRenderer {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonRenderer {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartRenderer for JsonRenderer {
    fn render(&mut self, kind: ChartKind, dataset: &ChartDataset) -> Result<()> {
        let path = self.output_dir.join(format!("{}.json", kind.file_stem()));
        let document = ChartDocument {
            kind: kind.file_stem(),
            title: kind.title(),
            dataset,
        };
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Generated: {}", path.display());
        self.written.push(path);
        Ok(())
    }

    fn renderer_name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::chart::render_all;
    use crate::config::SessionConfig;
    use crate::timing::TimingModel;

    #[test]
    fn test_writes_tagged_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionConfig::default()
            .generate(&TimingModel::default())
            .unwrap();

        let mut renderer = JsonRenderer::new(dir.path()).unwrap();
        render_all(&mut renderer, &Aggregator::new(&store)).unwrap();
        assert_eq!(renderer.written().len(), 6);

        let text =
            std::fs::read_to_string(dir.path().join("database_comparison.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "database_comparison");
        assert_eq!(value["shape"], "ranking");
        assert_eq!(value["data"].as_array().unwrap().len(), 5);

        let text = std::fs::read_to_string(dir.path().join("crud_performance.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["shape"], "table");
        assert!(value["data"]["rows"]["I1"]["InfluxDB"].is_number());
        assert!(value["data"]["rows"]["U1"].get("InfluxDB").is_none());
    }
}
