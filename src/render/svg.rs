use crate::aggregate::{ComparisonTable, HeatmapMatrix, RatioPoint};
use crate::chart::{ChartDataset, ChartKind, ChartRenderer};
use anyhow::{Context, Result};
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::Ranged;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// Font sizes
const TITLE_FONT_SIZE: u32 = 40;
const AXIS_LABEL_FONT_SIZE: u32 = 26;
const TICK_LABEL_FONT_SIZE: u32 = 20;
const LEGEND_FONT_SIZE: u32 = 20;
const DATA_LABEL_FONT_SIZE: u32 = 16;

const DEFAULT_MARGIN_BOTTOM: u32 = 55;
const DEFAULT_X_LABEL_AREA_SIZE: u32 = 60;

/// Fallback colors for engines without a fixed color
const PALETTE: &[RGBColor] = &[
    RGBColor(142, 68, 173),
    RGBColor(22, 160, 133),
    RGBColor(127, 140, 141),
    RGBColor(211, 84, 0),
];

fn get_database_color(name: &str, index: usize) -> RGBColor {
    match name {
        "PostgreSQL" => RGBColor(231, 76, 60),
        "PostgreSQL_indexed" => RGBColor(192, 57, 43),
        "DuckDB" => RGBColor(52, 152, 219),
        "DuckDB_indexed" => RGBColor(40, 116, 166),
        "InfluxDB" => RGBColor(243, 156, 18),
        _ => PALETTE[index % PALETTE.len()],
    }
}

/// Green (fast) through yellow to red (slow).
fn heat_color(value: f64) -> RGBColor {
    let lerp = |a: u8, b: u8, t: f64| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    let v = value.clamp(0.0, 1.0);
    if v < 0.5 {
        let t = v * 2.0;
        RGBColor(lerp(46, 241, t), lerp(204, 196, t), lerp(113, 15, t))
    } else {
        let t = (v - 0.5) * 2.0;
        RGBColor(lerp(241, 231, t), lerp(196, 76, t), lerp(15, 60, t))
    }
}

/// Format latency for display
fn format_latency(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.1}s", ms / 1000.0)
    } else if ms >= 1.0 {
        format!("{:.0}ms", ms)
    } else {
        format!("{:.2}ms", ms)
    }
}

fn format_log_latency_tick(ms: f64) -> String {
    if ms <= 0.0 {
        return String::new();
    }
    // Only label powers of 10 on log axes (keeps SVGs readable).
    let log10 = ms.log10();
    let nearest = log10.round();
    if (log10 - nearest).abs() < 1e-6 {
        format_latency(ms)
    } else {
        String::new()
    }
}

/// Label for the integer slot nearest to `x`, if `x` sits on it.
fn slot_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() >= 0.3 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Writes one SVG file per chart into an output directory.
pub struct SvgRenderer {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl SvgRenderer {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    /// Files written so far, in render order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn path_for(&self, kind: ChartKind) -> PathBuf {
        self.output_dir.join(format!("{}.svg", kind.file_stem()))
    }
}

impl ChartRenderer for SvgRenderer {
    fn render(&mut self, kind: ChartKind, dataset: &ChartDataset) -> Result<()> {
        let path = self.path_for(kind);
        match dataset {
            ChartDataset::Table(table) => draw_table(
                &path,
                kind.title(),
                table,
                kind == ChartKind::SimpleQueries,
            )?,
            ChartDataset::RatioSeries(points) => draw_ratio_series(&path, kind.title(), points)?,
            ChartDataset::Matrix(matrices) => draw_heatmap(&path, kind.title(), matrices)?,
            ChartDataset::Ranking(entries) => draw_ranking(&path, kind.title(), entries)?,
        }
        println!("Generated: {}", path.display());
        self.written.push(path);
        Ok(())
    }

    fn renderer_name(&self) -> &'static str {
        "svg"
    }
}

/// Grouped bars, one group per query. The simple-query chart spans orders of
/// magnitude and uses a log-scale y axis.
fn draw_table(path: &Path, title: &str, table: &ComparisonTable, log_scale: bool) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 650)).into_drawing_area();
    root.fill(&WHITE)?;

    let queries: Vec<String> = table.queries().iter().map(|q| q.to_string()).collect();
    let num_queries = queries.len();
    let x_range = -0.5..(num_queries as f64 - 0.5);

    let mut builder = ChartBuilder::on(&root);
    builder
        .caption(title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90);

    if log_scale {
        let min_time = table
            .values()
            .filter(|&v| v > 0.0)
            .fold(f64::MAX, |a, b| a.min(b))
            .min(1.0)
            * 0.5;
        let max_time = table.values().fold(0.0_f64, |a, b| a.max(b)).max(min_time * 10.0) * 2.0;

        let mut chart = builder.build_cartesian_2d(x_range, (min_time..max_time).log_scale())?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(num_queries)
            .x_label_formatter(&|x| slot_label(&queries, *x))
            .y_labels(8)
            .y_label_formatter(&|y| format_log_latency_tick(*y))
            .y_desc("Execution Time")
            .x_desc("Query")
            .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
            .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
            .draw()?;
        draw_grouped_bars(&mut chart, table, &queries, min_time, max_time)?;
    } else {
        let max_time = (table.values().fold(0.0_f64, |a, b| a.max(b)) * 1.25).max(1.0);

        let mut chart = builder.build_cartesian_2d(x_range, 0.0..max_time)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(num_queries)
            .x_label_formatter(&|x| slot_label(&queries, *x))
            .y_labels(8)
            .y_label_formatter(&|y| format_latency(*y))
            .y_desc("Execution Time")
            .x_desc("Query")
            .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
            .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
            .draw()?;
        draw_grouped_bars(&mut chart, table, &queries, 0.0, max_time)?;
    }

    root.present()?;
    Ok(())
}

/// Horizontal extent of bar `member` of `members` within group `slot`.
fn bar_span(slot: usize, member: usize, members: usize) -> (f64, f64) {
    let group_width = 0.8;
    let members = members.max(1) as f64;
    let bar_width = group_width / members;
    let x_center = slot as f64 + (member as f64 - (members - 1.0) / 2.0) * bar_width;
    (x_center - bar_width / 2.0 + 0.01, x_center + bar_width / 2.0 - 0.01)
}

/// Bars rise from `baseline`; non-positive times are left out since a log
/// axis cannot place them.
fn draw_grouped_bars<'a, Y>(
    chart: &mut ChartContext<'a, SVGBackend<'a>, Cartesian2d<RangedCoordf64, Y>>,
    table: &ComparisonTable,
    queries: &[String],
    baseline: f64,
    legend_y: f64,
) -> Result<()>
where
    Y: Ranged<ValueType = f64>,
{
    let databases = table.databases();

    for (db_idx, db) in databases.iter().enumerate() {
        let color = get_database_color(db, db_idx);

        for (query_idx, query) in queries.iter().enumerate() {
            let Some(time) = table.get(query, db) else { continue };
            if time <= 0.0 {
                continue;
            }

            let (x_left, x_right) = bar_span(query_idx, db_idx, databases.len());
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x_left, baseline), (x_right, time)],
                color.filled(),
            )))?;
        }

        chart
            .draw_series(std::iter::once(Circle::new(
                (queries.len() as f64 - 1.0, legend_y),
                0,
                color.filled(),
            )))?
            .label(*db)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;
    Ok(())
}

/// Grouped bars of return-time share in percent.
fn draw_ratio_series(path: &Path, title: &str, points: &[RatioPoint]) -> Result<()> {
    let root = SVGBackend::new(path, (1200, 650)).into_drawing_area();
    root.fill(&WHITE)?;

    let queries: Vec<String> = points
        .iter()
        .map(|p| p.query_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let databases: Vec<String> = points
        .iter()
        .map(|p| p.database_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let num_queries = queries.len();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..(num_queries as f64 - 0.5), 0.0..110.0)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_queries)
        .x_label_formatter(&|x| slot_label(&queries, *x))
        .y_label_formatter(&|y| format!("{:.0}%", y))
        .y_desc("Return Time Share")
        .x_desc("Query")
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    for (db_idx, db) in databases.iter().enumerate() {
        let color = get_database_color(db, db_idx);

        for point in points.iter().filter(|p| &p.database_name == db) {
            let Some(query_idx) = queries.iter().position(|q| *q == point.query_id) else {
                continue;
            };

            let (x_left, x_right) = bar_span(query_idx, db_idx, databases.len());

            chart.draw_series(std::iter::once(Rectangle::new(
                [(x_left, 0.0), (x_right, point.ratio * 100.0)],
                color.filled(),
            )))?;
        }

        let legend_color = color;
        chart
            .draw_series(std::iter::once(Circle::new(
                (num_queries as f64 - 1.0, 110.0),
                0,
                color.filled(),
            )))?
            .label(db.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 20, y + 5)], legend_color.filled())
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Colored cell grid; rows are (category, query), columns are databases.
fn draw_heatmap(path: &Path, title: &str, matrices: &[HeatmapMatrix]) -> Result<()> {
    let rows: Vec<(String, &HeatmapMatrix, String)> = matrices
        .iter()
        .flat_map(|m| {
            m.queries()
                .into_iter()
                .map(move |q| (format!("{}/{}", m.category, q), m, q.to_string()))
        })
        .collect();
    let databases: Vec<String> = matrices
        .iter()
        .flat_map(|m| m.databases())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let row_labels: Vec<String> = rows.iter().map(|(label, _, _)| label.clone()).collect();

    let num_rows = rows.len();
    let num_databases = databases.len();
    let height = (200 + num_rows as u32 * 36).max(600);

    let root = SVGBackend::new(path, (1200, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(160)
        .build_cartesian_2d(
            -0.5..(num_databases as f64 - 0.5),
            -0.5..(num_rows as f64 - 0.5),
        )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(num_databases)
        .x_label_formatter(&|x| slot_label(&databases, *x))
        .y_labels(num_rows)
        .y_label_formatter(&|y| slot_label(&row_labels, *y))
        .x_desc("Database")
        .y_desc("Query")
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    for (row_idx, (_, matrix, query)) in rows.iter().enumerate() {
        for (db_idx, db) in databases.iter().enumerate() {
            let Some(value) = matrix.get(query, db) else { continue };

            let x = db_idx as f64;
            let y = row_idx as f64;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                heat_color(value).filled(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.2}", value),
                (x, y),
                ("sans-serif", DATA_LABEL_FONT_SIZE)
                    .into_font()
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Center, VPos::Center)),
            )))?;
        }
    }

    root.present()?;
    Ok(())
}

/// One bar per database with its overall score.
fn draw_ranking(path: &Path, title: &str, entries: &[(String, f64)]) -> Result<()> {
    let root = SVGBackend::new(path, (1000, 550)).into_drawing_area();
    root.fill(&WHITE)?;

    let names: Vec<String> = entries.iter().map(|(name, _)| name.clone()).collect();
    let num_databases = names.len();
    let max_score = 1.15;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..(num_databases as f64 - 0.5), 0.0..max_score)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_databases)
        .x_label_formatter(&|x| slot_label(&names, *x))
        .y_desc("Normalized Score")
        .x_desc("Database")
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    let bar_width = 0.6;

    for (idx, (name, score)) in entries.iter().enumerate() {
        let color = get_database_color(name, idx);
        let x_center = idx as f64;
        let x_left = x_center - bar_width / 2.0;
        let x_right = x_center + bar_width / 2.0;

        chart.draw_series(std::iter::once(Rectangle::new(
            [(x_left, 0.0), (x_right, *score)],
            color.filled(),
        )))?;

        // Add value label on top of bar
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.3}", score),
            (x_center, *score + max_score * 0.02),
            ("sans-serif", DATA_LABEL_FONT_SIZE + 2)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Bottom)),
        )))?;
    }

    root.present()?;
    Ok(())
}
