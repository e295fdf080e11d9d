use crate::aggregate::{Aggregator, Summary};
use crate::store::{BenchmarkStore, IngestReport};

/// How many rows an ingestion kept and why the others were skipped.
pub fn format_ingest_report(report: &IngestReport) -> String {
    let mut lines = vec![format!("Ingested {} rows", report.accepted)];
    if !report.rejected.is_empty() {
        lines.push(format!("Skipped {} rows:", report.rejected_count()));
        lines.extend(report.rejected.iter().map(|rejected| format!("  {}", rejected)));
    }
    lines.join("\n")
}

pub fn print_ingest_report(report: &IngestReport) {
    println!("\n{}", format_ingest_report(report));
}

/// Print store-level invariant violations, if any.
pub fn print_violations(store: &BenchmarkStore) -> usize {
    let violations = store.validate();
    if !violations.is_empty() {
        println!("\n{} consistency problems:", violations.len());
        for violation in &violations {
            println!("  {}", violation);
        }
    }
    violations.len()
}

pub fn print_results(engine: &Aggregator<'_>) {
    println!("\n{:=<80}", "");
    println!("Benchmark Results");
    println!("{:=<80}\n", "");

    let Some(summary) = engine.summary() else {
        println!("No measurements.");
        return;
    };
    println!("{}", format_summary(&summary));

    println!("\nMean execution time by category (ms)");
    println!("{:-<80}", "");
    let averages = engine.category_averages();
    for (database, by_category) in &averages {
        let cells: Vec<String> = by_category
            .iter()
            .map(|(category, mean)| format!("{}={:.2}", category, mean))
            .collect();
        println!("  {:<20} {}", database, cells.join("  "));
    }

    println!("\nOverall ranking (normalized score, lower is better)");
    println!("{:-<80}", "");
    println!("{}", format_ranking(&engine.overall_ranking()));
    println!();
}

/// Numbered ranking lines, best first.
pub fn format_ranking(ranking: &[(String, f64)]) -> String {
    ranking
        .iter()
        .enumerate()
        .map(|(position, (database, score))| {
            format!("  {:>2}. {:<20} {:>8.3}", position + 1, database, score)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_summary(summary: &Summary) -> String {
    let categories: Vec<String> = summary.categories.iter().map(|c| c.to_string()).collect();
    let mut lines = vec![
        format!("  Records:        {}", summary.total_records),
        format!("  Databases:      {}", summary.databases.join(", ")),
        format!("  Categories:     {}", categories.join(", ")),
        format!("  Mean execution: {:.2} ms", summary.mean_execution_ms),
        format!(
            "  Fastest:        {} on {} ({:.2} ms)",
            summary.fastest.query_id(),
            summary.fastest.database_name(),
            summary.fastest.execution_time_ms()
        ),
        format!(
            "  Slowest:        {} on {} ({:.2} ms)",
            summary.slowest.query_id(),
            summary.slowest.database_name(),
            summary.slowest.execution_time_ms()
        ),
        String::new(),
        format!(
            "  {:<20} {:>12} {:>14} {:>8}",
            "Database", "Mean (ms)", "Return share", "Wins"
        ),
        format!("  {:-<58}", ""),
    ];

    for (database, mean) in &summary.mean_by_database {
        let ratio = summary
            .return_ratio_by_database
            .iter()
            .find(|(name, _)| name == database)
            .map(|(_, ratio)| format!("{:.1}%", ratio * 100.0))
            .unwrap_or_else(|| "-".to_string());
        let wins = summary
            .wins
            .iter()
            .find(|(name, _)| name == database)
            .map_or(0, |(_, wins)| *wins);
        lines.push(format!(
            "  {:<20} {:>12.2} {:>14} {:>8}",
            database, mean, ratio, wins
        ));
    }
    lines.join("\n")
}
