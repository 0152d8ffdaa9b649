//! Console output formatter for annotation reports

use celltype_domain::{ClusterReport, ConsensusResult, FinalReport, ModelComparison, OutputFormat};
use colored::Colorize;

const LABEL_WIDTH: usize = 32;
const MAX_CONFUSIONS: usize = 10;

/// Force colored output on or off for the whole process.
pub fn set_color_enabled(enabled: bool) {
    colored::control::set_override(enabled);
}

/// Formats annotation reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Render the report in the requested format.
    pub fn render(report: &FinalReport, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format_full(report),
            OutputFormat::Summary => Self::format_summary(report),
            OutputFormat::Json => Self::format_json(report),
        }
    }

    /// Summary table plus every oracle's initial answers and the discussion
    /// transcripts.
    pub fn format_full(report: &FinalReport) -> String {
        let mut output = Self::format_summary(report);

        output.push_str(&Self::section_header("Oracle Annotations"));
        for (oracle, prediction) in report.model_annotations().iter() {
            output.push_str(&format!("\n{}\n", format!("── {} ──", oracle).yellow().bold()));
            for cluster in report.clusters() {
                let label = prediction
                    .label(cluster.cluster.as_str())
                    .map_or_else(|| "(no answer)".dimmed().to_string(), |l| display_label(l).to_string());
                output.push_str(&format!("  {:>8}  {}\n", cluster.cluster.as_str(), label));
            }
        }

        if report.model_annotations().len() > 1 {
            output.push_str(&Self::format_comparison(&ModelComparison::from_report(report)));
        }

        let discussed: Vec<&ClusterReport> = report
            .clusters()
            .iter()
            .filter(|c| !c.discussion.is_empty())
            .collect();
        if !discussed.is_empty() {
            output.push_str(&Self::section_header("Discussion"));
            for cluster in discussed {
                output.push_str(&format!(
                    "\n{}\n",
                    format!(
                        "── Cluster {}: {} → {} ──",
                        cluster.cluster,
                        display_label(&cluster.initial.label),
                        display_label(&cluster.consensus.label)
                    )
                    .yellow()
                    .bold()
                ));
                for line in cluster.transcript() {
                    output.push_str(&format!("  {}\n", line));
                }
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Render one report per marker set, each under its own title. JSON
    /// output is an array of `{"set": ..., "report": ...}` objects.
    pub fn render_batch(reports: &[(String, FinalReport)], format: OutputFormat) -> String {
        if format == OutputFormat::Json {
            let sets: Vec<_> = reports
                .iter()
                .map(|(set, report)| serde_json::json!({ "set": set, "report": report }))
                .collect();
            return serde_json::to_string_pretty(&sets).unwrap_or_else(|_| "[]".to_string());
        }

        reports
            .iter()
            .enumerate()
            .map(|(i, (set, report))| {
                format!(
                    "{}\n{}",
                    format!("Set {}: {}", i + 1, set).magenta().bold(),
                    Self::render(report, format)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_comparison(comparison: &ModelComparison) -> String {
        let mut output = Self::section_header("Model Comparison");

        output.push_str(&format!("{}\n", "Agreement with consensus:".bold()));
        for row in &comparison.agreement {
            output.push_str(&format!(
                "  {:<24} {:>3}/{:<3} {:>4.0}%\n",
                row.oracle.as_str(),
                row.agreed,
                row.answered,
                row.rate() * 100.0
            ));
        }

        output.push_str(&format!("\n{}\n", "Pairwise agreement:".bold()));
        for pair in &comparison.pairs {
            output.push_str(&format!(
                "  {:<24} {:>3}/{:<3} {:>4.0}%\n",
                format!("{} / {}", pair.first, pair.second),
                pair.agreed,
                pair.shared,
                pair.rate() * 100.0
            ));
        }

        if !comparison.confusions.is_empty() {
            output.push_str(&format!("\n{}\n", "Frequent disagreements:".bold()));
            for confusion in comparison.confusions.iter().take(MAX_CONFUSIONS) {
                output.push_str(&format!(
                    "  {} → {} ({}x)\n",
                    display_label(&confusion.consensus),
                    display_label(&confusion.predicted),
                    confusion.count
                ));
            }
        }

        output
    }

    /// One row per cluster with agreement, entropy and rounds used.
    pub fn format_summary(report: &FinalReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Cell Type Annotation"));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n\n",
            "Oracles:".cyan().bold(),
            report
                .model_annotations()
                .oracles()
                .map(|o| o.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        output.push_str(&format!(
            "{:>8}  {:<width$}  {:>9}  {:>7}  {:>6}\n",
            "Cluster".bold(),
            "Cell type".bold(),
            "Agreement".bold(),
            "Entropy".bold(),
            "Rounds".bold(),
            width = LABEL_WIDTH
        ));
        output.push_str(&format!("{}\n", "-".repeat(8 + 2 + LABEL_WIDTH + 2 + 9 + 2 + 7 + 2 + 6)));

        for cluster in report.clusters() {
            output.push_str(&Self::row(cluster));
        }

        let controversial = report.controversial_clusters();
        if !controversial.is_empty() {
            output.push_str(&format!(
                "\n{} {}\n",
                "Controversial:".yellow().bold(),
                controversial
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        if !report.oracle_failures().is_empty() {
            output.push_str(&format!("\n{}\n", "Oracle failures:".red().bold()));
            for failure in report.oracle_failures() {
                output.push_str(&format!(
                    "  {} {} ({}): {}\n",
                    "x".red(),
                    failure.oracle,
                    failure.phase,
                    failure.message
                ));
            }
        }

        output
    }

    /// Format as JSON
    pub fn format_json(report: &FinalReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn row(cluster: &ClusterReport) -> String {
        let consensus = &cluster.consensus;
        let label = format!("{:<width$}", display_label(&consensus.label), width = LABEL_WIDTH);
        let label = if consensus.is_unresolved() {
            label.red().to_string()
        } else if cluster.controversial {
            label.yellow().to_string()
        } else {
            label.green().to_string()
        };
        let marker = if cluster.controversial { "*" } else { " " };

        format!(
            "{:>7}{}  {}  {:>9}  {:>7.3}  {:>6}\n",
            cluster.cluster.as_str(),
            marker,
            label,
            agreement(consensus),
            consensus.entropy,
            cluster.rounds_used
        )
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

fn display_label(label: &str) -> &str {
    if label.is_empty() { "(unknown)" } else { label }
}

/// "2/3 (67%)"
fn agreement(result: &ConsensusResult) -> String {
    if result.voters == 0 {
        return "-".to_string();
    }
    let agreeing = (result.proportion * result.voters as f64).round() as usize;
    format!(
        "{}/{} {:>3.0}%",
        agreeing,
        result.voters,
        result.proportion * 100.0
    )
}
