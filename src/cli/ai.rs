//! AI commands - per-file LLM enrichment across a repository

use crate::ai::ResilientClient;
use crate::analyzer::StaticAnalyzer;
use crate::config::UserConfig;
use crate::orchestrator::{Flavor, FlavorSummary, Orchestrator, RepositoryReport};
use crate::scoring::Status;
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

/// Run one enrichment flavor over `path` and print the report
pub fn run(path: &Path, flavor: Flavor, format: &str, config: &UserConfig) -> Result<Status> {
    let client = Arc::new(ResilientClient::new(
        config.credential_pool(),
        config.client_settings(),
    ));
    let analyzer = StaticAnalyzer::new().respect_ignore_files(config.respect_ignore_files());

    let bar = ProgressBar::new(0);
    bar.set_style(create_bar_style());
    bar.set_message(format!("{} analysis...", flavor));
    let progress = bar.clone();

    let orchestrator = Orchestrator::new(client, analyzer, config.orchestrator_settings())?
        .with_progress(Box::new(move |file, done, total| {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
            progress.set_message(file.to_string());
        }));

    let report = orchestrator.run(path, flavor);
    bar.finish_and_clear();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(path, &report));
    }
    Ok(report.status)
}

/// Create bar progress style
fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

fn render(path: &Path, report: &RepositoryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{} {} {}\n",
        style("repoqa").bold(),
        style(report.flavor).bold(),
        style(path.display()).cyan()
    );

    if let Some(error) = &report.error {
        let _ = writeln!(out, "{} {}", style("✗").red().bold(), error);
        if report.summary.is_none() {
            return out;
        }
    }

    let _ = writeln!(out, "  Files analyzed  {}", report.total_files_analyzed);
    if !report.skipped.is_empty() {
        let _ = writeln!(out, "  Skipped         {}", report.skipped.len());
    }
    if !report.errors.is_empty() {
        let _ = writeln!(out, "  Failed          {}", style(report.errors.len()).red());
    }
    let _ = writeln!(out);

    match &report.summary {
        Some(FlavorSummary::Insight(summary)) => {
            let _ = writeln!(out, "  {} potential issues\n", style(summary.total_insights).bold());
            for file in summary.insights.iter().filter(|f| !f.findings.is_empty()) {
                let _ = writeln!(out, "  {}", style(&file.file).cyan());
                for finding in &file.findings {
                    let _ = writeln!(
                        out,
                        "    [{}] {}{}: {}",
                        finding.severity,
                        finding.kind,
                        line_suffix(finding.line),
                        finding.reasoning
                    );
                }
            }
        }
        Some(FlavorSummary::Defect(summary)) => {
            let _ = writeln!(
                out,
                "  High risk files {}   Average defect score {}\n",
                style(summary.high_risk_files).red().bold(),
                summary.average_defect_score
            );
            for p in &summary.predictions {
                let _ = writeln!(
                    out,
                    "  {:>3}  {:<6} {}",
                    p.prediction.defect_score,
                    p.prediction.severity.as_str(),
                    p.file
                );
                for reason in &p.prediction.risk_reasons {
                    let _ = writeln!(out, "         - {}", style(reason).dim());
                }
            }
        }
        Some(FlavorSummary::Leaks(summary)) => {
            let _ = writeln!(
                out,
                "  {} potential leaks ({} high severity)\n",
                style(summary.total_leaks).bold(),
                summary.high_severity_leaks
            );
            for file in summary.leaks.iter().filter(|f| !f.leaks.is_empty()) {
                let _ = writeln!(out, "  {}", style(&file.file).cyan());
                for leak in &file.leaks {
                    let _ = writeln!(
                        out,
                        "    [{}] {}{}: {}",
                        leak.severity,
                        leak.kind,
                        line_suffix(leak.line),
                        leak.fix
                    );
                }
            }
        }
        Some(FlavorSummary::Refactor(summary)) => {
            if !summary.architecture_recommendations.is_empty() {
                let _ = writeln!(out, "  {}", style("Architecture").bold());
                for rec in &summary.architecture_recommendations {
                    let _ = writeln!(out, "    - {}", rec);
                }
                let _ = writeln!(out);
            }
            for file in &summary.file_recommendations {
                if file.advice.functions.is_empty() && file.advice.code_smells.is_empty() {
                    continue;
                }
                let _ = writeln!(out, "  {}", style(&file.file).cyan());
                for f in &file.advice.functions {
                    let _ = writeln!(out, "    {}{}: {}", f.function, line_suffix(f.line), f.suggestion);
                }
                for smell in &file.advice.code_smells {
                    let _ = writeln!(out, "    smell: {}", smell);
                }
            }
        }
        Some(FlavorSummary::TestGaps(summary)) => {
            let _ = writeln!(out, "  {} test gaps\n", style(summary.total_gaps).bold());
            for analysis in summary.analyses.iter().filter(|a| !a.gaps.is_empty()) {
                let tests = if analysis.existing_tests.is_empty() {
                    "no tests".to_string()
                } else {
                    analysis.existing_tests.join(", ")
                };
                let _ = writeln!(out, "  {} ({})", style(&analysis.file).cyan(), style(tests).dim());
                for gap in &analysis.gaps {
                    let _ = writeln!(out, "    [{}] {}: {}", gap.priority, gap.kind, gap.suggested_test);
                }
            }
        }
        None => {}
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\n  {}", style("Errors").red().bold());
        for failure in &report.errors {
            let _ = writeln!(out, "    {}: {}", failure.file, failure.error);
        }
    }
    out
}

fn line_suffix(line: Option<u32>) -> String {
    line.map(|l| format!(" (line {})", l)).unwrap_or_default()
}
