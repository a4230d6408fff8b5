//! Scan and report commands - static analysis with debt scoring

use crate::analyzer::StaticAnalyzer;
use crate::config::UserConfig;
use crate::models::{Finding, Severity};
use crate::scoring::{Risk, ScanReport, ScanSummary, Status};
use anyhow::{Context, Result};
use console::style;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Run a static scan. `full` includes every finding (the `report` command).
pub fn run(
    path: &Path,
    format: &str,
    config: &UserConfig,
    full: bool,
    output: Option<&Path>,
) -> Result<Status> {
    let analyzer = StaticAnalyzer::new().respect_ignore_files(config.respect_ignore_files());

    let analysis = match analyzer.analyze(path) {
        Ok(analysis) => analysis,
        Err(e) => {
            let rendered = if format == "json" {
                serde_json::to_string_pretty(&serde_json::json!({
                    "status": Status::Error,
                    "error": e.to_string(),
                }))?
            } else {
                format!("{} {}\n", style("✗").red().bold(), e)
            };
            emit(&rendered, output)?;
            return Ok(Status::Error);
        }
    };

    let report = ScanReport::from_analysis(analysis);
    info!(
        "Scan complete: {} files, score {} ({})",
        report.summary.files_scanned, report.summary.tech_debt_score, report.summary.risk_level
    );

    let rendered = match (format, full) {
        ("json", true) => serde_json::to_string_pretty(&report)?,
        ("json", false) => serde_json::to_string_pretty(&report.summary)?,
        (_, true) => render_report(path, &report),
        (_, false) => render_summary(path, &report.summary),
    };
    emit(&rendered, output)?;
    Ok(report.summary.status)
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(file) => {
            std::fs::write(file, rendered)
                .with_context(|| format!("Failed to write report to {}", file.display()))?;
            eprintln!("{} Report written to {}", style("✓").green(), style(file.display()).cyan());
        }
        None => println!("{}", rendered.trim_end()),
    }
    Ok(())
}

fn risk_style(risk: Risk) -> console::StyledObject<&'static str> {
    match risk {
        Risk::High => style(risk.as_str()).red().bold(),
        Risk::Medium => style(risk.as_str()).yellow().bold(),
        Risk::Low => style(risk.as_str()).cyan(),
        Risk::Minimal => style(risk.as_str()).green(),
    }
}

fn severity_style(severity: Severity) -> console::StyledObject<&'static str> {
    match severity {
        Severity::High => style(severity.as_str()).red(),
        Severity::Medium => style(severity.as_str()).yellow(),
        Severity::Low => style(severity.as_str()).dim(),
    }
}

fn render_summary(path: &Path, summary: &ScanSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{} {}\n", style("repoqa scan").bold(), style(path.display()).cyan());
    let _ = writeln!(out, "  Files scanned    {}", summary.files_scanned);
    let _ = writeln!(
        out,
        "  Tech debt score  {} ({})",
        style(summary.tech_debt_score).bold(),
        risk_style(summary.risk_level)
    );
    let _ = writeln!(out, "  Findings         {}", summary.total_findings);
    let _ = writeln!(out, "    {:<7} {}", severity_style(Severity::High), summary.high_severity_issues);
    let _ = writeln!(out, "    {:<7} {}", severity_style(Severity::Medium), summary.medium_severity_issues);
    let _ = writeln!(out, "    {:<7} {}", severity_style(Severity::Low), summary.low_severity_issues);
    out
}

fn render_report(path: &Path, report: &ScanReport) -> String {
    let mut out = render_summary(path, &report.summary);
    if report.findings.is_empty() {
        let _ = writeln!(out, "\n{} No findings", style("✓").green());
        return out;
    }

    let _ = writeln!(out, "\n{}", style("Findings").bold().underlined());
    let mut current_file: Option<&str> = None;
    for finding in &report.findings {
        if current_file != Some(finding.file.as_str()) {
            let _ = writeln!(out, "\n  {}", style(&finding.file).cyan());
            current_file = Some(finding.file.as_str());
        }
        let _ = writeln!(out, "    {}", finding_line(finding));
    }

    if !report.diagnostics.is_empty() {
        let _ = writeln!(out, "\n{} {} file(s) could not be read", style("!").yellow(), report.diagnostics.len());
    }
    out
}

fn finding_line(finding: &Finding) -> String {
    match &finding.details {
        Some(details) => format!("[{}] {}: {}", severity_style(finding.severity), finding.kind, details),
        None => format!("[{}] {}", severity_style(finding.severity), finding.kind),
    }
}
