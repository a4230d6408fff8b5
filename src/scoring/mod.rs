//! Technical debt scoring
//!
//! Reduces a set of static findings to a single number and a risk tier.
//!
//! # Scoring Formula
//!
//! ```text
//! score = Σ weight(severity) + total_findings
//!
//! weight(HIGH) = 10, weight(MEDIUM) = 5, weight(LOW) = 2
//! ```
//!
//! | score      | risk    |
//! |------------|---------|
//! | > 100      | HIGH    |
//! | > 50       | MEDIUM  |
//! | > 20       | LOW     |
//! | otherwise  | MINIMAL |
//!
//! # Example
//!
//! One empty catch block (HIGH) and two LOW findings:
//! `10 + 2 + 2 + 3 = 17`, which stays MINIMAL; the LOW tier starts above 20.

use crate::analyzer::StaticAnalysis;
use crate::models::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier derived from a debt score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Risk {
    Minimal,
    Low,
    Medium,
    High,
}

impl Risk {
    pub fn from_score(score: u32) -> Self {
        if score > 100 {
            Risk::High
        } else if score > 50 {
            Risk::Medium
        } else if score > 20 {
            Risk::Low
        } else {
            Risk::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Risk::High => "HIGH",
            Risk::Medium => "MEDIUM",
            Risk::Low => "LOW",
            Risk::Minimal => "MINIMAL",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debt score for a set of findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtReport {
    pub total_findings: usize,
    pub score: u32,
    pub risk: Risk,
    pub high_severity: usize,
    pub medium_severity: usize,
    pub low_severity: usize,
}

impl DebtReport {
    /// Score a finding sequence. Pure; order does not matter.
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut high = 0;
        let mut medium = 0;
        let mut low = 0;
        let mut weighted: u32 = 0;

        for finding in findings {
            match finding.severity {
                Severity::High => high += 1,
                Severity::Medium => medium += 1,
                Severity::Low => low += 1,
            }
            weighted = weighted.saturating_add(finding.severity.weight());
        }

        let total = findings.len();
        let score = weighted.saturating_add(u32::try_from(total).unwrap_or(u32::MAX));

        Self {
            total_findings: total,
            score,
            risk: Risk::from_score(score),
            high_severity: high,
            medium_severity: medium,
            low_severity: low,
        }
    }
}

/// Run status shared by every command result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Completed,
    Error,
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error)
    }
}

/// Headline numbers of a static scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub status: Status,
    pub files_scanned: usize,
    pub tech_debt_score: u32,
    pub risk_level: Risk,
    pub total_findings: usize,
    pub high_severity_issues: usize,
    pub medium_severity_issues: usize,
    pub low_severity_issues: usize,
}

impl ScanSummary {
    pub fn new(files_scanned: usize, debt: &DebtReport) -> Self {
        Self {
            status: Status::Completed,
            files_scanned,
            tech_debt_score: debt.score,
            risk_level: debt.risk,
            total_findings: debt.total_findings,
            high_severity_issues: debt.high_severity,
            medium_severity_issues: debt.medium_severity,
            low_severity_issues: debt.low_severity,
        }
    }
}

/// Full static report: summary, every finding and the debt breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    #[serde(flatten)]
    pub summary: ScanSummary,
    pub findings: Vec<Finding>,
    pub tech_debt: DebtReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl ScanReport {
    pub fn from_analysis(analysis: StaticAnalysis) -> Self {
        let tech_debt = DebtReport::from_findings(&analysis.findings);
        Self {
            summary: ScanSummary::new(analysis.files_scanned, &tech_debt),
            findings: analysis.findings,
            tech_debt,
            diagnostics: analysis.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FindingKind;

    fn finding(kind: FindingKind) -> Finding {
        Finding::new("a.java", kind)
    }

    #[test]
    fn test_empty_findings() {
        let report = DebtReport::from_findings(&[]);
        assert_eq!(report.total_findings, 0);
        assert_eq!(report.score, 0);
        assert_eq!(report.risk, Risk::Minimal);
    }

    #[test]
    fn test_mixed_findings_score() {
        let findings = vec![
            finding(FindingKind::EmptyCatchBlock),
            finding(FindingKind::TechnicalDebtMarker),
            finding(FindingKind::PrintStatement),
        ];
        let report = DebtReport::from_findings(&findings);
        assert_eq!(report.total_findings, 3);
        assert_eq!(report.score, 17);
        assert_eq!(report.risk, Risk::Minimal);
        assert_eq!(report.high_severity, 1);
        assert_eq!(report.medium_severity, 0);
        assert_eq!(report.low_severity, 2);
    }

    #[test]
    fn test_score_monotone_in_findings() {
        let kinds = [
            FindingKind::HardcodedSecret,
            FindingKind::LongFile,
            FindingKind::CommentedCode,
            FindingKind::DeepNesting,
            FindingKind::SystemExitUsage,
        ];
        let mut findings = Vec::new();
        let mut previous = DebtReport::from_findings(&findings).score;
        for kind in kinds.iter().cycle().take(40) {
            findings.push(finding(*kind));
            let score = DebtReport::from_findings(&findings).score;
            assert!(score > previous);
            previous = score;
        }
    }

    #[test]
    fn test_risk_thresholds() {
        assert_eq!(Risk::from_score(20), Risk::Minimal);
        assert_eq!(Risk::from_score(21), Risk::Low);
        assert_eq!(Risk::from_score(50), Risk::Low);
        assert_eq!(Risk::from_score(51), Risk::Medium);
        assert_eq!(Risk::from_score(100), Risk::Medium);
        assert_eq!(Risk::from_score(101), Risk::High);
    }

    #[test]
    fn test_report_json_shape() {
        let analysis = StaticAnalysis {
            findings: vec![finding(FindingKind::SqlInjectionRisk)],
            files_scanned: 2,
            diagnostics: Vec::new(),
        };
        let json = serde_json::to_value(ScanReport::from_analysis(analysis)).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["filesScanned"], 2);
        assert_eq!(json["techDebtScore"], 11);
        assert_eq!(json["riskLevel"], "MINIMAL");
        assert_eq!(json["findings"][0]["type"], "SQLInjectionRisk");
        assert_eq!(json["techDebt"]["highSeverity"], 1);
        assert!(json.get("diagnostics").is_none());
    }
}
