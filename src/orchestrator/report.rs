//! Per-run results and their per-flavor aggregation

use super::Flavor;
use crate::ai::normalize::{
    AnalysisOutcome, DefectPrediction, InsightFinding, MemoryLeak, ParseDiagnostic, RefactorAdvice,
    TestGap,
};
use crate::models::Severity;
use crate::scoring::Status;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// What happened to one eligible file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Analyzed {
        outcome: AnalysisOutcome,
        diagnostic: Option<ParseDiagnostic>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct FileResult {
    pub file: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileInsights {
    pub file: String,
    pub findings: Vec<InsightFinding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilePrediction {
    pub file: String,
    #[serde(flatten)]
    pub prediction: DefectPrediction,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileLeaks {
    pub file: String,
    pub leaks: Vec<MemoryLeak>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRefactor {
    pub file: String,
    #[serde(flatten)]
    pub advice: RefactorAdvice,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTestGaps {
    pub file: String,
    pub existing_tests: Vec<String>,
    pub gaps: Vec<TestGap>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummary {
    pub insights: Vec<FileInsights>,
    pub total_insights: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectSummary {
    /// Sorted by descending defect score, ties by path
    pub predictions: Vec<FilePrediction>,
    pub high_risk_files: usize,
    pub average_defect_score: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeakSummary {
    pub leaks: Vec<FileLeaks>,
    pub total_leaks: usize,
    pub high_severity_leaks: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorSummary {
    /// Distinct architecture suggestions, first occurrence in path order
    pub architecture_recommendations: Vec<String>,
    pub file_recommendations: Vec<FileRefactor>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestGapSummary {
    pub analyses: Vec<FileTestGaps>,
    pub total_gaps: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FlavorSummary {
    Insight(InsightSummary),
    Defect(DefectSummary),
    Leaks(LeakSummary),
    Refactor(RefactorSummary),
    TestGaps(TestGapSummary),
}

/// Result of one orchestration run, serialized as the command output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryReport {
    pub status: Status,
    pub flavor: Flavor,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub total_files_analyzed: usize,
    #[serde(flatten)]
    pub summary: Option<FlavorSummary>,
    pub skipped: Vec<SkippedFile>,
    pub errors: Vec<FileFailure>,
    pub diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepositoryReport {
    fn empty(flavor: Flavor) -> Self {
        Self {
            status: Status::Completed,
            flavor,
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            total_files_analyzed: 0,
            summary: None,
            skipped: Vec::new(),
            errors: Vec::new(),
            diagnostics: Vec::new(),
            error: None,
        }
    }

    /// A run that failed before any file was analyzed
    pub fn failed(flavor: Flavor, error: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Self {
            status: Status::Error,
            error: Some(error.into()),
            diagnostics,
            ..Self::empty(flavor)
        }
    }

    /// Fold per-file results into a report.
    ///
    /// `existing_tests` maps source paths to their paired test files and is
    /// only consulted for test-gap runs.
    pub fn aggregate(
        flavor: Flavor,
        mut results: Vec<FileResult>,
        existing_tests: &BTreeMap<String, Vec<String>>,
        diagnostics: Vec<String>,
    ) -> Self {
        results.sort_by(|a, b| a.file.cmp(&b.file));
        let eligible = results.len();

        let mut report = Self::empty(flavor);
        report.diagnostics = diagnostics;
        let mut analyzed: Vec<(String, AnalysisOutcome)> = Vec::new();

        for result in results {
            match result.outcome {
                FileOutcome::Analyzed { outcome, diagnostic } => {
                    if let Some(d) = diagnostic {
                        report
                            .diagnostics
                            .push(format!("normalize: {}: {}", result.file, d.error));
                    }
                    analyzed.push((result.file, outcome));
                }
                FileOutcome::Skipped { reason } => report.skipped.push(SkippedFile {
                    file: result.file,
                    reason,
                }),
                FileOutcome::Failed { error } => report.errors.push(FileFailure {
                    file: result.file,
                    error,
                }),
            }
        }

        report.total_files_analyzed = analyzed.len();
        report.summary = Some(summarize(flavor, analyzed, existing_tests));

        if eligible > 0 && report.errors.len() == eligible {
            report.status = Status::Error;
            report.error = report.errors.first().map(|f| f.error.clone());
        }
        report
    }
}

fn summarize(
    flavor: Flavor,
    analyzed: Vec<(String, AnalysisOutcome)>,
    existing_tests: &BTreeMap<String, Vec<String>>,
) -> FlavorSummary {
    match flavor {
        Flavor::Insight => {
            let insights: Vec<FileInsights> = analyzed
                .into_iter()
                .filter_map(|(file, outcome)| match outcome {
                    AnalysisOutcome::Insight(findings) => Some(FileInsights { file, findings }),
                    _ => None,
                })
                .collect();
            let total_insights = insights.iter().map(|i| i.findings.len()).sum();
            FlavorSummary::Insight(InsightSummary {
                insights,
                total_insights,
            })
        }
        Flavor::DefectPrediction => {
            let mut predictions: Vec<FilePrediction> = analyzed
                .into_iter()
                .filter_map(|(file, outcome)| match outcome {
                    AnalysisOutcome::Defect(prediction) => Some(FilePrediction { file, prediction }),
                    _ => None,
                })
                .collect();
            predictions.sort_by(|a, b| {
                b.prediction
                    .defect_score
                    .cmp(&a.prediction.defect_score)
                    .then_with(|| a.file.cmp(&b.file))
            });
            let high_risk_files = predictions
                .iter()
                .filter(|p| p.prediction.severity == Severity::High)
                .count();
            let total: u32 = predictions.iter().map(|p| u32::from(p.prediction.defect_score)).sum();
            let average_defect_score = total / (predictions.len().max(1) as u32);
            FlavorSummary::Defect(DefectSummary {
                predictions,
                high_risk_files,
                average_defect_score,
            })
        }
        Flavor::MemoryLeak => {
            let leaks: Vec<FileLeaks> = analyzed
                .into_iter()
                .filter_map(|(file, outcome)| match outcome {
                    AnalysisOutcome::Leaks(leaks) => Some(FileLeaks { file, leaks }),
                    _ => None,
                })
                .collect();
            let total_leaks = leaks.iter().map(|f| f.leaks.len()).sum();
            let high_severity_leaks = leaks
                .iter()
                .flat_map(|f| &f.leaks)
                .filter(|l| l.severity == Severity::High)
                .count();
            FlavorSummary::Leaks(LeakSummary {
                leaks,
                total_leaks,
                high_severity_leaks,
            })
        }
        Flavor::Refactor => {
            let file_recommendations: Vec<FileRefactor> = analyzed
                .into_iter()
                .filter_map(|(file, outcome)| match outcome {
                    AnalysisOutcome::Refactor(advice) => Some(FileRefactor { file, advice }),
                    _ => None,
                })
                .collect();
            let architecture_recommendations: Vec<String> = {
                let mut seen = HashSet::new();
                file_recommendations
                    .iter()
                    .flat_map(|f| &f.advice.architecture)
                    .filter(|r| seen.insert(r.as_str()))
                    .cloned()
                    .collect()
            };
            FlavorSummary::Refactor(RefactorSummary {
                architecture_recommendations,
                file_recommendations,
            })
        }
        Flavor::TestGap => {
            let analyses: Vec<FileTestGaps> = analyzed
                .into_iter()
                .filter_map(|(file, outcome)| match outcome {
                    AnalysisOutcome::TestGaps(gaps) => Some(FileTestGaps {
                        existing_tests: existing_tests.get(&file).cloned().unwrap_or_default(),
                        file,
                        gaps,
                    }),
                    _ => None,
                })
                .collect();
            let total_gaps = analyses.iter().map(|a| a.gaps.len()).sum();
            FlavorSummary::TestGaps(TestGapSummary {
                analyses,
                total_gaps,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzed(file: &str, outcome: AnalysisOutcome) -> FileResult {
        FileResult {
            file: file.to_string(),
            outcome: FileOutcome::Analyzed {
                outcome,
                diagnostic: None,
            },
        }
    }

    fn failed(file: &str) -> FileResult {
        FileResult {
            file: file.to_string(),
            outcome: FileOutcome::Failed {
                error: "API error: 500 - boom".to_string(),
            },
        }
    }

    fn prediction(score: u8, severity: Severity) -> AnalysisOutcome {
        AnalysisOutcome::Defect(DefectPrediction {
            defect_score: score,
            severity,
            ..Default::default()
        })
    }

    #[test]
    fn test_defect_aggregation() {
        let results = vec![
            analyzed("b.py", prediction(80, Severity::High)),
            analyzed("a.py", prediction(80, Severity::High)),
            analyzed("c.py", prediction(15, Severity::Low)),
            failed("d.py"),
        ];
        let report = RepositoryReport::aggregate(Flavor::DefectPrediction, results, &BTreeMap::new(), Vec::new());

        assert_eq!(report.status, Status::Completed);
        assert_eq!(report.total_files_analyzed, 3);
        assert_eq!(report.errors.len(), 1);
        match report.summary.unwrap() {
            FlavorSummary::Defect(summary) => {
                let order: Vec<_> = summary.predictions.iter().map(|p| p.file.as_str()).collect();
                assert_eq!(order, vec!["a.py", "b.py", "c.py"]);
                assert_eq!(summary.high_risk_files, 2);
                assert_eq!(summary.average_defect_score, 58);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_empty_defect_average_is_zero() {
        let report = RepositoryReport::aggregate(Flavor::DefectPrediction, Vec::new(), &BTreeMap::new(), Vec::new());
        assert_eq!(report.status, Status::Completed);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["averageDefectScore"], 0);
        assert_eq!(json["predictions"], serde_json::json!([]));
    }

    #[test]
    fn test_all_failed_is_error() {
        let report = RepositoryReport::aggregate(
            Flavor::Insight,
            vec![failed("a.py"), failed("b.py")],
            &BTreeMap::new(),
            Vec::new(),
        );
        assert_eq!(report.status, Status::Error);
        assert_eq!(report.error.as_deref(), Some("API error: 500 - boom"));
    }

    #[test]
    fn test_refactor_dedups_architecture() {
        let advice = |arch: &[&str]| {
            AnalysisOutcome::Refactor(RefactorAdvice {
                architecture: arch.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            })
        };
        let results = vec![
            analyzed("b.java", advice(&["Add service layer", "Split module"])),
            analyzed("a.java", advice(&["Split module"])),
        ];
        let report = RepositoryReport::aggregate(Flavor::Refactor, results, &BTreeMap::new(), Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json["architectureRecommendations"],
            serde_json::json!(["Split module", "Add service layer"])
        );
        assert_eq!(json["fileRecommendations"][0]["file"], "a.java");
    }

    #[test]
    fn test_leak_and_gap_totals() {
        let leak = |severity| MemoryLeak {
            severity,
            ..Default::default()
        };
        let report = RepositoryReport::aggregate(
            Flavor::MemoryLeak,
            vec![analyzed("a.js", AnalysisOutcome::Leaks(vec![leak(Severity::High), leak(Severity::Low)]))],
            &BTreeMap::new(),
            Vec::new(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalLeaks"], 2);
        assert_eq!(json["highSeverityLeaks"], 1);

        let mut tests = BTreeMap::new();
        tests.insert("src/Foo.java".to_string(), vec!["src/FooTest.java".to_string()]);
        let report = RepositoryReport::aggregate(
            Flavor::TestGap,
            vec![analyzed("src/Foo.java", AnalysisOutcome::TestGaps(vec![TestGap::default()]))],
            &tests,
            Vec::new(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalGaps"], 1);
        assert_eq!(json["analyses"][0]["existingTests"][0], "src/FooTest.java");
    }

    #[test]
    fn test_parse_diagnostics_surface_in_report() {
        let results = vec![FileResult {
            file: "a.py".to_string(),
            outcome: FileOutcome::Analyzed {
                outcome: AnalysisOutcome::Insight(Vec::new()),
                diagnostic: Some(ParseDiagnostic {
                    error: "expected value at line 1 column 1".to_string(),
                    raw: "nope".to_string(),
                }),
            },
        }];
        let report = RepositoryReport::aggregate(Flavor::Insight, results, &BTreeMap::new(), vec!["walk: x".to_string()]);
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.diagnostics[1].starts_with("normalize: a.py:"));
    }
}
