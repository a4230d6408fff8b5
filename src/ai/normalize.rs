//! Turn loosely structured model replies into typed results
//!
//! Models wrap JSON in markdown fences, return numbers as strings, invent
//! severities and drop fields. Every function here accepts all of that and
//! always yields a value: malformed replies produce the type's default plus a
//! [`ParseDiagnostic`] instead of an error.

use crate::models::Severity;
use crate::orchestrator::Flavor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Longest raw reply excerpt kept in a diagnostic
const MAX_RAW_CHARS: usize = 2000;

/// Why a reply fell back to defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    pub error: String,
    pub raw: String,
}

impl ParseDiagnostic {
    fn new(error: impl Into<String>, raw: &str) -> Self {
        Self {
            error: error.into(),
            raw: raw.chars().take(MAX_RAW_CHARS).collect(),
        }
    }
}

/// A normalized value and, when defaults were substituted, the reason
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub diagnostic: Option<ParseDiagnostic>,
}

impl<T> Normalized<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        Normalized {
            value: f(self.value),
            diagnostic: self.diagnostic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightFinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub line: Option<u32>,
    pub evidence: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectPrediction {
    pub defect_score: u8,
    pub crash_probability: u8,
    pub severity: Severity,
    pub risk_reasons: Vec<String>,
    pub hotspots: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryLeak {
    #[serde(rename = "type")]
    pub kind: String,
    pub line: Option<u32>,
    pub severity: Severity,
    pub evidence: String,
    pub fix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRefactor {
    pub function: String,
    pub line: Option<u32>,
    pub suggestion: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorAdvice {
    pub architecture: Vec<String>,
    pub functions: Vec<FunctionRefactor>,
    pub code_smells: Vec<String>,
    pub package_restructure: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestGap {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub suggested_test: String,
    pub priority: Severity,
}

/// Typed result of one file's enrichment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Insight(Vec<InsightFinding>),
    Defect(DefectPrediction),
    Leaks(Vec<MemoryLeak>),
    Refactor(RefactorAdvice),
    TestGaps(Vec<TestGap>),
}

/// Trim, drop a leading ```` ```json ```` or ```` ``` ```` and a trailing ```` ``` ````
pub fn strip_code_fences(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Normalize a reply according to the flavor that requested it
pub fn normalize(flavor: Flavor, raw: &str) -> Normalized<AnalysisOutcome> {
    match flavor {
        Flavor::Insight => normalize_insights(raw).map(AnalysisOutcome::Insight),
        Flavor::DefectPrediction => normalize_defect(raw).map(AnalysisOutcome::Defect),
        Flavor::MemoryLeak => normalize_leaks(raw).map(AnalysisOutcome::Leaks),
        Flavor::Refactor => normalize_refactor(raw).map(AnalysisOutcome::Refactor),
        Flavor::TestGap => normalize_test_gaps(raw).map(AnalysisOutcome::TestGaps),
    }
}

pub fn normalize_insights(raw: &str) -> Normalized<Vec<InsightFinding>> {
    with_object(raw, |obj| {
        object_list(obj, "findings")
            .map(|item| InsightFinding {
                kind: string_field(item, "type"),
                severity: severity_field(item, "severity").unwrap_or_default(),
                line: line_field(item, "line"),
                evidence: string_field(item, "evidence"),
                reasoning: string_field(item, "reasoning"),
            })
            .collect()
    })
}

pub fn normalize_defect(raw: &str) -> Normalized<DefectPrediction> {
    with_object(raw, |obj| {
        let defect_score = score_field(obj, "defectScore");
        DefectPrediction {
            defect_score,
            crash_probability: score_field(obj, "crashProbability"),
            severity: defect_severity(obj, defect_score),
            risk_reasons: string_list(obj, "riskReasons"),
            hotspots: obj
                .get("hotspots")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(as_line).collect())
                .unwrap_or_default(),
        }
    })
}

pub fn normalize_leaks(raw: &str) -> Normalized<Vec<MemoryLeak>> {
    with_object(raw, |obj| {
        object_list(obj, "leaks")
            .map(|item| MemoryLeak {
                kind: string_field(item, "type"),
                line: line_field(item, "line"),
                severity: severity_field(item, "severity").unwrap_or_default(),
                evidence: string_field(item, "evidence"),
                fix: string_field(item, "fix"),
            })
            .collect()
    })
}

pub fn normalize_refactor(raw: &str) -> Normalized<RefactorAdvice> {
    with_object(raw, |obj| RefactorAdvice {
        architecture: string_list(obj, "architecture"),
        functions: object_list(obj, "functions")
            .map(|item| FunctionRefactor {
                function: string_field(item, "function"),
                line: line_field(item, "line"),
                suggestion: string_field(item, "suggestion"),
                reason: string_field(item, "reason"),
            })
            .collect(),
        code_smells: string_list(obj, "codeSmells"),
        package_restructure: string_list(obj, "packageRestructure"),
    })
}

pub fn normalize_test_gaps(raw: &str) -> Normalized<Vec<TestGap>> {
    with_object(raw, |obj| {
        object_list(obj, "gaps")
            .map(|item| TestGap {
                kind: string_field(item, "type"),
                description: string_field(item, "description"),
                suggested_test: string_field(item, "suggestedTest"),
                priority: severity_field(item, "priority").unwrap_or_default(),
            })
            .collect()
    })
}

/// Severity implied by a defect score when the model gave none
pub fn severity_for_score(score: u8) -> Severity {
    if score > 70 {
        Severity::High
    } else if score > 40 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// A missing label is LOW; a present but unknown one is derived from the score
fn defect_severity(obj: &Map<String, Value>, defect_score: u8) -> Severity {
    match obj.get("severity") {
        None => Severity::Low,
        Some(label) => label
            .as_str()
            .and_then(Severity::parse)
            .unwrap_or_else(|| severity_for_score(defect_score)),
    }
}

fn with_object<T: Default>(raw: &str, extract: impl FnOnce(&Map<String, Value>) -> T) -> Normalized<T> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(obj)) => Normalized {
            value: extract(&obj),
            diagnostic: None,
        },
        Ok(_) => Normalized {
            value: T::default(),
            diagnostic: Some(ParseDiagnostic::new("expected a JSON object", raw)),
        },
        Err(e) => Normalized {
            value: T::default(),
            diagnostic: Some(ParseDiagnostic::new(e.to_string(), raw)),
        },
    }
}

fn object_list<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn severity_field(obj: &Map<String, Value>, key: &str) -> Option<Severity> {
    obj.get(key).and_then(Value::as_str).and_then(Severity::parse)
}

fn line_field(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key).and_then(as_line)
}

fn as_line(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 0..=100 score from an integer, float (truncated) or numeric string
fn score_field(obj: &Map<String, Value>, key: &str) -> u8 {
    let score: i64 = match obj.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    };
    score.clamp(0, 100) as u8
}
