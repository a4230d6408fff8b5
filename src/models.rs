//! Core data models for repoqa
//!
//! These models are shared by the static analyzer, the debt scorer and the
//! AI orchestrator.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Severity levels for findings
///
/// Only three levels exist. Anything else coming from outside the crate
/// (model output, hand-edited JSON) is coerced with [`Severity::parse_lenient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse a severity label, accepting any casing.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Severity::High),
            "MEDIUM" => Some(Severity::Medium),
            "LOW" => Some(Severity::Low),
            _ => None,
        }
    }

    /// Parse a severity label, falling back to `Low` for unknown labels.
    pub fn parse_lenient(label: &str) -> Self {
        Self::parse(label).unwrap_or(Severity::Low)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    /// Score weight used by the debt scorer
    pub fn weight(&self) -> u32 {
        match self {
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .map(Severity::parse_lenient)
            .unwrap_or_default())
    }
}

/// Kind of static finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingKind {
    MissingTest,
    LongFile,
    LongMethod,
    EmptyCatchBlock,
    PrintStatement,
    HardcodedSecret,
    #[serde(rename = "SQLInjectionRisk")]
    SqlInjectionRisk,
    SystemExitUsage,
    TechnicalDebtMarker,
    CommentedCode,
    HighComplexity,
    DeepNesting,
}

impl FindingKind {
    /// Fixed severity attached to every finding of this kind
    pub fn severity(&self) -> Severity {
        match self {
            FindingKind::EmptyCatchBlock
            | FindingKind::HardcodedSecret
            | FindingKind::SqlInjectionRisk
            | FindingKind::SystemExitUsage => Severity::High,
            FindingKind::MissingTest
            | FindingKind::LongFile
            | FindingKind::LongMethod
            | FindingKind::HighComplexity
            | FindingKind::DeepNesting => Severity::Medium,
            FindingKind::PrintStatement
            | FindingKind::TechnicalDebtMarker
            | FindingKind::CommentedCode => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::MissingTest => "MissingTest",
            FindingKind::LongFile => "LongFile",
            FindingKind::LongMethod => "LongMethod",
            FindingKind::EmptyCatchBlock => "EmptyCatchBlock",
            FindingKind::PrintStatement => "PrintStatement",
            FindingKind::HardcodedSecret => "HardcodedSecret",
            FindingKind::SqlInjectionRisk => "SQLInjectionRisk",
            FindingKind::SystemExitUsage => "SystemExitUsage",
            FindingKind::TechnicalDebtMarker => "TechnicalDebtMarker",
            FindingKind::CommentedCode => "CommentedCode",
            FindingKind::HighComplexity => "HighComplexity",
            FindingKind::DeepNesting => "DeepNesting",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single static-analysis observation about one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Path relative to the analyzed root, `/`-separated
    pub file: String,
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Finding {
    /// Create a finding carrying the kind's fixed severity
    pub fn new(file: impl Into<String>, kind: FindingKind) -> Self {
        Self {
            file: file.into(),
            kind,
            severity: kind.severity(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Per-file size and complexity metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileMetrics {
    pub lines: usize,
    pub complexity: usize,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_lenient() {
        assert_eq!(Severity::parse_lenient("HIGH"), Severity::High);
        assert_eq!(Severity::parse_lenient("medium"), Severity::Medium);
        assert_eq!(Severity::parse_lenient(" Low "), Severity::Low);
        assert_eq!(Severity::parse_lenient("CRITICAL"), Severity::Low);
        assert_eq!(Severity::parse_lenient(""), Severity::Low);
    }

    #[test]
    fn test_severity_deserialize_coerces_unknown() {
        let sev: Severity = serde_json::from_str("\"blocker\"").unwrap();
        assert_eq!(sev, Severity::Low);
        let sev: Severity = serde_json::from_str("42").unwrap();
        assert_eq!(sev, Severity::Low);
        let sev: Severity = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(sev, Severity::High);
    }

    #[test]
    fn test_finding_serializes_with_type_field() {
        let finding = Finding::new("src/Db.java", FindingKind::SqlInjectionRisk)
            .with_details("concat");
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "SQLInjectionRisk");
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["file"], "src/Db.java");
    }

    #[test]
    fn test_kind_severity_table() {
        assert_eq!(FindingKind::MissingTest.severity(), Severity::Medium);
        assert_eq!(FindingKind::EmptyCatchBlock.severity(), Severity::High);
        assert_eq!(FindingKind::CommentedCode.severity(), Severity::Low);
    }
}
