//! Prompt templates for per-file enrichment
//!
//! One system prompt and one user prompt layout per [`Flavor`]. Every user
//! prompt ends with the exact JSON shape that [`crate::ai::normalize`] expects
//! back.

use crate::analyzer::ArchitectureContext;
use crate::models::{FileMetrics, Finding};
use crate::orchestrator::Flavor;

/// System prompts per flavor
pub struct PromptTemplate;

impl PromptTemplate {
    pub fn system_prompt(flavor: Flavor) -> &'static str {
        match flavor {
            Flavor::Insight => {
                "You are an expert code reviewer specializing in finding hidden bugs, \
                 logical errors, and architectural flaws. Return only valid JSON."
            }
            Flavor::DefectPrediction => {
                "You are an expert software quality analyst. \
                 Predict defect probability based on code patterns, complexity, and static analysis. \
                 Return only valid JSON."
            }
            Flavor::MemoryLeak => {
                "You are an expert in memory management and resource leak detection. \
                 Identify potential memory leaks, resource leaks, and unbounded growth patterns. \
                 Return only valid JSON."
            }
            Flavor::Refactor => {
                "You are an expert software architect and refactoring specialist. \
                 Provide actionable refactoring recommendations at both architecture and function levels. \
                 Return only valid JSON."
            }
            Flavor::TestGap => {
                "You are an expert QA engineer specializing in test coverage analysis. \
                 Identify missing test cases, edge cases, and negative scenarios. \
                 Return only valid JSON."
            }
        }
    }
}

/// Builder for one file's user prompt
pub struct PromptBuilder<'a> {
    flavor: Flavor,
    file_path: &'a str,
    code: &'a str,
    findings: &'a [Finding],
    metrics: Option<&'a FileMetrics>,
    architecture: Option<&'a ArchitectureContext>,
    existing_tests: &'a [String],
}

impl<'a> PromptBuilder<'a> {
    pub fn new(flavor: Flavor, file_path: &'a str, code: &'a str) -> Self {
        Self {
            flavor,
            file_path,
            code,
            findings: &[],
            metrics: None,
            architecture: None,
            existing_tests: &[],
        }
    }

    pub fn findings(mut self, findings: &'a [Finding]) -> Self {
        self.findings = findings;
        self
    }

    pub fn metrics(mut self, metrics: Option<&'a FileMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn architecture(mut self, context: Option<&'a ArchitectureContext>) -> Self {
        self.architecture = context;
        self
    }

    pub fn existing_tests(mut self, tests: &'a [String]) -> Self {
        self.existing_tests = tests;
        self
    }

    pub fn build(self) -> String {
        let (task, context, checklist, shape) = match self.flavor {
            Flavor::Insight => (
                "Analyze the following code for hidden bugs, logical errors, and architectural issues.",
                self.findings_section(),
                "Please identify:\n\
                 1. Hidden bugs that static analysis might miss\n\
                 2. Incorrect logical branching\n\
                 3. Misuse of external libraries\n\
                 4. Dangerous concurrency patterns\n\
                 5. Edge cases where code might fail",
                INSIGHT_SHAPE,
            ),
            Flavor::DefectPrediction => (
                "Predict the defect probability for this code file.",
                self.defect_context(),
                "Calculate:\n\
                 1. Defect probability score (0-100)\n\
                 2. Crash probability and severity\n\
                 3. Risk reasons\n\
                 4. Code hotspots (line numbers)",
                DEFECT_SHAPE,
            ),
            Flavor::MemoryLeak => (
                "Detect potential memory leaks in this code.",
                String::new(),
                "Look for:\n\
                 1. Resources not closed (files, streams, connections)\n\
                 2. Potential leaks in loops\n\
                 3. Unbounded collections\n\
                 4. Observer/listener leaks\n\
                 5. Asynchronous leak patterns",
                LEAK_SHAPE,
            ),
            Flavor::Refactor => (
                "Provide refactoring recommendations for this code.",
                self.architecture_section(),
                "Provide:\n\
                 1. High-level architecture improvements\n\
                 2. Function-level refactor suggestions\n\
                 3. Unnecessary layers to remove\n\
                 4. Code smells to address\n\
                 5. Package restructuring suggestions",
                REFACTOR_SHAPE,
            ),
            Flavor::TestGap => (
                "Analyze test coverage gaps for this code.",
                self.tests_section(),
                "Identify:\n\
                 1. Untested code paths\n\
                 2. Missing edge cases\n\
                 3. Missing negative test cases\n\
                 4. Missing async/concurrency tests",
                TEST_GAP_SHAPE,
            ),
        };

        format!(
            r#"{task}

File: {file_path}

Code:
```
{code}
```

{context}{checklist}

Return JSON format:
{shape}
"#,
            task = task,
            file_path = self.file_path,
            code = sanitize_code(self.code),
            context = context,
            checklist = checklist,
            shape = shape,
        )
    }

    fn findings_section(&self) -> String {
        if self.findings.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = self
            .findings
            .iter()
            .map(|f| {
                format!(
                    "- {} ({}): {}",
                    f.kind,
                    f.severity,
                    f.details.as_deref().unwrap_or("")
                )
            })
            .collect();
        format!("Static analysis findings:\n{}\n\n", lines.join("\n"))
    }

    fn defect_context(&self) -> String {
        let mut section = String::new();
        if !self.findings.is_empty() {
            section.push_str(&format!("Static analysis findings: {}\n", self.findings.len()));
        }
        if let Some(metrics) = self.metrics {
            section.push_str(&format!(
                "Complexity metrics: {}\n",
                serde_json::to_string(metrics).unwrap_or_default()
            ));
        }
        if !section.is_empty() {
            section.push('\n');
        }
        section
    }

    fn architecture_section(&self) -> String {
        match self.architecture {
            Some(context) => format!(
                "Architecture context: {}\n\n",
                serde_json::to_string(context).unwrap_or_default()
            ),
            None => String::new(),
        }
    }

    fn tests_section(&self) -> String {
        if self.existing_tests.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = self.existing_tests.iter().map(|t| format!("- {}", t)).collect();
        format!("Existing tests:\n{}\n\n", lines.join("\n"))
    }
}

const INSIGHT_SHAPE: &str = r#"{
  "findings": [
    {
      "type": "bug_type",
      "severity": "HIGH|MEDIUM|LOW",
      "line": line_number,
      "evidence": "code snippet",
      "reasoning": "explanation"
    }
  ]
}"#;

const DEFECT_SHAPE: &str = r#"{
  "defectScore": 0-100,
  "crashProbability": 0-100,
  "severity": "HIGH|MEDIUM|LOW",
  "riskReasons": ["reason1", "reason2"],
  "hotspots": [line1, line2]
}"#;

const LEAK_SHAPE: &str = r#"{
  "leaks": [
    {
      "type": "leak_type",
      "line": line_number,
      "severity": "HIGH|MEDIUM|LOW",
      "evidence": "code snippet",
      "fix": "suggested fix"
    }
  ]
}"#;

const REFACTOR_SHAPE: &str = r#"{
  "architecture": ["suggestion1", "suggestion2"],
  "functions": [
    {
      "function": "function_name",
      "line": line_number,
      "suggestion": "refactor suggestion",
      "reason": "reasoning"
    }
  ],
  "codeSmells": ["smell1", "smell2"],
  "packageRestructure": ["suggestion1"]
}"#;

const TEST_GAP_SHAPE: &str = r#"{
  "gaps": [
    {
      "type": "gap_type",
      "description": "description",
      "suggestedTest": "test case description",
      "priority": "HIGH|MEDIUM|LOW"
    }
  ]
}"#;

const INJECTION_PATTERNS: &[&str] = &[
    "ignore all previous",
    "ignore above instructions",
    "disregard all prior",
    "disregard previous",
    "forget your instructions",
    "new instructions:",
    "system prompt:",
    "pretend you are",
    "reveal your",
    "print your system",
];

/// Replace code lines carrying prompt-injection phrases with a marker.
///
/// Line count is preserved so line numbers in the reply still match the file.
fn sanitize_code(code: &str) -> String {
    let lower = code.to_lowercase();
    if !INJECTION_PATTERNS.iter().any(|p| lower.contains(p)) {
        return code.to_string();
    }
    code.lines()
        .map(|line| {
            let lower = line.to_lowercase();
            if INJECTION_PATTERNS.iter().any(|p| lower.contains(p)) {
                "/* [prompt injection filtered] */"
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
