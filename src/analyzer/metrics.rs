//! Lexical size and complexity metrics
//!
//! These are simple token counts, not a control-flow graph. They feed the
//! `HighComplexity`/`DeepNesting` checks, the defect-prediction prompt and the
//! refactor prompt's architecture context.

use super::walk::{SourceFile, Walk, CODE_EXTENSIONS};
use crate::models::FileMetrics;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::sync::OnceLock;

static CONTROL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn control_pattern() -> &'static Regex {
    CONTROL_PATTERN.get_or_init(|| {
        Regex::new(r"\b(if|for|while|switch|catch)\s*\(").expect("valid regex")
    })
}

/// Occurrences of each control construct followed by `(`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlCounts {
    pub ifs: usize,
    pub fors: usize,
    pub whiles: usize,
    pub switches: usize,
    pub catches: usize,
}

impl ControlCounts {
    pub fn scan(content: &str) -> Self {
        let mut counts = Self::default();
        for cap in control_pattern().captures_iter(content) {
            match cap.get(1).map(|m| m.as_str()) {
                Some("if") => counts.ifs += 1,
                Some("for") => counts.fors += 1,
                Some("while") => counts.whiles += 1,
                Some("switch") => counts.switches += 1,
                Some("catch") => counts.catches += 1,
                _ => {}
            }
        }
        counts
    }

    /// Complexity as reported in [`FileMetrics`] (switches excluded)
    pub fn metric_complexity(&self) -> usize {
        self.ifs + self.fors + self.whiles + self.catches
    }

    /// All control constructs, used by the `HighComplexity` check
    pub fn total(&self) -> usize {
        self.metric_complexity() + self.switches
    }
}

/// Maximum `{` nesting depth over the whole file
pub fn max_nesting(content: &str) -> usize {
    let mut depth: i64 = 0;
    let mut max_depth: i64 = 0;
    for c in content.chars() {
        match c {
            '{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            '}' => depth -= 1,
            _ => {}
        }
    }
    max_depth as usize
}

pub fn file_metrics(content: &str) -> FileMetrics {
    FileMetrics {
        lines: content.lines().count(),
        complexity: ControlCounts::scan(content).metric_complexity(),
        size: content.chars().count(),
    }
}

/// Metrics for every code file in the walk, keyed by relative path.
///
/// Unreadable files are skipped and reported in `diagnostics`.
pub fn compute_metrics(walk: &Walk, diagnostics: &mut Vec<String>) -> BTreeMap<String, FileMetrics> {
    let mut metrics = BTreeMap::new();
    for file in walk.with_extensions(CODE_EXTENSIONS) {
        match fs::read_to_string(&file.path) {
            Ok(content) => {
                metrics.insert(file.relative.clone(), file_metrics(&content));
            }
            Err(e) => diagnostics.push(format!("metrics: {}: {}", file.relative, e)),
        }
    }
    metrics
}

/// Repository-wide package layout, shared by every refactor prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureContext {
    pub package_count: usize,
    pub top_level_packages: Vec<String>,
    pub package_distribution: BTreeMap<String, usize>,
}

/// Derive packages from the parent directories of code files (`a/b` → `a.b`)
pub fn architecture_context<'a>(files: impl IntoIterator<Item = &'a SourceFile>) -> ArchitectureContext {
    let mut context = ArchitectureContext::default();
    for file in files {
        let package = match file.relative.rsplit_once('/') {
            Some((parent, _)) => parent.replace('/', "."),
            None => continue,
        };
        let top = package.split('.').next().unwrap_or_default().to_string();
        if !context.top_level_packages.contains(&top) {
            context.top_level_packages.push(top);
        }
        *context.package_distribution.entry(package).or_insert(0) += 1;
    }
    context.package_count = context.package_distribution.len();
    context
}
