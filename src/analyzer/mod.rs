//! Pattern-based static analysis
//!
//! Walks a repository, pairs source files with their tests and runs the
//! heuristic checks in [`checks`] over every analyzed source file. Nothing
//! here touches the network.
//!
//! Unreadable files never abort the scan: they are skipped and reported in
//! [`StaticAnalysis::diagnostics`]. Only a root that cannot be listed is fatal.

pub mod checks;
pub mod metrics;
pub mod naming;
pub mod walk;

pub use metrics::{architecture_context, compute_metrics, file_metrics, ArchitectureContext};
pub use walk::{walk_files, SourceFile, Walk, ANALYZED_EXTENSIONS, CODE_EXTENSIONS, SCANNED_EXTENSIONS};

use crate::models::{Finding, FindingKind};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that abort a whole analysis run
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Cannot read repository root {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Repository root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Output of one static analysis pass
#[derive(Debug, Default)]
pub struct StaticAnalysis {
    /// Findings sorted by file, then kind
    pub findings: Vec<Finding>,
    /// Files with a scanned extension (see [`SCANNED_EXTENSIONS`])
    pub files_scanned: usize,
    /// Suppressed walk and read errors
    pub diagnostics: Vec<String>,
}

impl StaticAnalysis {
    /// Group findings by relative file path
    pub fn findings_by_file(&self) -> HashMap<String, Vec<Finding>> {
        let mut grouped: HashMap<String, Vec<Finding>> = HashMap::new();
        for finding in &self.findings {
            grouped
                .entry(finding.file.clone())
                .or_default()
                .push(finding.clone());
        }
        grouped
    }
}

/// Heuristic static analyzer
#[derive(Debug, Clone, Default)]
pub struct StaticAnalyzer {
    respect_ignore_files: bool,
}

impl StaticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Honor `.gitignore`/`.ignore` files and skip hidden entries while walking.
    pub fn respect_ignore_files(mut self, yes: bool) -> Self {
        self.respect_ignore_files = yes;
        self
    }

    /// Walk `root` with this analyzer's walk settings
    pub fn walk(&self, root: &Path) -> Result<Walk, AnalyzeError> {
        walk_files(root, self.respect_ignore_files)
    }

    /// Walk and analyze a repository
    pub fn analyze(&self, root: &Path) -> Result<StaticAnalysis, AnalyzeError> {
        let walk = self.walk(root)?;
        Ok(self.analyze_walk(&walk))
    }

    /// Analyze an already walked repository
    pub fn analyze_walk(&self, walk: &Walk) -> StaticAnalysis {
        let mut diagnostics = walk.diagnostics.clone();

        let (tests, sources): (Vec<&SourceFile>, Vec<&SourceFile>) = walk
            .with_extensions(ANALYZED_EXTENSIONS)
            .partition(|f| naming::is_test_file(&f.relative));

        let mut findings = missing_tests(&sources, &tests);

        let per_file: Vec<Result<Vec<Finding>, String>> = sources
            .par_iter()
            .map(|file| {
                fs::read_to_string(&file.path)
                    .map(|content| checks::check_file(&file.relative, &content))
                    .map_err(|e| format!("read: {}: {}", file.relative, e))
            })
            .collect();

        for result in per_file {
            match result {
                Ok(file_findings) => findings.extend(file_findings),
                Err(diagnostic) => {
                    debug!("Skipping unreadable file: {}", diagnostic);
                    diagnostics.push(diagnostic);
                }
            }
        }

        findings.sort_by(|a, b| a.file.cmp(&b.file).then(a.kind.cmp(&b.kind)));

        let files_scanned = walk.with_extensions(SCANNED_EXTENSIONS).count();
        info!(
            "Static analysis: {} findings across {} source files ({} scanned)",
            findings.len(),
            sources.len(),
            files_scanned
        );

        StaticAnalysis {
            findings,
            files_scanned,
            diagnostics,
        }
    }
}

/// One `MissingTest` finding per source base name without a matching test
fn missing_tests(sources: &[&SourceFile], tests: &[&SourceFile]) -> Vec<Finding> {
    let test_bases: HashSet<String> = tests
        .iter()
        .map(|f| naming::test_base_name(&f.relative))
        .collect();

    let mut by_base: BTreeMap<String, &SourceFile> = BTreeMap::new();
    for file in sources {
        by_base
            .entry(naming::source_base_name(&file.relative))
            .or_insert(file);
    }

    by_base
        .into_iter()
        .filter(|(base, _)| !test_bases.contains(base) && !naming::is_config_or_entry_point(base))
        .map(|(base, file)| {
            Finding::new(file.relative.clone(), FindingKind::MissingTest)
                .with_details(format!("No test file found for '{}'", base))
        })
        .collect()
}
