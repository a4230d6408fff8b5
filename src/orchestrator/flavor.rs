//! The five enrichment flavors

use crate::analyzer::naming;
use crate::analyzer::{SourceFile, CODE_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which question a run asks the model about each file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flavor {
    Insight,
    DefectPrediction,
    MemoryLeak,
    Refactor,
    TestGap,
}

impl Flavor {
    pub const ALL: [Flavor; 5] = [
        Flavor::Insight,
        Flavor::DefectPrediction,
        Flavor::MemoryLeak,
        Flavor::Refactor,
        Flavor::TestGap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Insight => "insight",
            Flavor::DefectPrediction => "defect-prediction",
            Flavor::MemoryLeak => "memory-leak",
            Flavor::Refactor => "refactor",
            Flavor::TestGap => "test-gap",
        }
    }

    /// Whether `file` is sent to the model in this flavor.
    ///
    /// All flavors take code files; test-gap analysis skips the tests themselves.
    pub fn is_eligible(&self, file: &SourceFile) -> bool {
        if !file.has_extension(CODE_EXTENSIONS) {
            return false;
        }
        match self {
            Flavor::TestGap => !naming::is_test_file(&file.relative),
            _ => true,
        }
    }

    pub fn needs_metrics(&self) -> bool {
        matches!(self, Flavor::DefectPrediction)
    }

    pub fn needs_architecture(&self) -> bool {
        matches!(self, Flavor::Refactor)
    }

    pub fn needs_test_pairing(&self) -> bool {
        matches!(self, Flavor::TestGap)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
