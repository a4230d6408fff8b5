//! Repository-wide fan-out of per-file AI enrichment
//!
//! One engine serves every [`Flavor`]. A run:
//!
//! 1. checks the client has credentials, walks the repository once and runs
//!    the static analyzer;
//! 2. prepares flavor context (metrics, architecture layout, test pairing);
//! 3. submits one [`FileTask`] per eligible file to the [`WorkerPool`];
//! 4. gathers exactly one [`FileResult`] per task over a results channel;
//! 5. folds the results into a [`RepositoryReport`].
//!
//! A failing or panicking task only fails its own file.

pub mod flavor;
pub mod pool;
pub mod report;

pub use flavor::Flavor;
pub use pool::{PoolError, WorkerPool};
pub use report::{FileOutcome, FileResult, FlavorSummary, RepositoryReport};

use crate::ai::normalize::normalize;
use crate::ai::prompts::{PromptBuilder, PromptTemplate};
use crate::ai::{AiResult, ResilientClient};
use crate::analyzer::naming;
use crate::analyzer::{architecture_context, compute_metrics, ArchitectureContext, StaticAnalyzer, Walk, CODE_EXTENSIONS};
use crate::models::{FileMetrics, Finding};
use crossbeam_channel::unbounded;
use pool::panic_message;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Progress callback: (file, completed, total)
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Worker threads in the pool
    pub workers: usize,
    /// Files with more characters than this are skipped, never sent
    pub max_file_chars: usize,
    /// How long dropping the orchestrator waits for in-flight tasks
    pub shutdown_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            max_file_chars: 50_000,
            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

/// Everything one worker needs to enrich one file
#[derive(Debug, Clone)]
pub struct FileTask {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub findings: Vec<Finding>,
    pub metrics: Option<FileMetrics>,
    pub existing_tests: Vec<String>,
}

/// Read-only state shared by every task of a run
struct RunContext {
    flavor: Flavor,
    architecture: Option<ArchitectureContext>,
    max_file_chars: usize,
}

pub struct Orchestrator {
    client: Arc<ResilientClient>,
    analyzer: StaticAnalyzer,
    settings: OrchestratorSettings,
    pool: WorkerPool,
    progress: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<ResilientClient>,
        analyzer: StaticAnalyzer,
        settings: OrchestratorSettings,
    ) -> Result<Self, PoolError> {
        let pool = WorkerPool::new(settings.workers, settings.shutdown_timeout)?;
        Ok(Self {
            client,
            analyzer,
            settings,
            pool,
            progress: None,
        })
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Enrich every eligible file under `root` and aggregate the results.
    ///
    /// Never fails: problems become an `error` status or per-file entries.
    pub fn run(&self, root: &Path, flavor: Flavor) -> RepositoryReport {
        if let Err(e) = self.client.ensure_configured() {
            return RepositoryReport::failed(flavor, e.to_string(), Vec::new());
        }

        let walk = match self.analyzer.walk(root) {
            Ok(walk) => walk,
            Err(e) => return RepositoryReport::failed(flavor, e.to_string(), Vec::new()),
        };

        info!("Starting {} run for {}", flavor, root.display());
        let analysis = self.analyzer.analyze_walk(&walk);
        let mut diagnostics = analysis.diagnostics.clone();
        let mut findings_by_file = analysis.findings_by_file();

        let metrics = if flavor.needs_metrics() {
            compute_metrics(&walk, &mut diagnostics)
        } else {
            BTreeMap::new()
        };
        let architecture = flavor
            .needs_architecture()
            .then(|| architecture_context(walk.with_extensions(CODE_EXTENSIONS)));
        let existing_tests = if flavor.needs_test_pairing() {
            pair_tests(&walk)
        } else {
            BTreeMap::new()
        };

        let tasks: Vec<FileTask> = walk
            .files
            .iter()
            .filter(|f| flavor.is_eligible(f))
            .map(|f| FileTask {
                relative_path: f.relative.clone(),
                absolute_path: f.path.clone(),
                findings: findings_by_file.remove(&f.relative).unwrap_or_default(),
                metrics: metrics.get(&f.relative).copied(),
                existing_tests: existing_tests.get(&f.relative).cloned().unwrap_or_default(),
            })
            .collect();
        info!(
            "{} static findings, {} files eligible for {}",
            analysis.findings.len(),
            tasks.len(),
            flavor
        );

        let context = Arc::new(RunContext {
            flavor,
            architecture,
            max_file_chars: self.settings.max_file_chars,
        });
        let results = self.fan_out(tasks, context);

        let report = RepositoryReport::aggregate(flavor, results, &existing_tests, diagnostics);
        info!(
            "{} run finished: {} analyzed, {} skipped, {} failed",
            flavor,
            report.total_files_analyzed,
            report.skipped.len(),
            report.errors.len()
        );
        report
    }

    /// Submit every task and block until each has reported once
    fn fan_out(&self, tasks: Vec<FileTask>, context: Arc<RunContext>) -> Vec<FileResult> {
        let total = tasks.len();
        let (result_tx, result_rx) = unbounded::<FileResult>();
        let mut results = Vec::with_capacity(total);
        let mut submitted = Vec::with_capacity(total);

        for task in tasks {
            let file = task.relative_path.clone();
            let tx = result_tx.clone();
            let client = Arc::clone(&self.client);
            let ctx = Arc::clone(&context);

            let job = move || {
                let result = run_task(&client, &ctx, task);
                let _ = tx.send(result);
            };
            match self.pool.execute(job) {
                Ok(()) => submitted.push(file),
                Err(e) => results.push(FileResult {
                    file,
                    outcome: FileOutcome::Failed {
                        error: e.to_string(),
                    },
                }),
            }
        }

        // Only workers hold senders now; the loop ends when the last task reports
        drop(result_tx);

        let mut done = results.len();
        for result in result_rx.iter() {
            done += 1;
            if let Some(ref callback) = self.progress {
                callback(&result.file, done, total);
            }
            results.push(result);
        }

        let reported: HashSet<&str> = results.iter().map(|r| r.file.as_str()).collect();
        let lost: Vec<String> = submitted
            .into_iter()
            .filter(|f| !reported.contains(f.as_str()))
            .collect();
        for file in lost {
            warn!("Task for {} was dropped before reporting", file);
            results.push(FileResult {
                file,
                outcome: FileOutcome::Failed {
                    error: "task cancelled before completion".to_string(),
                },
            });
        }

        results
    }
}

fn run_task(client: &ResilientClient, ctx: &RunContext, task: FileTask) -> FileResult {
    let outcome = match catch_unwind(AssertUnwindSafe(|| analyze_file(client, ctx, &task))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!("AI analysis failed for {}: {}", task.relative_path, e);
            FileOutcome::Failed {
                error: e.to_string(),
            }
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!("AI analysis panicked for {}: {}", task.relative_path, message);
            FileOutcome::Failed {
                error: format!("panic: {}", message),
            }
        }
    };
    FileResult {
        file: task.relative_path,
        outcome,
    }
}

fn analyze_file(client: &ResilientClient, ctx: &RunContext, task: &FileTask) -> AiResult<FileOutcome> {
    let content = fs::read_to_string(&task.absolute_path)?;
    let chars = content.chars().count();
    if chars > ctx.max_file_chars {
        warn!(
            "Skipping {}: {} characters exceeds limit of {}",
            task.relative_path, chars, ctx.max_file_chars
        );
        return Ok(FileOutcome::Skipped {
            reason: format!("file too large ({} characters, limit {})", chars, ctx.max_file_chars),
        });
    }

    let prompt = PromptBuilder::new(ctx.flavor, &task.relative_path, &content)
        .findings(&task.findings)
        .metrics(task.metrics.as_ref())
        .architecture(ctx.architecture.as_ref())
        .existing_tests(&task.existing_tests)
        .build();

    debug!("Requesting {} analysis for {}", ctx.flavor, task.relative_path);
    let reply = client.complete(PromptTemplate::system_prompt(ctx.flavor), &prompt)?;

    let normalized = normalize(ctx.flavor, &reply);
    if let Some(ref diagnostic) = normalized.diagnostic {
        warn!(
            "Unparseable reply for {}, using defaults: {}",
            task.relative_path, diagnostic.error
        );
    }
    Ok(FileOutcome::Analyzed {
        outcome: normalized.value,
        diagnostic: normalized.diagnostic,
    })
}

/// Map each non-test code file to the test files sharing its base name
fn pair_tests(walk: &Walk) -> BTreeMap<String, Vec<String>> {
    let mut tests_by_base: HashMap<String, Vec<String>> = HashMap::new();
    for file in walk.with_extensions(CODE_EXTENSIONS) {
        if naming::is_test_file(&file.relative) {
            tests_by_base
                .entry(naming::test_base_name(&file.relative))
                .or_default()
                .push(file.relative.clone());
        }
    }

    walk.with_extensions(CODE_EXTENSIONS)
        .filter(|f| !naming::is_test_file(&f.relative))
        .map(|f| {
            let tests = tests_by_base
                .get(&naming::source_base_name(&f.relative))
                .cloned()
                .unwrap_or_default();
            (f.relative.clone(), tests)
        })
        .collect()
}
