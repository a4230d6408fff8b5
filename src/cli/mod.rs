//! CLI command definitions and handlers

mod ai;
mod init;
mod scan;

use crate::config::UserConfig;
use crate::orchestrator::Flavor;
use crate::scoring::Status;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// repoqa - repository quality analysis
///
/// Fast local static checks plus per-file LLM review.
#[derive(Parser, Debug)]
#[command(name = "repoqa")]
#[command(
    version,
    about = "Repository quality analysis: static checks, technical debt score and LLM-assisted review",
    after_help = "\
Examples:
  repoqa scan .                        Static scan with debt score
  repoqa report . --format json        Full findings list as JSON
  repoqa defects ./service             Predict defect-prone files
  repoqa --workers 8 insights .        Hidden-bug review with 8 parallel requests
  repoqa init                          Write an example config file

AI commands need AI_API_KEY (or api_keys in the config file)."
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: ~/.config/repoqa/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of parallel AI requests (1-64)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Skip files with more characters than this in AI commands
    #[arg(long, global = true)]
    pub max_file_chars: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example config file
    Init,

    /// Static scan: files scanned, debt score and severity counts
    Scan {
        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Static scan with every finding and the debt breakdown
    Report {
        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// LLM review for hidden bugs and logic errors
    Insights {
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// LLM defect probability per file
    Defects {
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// LLM memory and resource leak detection
    Leaks {
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// LLM refactoring recommendations
    Refactor {
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// LLM test coverage gap analysis
    TestGaps {
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

/// Run the parsed command and return the status it reported
pub fn run(cli: Cli) -> Result<Status> {
    // init creates the config file, so it must not try to load it first
    if let Some(Commands::Init) = cli.command {
        return init::run(cli.config.as_deref());
    }

    let mut config = UserConfig::load(cli.config.as_deref())?;
    if cli.workers.is_some() {
        config.analysis.workers = cli.workers;
    }
    if cli.max_file_chars.is_some() {
        config.analysis.max_file_chars = cli.max_file_chars;
    }

    let ai = |flavor: Flavor, format: &str| ai::run(&cli.path, flavor, format, &config);

    match &cli.command {
        Some(Commands::Init) => Ok(Status::Completed),
        None => scan::run(&cli.path, "text", &config, false, None),
        Some(Commands::Scan { format }) => scan::run(&cli.path, format, &config, false, None),
        Some(Commands::Report { format, output }) => {
            scan::run(&cli.path, format, &config, true, output.as_deref())
        }
        Some(Commands::Insights { format }) => ai(Flavor::Insight, format),
        Some(Commands::Defects { format }) => ai(Flavor::DefectPrediction, format),
        Some(Commands::Leaks { format }) => ai(Flavor::MemoryLeak, format),
        Some(Commands::Refactor { format }) => ai(Flavor::Refactor, format),
        Some(Commands::TestGaps { format }) => ai(Flavor::TestGap, format),
    }
}
