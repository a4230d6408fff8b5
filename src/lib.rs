//! repoqa - repository quality analysis
//!
//! Heuristic static checks with a technical-debt score, plus per-file
//! LLM review fanned out over a bounded worker pool.

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod scoring;
