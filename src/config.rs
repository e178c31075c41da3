//! Run configuration and CLI surface.
//!
//! `NccatConfig` mirrors the JSON config table: one `serde` struct serves
//! both the on-disk config file and (via `clap`'s `Parser` derive on
//! [`Cli`]) the command line, following the teacher's `MutationParams`
//! pattern of deriving `Parser` + `Deserialize`/`Serialize` on the same
//! shape so CLI flags and JSON config stay in lockstep.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The `arguments.json` shape from the original tool, renamed to
/// kebab-case keys to match its on-disk spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NccatConfig {
    /// Directory under which `phase_1/`, `phase_2a/`, ..., `witnesses/` are
    /// created.
    pub root: PathBuf,
    /// The proof-of-concept C source file that reproduces the miscompilation.
    pub filename: PathBuf,
    pub compiler_path: PathBuf,
    /// Optimization flags for the "optimized" compile.
    pub options: Vec<String>,
    /// Optimization flags for the "unoptimized" compile (`opt-off`).
    pub opt_off: Vec<String>,
    #[serde(default)]
    pub linker: Vec<String>,
    /// Alternate compiler used by the coverage-driven bug-localization mode
    /// (not wired into the default pipeline; see `oracle::classify_with_coverage`).
    #[serde(default)]
    pub compiler_gcov_path: Option<PathBuf>,
    /// Size of the rayon worker pool; defaults to logical CPU count when absent.
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Extra variants generated per identified mutation set in Learner B.
    #[serde(default = "default_samples_per_set")]
    pub samples_per_set: usize,
    /// Seed for the deterministic mutation RNG, the same role the
    /// teacher's `MutationParams.seed` plays.
    #[serde(default)]
    pub seed: u64,
}

fn default_samples_per_set() -> usize {
    crate::learn_b::DEFAULT_SAMPLES_PER_SET
}

impl NccatConfig {
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| crate::error::NccatError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| crate::error::NccatError::json(path, e))
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Parser)]
#[command(name = "nccat", about = "Generates witness programs that localize C compiler miscompilations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Overrides the rayon worker pool size for this run.
    #[arg(long, global = true)]
    pub jobs: Option<usize>,

    /// Raises the log level (repeat for more detail: -v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Runs the full pipeline against a config file.
    Run {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}
