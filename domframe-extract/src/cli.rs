//! Command-line arguments for the `domframe` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use domframe_core::CompactLevel;

use crate::config::ExtractConfig;

/// Command-line arguments for domframe.
#[derive(Debug, Clone, Parser)]
#[command(name = "domframe")]
#[command(about = "Compile a render-tree snapshot into a design document")]
#[command(version)]
pub struct CliArgs {
    /// Render snapshot (JSON) to compile
    pub snapshot: PathBuf,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Abort once the tree holds more nodes than this
    #[arg(long, env = "DOMFRAME_MAX_NODES", default_value = "15000")]
    pub max_nodes: usize,

    /// Drop subtrees deeper than this
    #[arg(long, env = "DOMFRAME_MAX_DEPTH", default_value = "64")]
    pub max_depth: usize,

    /// Wall-clock budget for the whole run, in milliseconds
    #[arg(long, env = "DOMFRAME_TIME_BUDGET_MS", default_value = "60000")]
    pub time_budget_ms: u64,

    /// Do not fetch or inline assets
    #[arg(long, env = "DOMFRAME_NO_ASSETS")]
    pub no_assets: bool,

    /// Do not synthesize ::before/::after nodes
    #[arg(long, env = "DOMFRAME_NO_PSEUDO")]
    pub no_pseudo: bool,

    /// Asset fetches in flight at once
    #[arg(long, env = "DOMFRAME_CONCURRENCY", default_value = "5")]
    pub concurrency: usize,

    /// Shrink the document before writing it
    #[arg(long, value_enum, env = "DOMFRAME_COMPACT")]
    pub compact: Option<CompactArg>,

    /// Compact until the document fits in this many megabytes
    #[arg(long, env = "DOMFRAME_TARGET_SIZE_MB")]
    pub target_size_mb: Option<f64>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pub pretty: bool,
}

/// Compaction level on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompactArg {
    /// Moderate limits
    Standard,
    /// Tight limits
    Aggressive,
}

impl From<CompactArg> for CompactLevel {
    fn from(arg: CompactArg) -> Self {
        match arg {
            CompactArg::Standard => Self::Standard,
            CompactArg::Aggressive => Self::Aggressive,
        }
    }
}

impl CliArgs {
    /// Size target in bytes, if one was given.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn target_bytes(&self) -> Option<usize> {
        self.target_size_mb
            .filter(|mb| *mb > 0.0)
            .map(|mb| (mb * 1024.0 * 1024.0) as usize)
    }
}

impl From<&CliArgs> for ExtractConfig {
    fn from(args: &CliArgs) -> Self {
        let mut config = Self {
            max_nodes: args.max_nodes,
            max_depth: args.max_depth,
            time_budget: Duration::from_millis(args.time_budget_ms),
            include_pseudo_elements: !args.no_pseudo,
            resolve_assets: !args.no_assets,
            ..Self::default()
        };
        config.pipeline.concurrency = args.concurrency.max(1);
        config
    }
}
