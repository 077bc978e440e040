use anyhow::bail;
use clap::{Parser, Subcommand};
use quarry::{COMMENT_PREFIX, DEFAULT_BATCH_SIZE, DEFAULT_LEAF_SIZE};
use std::path::PathBuf;

/// Largest batch the remote API accepts in one call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Runtime configuration for the `quarry` binary.
///
/// Every global option can also be set through the environment or a `.env`
/// file, so a scheduled job only needs to name the subcommand.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "quarry",
    version,
    about = "Quota-aware, resumable collector for dense numeric ID spaces"
)]
pub struct CliArgs {
    /// JSON file describing the time windows and their quotas.
    ///
    /// Environment variable: `QUARRY_WINDOWS`
    #[arg(long, env = "QUARRY_WINDOWS", default_value = "windows.json")]
    pub windows: PathBuf,

    /// Directory holding `outcomes.txt` and `summary.json`.
    ///
    /// Environment variable: `QUARRY_DATA_DIR`
    #[arg(long, env = "QUARRY_DATA_DIR", default_value = "out")]
    pub data_dir: PathBuf,

    /// Maximum number of IDs spanned by one leaf.
    ///
    /// Changing this between runs changes the proposal order, so keep it
    /// fixed for the lifetime of a data directory.
    ///
    /// Environment variable: `QUARRY_LEAF_SIZE`
    #[arg(long, env = "QUARRY_LEAF_SIZE", default_value_t = DEFAULT_LEAF_SIZE)]
    pub leaf_size: u64,

    /// Number of IDs drawn per batch.
    ///
    /// Environment variable: `QUARRY_BATCH_SIZE`
    #[arg(long, env = "QUARRY_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Kind prefix used when printing and parsing fullnames.
    ///
    /// Environment variable: `QUARRY_PREFIX`
    #[arg(long, env = "QUARRY_PREFIX", default_value = COMMENT_PREFIX)]
    pub prefix: String,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, default_value_t = false, conflicts_with = "silent")]
    pub verbose: bool,

    /// Only log errors unless `RUST_LOG` says otherwise.
    #[arg(short, long, default_value_t = false)]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the next batches as fullnames without recording anything.
    Plan {
        /// Number of batches to print.
        #[arg(long, default_value_t = 1)]
        batches: usize,
    },
    /// Record outcomes reported by another tool.
    Record {
        /// Comma-separated IDs that exist.
        #[arg(long, value_delimiter = ',')]
        hits: Vec<String>,
        /// Comma-separated IDs that do not exist.
        #[arg(long, value_delimiter = ',')]
        misses: Vec<String>,
    },
    /// Print per-window progress.
    Status {
        /// Print the full report as JSON instead of CSV.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Check the window file and the outcome logs for inconsistencies.
    Validate,
    /// Draw, fetch and record batches until every quota is met.
    Collect {
        /// Command run once per batch; the comma-joined fullnames are
        /// appended as its last argument. Split on whitespace.
        ///
        /// Environment variable: `QUARRY_FETCH_CMD`
        #[arg(long, env = "QUARRY_FETCH_CMD")]
        fetch_cmd: String,
        /// Stop after this many batches even if quotas are still open.
        #[arg(long)]
        max_batches: Option<u64>,
        /// Abort once more than this many fetches in a row have failed.
        #[arg(long, default_value_t = 5)]
        max_failures: u32,
    },
}

/// Validated settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub windows_path: PathBuf,
    pub data_dir: PathBuf,
    pub leaf_size: u64,
    pub batch_size: usize,
    pub prefix: String,
    pub log_level: &'static str,
    pub command: Command,
}

impl TryFrom<CliArgs> for CollectorConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.verbose && args.silent {
            bail!("--verbose and --silent cannot be combined");
        }

        if args.leaf_size == 0 {
            bail!("QUARRY_LEAF_SIZE must be greater than 0");
        }

        if args.batch_size == 0 || args.batch_size > MAX_BATCH_SIZE {
            bail!(
                "QUARRY_BATCH_SIZE ({}) must be between 1 and {}",
                args.batch_size,
                MAX_BATCH_SIZE
            );
        }

        if let Command::Collect { fetch_cmd, .. } = &args.command {
            if fetch_cmd.split_whitespace().next().is_none() {
                bail!("QUARRY_FETCH_CMD must not be empty");
            }
        }

        if let Command::Plan { batches: 0 } = args.command {
            bail!("--batches must be greater than 0");
        }

        let log_level = if args.verbose {
            "debug"
        } else if args.silent {
            "error"
        } else {
            "info"
        };

        Ok(Self {
            windows_path: args.windows,
            data_dir: args.data_dir,
            leaf_size: args.leaf_size,
            batch_size: args.batch_size,
            prefix: args.prefix,
            log_level,
            command: args.command,
        })
    }
}
