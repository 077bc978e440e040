use anyhow::{Context, bail};
use chrono::{SecondsFormat, Utc};
use quarry::{Outcome, SpaceReport, decode_base36, encode_base36};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const OUTCOMES_FILE: &str = "outcomes.txt";
pub const SUMMARY_FILE: &str = "summary.json";

const HIT_TAG: &str = "h";
const MISS_TAG: &str = "m";
const COMMIT_TAG: &str = "c";

/// Everything read back from a data directory, in file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoredOutcomes {
    pub hits: Vec<u64>,
    pub misses: Vec<u64>,
}

impl StoredOutcomes {
    pub fn total(&self) -> usize {
        self.hits.len() + self.misses.len()
    }
}

/// Append-only record of outcomes.
///
/// Every batch is one `write_all` of tagged lines (`h <id>` or `m <id>`, IDs
/// in base 36) closed by a `c <count>` commit line, then synced. A batch
/// without its commit line was torn by a crash: loading ignores it and
/// opening cuts it off, so the log only ever holds whole batches.
#[derive(Debug)]
pub struct OutcomeLog {
    dir: PathBuf,
    file: File,
}

impl OutcomeLog {
    /// Opens (creating if needed) the log under `dir`, dropping any torn
    /// batch at its end.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        let path = dir.join(OUTCOMES_FILE);

        let committed = read_log(&path)?.committed_len;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let len = file.metadata()?.len();
        if len > committed {
            tracing::warn!(
                torn_bytes = len - committed,
                "dropping a torn batch from {}",
                path.display()
            );
            file.set_len(committed)?;
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            file,
        })
    }

    /// Reads every committed outcome under `dir`. A missing log reads as
    /// empty.
    pub fn load(dir: &Path) -> anyhow::Result<StoredOutcomes> {
        let log = read_log(&dir.join(OUTCOMES_FILE))?;
        if log.torn > 0 {
            tracing::warn!(torn = log.torn, "ignoring a torn batch");
        }
        Ok(log.outcomes)
    }

    /// Appends `outcomes` as one committed batch.
    pub fn append(&mut self, outcomes: &[(u64, Outcome)]) -> anyhow::Result<()> {
        if outcomes.is_empty() {
            return Ok(());
        }
        let mut batch = String::with_capacity(outcomes.len() * 16);
        for &(id, outcome) in outcomes {
            let tag = if outcome.is_hit() { HIT_TAG } else { MISS_TAG };
            batch.push_str(tag);
            batch.push(' ');
            batch.push_str(&encode_base36(id));
            batch.push('\n');
        }
        batch.push_str(&format!("{COMMIT_TAG} {}\n", outcomes.len()));

        self.file
            .write_all(batch.as_bytes())
            .context("failed to append outcomes")?;
        self.file.sync_data().context("failed to sync outcomes")?;
        Ok(())
    }

    /// Overwrites `summary.json` with `report` and the current time.
    pub fn write_summary(&self, report: &SpaceReport) -> anyhow::Result<PathBuf> {
        #[derive(Serialize)]
        struct Summary<'a> {
            timestamp: String,
            #[serde(flatten)]
            report: &'a SpaceReport,
        }

        let path = self.dir.join(SUMMARY_FILE);
        let summary = Summary {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            report,
        };
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Debug, Default)]
struct ParsedLog {
    outcomes: StoredOutcomes,
    /// Bytes up to and including the last commit line.
    committed_len: u64,
    /// Lines after the last commit line.
    torn: usize,
}

fn read_log(path: &Path) -> anyhow::Result<ParsedLog> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ParsedLog::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let mut log = ParsedLog::default();
    let mut pending: Vec<(u64, Outcome)> = Vec::new();
    let mut offset = 0;
    let mut cut_short = false;

    // A write cut short mid-line leaves a last line without its newline.
    for (number, line) in raw.split_inclusive('\n').enumerate() {
        offset += line.len();
        let Some(line) = line.strip_suffix('\n') else {
            cut_short = true;
            break;
        };
        let at = || format!("{}:{}", path.display(), number + 1);

        let Some((tag, value)) = line.split_once(' ') else {
            bail!("{}: malformed line {line:?}", at());
        };
        match tag {
            HIT_TAG | MISS_TAG => {
                let id = decode_base36(value)
                    .with_context(|| format!("{}: invalid ID {value:?}", at()))?;
                pending.push((id, Outcome::from(tag == HIT_TAG)));
            }
            COMMIT_TAG => {
                let count: usize = value
                    .parse()
                    .with_context(|| format!("{}: invalid commit {value:?}", at()))?;
                if count != pending.len() {
                    bail!(
                        "{}: commit of {count} outcomes follows {} lines",
                        at(),
                        pending.len()
                    );
                }
                for (id, outcome) in pending.drain(..) {
                    match outcome {
                        Outcome::Hit => log.outcomes.hits.push(id),
                        Outcome::Miss => log.outcomes.misses.push(id),
                    }
                }
                log.committed_len = offset as u64;
            }
            _ => bail!("{}: unknown tag {tag:?}", at()),
        }
    }

    log.torn = pending.len() + usize::from(cut_short);
    Ok(log)
}
