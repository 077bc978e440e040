use super::config::{Command, CollectorConfig};
use super::fetch::CommandFetcher;
use super::runner::Collector;
use super::store::{OutcomeLog, StoredOutcomes};
use super::validate::find_issues;
use super::windows::WindowFile;
use anyhow::{Context, bail};
use quarry::{IdRange, Outcome, RootSpace, SpaceReport, from_fullname, to_fullname};
use std::collections::HashSet;
use std::io::Write;

/// Runs the configured subcommand, writing user-facing output to `out`.
pub fn run(config: &CollectorConfig, out: &mut impl Write) -> anyhow::Result<()> {
    match &config.command {
        Command::Plan { batches } => plan(config, *batches, out),
        Command::Record { hits, misses } => record(config, hits, misses, out),
        Command::Status { json } => status(config, *json, out),
        Command::Validate => validate(config, out),
        Command::Collect {
            fetch_cmd,
            max_batches,
            max_failures,
        } => collect(config, fetch_cmd, *max_batches, *max_failures, out),
    }
}

fn build_space(config: &CollectorConfig) -> anyhow::Result<RootSpace> {
    let space_config = WindowFile::load(&config.windows_path)?.to_config(config.leaf_size)?;
    RootSpace::from_config(&space_config)
        .with_context(|| format!("invalid windows in {}", config.windows_path.display()))
}

/// Builds the space and replays every outcome stored in the data directory.
fn load_space(config: &CollectorConfig) -> anyhow::Result<(RootSpace, StoredOutcomes)> {
    let mut space = build_space(config)?;
    let stored = OutcomeLog::load(&config.data_dir)?;
    let ids: Vec<u64> = stored.hits.iter().chain(&stored.misses).copied().collect();
    space
        .check_in_turn(&ids)
        .context("stored outcomes do not fit the windows; run `quarry validate`")?;
    let summary = space
        .replay(stored.hits.iter().copied(), stored.misses.iter().copied())
        .context("stored outcomes do not fit the windows; run `quarry validate`")?;
    tracing::info!(
        hits = summary.hits,
        misses = summary.misses,
        needed = space.needed(),
        "replayed stored outcomes"
    );
    Ok((space, stored))
}

fn plan(config: &CollectorConfig, batches: usize, out: &mut impl Write) -> anyhow::Result<()> {
    let (mut space, _) = load_space(config)?;
    // One draw, so the batches never overlap.
    let ids = space.draw(config.batch_size.saturating_mul(batches));
    if ids.is_empty() {
        tracing::warn!("nothing left to propose");
    }
    for chunk in ids.chunks(config.batch_size) {
        let names: Vec<String> = chunk
            .iter()
            .map(|&id| to_fullname(&config.prefix, id))
            .collect();
        writeln!(out, "{}", names.join(","))?;
    }
    Ok(())
}

fn record(
    config: &CollectorConfig,
    hits: &[String],
    misses: &[String],
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let (mut space, stored) = load_space(config)?;
    let mut seen: HashSet<u64> = stored.hits.iter().chain(&stored.misses).copied().collect();

    let named = hits
        .iter()
        .map(|name| (name, Outcome::Hit))
        .chain(misses.iter().map(|name| (name, Outcome::Miss)));
    let mut outcomes = Vec::with_capacity(hits.len() + misses.len());
    for (name, outcome) in named {
        let id = from_fullname(&config.prefix, name)
            .with_context(|| format!("invalid ID {name:?}"))?;
        if space.window_for(id).is_none() {
            bail!("{name} is outside every window");
        }
        if !seen.insert(id) {
            bail!("{name} is already recorded");
        }
        outcomes.push((id, outcome));
    }
    let ids: Vec<u64> = outcomes.iter().map(|&(id, _)| id).collect();
    space
        .check_in_turn(&ids)
        .context("record IDs in the order `quarry plan` proposes them")?;

    for &(id, outcome) in &outcomes {
        space.record_outcome(id, outcome)?;
    }
    OutcomeLog::open(&config.data_dir)?.append(&outcomes)?;

    writeln!(
        out,
        "recorded {} outcomes, {} still needed",
        outcomes.len(),
        space.needed()
    )?;
    Ok(())
}

fn status(config: &CollectorConfig, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let (space, _) = load_space(config)?;
    let report = space.report();
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        write_table(&report, out)?;
    }
    Ok(())
}

fn write_table(report: &SpaceReport, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Date,Min,Hits,Misses,Total,Needed,Status")?;
    for window in &report.windows {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            window.display_start.format("%Y-%m"),
            window.min_quota,
            window.hits,
            window.misses,
            window.hits + window.misses,
            window.needed,
            window.status,
        )?;
    }
    writeln!(
        out,
        "Total,,{},{},{},{},",
        report.hits,
        report.misses,
        report.hits + report.misses,
        report.needed
    )?;
    Ok(())
}

fn validate(config: &CollectorConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let space = build_space(config)?;
    let stored = OutcomeLog::load(&config.data_dir)?;
    writeln!(
        out,
        "{} windows, {} stored outcomes",
        space.windows().len(),
        stored.total()
    )?;

    let issues = find_issues(&space, &stored);
    for issue in &issues {
        writeln!(out, "{issue}")?;
    }
    if !issues.is_empty() {
        bail!("found {} issues", issues.len());
    }
    writeln!(out, "ok")?;
    Ok(())
}

fn collect(
    config: &CollectorConfig,
    fetch_cmd: &str,
    max_batches: Option<u64>,
    max_failures: u32,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let (space, _) = load_space(config)?;
    let fetcher = CommandFetcher::parse(fetch_cmd, config.prefix.as_str())?;
    let log = OutcomeLog::open(&config.data_dir)?;
    let mut collector = Collector::new(space, log, fetcher, config.batch_size);

    let result = collector.run(max_batches, max_failures);
    // The summary reflects what was recorded even when the run aborts.
    let path = collector.log().write_summary(&collector.space().report())?;
    tracing::info!("wrote {}", path.display());

    let summary = result?;
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::config::CliArgs;
    use crate::collector::store::{OUTCOMES_FILE, SUMMARY_FILE};
    use quarry::encode_base36;
    use clap::Parser;
    use std::path::Path;

    const WINDOWS: &str = r#"{
        "time_start": "2010-01-01",
        "time_step": 6,
        "windows": [
            { "start": "0", "min": 3 },
            { "start": "1c", "end": "2s", "min": 3 }
        ]
    }"#;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("windows.json"), WINDOWS).unwrap();
        dir
    }

    fn config(dir: &Path, args: &[&str]) -> CollectorConfig {
        let windows = dir.join("windows.json");
        let data = dir.join("out");
        let base = [
            "quarry",
            "--windows",
            windows.to_str().unwrap(),
            "--data-dir",
            data.to_str().unwrap(),
            "--leaf-size",
            "16",
            "--batch-size",
            "4",
            "--prefix",
            "t1_",
        ];
        let args = CliArgs::try_parse_from(base.iter().chain(args)).unwrap();
        CollectorConfig::try_from(args).unwrap()
    }

    fn run_to_string(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
        let mut out = Vec::new();
        run(&config(dir, args), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn plan_prints_disjoint_batches() {
        let dir = setup();
        let output = run_to_string(dir.path(), &["plan", "--batches", "3"]).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);

        let names: HashSet<&str> = lines.iter().flat_map(|line| line.split(',')).collect();
        assert_eq!(names.len(), 12);
        assert!(names.iter().all(|name| name.starts_with("t1_")));

        // Nothing was recorded, so planning again proposes the same IDs.
        let again = run_to_string(dir.path(), &["plan", "--batches", "3"]).unwrap();
        assert_eq!(again, output);
    }

    fn planned(dir: &Path, batches: &str) -> Vec<String> {
        let output = run_to_string(dir, &["plan", "--batches", batches]).unwrap();
        output
            .lines()
            .flat_map(|line| line.split(','))
            .map(String::from)
            .collect()
    }

    fn log_contents(dir: &Path) -> String {
        std::fs::read_to_string(dir.join("out").join(OUTCOMES_FILE)).unwrap()
    }

    #[test]
    fn record_then_status() {
        let dir = setup();
        // The first two planned IDs come from the first window, the last two
        // from the second.
        let names = planned(dir.path(), "1");
        let hits = names[..3].join(",");
        run_to_string(dir.path(), &["record", "--hits", &hits, "--misses", &names[3]]).unwrap();

        let table = run_to_string(dir.path(), &["status"]).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Date,Min,Hits,Misses,Total,Needed,Status");
        assert_eq!(lines[1], "2010-01,3,2,0,2,1,in_progress");
        assert_eq!(lines[2], "2010-07,3,1,1,2,2,in_progress");
        assert_eq!(lines[3], "Total,,3,1,4,3,");

        let json = run_to_string(dir.path(), &["status", "--json"]).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["hits"], 3);
        assert_eq!(report["windows"][1]["needed"], 2);
    }

    #[test]
    fn recorded_ids_are_not_planned_again() {
        let dir = setup();
        let first = planned(dir.path(), "1");
        let hits = first[..2].join(",");
        let misses = first[2..].join(",");
        run_to_string(dir.path(), &["record", "--hits", &hits, "--misses", &misses]).unwrap();

        let next = planned(dir.path(), "5");
        assert_eq!(next.len(), 20);
        assert!(next.iter().all(|name| !first.contains(name)), "{next:?}");

        // Recording a later batch keeps every future plan clear of both.
        run_to_string(dir.path(), &["record", "--misses", &next[..4].join(",")]).unwrap();
        let after = planned(dir.path(), "5");
        assert!(after.iter().all(|name| !first.contains(name) && !next[..4].contains(name)));
    }

    #[test]
    fn out_of_turn_ids_are_rejected() {
        let dir = setup();
        let space = build_space(&config(dir.path(), &["status"])).unwrap();
        let second = space.leaf_for(0).unwrap().peek(2)[1];
        let name = to_fullname("t1_", second);

        let err = run_to_string(dir.path(), &["record", "--hits", &name]).unwrap_err();
        assert!(format!("{err:#}").contains("not next in line"), "{err:#}");
        assert!(!dir.path().join("out").join(OUTCOMES_FILE).exists());

        // The same ID smuggled into the log blocks resuming and fails validation.
        let data = dir.path().join("out");
        std::fs::create_dir_all(&data).unwrap();
        let line = format!("h {}\nc 1\n", encode_base36(second));
        std::fs::write(data.join(OUTCOMES_FILE), line).unwrap();
        assert!(run_to_string(dir.path(), &["plan"]).is_err());
        let err = run_to_string(dir.path(), &["validate"]).unwrap_err();
        assert_eq!(err.to_string(), "found 1 issues");
    }

    #[test]
    fn record_rejects_repeats_and_foreign_ids() {
        let dir = setup();
        let names = planned(dir.path(), "1");
        run_to_string(dir.path(), &["record", "--hits", &names[0]]).unwrap();

        assert!(run_to_string(dir.path(), &["record", "--misses", &names[0]]).is_err());
        let twice = format!("{},{}", names[1], names[1]);
        assert!(run_to_string(dir.path(), &["record", "--hits", &twice]).is_err());
        assert!(run_to_string(dir.path(), &["record", "--hits", "zz"]).is_err());

        // Rejected commands leave the log untouched.
        let id = names[0].strip_prefix("t1_").unwrap();
        assert_eq!(log_contents(dir.path()), format!("h {id}\nc 1\n"));
    }

    #[test]
    fn validate_reports_issues() {
        let dir = setup();
        assert!(run_to_string(dir.path(), &["validate"]).unwrap().ends_with("ok\n"));

        let data = dir.path().join("out");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join(OUTCOMES_FILE), "h 1\nh 1\nc 2\nh zz\nc 1\n").unwrap();
        let err = run_to_string(dir.path(), &["validate"]).unwrap_err();
        assert_eq!(err.to_string(), "found 2 issues");
    }

    #[test]
    fn corrupt_logs_block_other_commands() {
        let dir = setup();
        let data = dir.path().join("out");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join(OUTCOMES_FILE), "x 1\nc 1\n").unwrap();
        assert!(run_to_string(dir.path(), &["status"]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn collect_fills_quotas_and_writes_summary() {
        let dir = setup();
        // Every proposed name exists.
        let script = dir.path().join("fetch.sh");
        std::fs::write(&script, "#!/bin/sh\nprintf '%s\\n' \"$1\" | tr ',' '\\n'\n").unwrap();
        let fetch_cmd = format!("sh {}", script.display());

        let output = run_to_string(dir.path(), &["collect", "--fetch-cmd", &fetch_cmd]).unwrap();
        let summary: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        // Two batches of four: the second tops up both windows past quota.
        assert_eq!(summary["stop"], "satisfied");
        assert_eq!(summary["batches"], 2);
        assert_eq!(summary["hits"], 8);

        let written = std::fs::read_to_string(dir.path().join("out").join(SUMMARY_FILE)).unwrap();
        let written: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert!(written["timestamp"].is_string());
        assert_eq!(written["needed"], 0);
    }
}
