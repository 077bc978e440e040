use anyhow::{Context, bail};
use chrono::{Months, NaiveDate};
use quarry::{SpaceConfig, WindowSpec, decode_base36};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk description of the windows to collect from.
///
/// IDs are base 36. Window `i` covers `time_step` months starting
/// `i * time_step` months after `time_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFile {
    pub time_start: NaiveDate,
    /// Calendar months per window.
    pub time_step: u32,
    pub windows: Vec<WindowEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub start: String,
    /// Defaults to the next window's start. Required on the last window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub min: u64,
}

impl WindowFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read window file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse window file {}", path.display()))
    }

    /// Resolves IDs and display dates into window specs.
    ///
    /// Tiling is not checked here; building the space does that.
    pub fn to_specs(&self) -> anyhow::Result<Vec<WindowSpec>> {
        if self.time_step == 0 {
            bail!("time_step must be at least one month");
        }
        if self.windows.is_empty() {
            bail!("window file lists no windows");
        }

        let step = Months::new(self.time_step);
        let mut display_start = self.time_start;
        let mut specs = Vec::with_capacity(self.windows.len());

        for (index, entry) in self.windows.iter().enumerate() {
            let end = match (&entry.end, self.windows.get(index + 1)) {
                (Some(end), _) => end,
                (None, Some(next)) => &next.start,
                (None, None) => bail!("the last window ({}) needs an explicit end", entry.start),
            };
            let display_end = display_start
                .checked_add_months(step)
                .with_context(|| format!("window {index} runs past the calendar"))?;

            specs.push(WindowSpec {
                start_id: parse_id(&entry.start, index)?,
                end_id: parse_id(end, index)?,
                display_start,
                display_end,
                min_quota: entry.min,
            });
            display_start = display_end;
        }
        Ok(specs)
    }

    pub fn to_config(&self, leaf_size: u64) -> anyhow::Result<SpaceConfig> {
        Ok(SpaceConfig::new(self.to_specs()?).with_leaf_size(leaf_size))
    }
}

fn parse_id(raw: &str, index: usize) -> anyhow::Result<u64> {
    decode_base36(raw.trim()).with_context(|| format!("window {index}: invalid base-36 ID {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "time_start": "2006-01-01",
        "time_step": 3,
        "windows": [
            { "start": "a0", "min": 5 },
            { "start": "b0", "min": 7 },
            { "start": "c0", "end": "d0", "min": 0 }
        ]
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ends_default_to_next_start() {
        let file: WindowFile = serde_json::from_str(SAMPLE).unwrap();
        let specs = file.to_specs().unwrap();

        assert_eq!(specs.len(), 3);
        assert_eq!((specs[0].start_id, specs[0].end_id), (360, 396));
        assert_eq!((specs[1].start_id, specs[1].end_id), (396, 432));
        assert_eq!((specs[2].start_id, specs[2].end_id), (432, 468));
        assert_eq!(specs[1].min_quota, 7);
    }

    #[test]
    fn display_dates_step_by_months() {
        let file: WindowFile = serde_json::from_str(SAMPLE).unwrap();
        let specs = file.to_specs().unwrap();

        assert_eq!(specs[0].display_start, date(2006, 1, 1));
        assert_eq!(specs[0].display_end, date(2006, 4, 1));
        assert_eq!(specs[2].display_start, date(2006, 7, 1));
        assert_eq!(specs[2].display_end, date(2006, 10, 1));
    }

    #[test]
    fn last_window_needs_an_end() {
        let mut file: WindowFile = serde_json::from_str(SAMPLE).unwrap();
        file.windows[2].end = None;
        assert!(file.to_specs().is_err());
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut file: WindowFile = serde_json::from_str(SAMPLE).unwrap();
        file.time_step = 0;
        assert!(file.to_specs().is_err());
    }

    #[test]
    fn bad_ids_are_reported() {
        let mut file: WindowFile = serde_json::from_str(SAMPLE).unwrap();
        file.windows[1].start = "b-0".into();
        let err = file.to_specs().unwrap_err();
        assert!(err.to_string().contains("window 0"), "{err}");
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windows.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = WindowFile::load(&path).unwrap().to_config(10).unwrap();
        assert_eq!(config.leaf_size, 10);
        assert_eq!(config.windows.len(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WindowFile::load(&dir.path().join("nope.json")).is_err());
    }
}
