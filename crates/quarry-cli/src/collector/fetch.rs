use anyhow::{Context, bail};
use quarry::{from_fullname, to_fullname};
use std::collections::HashSet;
use std::process::Command;

/// Source of truth for which proposed IDs exist.
pub trait Fetcher {
    /// Looks up `ids` and returns the subset that exists.
    ///
    /// An error means nothing is known about the batch; it is not recorded
    /// and will be proposed again.
    fn fetch(&mut self, ids: &[u64]) -> anyhow::Result<HashSet<u64>>;
}

/// Runs an external program once per batch.
///
/// The program receives the comma-joined fullnames as its last argument and
/// prints one found ID per line, either as a fullname or as bare base 36.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    program: String,
    args: Vec<String>,
    prefix: String,
}

impl CommandFetcher {
    /// Splits `command` on whitespace into a program and its arguments.
    pub fn parse(command: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let Some(program) = parts.next() else {
            bail!("fetch command is empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
            prefix: prefix.into(),
        })
    }
}

impl Fetcher for CommandFetcher {
    fn fetch(&mut self, ids: &[u64]) -> anyhow::Result<HashSet<u64>> {
        let names = ids
            .iter()
            .map(|&id| to_fullname(&self.prefix, id))
            .collect::<Vec<_>>()
            .join(",");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&names)
            .output()
            .with_context(|| format!("failed to run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                from_fullname(&self.prefix, line)
                    .with_context(|| format!("{} printed an invalid ID {line:?}", self.program))
            })
            .collect()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn echoed_names_come_back_as_ids() {
        // Quoted scripts do not survive whitespace splitting, so set the
        // arguments directly. `$0` is the comma-joined batch.
        let mut fetcher = CommandFetcher::parse("sh", "t1_").unwrap();
        fetcher.args = vec!["-c".into(), r#"printf '%s' "$0" | tr ',' '\n'"#.into()];

        let found = fetcher.fetch(&[35, 36, 1_295]).unwrap();
        assert_eq!(found, HashSet::from([35, 36, 1_295]));
    }

    #[test]
    fn empty_output_means_no_hits() {
        let mut fetcher = CommandFetcher::parse("true", "t1_").unwrap();
        assert!(fetcher.fetch(&[1, 2, 3]).unwrap().is_empty());
    }

    #[test]
    fn failing_command_is_an_error() {
        let mut fetcher = CommandFetcher::parse("false", "t1_").unwrap();
        assert!(fetcher.fetch(&[1]).is_err());
    }

    #[test]
    fn missing_program_is_an_error() {
        let mut fetcher = CommandFetcher::parse("quarry-no-such-program-here", "t1_").unwrap();
        assert!(fetcher.fetch(&[1]).is_err());
    }

    #[test]
    fn arguments_are_split_on_whitespace() {
        let fetcher = CommandFetcher::parse("  python3 fetch.py  --token x ", "t1_").unwrap();
        assert_eq!(fetcher.program, "python3");
        assert_eq!(fetcher.args, vec!["fetch.py", "--token", "x"]);
        assert!(CommandFetcher::parse("   ", "t1_").is_err());
    }
}
