//! Append-only error log for recoverable per-agent solve failures.
//!
//! Entries accumulate in memory during the run (mirrored to the tracing
//! output as they arrive) and are written to a timestamped file on demand.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::NoSolution;

#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Vec<String>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a no-solution condition for an agent/period pair.
    pub fn no_solution(&mut self, err: &NoSolution) {
        tracing::warn!(
            agent = err.agent,
            period = err.period as u64,
            "no optimum found; carrying prior decision forward"
        );
        self.entries.push(err.to_string());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all entries to a timestamped file under `dir`. Nothing is
    /// written (and no file created) when the log is empty.
    pub fn save(&self, dir: impl AsRef<Path>) -> std::io::Result<Option<PathBuf>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        fs::create_dir_all(dir.as_ref())?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.as_ref().join(format!("log-{stamp}.txt"));
        let mut file = fs::File::create(&path)?;
        for entry in &self.entries {
            writeln!(file, "{entry}")?;
        }
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new();
        assert!(log.save(dir.path()).unwrap().is_none());
    }

    #[test]
    fn entries_are_saved_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ErrorLog::new();
        log.no_solution(&NoSolution { agent: 4, period: 2 });
        log.no_solution(&NoSolution { agent: 9, period: 3 });

        let path = log.save(dir.path()).unwrap().unwrap();
        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("agent 4") && lines[0].contains("period 2"));
        assert!(lines[1].contains("agent 9") && lines[1].contains("period 3"));
    }
}
