//! Logging configuration shared by the front-ends
//!
//! The subscriber itself is installed by the application crate; this module
//! only describes where logs go and how many files are retained.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;

const LOG_FILE_PREFIX: &str = "soundreactive_";
const LOG_FILE_EXTENSION: &str = "log";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level: trace, debug, info, warn or error
    pub level: String,
    /// Write to stderr
    pub console_output: bool,
    /// Write to a dated file in `log_directory`
    pub file_output: bool,
    /// Directory holding log files
    pub log_directory: PathBuf,
    /// Number of log files kept by [`LogConfig::cleanup_old_logs`]
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_directory: PathBuf::from("logs"),
            max_log_files: 10,
        }
    }
}

impl LogConfig {
    /// Parse `level`, falling back to INFO
    pub fn parse_level(&self) -> Level {
        self.level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Create the log directory if file output is enabled
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Path of today's log file
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y-%m-%d");
        self.log_directory
            .join(format!("{}{}.{}", LOG_FILE_PREFIX, stamp, LOG_FILE_EXTENSION))
    }

    /// Delete the oldest log files beyond `max_log_files`.
    ///
    /// Returns the number of files removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_directory.is_dir() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_log_file(path))
            .collect();

        if logs.len() <= self.max_log_files {
            return Ok(0);
        }

        // Dated names sort chronologically
        logs.sort();
        let excess = logs.len() - self.max_log_files;
        for path in &logs[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

fn is_log_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == LOG_FILE_EXTENSION);
    path.is_file() && name_matches && ext_matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), Level::INFO);
        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), Level::DEBUG);
        config.level = "nonsense".to_string();
        assert_eq!(config.parse_level(), Level::INFO);
    }

    #[test]
    fn test_current_log_path_in_directory() {
        let config = LogConfig {
            log_directory: PathBuf::from("/tmp/sr-logs"),
            ..Default::default()
        };
        let path = config.current_log_path();
        assert!(path.starts_with("/tmp/sr-logs"));
        assert!(is_log_name(&path));
    }

    fn is_log_name(path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
    }

    #[test]
    fn test_ensure_log_directory() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            file_output: true,
            log_directory: dir.path().join("nested/logs"),
            ..Default::default()
        };
        config.ensure_log_directory().unwrap();
        assert!(config.log_directory.is_dir());
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for day in 1..=5 {
            fs::write(
                dir.path().join(format!("soundreactive_2024-01-0{}.log", day)),
                "x",
            )
            .unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let config = LogConfig {
            log_directory: dir.path().to_path_buf(),
            max_log_files: 2,
            ..Default::default()
        };
        assert_eq!(config.cleanup_old_logs().unwrap(), 3);
        assert!(dir.path().join("soundreactive_2024-01-05.log").exists());
        assert!(dir.path().join("soundreactive_2024-01-04.log").exists());
        assert!(!dir.path().join("soundreactive_2024-01-01.log").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_cleanup_missing_directory() {
        let config = LogConfig {
            log_directory: PathBuf::from("/nonexistent/soundreactive/logs"),
            ..Default::default()
        };
        assert_eq!(config.cleanup_old_logs().unwrap(), 0);
    }
}
