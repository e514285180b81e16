use crate::config::AuditConfig;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Appends one line per external git invocation to a size-rotated log file.
///
/// Also records workspace cleanup failures, which are logged rather than
/// propagated so they never mask the result of the operation that owned the
/// workspace.
#[derive(Debug)]
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    /// Create a new AuditLogger with the default log path
    pub fn new() -> std::io::Result<Self> {
        let log_path = Self::default_log_path()?;
        Self::with_path(log_path)
    }

    /// Build a shared logger from config; None when logging is disabled or
    /// the log file cannot be set up.
    pub fn from_config(config: &AuditConfig) -> Option<Arc<Self>> {
        if !config.log_commands {
            return None;
        }

        let logger = match &config.log_path {
            Some(path) => Self::with_path(path),
            None => Self::new(),
        };

        logger.ok().map(Arc::new)
    }

    /// Create an AuditLogger with a custom log path
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { log_path })
    }

    /// Get the default log path: ~/.config/githarbor/commands.log
    fn default_log_path() -> std::io::Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            )
        })?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("githarbor")
            .join("commands.log"))
    }

    /// Log one git invocation
    pub fn log_command(
        &self,
        command: &str,
        working_dir: &Path,
        exit_code: i32,
    ) -> std::io::Result<()> {
        self.rotate_if_needed()?;

        let timestamp = Utc::now().to_rfc3339();
        let entry = format!(
            "[{}] [{}] [exit:{}] git {}\n",
            timestamp,
            working_dir.display(),
            exit_code,
            command
        );

        self.append(&entry)
    }

    /// Log a failed workspace removal
    pub fn log_cleanup_failure(&self, workspace_root: &Path, error: &str) -> std::io::Result<()> {
        self.rotate_if_needed()?;

        let timestamp = Utc::now().to_rfc3339();
        let entry = format!(
            "[{}] [{}] [CLEANUP-FAILED] {}\n",
            timestamp,
            workspace_root.display(),
            error
        );

        self.append(&entry)
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(entry.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Rotate log file if it exceeds MAX_LOG_SIZE
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(&self.log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            // Rotate: commands.log -> commands.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
