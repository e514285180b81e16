use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Engine-wide configuration, loaded from TOML by the embedding service
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    /// Name or path of the git binary to invoke
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Upper bound on any single git invocation
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Committer identity used for merge and conflict-resolution commits
    #[serde(default = "default_committer_name")]
    pub committer_name: String,
    #[serde(default = "default_committer_email")]
    pub committer_email: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct WorkspaceConfig {
    /// Parent directory for ephemeral clones; system temp dir when unset
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AuditConfig {
    /// Record every git invocation to the audit log
    #[serde(default)]
    pub log_commands: bool,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

fn default_binary() -> String {
    "git".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_committer_name() -> String {
    "githarbor".to_string()
}

fn default_committer_email() -> String {
    "githarbor@localhost".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            binary: default_binary(),
            timeout_seconds: default_timeout(),
            committer_name: default_committer_name(),
            committer_email: default_committer_email(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            git: GitConfig::default(),
            workspace: WorkspaceConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = toml::from_str(&contents)?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(dir) = path.as_ref().parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.git.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "git.binary must not be empty".to_string(),
            ));
        }

        if self.git.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "git.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.git.committer_name.trim().is_empty()
            || self.git.committer_email.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue(
                "git.committer_name and git.committer_email must not be empty".to_string(),
            ));
        }

        if let Some(root) = &self.workspace.temp_root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "workspace.temp_root must not be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}
