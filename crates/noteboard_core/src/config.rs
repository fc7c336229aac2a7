//! Host-supplied configuration and session context.
//!
//! # Responsibility
//! - Parse the JSON settings document the host passes at startup.
//! - Carry the session identity that scopes every store call.
//!
//! # Invariants
//! - Every field has a default; `{}` is a valid configuration.
//! - A configuration that passed `validate` never makes the core panic.

use crate::editor::EditorOptions;
use crate::logging::normalize_level;
use crate::model::note::{NoteId, OwnerId, ProjectId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "cannot parse notes config: {err}"),
            Self::Invalid(message) => write!(f, "invalid notes config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace|debug|info|warn|error.
    pub level: String,
    /// Absolute directory for rolling log files; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Quiet period after the last edit before a note is saved.
    pub debounce_ms: u64,
    /// Deepest list nesting reachable with indent.
    pub max_depth: u8,
    /// Undo entries kept per editor session.
    pub history_limit: usize,
    pub max_name_chars: usize,
    pub preview_chars: usize,
    pub logging: LoggingConfig,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 750,
            max_depth: crate::editor::DEFAULT_MAX_DEPTH,
            history_limit: 100,
            max_name_chars: 32,
            preview_chars: 100,
            logging: LoggingConfig::default(),
        }
    }
}

impl NotesConfig {
    /// Parses and validates a JSON settings document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_name_chars == 0 {
            return Err(ConfigError::Invalid(
                "max_name_chars must be at least 1".to_string(),
            ));
        }
        if self.preview_chars == 0 {
            return Err(ConfigError::Invalid(
                "preview_chars must be at least 1".to_string(),
            ));
        }
        normalize_level(&self.logging.level).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if let Some(dir) = &self.logging.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.log_dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            max_depth: self.max_depth,
            history_limit: self.history_limit,
        }
    }
}

/// Identity and preferences of the acting session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub owner_id: OwnerId,
    pub project_id: ProjectId,
    /// Note to reopen on the next load, if it still exists.
    #[serde(default)]
    pub preferred_note_id: Option<NoteId>,
}

impl SessionContext {
    pub fn new(owner_id: OwnerId, project_id: ProjectId) -> Self {
        Self {
            owner_id,
            project_id,
            preferred_note_id: None,
        }
    }
}
