//! Repository configuration record (`.svcs/config.json`).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SvcsResult;

pub const CONFIG_FILE: &str = "config.json";
pub const FORMAT_VERSION: &str = "1.0";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_AUTHOR: &str = "user";

/// Environment override for the commit author.
pub const AUTHOR_ENV: &str = "SVCS_AUTHOR";

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub version: String,
    pub created: DateTime<Utc>,
    pub branch: String,
    #[serde(default = "default_author")]
    pub default_author: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            created: Utc::now(),
            branch: DEFAULT_BRANCH.to_string(),
            default_author: default_author(),
        }
    }
}

impl RepoConfig {
    /// Read `config.json` from `dir`; `None` if it does not exist.
    pub fn load(dir: &Path) -> SvcsResult<Option<Self>> {
        match fs::read(dir.join(CONFIG_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, dir: &Path) -> SvcsResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(CONFIG_FILE), json + "\n")?;
        Ok(())
    }

    /// Author for a commit: the explicit value, else `$SVCS_AUTHOR`, else the
    /// configured default.
    pub fn resolve_author(&self, explicit: Option<&str>) -> String {
        if let Some(author) = explicit.map(str::trim).filter(|a| !a.is_empty()) {
            return author.to_string();
        }
        match std::env::var(AUTHOR_ENV) {
            Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
            _ => self.default_author.clone(),
        }
    }
}
