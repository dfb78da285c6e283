//! YAML configuration for the sync engine.
//!
//! # Storage layout
//!
//! ```text
//! ~/.depsync/
//!   config.yaml   (mode 0600 — holds the airtable token)
//! ```
//!
//! Values are layered: file, then environment (`DEPSYNC_AIRTABLE_TOKEN`,
//! `DEPSYNC_AIRTABLE_BASE_ID`), then whatever the caller overrides from flags.
//!
//! As with every path-taking API in this crate, `fn_at(home, …)` takes an
//! explicit home and `fn(…)` derives it from `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::TableKind;

pub const TOKEN_ENV: &str = "DEPSYNC_AIRTABLE_TOKEN";
pub const BASE_ID_ENV: &str = "DEPSYNC_AIRTABLE_BASE_ID";

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Remote table name for each [`TableKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub providers: String,
    pub accounts: String,
    pub repositories: String,
    pub labels: String,
    pub milestones: String,
    pub issues: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            providers: "Providers".to_string(),
            accounts: "Accounts".to_string(),
            repositories: "Repositories".to_string(),
            labels: "Labels".to_string(),
            milestones: "Milestones".to_string(),
            issues: "Issues and PRs".to_string(),
        }
    }
}

impl TableNames {
    pub fn name(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Provider => &self.providers,
            TableKind::Account => &self.accounts,
            TableKind::Repository => &self.repositories,
            TableKind::Label => &self.labels,
            TableKind::Milestone => &self.milestones,
            TableKind::Issue => &self.issues,
        }
    }

    pub fn set(&mut self, kind: TableKind, name: impl Into<String>) {
        let slot = match kind {
            TableKind::Provider => &mut self.providers,
            TableKind::Account => &mut self.accounts,
            TableKind::Repository => &mut self.repositories,
            TableKind::Label => &mut self.labels,
            TableKind::Milestone => &mut self.milestones,
            TableKind::Issue => &mut self.issues,
        };
        *slot = name.into();
    }
}

/// Connection settings for the remote tabular store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirtableConfig {
    pub base_id: String,
    pub token: String,
    /// Upper bound on outbound calls per second.
    pub requests_per_second: u32,
    /// Retries on 429/5xx before a call is reported as failed.
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub tables: TableNames,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            base_id: String::new(),
            token: String::new(),
            requests_per_second: 5,
            max_retries: 3,
            timeout_secs: 30,
            tables: TableNames::default(),
        }
    }
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    pub airtable: AirtableConfig,
    /// Delete remote rows that no longer match any local entity.
    pub destroy_invalid_records: bool,
    /// Target selectors applied to the graph before syncing.
    pub targets: Vec<String>,
}

impl SyncConfig {
    /// Override credentials from `DEPSYNC_AIRTABLE_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`SyncConfig::apply_env`] with an injectable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.airtable.token = token;
        }
        if let Some(base_id) = lookup(BASE_ID_ENV).filter(|v| !v.is_empty()) {
            self.airtable.base_id = base_id;
        }
    }

    /// Fails with [`ConfigError::MissingCredentials`] when base id or token is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.airtable.base_id.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("base id"));
        }
        if self.airtable.token.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("token"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. Paths
// ---------------------------------------------------------------------------

/// `<home>/.depsync/config.yaml`; pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".depsync").join("config.yaml")
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// Load the config file at `path`; a missing file yields defaults.
pub fn load_from(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Ok(SyncConfig::default());
    }
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(SyncConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.depsync/config.yaml`.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_at(&home()?)
}

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_to(path: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Save to `<home>/.depsync/config.yaml`.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    save_to(&config_path_at(home), config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Current user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    #[test]
    fn config_path_is_correct() {
        let home = make_home();
        assert!(config_path_at(home.path()).ends_with(".depsync/config.yaml"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = make_home();
        let config = load_at(home.path()).expect("load");
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.airtable.requests_per_second, 5);
        assert_eq!(config.airtable.tables.name(TableKind::Issue), "Issues and PRs");
        assert!(!config.destroy_invalid_records);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let home = make_home();
        let mut config = SyncConfig::default();
        config.airtable.base_id = "app123".to_string();
        config.airtable.tables.set(TableKind::Label, "Tags");
        config.targets = vec!["moul/depviz".to_string()];
        save_at(home.path(), &config).expect("save");

        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded, config);
        let tmp = config_path_at(home.path()).with_extension("yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    #[cfg(unix)]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let home = make_home();
        save_at(home.path(), &SyncConfig::default()).expect("save");
        let mode = std::fs::metadata(config_path_at(home.path()))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let home = make_home();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "airtable:\n  base_id: app42\n  tables:\n    issues: Tickets\n")
            .unwrap();

        let config = load_at(home.path()).expect("load");
        assert_eq!(config.airtable.base_id, "app42");
        assert_eq!(config.airtable.tables.issues, "Tickets");
        assert_eq!(config.airtable.tables.accounts, "Accounts");
        assert_eq!(config.airtable.max_retries, 3);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let home = make_home();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "airtable: [unclosed").unwrap();

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn env_overrides_credentials() {
        let env: HashMap<&str, &str> =
            HashMap::from([(TOKEN_ENV, "patXYZ"), (BASE_ID_ENV, "appENV")]);
        let mut config = SyncConfig::default();
        config.airtable.token = "from-file".to_string();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.airtable.token, "patXYZ");
        assert_eq!(config.airtable.base_id, "appENV");
    }

    #[test]
    fn empty_env_value_does_not_clobber_file() {
        let mut config = SyncConfig::default();
        config.airtable.token = "from-file".to_string();
        config.apply_env_from(|_| Some(String::new()));
        assert_eq!(config.airtable.token, "from-file");
    }

    #[test]
    fn validate_requires_both_credentials() {
        let mut config = SyncConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredentials("base id"))
        ));
        config.airtable.base_id = "app1".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredentials("token"))
        ));
        config.airtable.token = "pat1".to_string();
        assert!(config.validate().is_ok());
    }
}
