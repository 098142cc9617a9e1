use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use memento_core::{Backend, Journal, MemoryStore, SqliteStore};

/// Overrides the database location. `:memory:` keeps nothing on disk.
pub const DB_ENV: &str = "MEMENTO_DB";
/// `true` selects the remote backend.
pub const REMOTE_ENV: &str = "MEMENTO_USE_REMOTE";
/// Log level filter for stderr logging, e.g. `info` or `memento_core=debug`.
pub const LOG_ENV: &str = "MEMENTO_LOG";

const DEFAULT_LOG_LEVEL: &str = "warn";
const IN_MEMORY_DB: &str = ":memory:";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "memento").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Self::from_env(data_dir, |key| std::env::var(key).ok()))
    }

    fn from_env(data_dir: PathBuf, env: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = env(DB_ENV)
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| data_dir.join("memento.db"), PathBuf::from);
        let backend = Backend::from_flag(env(REMOTE_ENV).as_deref());
        let log_level = env(LOG_ENV)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Config {
            db_path,
            data_dir,
            backend,
            log_level,
        }
    }

    /// Opens the journal on the configured backend.
    pub fn open_journal(&self) -> Result<Journal> {
        if self.db_path.as_os_str() == IN_MEMORY_DB {
            log::debug!("event=journal_open module=config db=memory backend={:?}", self.backend);
            return Ok(Journal::open(self.backend, MemoryStore::new())?);
        }
        let store = SqliteStore::open(&self.db_path)
            .with_context(|| format!("Failed to open database: {}", self.db_path.display()))?;
        log::debug!(
            "event=journal_open module=config db={} backend={:?}",
            self.db_path.display(),
            self.backend
        );
        Ok(Journal::open(self.backend, store)?)
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        log::info!("event=api_key_created module=config path={}", path.display());
        Ok((key, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(dir: &std::path::Path, vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_env(dir.to_path_buf(), |k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path(), &[]);
        assert_eq!(config.db_path, dir.path().join("memento.db"));
        assert_eq!(config.backend, Backend::Local);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(
            dir.path(),
            &[
                (DB_ENV, "/tmp/other.db"),
                (REMOTE_ENV, "true"),
                (LOG_ENV, "debug"),
            ],
        );
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_remote_backend_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path(), &[(REMOTE_ENV, "true")]);
        let err = config.open_journal().err().unwrap();
        assert!(format!("{err:#}").contains("not implemented"));
    }

    #[test]
    fn test_open_journal_local() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path(), &[(REMOTE_ENV, "false")]);
        let journal = config.open_journal().unwrap();
        assert!(journal.all_days().unwrap().is_empty());
        assert!(config.db_path.exists());
    }

    #[test]
    fn test_in_memory_journal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path(), &[(DB_ENV, ":memory:")]);
        let journal = config.open_journal().unwrap();
        assert!(journal.all_days().unwrap().is_empty());
        assert!(!dir.path().join(":memory:").exists());
    }

    #[test]
    fn test_api_key_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path(), &[]);
        let (key, created) = config.load_or_create_api_key().unwrap();
        assert!(created);
        assert_eq!(key.len(), 64);
        let (again, created) = config.load_or_create_api_key().unwrap();
        assert!(!created);
        assert_eq!(again, key);
    }
}
