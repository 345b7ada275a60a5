//! Root config record persistence (spec.md §3, §4.2, §6): a single
//! `config.json` under `$HOME/.airgapper`, written atomically under an
//! advisory lock, with directory/file modes hardened to 0700/0600.

pub mod error;
pub mod secrets;

pub use error::ConfigError;

use std::path::{Path, PathBuf};

use airgapper_core::Config;
use airgapper_store::fsutil::{ensure_dir_0700, write_atomic_0600, RecordLock};
use tracing::info;

const CONFIG_DIR_NAME: &str = ".airgapper";
const CONFIG_FILE_NAME: &str = "config.json";
const LOCK_FILE_NAME: &str = "config.lock";

pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// `$HOME/.airgapper`, created with mode 0700 if absent.
    pub fn open_default() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::Io("no home directory".into()))?;
        Self::open(home.join(CONFIG_DIR_NAME))
    }

    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        ensure_dir_0700(&dir)?;
        Ok(Self { dir })
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE_NAME)
    }

    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }

    /// Load the config, failing with `NotInitialized` if no `config.json`
    /// exists yet (spec.md §4.7 `Initialize`/`Join` precondition).
    pub fn load(&self) -> Result<Config, ConfigError> {
        let path = self.config_path();
        if !path.exists() {
            return Err(ConfigError::NotInitialized(path.display().to_string()));
        }
        let bytes = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write `config` atomically under an exclusive lock on `config.lock`
    /// (spec.md §4.2 note on serializing concurrent writers).
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let _lock = RecordLock::acquire(&self.lock_path())?;
        let bytes = serde_json::to_vec_pretty(config)?;
        write_atomic_0600(&self.config_path(), &bytes)?;
        info!(dir = %self.dir.display(), "config saved");
        Ok(())
    }

    /// Fail if a config already exists, otherwise persist a fresh one
    /// (spec.md §4.7 `Initialize` precondition).
    pub fn create(&self, config: &Config) -> Result<(), ConfigError> {
        let path = self.config_path();
        if path.exists() {
            return Err(ConfigError::AlreadyInitialized(path.display().to_string()));
        }
        self.save(config)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_before_create_is_not_initialized() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("cfg")).unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, ConfigError::NotInitialized(_)));
    }

    #[test]
    fn create_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("cfg")).unwrap();
        let config = Config {
            name: "node-a".into(),
            ..Default::default()
        };
        store.create(&config).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.name, "node-a");
    }

    #[test]
    fn create_twice_fails() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("cfg")).unwrap();
        let config = Config::default();
        store.create(&config).unwrap();
        let err = store.create(&config).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyInitialized(_)));
    }

    #[test]
    fn save_overwrites_existing_config() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("cfg")).unwrap();
        let mut config = Config {
            name: "node-a".into(),
            ..Default::default()
        };
        store.create(&config).unwrap();
        config.name = "node-b".into();
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap().name, "node-b");
    }

    #[cfg(unix)]
    #[test]
    fn config_file_and_dir_are_hardened() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let cfg_dir = dir.path().join("cfg");
        let store = ConfigStore::open(&cfg_dir).unwrap();
        store.create(&Config::default()).unwrap();
        let dir_mode = std::fs::metadata(&cfg_dir).unwrap().permissions().mode() & 0o777;
        let file_mode = std::fs::metadata(cfg_dir.join(CONFIG_FILE_NAME)).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert_eq!(file_mode, 0o600);
    }
}
