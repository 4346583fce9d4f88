use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use crate::app_config::MultiAppConfig;
use crate::error::AppError;

/// The loaded `config.json`, shared by the services.
pub struct AppState {
    pub config: RwLock<MultiAppConfig>,
    path: PathBuf,
}

impl AppState {
    pub fn try_new() -> Result<Self, AppError> {
        Self::load_from(crate::config::get_app_config_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self, AppError> {
        let config = Self::read(&path)?;
        Ok(Self {
            config: RwLock::new(config),
            path,
        })
    }

    pub fn from_config(config: MultiAppConfig, path: PathBuf) -> Self {
        Self {
            config: RwLock::new(config),
            path,
        }
    }

    fn read(path: &Path) -> Result<MultiAppConfig, AppError> {
        Ok(crate::config::read_json_file_opt(path)?.unwrap_or_default())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), AppError> {
        let guard = self.config.read()?;
        crate::config::write_json_file(&self.path, &*guard)?;
        log::debug!("saved config to {}", self.path.display());
        Ok(())
    }

    /// Replaces the in-memory config with what is on disk.
    pub fn reload(&self) -> Result<(), AppError> {
        let fresh = Self::read(&self.path)?;
        let mut guard = self.config.write()?;
        *guard = fresh;
        Ok(())
    }

    pub fn modified_time(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
    }
}
