use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_config::MultiAppConfig;
use crate::error::AppError;

const MAX_BACKUPS: usize = 10;

/// A backup file under `backups/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    /// File name without extension.
    pub id: String,
    pub path: PathBuf,
    /// `YYYYMMDD_HHMMSS` taken from the file name.
    pub timestamp: String,
    pub display_name: String,
}

/// Backup lifecycle of `config.json`.
pub struct ConfigService;

impl ConfigService {
    fn backup_dir(config_path: &Path) -> Result<PathBuf, AppError> {
        Ok(config_path
            .parent()
            .ok_or_else(|| AppError::Config("Invalid config path".into()))?
            .join("backups"))
    }

    /// Copies the current `config.json` into `backups/`, returning the backup id
    /// (empty when there is nothing to back up yet).
    ///
    /// Named `{custom_name}_{timestamp}.json`, or `backup_{timestamp}.json`.
    pub fn create_backup(
        config_path: &Path,
        custom_name: Option<String>,
    ) -> Result<String, AppError> {
        if !config_path.exists() {
            return Ok(String::new());
        }

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup_id = match custom_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{name}_{timestamp}"),
            _ => format!("backup_{timestamp}"),
        };

        let backup_dir = Self::backup_dir(config_path)?;
        let backup_path = backup_dir.join(format!("{backup_id}.json"));
        let contents = fs::read(config_path).map_err(|e| AppError::io(config_path, e))?;
        crate::config::atomic_write(&backup_path, &contents)?;

        Self::cleanup_old_backups(&backup_dir, MAX_BACKUPS)?;
        log::info!("created backup {}", backup_path.display());

        Ok(backup_id)
    }

    /// Backups newest first.
    pub fn list_backups(config_path: &Path) -> Result<Vec<BackupInfo>, AppError> {
        let backup_dir = Self::backup_dir(config_path)?;
        if !backup_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&backup_dir).map_err(|e| AppError::io(&backup_dir, e))?;

        let mut backups: Vec<BackupInfo> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let filename = path.file_stem()?.to_str()?.to_string();
                let timestamp = Self::extract_timestamp(&filename)?;
                let display_name = Self::format_display_name(&filename, &timestamp);
                Some(BackupInfo {
                    id: filename,
                    path,
                    timestamp,
                    display_name,
                })
            })
            .collect();

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(backups)
    }

    /// Replaces `config.json` with the backup at `backup_path`.
    ///
    /// The backup must parse as a config; the current file is first saved as a
    /// `pre-restore` backup whose id is returned.
    pub fn restore_backup(backup_path: &Path, config_path: &Path) -> Result<String, AppError> {
        if !backup_path.exists() {
            return Err(AppError::NotFound(format!(
                "backup {}",
                backup_path.display()
            )));
        }

        let content =
            fs::read_to_string(backup_path).map_err(|e| AppError::io(backup_path, e))?;
        serde_json::from_str::<MultiAppConfig>(&content)
            .map_err(|e| AppError::json(backup_path, e))?;

        let safety_id = Self::create_backup(config_path, Some("pre-restore".into()))?;
        crate::config::atomic_write(config_path, content.as_bytes())?;
        log::info!("restored config from {}", backup_path.display());

        Ok(safety_id)
    }

    /// `xxx_YYYYMMDD_HHMMSS` -> `YYYYMMDD_HHMMSS`
    fn extract_timestamp(filename: &str) -> Option<String> {
        let mut parts = filename.rsplitn(3, '_');
        let time = parts.next()?;
        let date = parts.next()?;
        let valid = date.len() == 8
            && time.len() == 6
            && date.chars().chain(time.chars()).all(|c| c.is_ascii_digit());
        valid.then(|| format!("{date}_{time}"))
    }

    fn format_display_name(filename: &str, timestamp: &str) -> String {
        let parsed = chrono::NaiveDateTime::parse_from_str(timestamp, "%Y%m%d_%H%M%S");
        let Ok(at) = parsed else {
            return filename.to_string();
        };
        let formatted = at.format("%Y-%m-%d %H:%M:%S").to_string();

        if filename.starts_with("backup_") {
            return formatted;
        }
        let custom_name = filename.rsplitn(3, '_').nth(2).unwrap_or(filename);
        format!("{custom_name} ({formatted})")
    }

    fn cleanup_old_backups(backup_dir: &Path, retain: usize) -> Result<(), AppError> {
        if retain == 0 {
            return Ok(());
        }

        let entries = match fs::read_dir(backup_dir) {
            Ok(iter) => iter
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
                .collect::<Vec<_>>(),
            Err(_) => return Ok(()),
        };

        if entries.len() <= retain {
            return Ok(());
        }

        let remove_count = entries.len().saturating_sub(retain);
        let mut sorted = entries;
        sorted.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            a_time.cmp(&b_time).then(a.file_name().cmp(&b.file_name()))
        });

        for entry in sorted.into_iter().take(remove_count) {
            if let Err(err) = fs::remove_file(entry.path()) {
                log::warn!(
                    "Failed to remove old backup {}: {}",
                    entry.path().display(),
                    err
                );
            }
        }

        Ok(())
    }
}
