use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{OnceLock, RwLock};

use crate::app_config::ViewMode;
use crate::error::AppError;

/// User preferences stored in `settings.json` next to `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_config_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex_config_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_config_dir: Option<String>,
    /// Provider list layout used when the interactive session starts.
    #[serde(default)]
    pub view_mode: ViewMode,
    /// Queue a release check as soon as the interactive session opens.
    #[serde(default)]
    pub check_update_on_startup: bool,
}

impl AppSettings {
    fn settings_path() -> PathBuf {
        crate::config::get_app_config_dir().join("settings.json")
    }

    fn normalize_paths(&mut self) {
        for dir in [
            &mut self.claude_config_dir,
            &mut self.codex_config_dir,
            &mut self.gemini_config_dir,
        ] {
            *dir = dir
                .as_ref()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string());
        }
    }

    pub fn load() -> Self {
        let path = Self::settings_path();
        match crate::config::read_json_file_opt::<AppSettings>(&path) {
            Ok(Some(mut settings)) => {
                settings.normalize_paths();
                settings
            }
            Ok(None) => Self::default(),
            Err(err) => {
                log::warn!(
                    "Failed to parse settings, falling back to defaults. path: {}, error: {}",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let mut normalized = self.clone();
        normalized.normalize_paths();
        crate::config::write_json_file(&Self::settings_path(), &normalized)
    }
}

fn settings_store() -> &'static RwLock<AppSettings> {
    static STORE: OnceLock<RwLock<AppSettings>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(AppSettings::load()))
}

fn resolve_override_path(raw: &str) -> PathBuf {
    if raw == "~" {
        return crate::config::home_dir();
    }
    if let Some(stripped) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return crate::config::home_dir().join(stripped);
    }
    PathBuf::from(raw)
}

pub fn get_settings() -> AppSettings {
    match settings_store().read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub fn update_settings(mut new_settings: AppSettings) -> Result<(), AppError> {
    new_settings.normalize_paths();
    new_settings.save()?;

    let mut guard = settings_store().write()?;
    *guard = new_settings;
    Ok(())
}

pub fn get_claude_override_dir() -> Option<PathBuf> {
    get_settings()
        .claude_config_dir
        .as_deref()
        .map(resolve_override_path)
}

pub fn get_codex_override_dir() -> Option<PathBuf> {
    get_settings()
        .codex_config_dir
        .as_deref()
        .map(resolve_override_path)
}

pub fn get_gemini_override_dir() -> Option<PathBuf> {
    get_settings()
        .gemini_config_dir
        .as_deref()
        .map(resolve_override_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_blank_overrides() {
        let mut settings = AppSettings {
            claude_config_dir: Some("   ".into()),
            codex_config_dir: Some(" /opt/codex ".into()),
            ..AppSettings::default()
        };
        settings.normalize_paths();
        assert_eq!(settings.claude_config_dir, None);
        assert_eq!(settings.codex_config_dir.as_deref(), Some("/opt/codex"));
    }

    #[test]
    fn tilde_overrides_expand_to_home() {
        let resolved = resolve_override_path("~/custom/.claude");
        assert!(resolved.ends_with("custom/.claude"));
        assert_eq!(resolve_override_path("/abs/dir"), PathBuf::from("/abs/dir"));
    }

    #[test]
    fn view_mode_defaults_to_single() {
        let parsed: AppSettings = serde_json::from_str("{}").expect("parse empty settings");
        assert_eq!(parsed.view_mode, ViewMode::Single);
        assert!(!parsed.check_update_on_startup);
    }
}
