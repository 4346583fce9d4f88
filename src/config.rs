use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;

/// Environment variable that relocates the app data directory.
///
/// Used by tests and portable installs.
pub const CONFIG_DIR_ENV: &str = "CC_SWITCH_CONFIG_DIR";

pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `~/.cc-switch` unless overridden by `CC_SWITCH_CONFIG_DIR`.
pub fn get_app_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    home_dir().join(".cc-switch")
}

pub fn get_app_config_path() -> PathBuf {
    get_app_config_dir().join("config.json")
}

pub fn get_templates_path() -> PathBuf {
    get_app_config_dir().join("templates.json")
}

fn override_or(dir: Option<PathBuf>, default: &str) -> PathBuf {
    dir.unwrap_or_else(|| home_dir().join(default))
}

pub fn get_claude_config_dir() -> PathBuf {
    override_or(crate::settings::get_claude_override_dir(), ".claude")
}

pub fn get_claude_settings_path() -> PathBuf {
    get_claude_config_dir().join("settings.json")
}

/// `~/.claude.json`, where Claude Code keeps its user-level MCP servers.
pub fn get_claude_mcp_path() -> PathBuf {
    home_dir().join(".claude.json")
}

pub fn get_codex_config_dir() -> PathBuf {
    override_or(crate::settings::get_codex_override_dir(), ".codex")
}

pub fn get_codex_auth_path() -> PathBuf {
    get_codex_config_dir().join("auth.json")
}

pub fn get_codex_config_path() -> PathBuf {
    get_codex_config_dir().join("config.toml")
}

pub fn get_gemini_config_dir() -> PathBuf {
    override_or(crate::settings::get_gemini_override_dir(), ".gemini")
}

pub fn get_gemini_env_path() -> PathBuf {
    get_gemini_config_dir().join(".env")
}

pub fn get_gemini_settings_path() -> PathBuf {
    get_gemini_config_dir().join("settings.json")
}

/// Writes `data` to a temp file in the target directory and renames it over `path`,
/// so readers never observe a half-written file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| AppError::io(parent, e))?;
    tmp.write_all(data).map_err(|e| AppError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| AppError::io(path, e))?;
    tmp.persist(path).map_err(|e| AppError::io(path, e.error))?;
    Ok(())
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| AppError::json(path, e))
}

/// Reads a JSON file, returning `None` when it does not exist.
pub fn read_json_file_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json_file(path).map(Some)
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| AppError::JsonSerialize { source: e })?;
    atomic_write(path, json.as_bytes())
}

pub fn read_text_file_opt(path: &Path) -> Result<Option<String>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .map_err(|e| AppError::io(path, e))
}

pub fn write_text_file(path: &Path, text: &str) -> Result<(), AppError> {
    atomic_write(path, text.as_bytes())
}

pub fn delete_file(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| AppError::io(path, e))?;
    }
    Ok(())
}
