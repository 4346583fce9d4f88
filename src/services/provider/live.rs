use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use toml_edit::{DocumentMut, Item};

use crate::app_config::AppType;
use crate::config::{
    get_claude_settings_path, get_codex_auth_path, get_codex_config_path, get_gemini_env_path,
    read_json_file_opt, read_text_file_opt, write_json_file, write_text_file,
};
use crate::error::AppError;
use crate::provider::Provider;

/// Writes the provider's settings into the tool's own config files.
pub(crate) fn write_live(app_type: AppType, provider: &Provider) -> Result<(), AppError> {
    match app_type {
        AppType::Claude => write_claude_live(provider),
        AppType::Codex => write_codex_live(provider),
        AppType::Gemini => write_gemini_live(provider),
    }
}

/// Reads the tool's live config in the same shape as `Provider::settings_config`,
/// or `None` when the tool has never been configured.
pub(crate) fn read_live(app_type: AppType) -> Result<Option<Value>, AppError> {
    match app_type {
        AppType::Claude => read_json_file_opt(&get_claude_settings_path()),
        AppType::Codex => {
            let auth: Option<Value> = read_json_file_opt(&get_codex_auth_path())?;
            let config = read_text_file_opt(&get_codex_config_path())?;
            if auth.is_none() && config.is_none() {
                return Ok(None);
            }
            Ok(Some(json!({
                "auth": auth.unwrap_or_else(|| json!({})),
                "config": config.unwrap_or_default(),
            })))
        }
        AppType::Gemini => {
            let Some(text) = read_text_file_opt(&get_gemini_env_path())? else {
                return Ok(None);
            };
            let env = parse_env(&text)
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<_, _>>();
            Ok(Some(json!({ "env": env })))
        }
    }
}

fn write_claude_live(provider: &Provider) -> Result<(), AppError> {
    let path = get_claude_settings_path();
    let mut live = read_json_file_opt::<Value>(&path)?.unwrap_or_else(|| json!({}));
    if !live.is_object() {
        live = json!({});
    }

    if let (Some(live_obj), Some(settings)) =
        (live.as_object_mut(), provider.settings_config.as_object())
    {
        for (key, value) in settings {
            live_obj.insert(key.clone(), value.clone());
        }
    }

    write_json_file(&path, &live)
}

fn write_codex_live(provider: &Provider) -> Result<(), AppError> {
    let settings = provider.settings_config.as_object().ok_or_else(|| {
        AppError::Config(format!(
            "Codex settings of provider {} must be an object",
            provider.id
        ))
    })?;

    if let Some(auth) = settings.get("auth").filter(|v| v.is_object()) {
        write_json_file(&get_codex_auth_path(), auth)?;
    }

    let snippet = settings
        .get("config")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let config_path = get_codex_config_path();
    let existing = read_text_file_opt(&config_path)?.unwrap_or_default();
    let merged = merge_codex_config(&existing, snippet)
        .map_err(|e| AppError::toml(&config_path, e))?;
    write_text_file(&config_path, &merged)
}

fn write_gemini_live(provider: &Provider) -> Result<(), AppError> {
    let path = get_gemini_env_path();
    let mut env = read_text_file_opt(&path)?
        .map(|text| parse_env(&text))
        .unwrap_or_default();

    if let Some(new_env) = provider
        .settings_config
        .get("env")
        .and_then(Value::as_object)
    {
        for key in ["GEMINI_API_KEY", "GOOGLE_GEMINI_BASE_URL", "GEMINI_MODEL"] {
            env.shift_remove(key);
        }
        for (key, value) in new_env {
            if let Some(text) = value.as_str() {
                env.insert(key.clone(), text.to_string());
            }
        }
    }

    write_text_file(&path, &serialize_env(&env))
}

/// Overlays the provider's top-level TOML keys onto the live `config.toml`,
/// keeping unrelated tables such as `[mcp_servers.*]`.
pub(crate) fn merge_codex_config(
    existing: &str,
    snippet: &str,
) -> Result<String, toml_edit::TomlError> {
    let mut doc = existing.parse::<DocumentMut>()?;
    let patch = snippet.parse::<DocumentMut>()?;

    for (key, item) in patch.iter() {
        match (key, item) {
            ("model_providers", Item::Table(src)) => {
                if !doc.contains_table("model_providers") {
                    let mut table = toml_edit::Table::new();
                    table.set_implicit(true);
                    doc.insert("model_providers", Item::Table(table));
                }
                if let Some(dst) = doc["model_providers"].as_table_mut() {
                    for (name, provider) in src.iter() {
                        dst.insert(name, provider.clone());
                    }
                }
            }
            _ => {
                doc.insert(key, item.clone());
            }
        }
    }

    Ok(doc.to_string())
}

pub(crate) fn parse_env(text: &str) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            out.insert(key.trim().to_string(), value.to_string());
        }
    }
    out
}

pub(crate) fn serialize_env(env: &IndexMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in env {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
