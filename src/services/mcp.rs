use serde_json::{json, Map, Value};
use toml_edit::{Array, DocumentMut, InlineTable, Item, Table};

use crate::app_config::{AppType, McpApps, McpServer};
use crate::config::{
    get_claude_mcp_path, get_codex_config_path, get_gemini_settings_path, read_json_file_opt,
    read_text_file_opt, write_json_file, write_text_file,
};
use crate::error::AppError;
use crate::store::AppState;

/// Registry of MCP servers in `config.json` and their projection into each tool's config.
pub struct McpService;

impl McpService {
    pub fn list(state: &AppState) -> Result<Vec<McpServer>, AppError> {
        let config = state.config.read()?;
        let mut servers = config.mcp.servers.values().cloned().collect::<Vec<_>>();
        servers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(servers)
    }

    pub fn get(state: &AppState, id: &str) -> Result<Option<McpServer>, AppError> {
        let config = state.config.read()?;
        Ok(config.mcp.servers.get(id).cloned())
    }

    /// Inserts or replaces a server in the registry. Does not touch tool configs.
    pub fn upsert(state: &AppState, server: McpServer) -> Result<(), AppError> {
        validate_server_spec(&server.id, &server.server)?;
        {
            let mut config = state.config.write()?;
            config.mcp.servers.insert(server.id.clone(), server);
        }
        state.save()
    }

    pub fn delete(state: &AppState, id: &str) -> Result<McpServer, AppError> {
        let removed = {
            let mut config = state.config.write()?;
            config
                .mcp
                .servers
                .shift_remove(id)
                .ok_or_else(|| AppError::NotFound(format!("MCP server {id}")))?
        };
        state.save()?;
        log::info!("deleted MCP server '{id}'");
        Ok(removed)
    }

    /// Writes the server into every enabled tool and removes it from every disabled one.
    pub fn sync_server(state: &AppState, id: &str) -> Result<(), AppError> {
        let server = Self::get(state, id)?
            .ok_or_else(|| AppError::NotFound(format!("MCP server {id}")))?;
        for app in AppType::ALL {
            if server.apps.is_enabled_for(app) {
                write_server(app, &server.id, &server.server)?;
            } else {
                remove_server(app, &server.id)?;
            }
        }
        log::debug!(
            "synced MCP server '{id}' to {:?}",
            server.apps.enabled_apps()
        );
        Ok(())
    }

    /// Projects every server enabled for `app` into its config.
    pub fn sync_enabled_to_app(state: &AppState, app: AppType) -> Result<(), AppError> {
        let servers = Self::list(state)?;
        for server in servers.iter().filter(|s| s.apps.is_enabled_for(app)) {
            write_server(app, &server.id, &server.server)?;
        }
        Ok(())
    }

    pub fn remove_server_from_app(app: AppType, id: &str) -> Result<bool, AppError> {
        remove_server(app, id)
    }

    /// Built-in server definitions offered when adding a server.
    pub fn presets() -> Vec<McpServer> {
        let preset = |id: &str, name: &str, server: Value, description: &str, homepage: &str| {
            McpServer {
                id: id.to_string(),
                name: name.to_string(),
                server,
                apps: McpApps::default(),
                description: Some(description.to_string()),
                homepage: Some(homepage.to_string()),
                tags: Vec::new(),
            }
        };

        vec![
            preset(
                "fetch",
                "Fetch",
                json!({"type": "stdio", "command": "uvx", "args": ["mcp-server-fetch"]}),
                "Fetch web pages and convert them to markdown",
                "https://github.com/modelcontextprotocol/servers",
            ),
            preset(
                "time",
                "Time",
                json!({"type": "stdio", "command": "uvx", "args": ["mcp-server-time"]}),
                "Current time and timezone conversion",
                "https://github.com/modelcontextprotocol/servers",
            ),
            preset(
                "memory",
                "Memory",
                json!({
                    "type": "stdio",
                    "command": "npx",
                    "args": ["-y", "@modelcontextprotocol/server-memory"]
                }),
                "Knowledge-graph based persistent memory",
                "https://github.com/modelcontextprotocol/servers",
            ),
            preset(
                "sequential-thinking",
                "Sequential Thinking",
                json!({
                    "type": "stdio",
                    "command": "npx",
                    "args": ["-y", "@modelcontextprotocol/server-sequential-thinking"]
                }),
                "Structured step-by-step reasoning",
                "https://github.com/modelcontextprotocol/servers",
            ),
            preset(
                "context7",
                "Context7",
                json!({"type": "stdio", "command": "npx", "args": ["-y", "@upstash/context7-mcp"]}),
                "Up-to-date library documentation",
                "https://github.com/upstash/context7",
            ),
        ]
    }
}

/// stdio servers need a `command`; http/sse servers need a `url`.
pub fn validate_server_spec(id: &str, spec: &Value) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidInput("MCP server id is required".into()));
    }
    if !spec.is_object() {
        return Err(AppError::InvalidInput(format!(
            "MCP server '{id}' must be a JSON object"
        )));
    }

    let kind = spec.get("type").and_then(Value::as_str).unwrap_or("stdio");
    let required = match kind {
        "stdio" => "command",
        "http" | "sse" => "url",
        other => {
            return Err(AppError::InvalidInput(format!(
                "MCP server type must be 'stdio', 'http' or 'sse', got '{other}'"
            )))
        }
    };
    let present = spec
        .get(required)
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty());
    if !present {
        return Err(AppError::InvalidInput(format!(
            "{kind} MCP server '{id}' is missing '{required}'"
        )));
    }
    Ok(())
}

fn write_server(app: AppType, id: &str, spec: &Value) -> Result<(), AppError> {
    match app {
        AppType::Claude => write_json_server(&get_claude_mcp_path(), id, spec),
        AppType::Gemini => write_json_server(&get_gemini_settings_path(), id, spec),
        AppType::Codex => write_codex_server(id, spec),
    }
}

fn remove_server(app: AppType, id: &str) -> Result<bool, AppError> {
    match app {
        AppType::Claude => remove_json_server(&get_claude_mcp_path(), id),
        AppType::Gemini => remove_json_server(&get_gemini_settings_path(), id),
        AppType::Codex => remove_codex_server(id),
    }
}

fn write_json_server(path: &std::path::Path, id: &str, spec: &Value) -> Result<(), AppError> {
    let mut root = read_json_file_opt::<Value>(path)?.unwrap_or_else(|| json!({}));
    let obj = root
        .as_object_mut()
        .ok_or_else(|| AppError::Config(format!("{} root must be an object", path.display())))?;

    let servers = obj
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    if !servers.is_object() {
        *servers = Value::Object(Map::new());
    }
    if let Some(servers) = servers.as_object_mut() {
        servers.insert(id.to_string(), spec.clone());
    }
    write_json_file(path, &root)
}

fn remove_json_server(path: &std::path::Path, id: &str) -> Result<bool, AppError> {
    let Some(mut root) = read_json_file_opt::<Value>(path)? else {
        return Ok(false);
    };
    let Some(servers) = root.get_mut("mcpServers").and_then(Value::as_object_mut) else {
        return Ok(false);
    };
    if servers.remove(id).is_none() {
        return Ok(false);
    }
    write_json_file(path, &root)?;
    Ok(true)
}

fn write_codex_server(id: &str, spec: &Value) -> Result<(), AppError> {
    let path = get_codex_config_path();
    let text = read_text_file_opt(&path)?.unwrap_or_default();
    let mut doc = text
        .parse::<DocumentMut>()
        .map_err(|e| AppError::toml(&path, e))?;

    if !doc.contains_table("mcp_servers") {
        let mut table = Table::new();
        table.set_implicit(true);
        doc.insert("mcp_servers", Item::Table(table));
    }

    let mut entry = Table::new();
    if let Some(obj) = spec.as_object() {
        for (key, value) in obj {
            // Codex infers the transport from `command` vs `url`.
            if key == "type" {
                continue;
            }
            if let Some(v) = json_to_toml(value) {
                entry.insert(key, Item::Value(v));
            }
        }
    }

    if let Some(servers) = doc["mcp_servers"].as_table_mut() {
        servers.insert(id, Item::Table(entry));
    }
    write_text_file(&path, &doc.to_string())
}

fn remove_codex_server(id: &str) -> Result<bool, AppError> {
    let path = get_codex_config_path();
    let Some(text) = read_text_file_opt(&path)? else {
        return Ok(false);
    };
    let mut doc = text
        .parse::<DocumentMut>()
        .map_err(|e| AppError::toml(&path, e))?;

    let removed = doc
        .get_mut("mcp_servers")
        .and_then(Item::as_table_mut)
        .and_then(|servers| servers.remove(id))
        .is_some();
    if removed {
        write_text_file(&path, &doc.to_string())?;
    }
    Ok(removed)
}

fn json_to_toml(value: &Value) -> Option<toml_edit::Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some((*b).into()),
        Value::Number(n) => n
            .as_i64()
            .map(toml_edit::Value::from)
            .or_else(|| n.as_f64().map(toml_edit::Value::from)),
        Value::String(s) => Some(s.as_str().into()),
        Value::Array(items) => {
            let mut array = Array::new();
            for item in items.iter().filter_map(json_to_toml) {
                array.push(item);
            }
            Some(toml_edit::Value::Array(array))
        }
        Value::Object(map) => {
            let mut table = InlineTable::new();
            for (key, item) in map {
                if let Some(v) = json_to_toml(item) {
                    table.insert(key.as_str(), v);
                }
            }
            Some(toml_edit::Value::InlineTable(table))
        }
    }
}
