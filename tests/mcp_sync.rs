use serde_json::{json, Value};
use serial_test::serial;

use cc_switch_tui::{
    get_claude_mcp_path, get_codex_config_path, get_gemini_settings_path, read_json_file,
    AppState, AppType, McpApps, McpServer, McpService,
};

#[path = "support.rs"]
mod support;
use support::TestHome;

fn fetch_server(apps: McpApps) -> McpServer {
    McpServer {
        id: "fetch".into(),
        name: "Fetch".into(),
        server: json!({"type": "stdio", "command": "uvx", "args": ["mcp-server-fetch"]}),
        apps,
        description: None,
        homepage: None,
        tags: Vec::new(),
    }
}

#[test]
#[serial]
fn sync_follows_enabled_tools() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");

    let mut apps = McpApps::default();
    apps.set_enabled_for(AppType::Claude, true);
    apps.set_enabled_for(AppType::Codex, true);
    McpService::upsert(&state, fetch_server(apps)).expect("upsert");
    McpService::sync_server(&state, "fetch").expect("sync");

    let claude: Value = read_json_file(&get_claude_mcp_path()).expect("claude json");
    assert_eq!(claude["mcpServers"]["fetch"]["command"], "uvx");
    let codex = std::fs::read_to_string(get_codex_config_path()).expect("codex toml");
    assert!(codex.contains("[mcp_servers.fetch]"));
    assert!(!get_gemini_settings_path().exists());

    apps.set_enabled_for(AppType::Claude, false);
    McpService::upsert(&state, fetch_server(apps)).expect("upsert");
    McpService::sync_server(&state, "fetch").expect("sync");
    let claude: Value = read_json_file(&get_claude_mcp_path()).expect("claude json");
    assert!(claude["mcpServers"].get("fetch").is_none());
}

#[test]
#[serial]
fn delete_then_unlink_everywhere() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");
    let mut apps = McpApps::default();
    apps.set_enabled_for(AppType::Gemini, true);
    McpService::upsert(&state, fetch_server(apps)).expect("upsert");
    McpService::sync_server(&state, "fetch").expect("sync");

    let removed = McpService::delete(&state, "fetch").expect("delete");
    assert_eq!(removed.name, "Fetch");
    assert!(McpService::get(&state, "fetch").expect("get").is_none());

    assert!(McpService::remove_server_from_app(AppType::Gemini, "fetch").expect("unlink"));
    assert!(!McpService::remove_server_from_app(AppType::Codex, "fetch").expect("unlink"));
}

#[test]
#[serial]
fn invalid_spec_is_rejected_before_saving() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");
    let mut server = fetch_server(McpApps::default());
    server.server = json!({"type": "stdio"});
    assert!(McpService::upsert(&state, server).is_err());
    assert!(McpService::list(&state).expect("list").is_empty());
}
