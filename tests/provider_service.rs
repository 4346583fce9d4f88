use serde_json::{json, Value};
use serial_test::serial;

use cc_switch_tui::{
    get_claude_settings_path, get_codex_config_path, read_json_file, AppError, AppState, AppType,
    MoveDirection, Provider, ProviderService,
};

#[path = "support.rs"]
mod support;
use support::TestHome;

fn claude(id: &str, token: &str) -> Provider {
    Provider::with_id(
        id.to_string(),
        id.to_string(),
        json!({"env": {
            "ANTHROPIC_AUTH_TOKEN": token,
            "ANTHROPIC_BASE_URL": format!("https://{id}.example"),
        }}),
        None,
    )
}

fn ids(state: &AppState, app: AppType) -> Vec<String> {
    ProviderService::list(state, app)
        .expect("list")
        .into_iter()
        .map(|p| p.id)
        .collect()
}

#[test]
#[serial]
fn first_provider_becomes_current_and_is_written_live() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");

    ProviderService::add(&state, AppType::Claude, claude("relay", "sk-relay")).expect("add");
    ProviderService::add(&state, AppType::Claude, claude("backup", "sk-backup")).expect("add");

    assert_eq!(
        ProviderService::current(&state, AppType::Claude).expect("current"),
        "relay"
    );
    let live: Value = read_json_file(&get_claude_settings_path()).expect("live settings");
    assert_eq!(live["env"]["ANTHROPIC_AUTH_TOKEN"], "sk-relay");
    assert!(home.config_path().exists(), "config.json saved");
}

#[test]
#[serial]
fn switch_rewrites_live_settings_and_keeps_other_keys() {
    let home = TestHome::new();
    std::fs::create_dir_all(home.path().join(".claude")).expect("claude dir");
    std::fs::write(
        get_claude_settings_path(),
        r#"{"permissions": {"allow": ["Bash"]}}"#,
    )
    .expect("seed live settings");

    let state = AppState::load_from(home.config_path()).expect("state");
    ProviderService::add(&state, AppType::Claude, claude("a", "sk-a")).expect("add");
    ProviderService::add(&state, AppType::Claude, claude("b", "sk-b")).expect("add");
    ProviderService::switch(&state, AppType::Claude, "b").expect("switch");

    let live: Value = read_json_file(&get_claude_settings_path()).expect("live settings");
    assert_eq!(live["env"]["ANTHROPIC_AUTH_TOKEN"], "sk-b");
    assert_eq!(live["permissions"]["allow"][0], "Bash");

    let reloaded = AppState::load_from(home.config_path()).expect("reload");
    assert_eq!(
        ProviderService::current(&reloaded, AppType::Claude).expect("current"),
        "b"
    );
}

#[test]
#[serial]
fn codex_switch_keeps_mcp_tables_in_config_toml() {
    let home = TestHome::new();
    std::fs::create_dir_all(home.path().join(".codex")).expect("codex dir");
    std::fs::write(
        get_codex_config_path(),
        "[mcp_servers.echo]\ncommand = \"echo\"\n",
    )
    .expect("seed config.toml");

    let state = AppState::load_from(home.config_path()).expect("state");
    let provider = Provider::with_id(
        "relay".into(),
        "Relay".into(),
        json!({
            "auth": {"OPENAI_API_KEY": "sk-relay"},
            "config": "model_provider = \"relay\"\nmodel = \"gpt-5-codex\"\n\n[model_providers.relay]\nbase_url = \"https://relay.example/v1\"\n",
        }),
        None,
    );
    ProviderService::add(&state, AppType::Codex, provider).expect("add");

    let text = std::fs::read_to_string(get_codex_config_path()).expect("config.toml");
    assert!(text.contains("model = \"gpt-5-codex\""));
    assert!(text.contains("[mcp_servers.echo]"));
    assert!(text.contains("https://relay.example/v1"));
}

#[test]
#[serial]
fn move_renumbers_and_refuses_boundaries() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");
    for id in ["a", "b", "c"] {
        ProviderService::add(&state, AppType::Claude, claude(id, "sk")).expect("add");
    }

    ProviderService::move_provider(&state, AppType::Claude, "c", MoveDirection::Up).expect("move");
    assert_eq!(ids(&state, AppType::Claude), ["a", "c", "b"]);

    let err = ProviderService::move_provider(&state, AppType::Claude, "a", MoveDirection::Up)
        .expect_err("already first");
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(ids(&state, AppType::Claude), ["a", "c", "b"]);
}

#[test]
#[serial]
fn current_provider_cannot_be_deleted() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");
    ProviderService::add(&state, AppType::Gemini, Provider::with_id(
        "g".into(),
        "G".into(),
        json!({"env": {"GEMINI_API_KEY": "k"}}),
        None,
    ))
    .expect("add");

    let err = ProviderService::delete(&state, AppType::Gemini, "g").expect_err("current");
    assert_eq!(err.to_string(), "Cannot delete the provider currently in use");
    assert!(matches!(
        ProviderService::delete(&state, AppType::Gemini, "missing"),
        Err(AppError::InvalidInput(_)) | Err(AppError::NotFound(_))
    ));
}
