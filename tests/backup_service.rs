use serial_test::serial;

use cc_switch_tui::{AppState, AppType, ConfigService, Provider, ProviderService};

#[path = "support.rs"]
mod support;
use support::TestHome;

fn seed(state: &AppState, id: &str) {
    let provider = Provider::with_id(
        id.to_string(),
        id.to_string(),
        serde_json::json!({"env": {"ANTHROPIC_AUTH_TOKEN": "sk"}}),
        None,
    );
    ProviderService::add(state, AppType::Claude, provider).expect("add");
}

#[test]
#[serial]
fn nothing_to_back_up_without_config() {
    let home = TestHome::new();
    let id = ConfigService::create_backup(&home.config_path(), None).expect("backup");
    assert!(id.is_empty());
    assert!(ConfigService::list_backups(&home.config_path())
        .expect("list")
        .is_empty());
}

#[test]
#[serial]
fn create_and_list_backups() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");
    seed(&state, "one");

    let id = ConfigService::create_backup(&home.config_path(), None).expect("backup");
    assert!(id.starts_with("backup_"));
    let named = ConfigService::create_backup(&home.config_path(), Some("before-upgrade".into()))
        .expect("named backup");
    assert!(named.starts_with("before-upgrade_"));

    let backups = ConfigService::list_backups(&home.config_path()).expect("list");
    assert_eq!(backups.len(), 2);
    assert!(backups.iter().all(|b| b.path.exists()));
    assert!(backups.iter().all(|b| !b.display_name.is_empty()));
}

#[test]
#[serial]
fn restore_replaces_config_and_keeps_safety_copy() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");
    seed(&state, "original");
    ConfigService::create_backup(&home.config_path(), None).expect("backup");
    let backup = ConfigService::list_backups(&home.config_path()).expect("list")[0].clone();

    seed(&state, "later");
    let safety = ConfigService::restore_backup(&backup.path, &home.config_path()).expect("restore");
    assert!(safety.starts_with("pre-restore_"));

    state.reload().expect("reload");
    let ids: Vec<String> = ProviderService::list(&state, AppType::Claude)
        .expect("list")
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, ["original"]);
}

#[test]
#[serial]
fn restore_rejects_invalid_backup() {
    let home = TestHome::new();
    let state = AppState::load_from(home.config_path()).expect("state");
    seed(&state, "keep");
    let before = std::fs::read_to_string(home.config_path()).expect("config");

    let bogus = home.path().join("bogus_20240101_000000.json");
    std::fs::write(&bogus, "not json").expect("write bogus");
    assert!(ConfigService::restore_backup(&bogus, &home.config_path()).is_err());
    assert_eq!(
        std::fs::read_to_string(home.config_path()).expect("config"),
        before
    );
}
