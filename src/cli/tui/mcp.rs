//! MCP server manager: add/edit form, delete with per-tool unlink, presets, per-tool enablement.

use crossterm::event::{KeyCode, KeyEvent};
use serde_json::{json, Map, Value};

use crate::app_config::{AppType, McpApps, McpServer};
use crate::services::McpService;

use super::backend::Services;
use super::cursor;
use super::form::{FieldKey, FormField, FormKeyResult, FormState};
use super::session::{Mode, Session};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct McpFlow {
    pub cursor: usize,
    pub mode: McpMode,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum McpMode {
    #[default]
    List,
    Add(FormState),
    Edit {
        id: String,
        form: FormState,
    },
    Delete {
        id: String,
        name: String,
    },
    Preset {
        cursor: usize,
    },
    /// `server` is staged; it may not exist in the registry yet.
    AppsToggle {
        server: McpServer,
        apps: McpApps,
        cursor: usize,
    },
}

fn server_form(server: Option<&McpServer>) -> FormState {
    let mut id = FormField::text(FieldKey::McpId, "Id", true);
    let mut name = FormField::text(FieldKey::McpName, "Name", false);
    let mut command = FormField::text(FieldKey::McpCommand, "Command or URL", true);
    let mut args = FormField::text(FieldKey::McpArgs, "Args", false);

    if let Some(server) = server {
        let spec = &server.server;
        let target = spec
            .get("url")
            .or_else(|| spec.get("command"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let joined = spec
            .get("args")
            .and_then(Value::as_array)
            .map(|args| {
                args.iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        id = id.with_value(server.id.as_str()).read_only();
        name = name.with_value(server.name.as_str());
        command = command.with_value(target);
        args = args.with_value(joined);
    }
    FormState::new(vec![id, name, command, args])
}

/// Rewrites the transport keys of `base` from the form, keeping anything else (env, headers).
fn server_spec(form: &FormState, base: Option<&Value>) -> Value {
    let mut spec = base
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);
    for key in ["type", "command", "args", "url"] {
        spec.remove(key);
    }

    let target = form.value(FieldKey::McpCommand);
    if target.starts_with("http://") || target.starts_with("https://") {
        spec.insert("type".into(), json!("http"));
        spec.insert("url".into(), json!(target));
    } else {
        let args = form
            .value(FieldKey::McpArgs)
            .split_whitespace()
            .collect::<Vec<_>>();
        spec.insert("type".into(), json!("stdio"));
        spec.insert("command".into(), json!(target));
        spec.insert("args".into(), json!(args));
    }
    Value::Object(spec)
}

fn enabled_summary(apps: &McpApps) -> String {
    let names = apps
        .enabled_apps()
        .into_iter()
        .map(|app| app.display_name())
        .collect::<Vec<_>>();
    if names.is_empty() {
        "no tools".to_string()
    } else {
        names.join(", ")
    }
}

impl Session {
    pub(crate) fn on_mcp_key(
        &mut self,
        mut flow: McpFlow,
        key: KeyEvent,
        services: &mut Services<'_>,
    ) -> Mode {
        let len = self.data.mcp.len();
        let mode = std::mem::take(&mut flow.mode);
        flow.mode = match mode {
            McpMode::List => {
                let selected = self.data.mcp.get(flow.cursor).cloned();
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => {
                        flow.cursor = cursor::wrap_prev(flow.cursor, len);
                        McpMode::List
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        flow.cursor = cursor::wrap_next(flow.cursor, len);
                        McpMode::List
                    }
                    KeyCode::Char('a') => McpMode::Add(server_form(None)),
                    KeyCode::Char('p') => McpMode::Preset { cursor: 0 },
                    KeyCode::Char('e') => match selected {
                        Some(server) => McpMode::Edit {
                            form: server_form(Some(&server)),
                            id: server.id,
                        },
                        None => McpMode::List,
                    },
                    KeyCode::Char('d') => match selected {
                        Some(server) => McpMode::Delete {
                            id: server.id,
                            name: server.name,
                        },
                        None => McpMode::List,
                    },
                    KeyCode::Enter | KeyCode::Char(' ') => match selected {
                        Some(server) => McpMode::AppsToggle {
                            apps: server.apps,
                            server,
                            cursor: 0,
                        },
                        None => McpMode::List,
                    },
                    KeyCode::Esc | KeyCode::Char('q') => return Mode::List,
                    _ => {
                        self.ignore_key();
                        McpMode::List
                    }
                }
            }
            McpMode::Add(mut form) => match form.handle_key(key) {
                FormKeyResult::Submit => self.submit_server(&mut flow, None, form, services),
                other if self.form_feedback(other) => McpMode::List,
                _ => McpMode::Add(form),
            },
            McpMode::Edit { id, mut form } => match form.handle_key(key) {
                FormKeyResult::Submit => {
                    self.submit_server(&mut flow, Some(id), form, services)
                }
                other if self.form_feedback(other) => McpMode::List,
                _ => McpMode::Edit { id, form },
            },
            McpMode::Delete { id, name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.delete_server(&mut flow, id, name, services)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => McpMode::List,
                _ => {
                    self.ignore_key();
                    McpMode::Delete { id, name }
                }
            },
            McpMode::Preset { cursor } => {
                let presets = McpService::presets();
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => McpMode::Preset {
                        cursor: cursor::wrap_prev(cursor, presets.len()),
                    },
                    KeyCode::Down | KeyCode::Char('j') => McpMode::Preset {
                        cursor: cursor::wrap_next(cursor, presets.len()),
                    },
                    KeyCode::Enter => match presets.into_iter().nth(cursor) {
                        Some(server) => McpMode::AppsToggle {
                            server,
                            apps: McpApps::default(),
                            cursor: 0,
                        },
                        None => McpMode::Preset { cursor },
                    },
                    KeyCode::Esc | KeyCode::Char('q') => McpMode::List,
                    _ => {
                        self.ignore_key();
                        McpMode::Preset { cursor }
                    }
                }
            }
            McpMode::AppsToggle {
                server,
                mut apps,
                cursor,
            } => {
                let tools = AppType::ALL.len();
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => McpMode::AppsToggle {
                        server,
                        apps,
                        cursor: cursor::wrap_prev(cursor, tools),
                    },
                    KeyCode::Down | KeyCode::Char('j') => McpMode::AppsToggle {
                        server,
                        apps,
                        cursor: cursor::wrap_next(cursor, tools),
                    },
                    KeyCode::Char(' ') | KeyCode::Char('x') => {
                        if let Some(app) = AppType::from_index(cursor) {
                            apps.toggle(app);
                        }
                        McpMode::AppsToggle {
                            server,
                            apps,
                            cursor,
                        }
                    }
                    KeyCode::Enter => self.commit_apps(&mut flow, server, apps, cursor, services),
                    KeyCode::Esc | KeyCode::Char('q') => McpMode::List,
                    _ => {
                        self.ignore_key();
                        McpMode::AppsToggle {
                            server,
                            apps,
                            cursor,
                        }
                    }
                }
            }
        };
        Mode::Mcp(flow)
    }

    /// Reports non-submit form outcomes; true when the form was cancelled.
    fn form_feedback(&mut self, result: FormKeyResult) -> bool {
        match result {
            FormKeyResult::Cancel => return true,
            FormKeyResult::ReadOnly(label) => {
                self.set_err(format!("{label} cannot be changed"));
            }
            FormKeyResult::Cleared => self.set_message("Cleared all fields (Ctrl+Z to undo)"),
            FormKeyResult::Undone => self.set_message("Restored cleared fields"),
            FormKeyResult::UndoEmpty => self.set_err("Nothing to undo"),
            FormKeyResult::Ignored => self.ignore_key(),
            FormKeyResult::Submit | FormKeyResult::Handled => {}
        }
        false
    }

    fn keep_form(editing: Option<String>, form: FormState) -> McpMode {
        match editing {
            Some(id) => McpMode::Edit { id, form },
            None => McpMode::Add(form),
        }
    }

    fn submit_server(
        &mut self,
        flow: &mut McpFlow,
        editing: Option<String>,
        form: FormState,
        services: &mut Services<'_>,
    ) -> McpMode {
        if let Some(field) = form.first_missing_required() {
            self.set_err(format!("{} is required", field.label));
            return Self::keep_form(editing, form);
        }

        let id = form.value(FieldKey::McpId).to_string();
        let existing = match &editing {
            Some(_) => self.data.mcp.iter().find(|s| s.id == id).cloned(),
            None => {
                if self.data.mcp.iter().any(|s| s.id == id) {
                    self.set_err(format!("MCP server '{id}' already exists"));
                    return Self::keep_form(editing, form);
                }
                None
            }
        };

        let name = match form.value(FieldKey::McpName) {
            "" => id.clone(),
            name => name.to_string(),
        };
        let spec = server_spec(&form, existing.as_ref().map(|s| &s.server));
        let server = match existing {
            Some(prev) => McpServer {
                name: name.clone(),
                server: spec,
                ..prev
            },
            None => McpServer {
                id: id.clone(),
                name: name.clone(),
                server: spec,
                apps: McpApps::default(),
                description: None,
                homepage: None,
                tags: Vec::new(),
            },
        };

        if let Err(e) = services.config.upsert_mcp_server(server) {
            self.set_err(format!("Failed to save MCP server: {e}"));
            return Self::keep_form(editing, form);
        }
        self.after_registry_change(flow, Some(&id), services);
        if let Err(e) = services.config.sync_mcp_server(&id) {
            self.set_err(format!("Saved '{name}' but sync failed: {e}"));
        } else if self.err.is_none() {
            self.set_message(format!("Saved MCP server '{name}'"));
        }
        McpMode::List
    }

    fn delete_server(
        &mut self,
        flow: &mut McpFlow,
        id: String,
        name: String,
        services: &mut Services<'_>,
    ) -> McpMode {
        if let Err(e) = services.config.delete_mcp_server(&id) {
            self.set_err(format!("Failed to delete MCP server: {e}"));
            return McpMode::Delete { id, name };
        }

        let failures = AppType::ALL
            .into_iter()
            .filter_map(|app| {
                services
                    .config
                    .unlink_mcp_server(app, &id)
                    .err()
                    .map(|e| format!("{} ({e})", app.display_name()))
            })
            .collect::<Vec<_>>();

        self.after_registry_change(flow, None, services);
        if self.err.is_none() {
            if failures.is_empty() {
                self.set_message(format!("Deleted MCP server '{name}'"));
            } else {
                log::warn!("MCP server '{id}' unlink failures: {failures:?}");
                self.set_message(format!(
                    "Deleted '{name}', but could not unlink it from: {}",
                    failures.join("; ")
                ));
            }
        }
        McpMode::List
    }

    fn commit_apps(
        &mut self,
        flow: &mut McpFlow,
        server: McpServer,
        apps: McpApps,
        cursor: usize,
        services: &mut Services<'_>,
    ) -> McpMode {
        let id = server.id.clone();
        let to_save = match services.config.get_mcp_server(&id) {
            Ok(Some(existing)) => McpServer { apps, ..existing },
            Ok(None) => McpServer { apps, ..server.clone() },
            Err(e) => {
                self.set_err(format!("Failed to look up MCP server '{id}': {e}"));
                return McpMode::AppsToggle {
                    server,
                    apps,
                    cursor,
                };
            }
        };
        let name = to_save.name.clone();

        let result = services
            .config
            .upsert_mcp_server(to_save)
            .and_then(|()| services.config.sync_mcp_server(&id));
        if let Err(e) = result {
            self.set_err(format!("Failed to update '{name}': {e}"));
            return McpMode::AppsToggle {
                server,
                apps,
                cursor,
            };
        }

        self.after_registry_change(flow, Some(&id), services);
        if self.err.is_none() {
            self.set_message(format!("'{name}' enabled for {}", enabled_summary(&apps)));
        }
        McpMode::List
    }

    fn after_registry_change(
        &mut self,
        flow: &mut McpFlow,
        anchor: Option<&str>,
        services: &Services<'_>,
    ) {
        if let Err(e) = self.data.refresh_mcp(&*services.config) {
            self.set_err(format!("Failed to reload MCP servers: {e}"));
        }
        self.record_mtime(services);
        let position = anchor.and_then(|id| self.data.mcp.iter().position(|s| s.id == id));
        flow.cursor = cursor::clamp(position.unwrap_or(flow.cursor), self.data.mcp.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tui::fake::Harness;
    use crate::cli::tui::session::PrimaryMode;
    use crossterm::event::KeyModifiers;

    fn flow(h: &Harness) -> &McpFlow {
        match &h.session().mode {
            Mode::Mcp(flow) => flow,
            other => panic!("expected MCP manager, got {other:?}"),
        }
    }

    fn open(h: &mut Harness) {
        h.press(KeyCode::Char('m'));
        assert_eq!(h.session().mode.primary(), PrimaryMode::McpManager);
    }

    fn stdio(id: &str, apps: McpApps) -> McpServer {
        McpServer {
            id: id.into(),
            name: id.into(),
            server: json!({"type": "stdio", "command": "run", "args": ["--x"], "env": {"K": "V"}}),
            apps,
            description: None,
            homepage: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn preset_stages_with_all_tools_off_then_creates() {
        let mut h = Harness::with_providers(&[]);
        open(&mut h);
        h.press(KeyCode::Char('p'));
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        match &flow(&h).mode {
            McpMode::AppsToggle { server, apps, .. } => {
                assert_eq!(server.id, "time");
                assert_eq!(*apps, McpApps::default());
            }
            other => panic!("expected apps toggle, got {other:?}"),
        }

        h.press(KeyCode::Down);
        h.press(KeyCode::Char(' '));
        h.press(KeyCode::Enter);
        assert_eq!(flow(&h).mode, McpMode::List);
        let saved = h.config.mcp.get("time").expect("created");
        assert!(saved.apps.codex);
        assert!(!saved.apps.claude);
        assert_eq!(h.config.synced, vec!["time".to_string()]);
    }

    #[test]
    fn toggling_existing_server_only_changes_apps() {
        let mut h = Harness::with_providers(&[]);
        let original = stdio("tool", McpApps { claude: true, ..McpApps::default() });
        h.config.mcp.insert("tool".into(), original.clone());
        open(&mut h);
        h.press(KeyCode::Enter);
        match &flow(&h).mode {
            McpMode::AppsToggle { apps, .. } => assert!(apps.claude),
            other => panic!("expected apps toggle, got {other:?}"),
        }
        h.press(KeyCode::Char(' '));
        h.press(KeyCode::Up);
        h.press(KeyCode::Char(' '));
        h.press(KeyCode::Enter);

        let saved = h.config.mcp.get("tool").expect("kept");
        assert_eq!(saved.server, original.server);
        assert_eq!(saved.apps, McpApps { gemini: true, ..McpApps::default() });
    }

    #[test]
    fn lookup_error_is_surfaced_and_keeps_toggle_open() {
        let mut h = Harness::with_providers(&[]);
        h.config.mcp.insert("tool".into(), stdio("tool", McpApps::default()));
        open(&mut h);
        h.press(KeyCode::Enter);
        h.config.fail_mcp_lookup = true;
        h.press(KeyCode::Enter);
        assert!(matches!(flow(&h).mode, McpMode::AppsToggle { .. }));
        assert!(h.session().err.as_deref().is_some_and(|e| e.contains("look up")));
        assert!(h.config.synced.is_empty());
    }

    #[test]
    fn delete_reports_partial_unlink_failures_as_warning() {
        let mut h = Harness::with_providers(&[]);
        h.config.mcp.insert("tool".into(), stdio("tool", McpApps::default()));
        h.config.fail_unlink_for = vec![AppType::Codex, AppType::Gemini];
        open(&mut h);
        h.press(KeyCode::Char('d'));
        h.press(KeyCode::Char('y'));

        let session = h.session();
        assert_eq!(flow(&h).mode, McpMode::List);
        assert!(h.config.mcp.is_empty());
        assert_eq!(session.err, None);
        let message = session.message.as_deref().unwrap_or_default();
        assert!(message.contains("Codex"));
        assert!(message.contains("Gemini"));
        assert!(!message.contains("Claude"));
    }

    #[test]
    fn add_form_rejects_duplicates_and_saves_new_server() {
        let mut h = Harness::with_providers(&[]);
        h.config.mcp.insert("tool".into(), stdio("tool", McpApps::default()));
        open(&mut h);
        h.press(KeyCode::Char('a'));
        h.type_text("tool");
        h.press(KeyCode::Tab);
        h.press(KeyCode::Tab);
        h.type_text("npx");
        h.press(KeyCode::Tab);
        h.type_text("-y pkg");
        h.press_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(matches!(flow(&h).mode, McpMode::Add(_)));
        assert_eq!(h.session().err.as_deref(), Some("MCP server 'tool' already exists"));

        h.press(KeyCode::Tab);
        h.type_text("2");
        h.press_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(flow(&h).mode, McpMode::List);
        let saved = h.config.mcp.get("tool2").expect("saved");
        assert_eq!(saved.server["args"], json!(["-y", "pkg"]));
        assert_eq!(saved.name, "tool2");
    }

    #[test]
    fn edit_keeps_id_and_extra_spec_keys() {
        let mut h = Harness::with_providers(&[]);
        h.config.mcp.insert("tool".into(), stdio("tool", McpApps::default()));
        open(&mut h);
        h.press(KeyCode::Char('e'));
        h.press(KeyCode::Char('x'));
        assert_eq!(h.session().err.as_deref(), Some("Id cannot be changed"));

        h.press(KeyCode::Tab);
        h.press(KeyCode::Tab);
        h.press_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));
        h.press_key(KeyEvent::new(KeyCode::Char('z'), KeyModifiers::CONTROL));
        h.press(KeyCode::End);
        h.type_text("2");
        h.press_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));

        let saved = h.config.mcp.get("tool").expect("kept");
        assert_eq!(saved.server["command"], json!("run2"));
        assert_eq!(saved.server["env"], json!({"K": "V"}));
    }

    #[test]
    fn url_target_becomes_http_server() {
        let form = {
            let mut form = server_form(None);
            form.set_value(FieldKey::McpId, "remote");
            form.set_value(FieldKey::McpCommand, "https://mcp.example/sse");
            form
        };
        let spec = server_spec(&form, Some(&json!({"command": "old", "headers": {"A": "b"}})));
        assert_eq!(
            spec,
            json!({"type": "http", "url": "https://mcp.example/sse", "headers": {"A": "b"}})
        );
    }
}
