//! In-memory collaborators for driving the session in tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::{json, Value};

use crate::app_config::{AppType, McpServer, PerApp, ViewMode};
use crate::error::AppError;
use crate::provider::{generate_provider_id, Provider};
use crate::services::{
    BackupInfo, MoveDirection, Template, TemplateCategory, TemplateService, TemplateTarget,
};

use super::backend::{BackupStore, ConfigManager, Services, TemplateStore};
use super::session::{Command, Event, Session};

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// A provider whose settings fill every required form field.
pub fn provider(app: AppType, id: &str) -> Provider {
    let settings = match app {
        AppType::Claude => json!({"env": {
            "ANTHROPIC_AUTH_TOKEN": format!("sk-{id}"),
            "ANTHROPIC_BASE_URL": format!("https://{id}.example"),
        }}),
        AppType::Codex => json!({
            "auth": {"OPENAI_API_KEY": format!("sk-{id}")},
            "config": format!(
                "model_provider = \"{id}\"\nmodel = \"gpt-5\"\n\n[model_providers.{id}]\nbase_url = \"https://{id}.example\"\n"
            ),
        }),
        AppType::Gemini => json!({"env": {
            "GEMINI_API_KEY": format!("sk-{id}"),
            "GOOGLE_GEMINI_BASE_URL": format!("https://{id}.example"),
        }}),
    };
    Provider::with_id(id.to_string(), id.to_string(), settings, None)
}

fn failure(what: &str) -> AppError {
    AppError::Message(format!("{what} failed"))
}

#[derive(Default)]
pub struct FakeConfig {
    pub providers: PerApp<Vec<Provider>>,
    pub current: PerApp<String>,
    /// Snapshot an "external editor" wrote; applied by the next reload.
    pending: Option<PerApp<Vec<Provider>>>,
    pub live: HashMap<AppType, Value>,
    pub mcp: BTreeMap<String, McpServer>,
    pub mtime: Option<SystemTime>,
    ticks: u64,

    pub reloads: usize,
    pub add_calls: usize,
    pub delete_calls: usize,
    pub move_calls: usize,
    pub synced: Vec<String>,

    pub fail_writes: bool,
    pub fail_save: bool,
    pub fail_mcp_lookup: bool,
    pub fail_live_read: bool,
    pub fail_unlink_for: Vec<AppType>,
}

impl FakeConfig {
    fn touch(&mut self) {
        self.ticks += 1;
        self.mtime = Some(SystemTime::UNIX_EPOCH + Duration::from_secs(self.ticks));
    }

    fn check_writes(&self) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(failure("write"));
        }
        Ok(())
    }

    /// Simulates another process editing `config.json`.
    pub fn external_edit(&mut self, app: AppType, provider: Provider) {
        let mut snapshot = self.pending.take().unwrap_or_else(|| self.providers.clone());
        snapshot[app].push(provider);
        self.pending = Some(snapshot);
        self.touch();
    }
}

impl ConfigManager for FakeConfig {
    fn providers(&self, app: AppType) -> Result<Vec<Provider>, AppError> {
        Ok(self.providers[app].clone())
    }

    fn current_provider(&self, app: AppType) -> Result<String, AppError> {
        Ok(self.current[app].clone())
    }

    fn get_provider(&self, app: AppType, id: &str) -> Result<Option<Provider>, AppError> {
        Ok(self.providers[app].iter().find(|p| p.id == id).cloned())
    }

    fn add_provider(&mut self, app: AppType, provider: Provider) -> Result<(), AppError> {
        self.add_calls += 1;
        self.check_writes()?;
        if self.current[app].is_empty() {
            self.current[app] = provider.id.clone();
        }
        self.providers[app].push(provider);
        self.touch();
        Ok(())
    }

    fn update_provider(&mut self, app: AppType, provider: Provider) -> Result<(), AppError> {
        self.check_writes()?;
        let slot = self.providers[app]
            .iter_mut()
            .find(|p| p.id == provider.id)
            .ok_or_else(|| AppError::NotFound(provider.id.clone()))?;
        *slot = provider;
        self.touch();
        Ok(())
    }

    fn delete_provider(&mut self, app: AppType, id: &str) -> Result<(), AppError> {
        self.delete_calls += 1;
        self.check_writes()?;
        if self.current[app] == id {
            return Err(AppError::InvalidInput(
                "Cannot delete the provider currently in use".into(),
            ));
        }
        self.providers[app].retain(|p| p.id != id);
        self.touch();
        Ok(())
    }

    fn move_provider(
        &mut self,
        app: AppType,
        id: &str,
        direction: MoveDirection,
    ) -> Result<(), AppError> {
        self.move_calls += 1;
        self.check_writes()?;
        let list = &mut self.providers[app];
        let index = list
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        let other = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < list.len() => index + 1,
            _ => {
                return Err(AppError::InvalidInput(
                    "Provider is already at the boundary".into(),
                ))
            }
        };
        list.swap(index, other);
        self.touch();
        Ok(())
    }

    fn switch_provider(&mut self, app: AppType, id: &str) -> Result<(), AppError> {
        self.check_writes()?;
        self.current[app] = id.to_string();
        self.touch();
        Ok(())
    }

    fn read_live_settings(&self, app: AppType) -> Result<Option<Value>, AppError> {
        if self.fail_live_read {
            return Err(failure("live settings read"));
        }
        Ok(self.live.get(&app).cloned())
    }

    fn mcp_servers(&self) -> Result<Vec<McpServer>, AppError> {
        Ok(self.mcp.values().cloned().collect())
    }

    fn get_mcp_server(&self, id: &str) -> Result<Option<McpServer>, AppError> {
        if self.fail_mcp_lookup {
            return Err(failure("registry read"));
        }
        Ok(self.mcp.get(id).cloned())
    }

    fn upsert_mcp_server(&mut self, server: McpServer) -> Result<(), AppError> {
        self.check_writes()?;
        self.mcp.insert(server.id.clone(), server);
        self.touch();
        Ok(())
    }

    fn delete_mcp_server(&mut self, id: &str) -> Result<(), AppError> {
        self.check_writes()?;
        self.mcp
            .remove(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        self.touch();
        Ok(())
    }

    fn sync_mcp_server(&mut self, id: &str) -> Result<(), AppError> {
        self.synced.push(id.to_string());
        Ok(())
    }

    fn unlink_mcp_server(&mut self, app: AppType, _id: &str) -> Result<(), AppError> {
        if self.fail_unlink_for.contains(&app) {
            return Err(failure("unlink"));
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), AppError> {
        if self.fail_save {
            return Err(failure("save"));
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<(), AppError> {
        self.reloads += 1;
        if let Some(snapshot) = self.pending.take() {
            self.providers = snapshot;
        }
        Ok(())
    }

    fn modified_time(&self) -> Option<SystemTime> {
        self.mtime
    }

    fn view_mode_preference(&self) -> ViewMode {
        ViewMode::Single
    }
}

#[derive(Default)]
pub struct FakeBackups {
    pub backups: Vec<BackupInfo>,
    pub created: usize,
    pub fail_restore: bool,
}

impl FakeBackups {
    fn info(id: &str) -> BackupInfo {
        BackupInfo {
            id: id.to_string(),
            path: PathBuf::from(format!("/fake/backups/{id}.json")),
            timestamp: id.trim_start_matches("backup_").to_string(),
            display_name: id.to_string(),
        }
    }

    /// Newest first, as listed.
    pub fn seed(&mut self, ids: &[&str]) {
        self.backups = ids.iter().map(|id| Self::info(id)).collect();
    }
}

impl BackupStore for FakeBackups {
    fn create_backup(&mut self) -> Result<String, AppError> {
        self.created += 1;
        let id = format!("backup_20250101_0000{:02}", self.created);
        self.backups.insert(0, Self::info(&id));
        Ok(id)
    }

    fn list_backups(&self) -> Result<Vec<BackupInfo>, AppError> {
        Ok(self.backups.clone())
    }

    fn restore_backup(&mut self, _path: &Path) -> Result<String, AppError> {
        if self.fail_restore {
            return Err(failure("restore"));
        }
        Ok("pre-restore_20250101_000000".to_string())
    }
}

#[derive(Default)]
pub struct FakeTemplates {
    pub user: Vec<Template>,
    pub files: HashMap<PathBuf, String>,
    pub fail_apply: bool,
}

impl FakeTemplates {
    pub fn add_user(&mut self, name: &str, content: &str) {
        let existing = self.user.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        self.user.push(Template {
            id: generate_provider_id(&format!("user-{name}"), &existing),
            name: name.to_string(),
            category: TemplateCategory::ClaudeMd,
            content: content.to_string(),
            built_in: false,
        });
    }
}

impl TemplateStore for FakeTemplates {
    fn list(&self, category: TemplateCategory) -> Result<Vec<Template>, AppError> {
        let mut all = TemplateService::built_ins(category);
        let mut user = self
            .user
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect::<Vec<_>>();
        user.sort_by(|a, b| a.name.cmp(&b.name));
        all.extend(user);
        Ok(all)
    }

    fn get(&self, id: &str) -> Result<Option<Template>, AppError> {
        let built_in = [
            TemplateCategory::ClaudeMd,
            TemplateCategory::AgentsMd,
            TemplateCategory::GeminiMd,
        ]
        .into_iter()
        .flat_map(TemplateService::built_ins);
        Ok(built_in
            .chain(self.user.iter().cloned())
            .find(|t| t.id == id))
    }

    fn add_from_file(
        &mut self,
        name: &str,
        category: TemplateCategory,
        source: &Path,
    ) -> Result<Template, AppError> {
        let content = self
            .files
            .get(source)
            .cloned()
            .ok_or_else(|| AppError::NotFound(source.display().to_string()))?;
        self.add_user(name, &content);
        let saved = self.user.last_mut().ok_or_else(|| failure("add"))?;
        saved.category = category;
        Ok(saved.clone())
    }

    fn delete(&mut self, id: &str) -> Result<(), AppError> {
        let before = self.user.len();
        self.user.retain(|t| t.id != id);
        if self.user.len() == before {
            return Err(AppError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn diff(&self, template: &Template, target: &Path) -> Result<String, AppError> {
        let current = self.files.get(target).map(String::as_str).unwrap_or_default();
        Ok(TemplateService::diff_text(current, &template.content, target))
    }

    fn apply(&mut self, template: &Template, target: &Path) -> Result<(), AppError> {
        if self.fail_apply {
            return Err(failure("apply"));
        }
        self.files
            .insert(target.to_path_buf(), template.content.clone());
        Ok(())
    }

    fn targets(&self, category: TemplateCategory) -> Vec<TemplateTarget> {
        let file = category.file_name();
        [("global", "Global"), ("project", "Project")]
            .into_iter()
            .map(|(dir, label)| {
                let path = PathBuf::from(format!("/fake/{dir}/{file}"));
                TemplateTarget {
                    exists: self.files.contains_key(&path),
                    label: format!("{label} {file}"),
                    path,
                }
            })
            .collect()
    }
}

/// A session wired to fakes, driven one event at a time.
pub struct Harness {
    session: Option<Session>,
    pub config: FakeConfig,
    pub backups: FakeBackups,
    pub templates: FakeTemplates,
}

impl Harness {
    /// `(tool, provider ids, current id)` per seeded tool; starts on Claude in single view.
    pub fn with_providers(seed: &[(&str, &[&str], &str)]) -> Self {
        let mut config = FakeConfig::default();
        for (app, ids, current) in seed {
            let app = app.parse::<AppType>().expect("known tool");
            config.providers[app] = ids.iter().map(|id| provider(app, id)).collect();
            config.current[app] = current.to_string();
        }
        config.touch();

        let mut harness = Self {
            session: None,
            config,
            backups: FakeBackups::default(),
            templates: FakeTemplates::default(),
        };
        let mut services = Services {
            config: &mut harness.config,
            backups: &mut harness.backups,
            templates: &mut harness.templates,
        };
        let session = Session::new(AppType::Claude, Some(ViewMode::Single), &mut services)
            .expect("session starts");
        harness.session = Some(session);
        harness
    }

    pub fn session(&self) -> &Session {
        self.session.as_ref().expect("session present")
    }

    pub fn session_mut(&mut self) -> &mut Session {
        self.session.as_mut().expect("session present")
    }

    pub fn send(&mut self, event: Event) -> Vec<Command> {
        let session = self.session.take().expect("session present");
        let mut services = Services {
            config: &mut self.config,
            backups: &mut self.backups,
            templates: &mut self.templates,
        };
        let (next, commands) = session.update(event, &mut services);
        self.session = Some(next);
        commands
    }

    pub fn press_key(&mut self, key: KeyEvent) -> Vec<Command> {
        self.send(Event::Key(key))
    }

    pub fn press(&mut self, code: KeyCode) -> Vec<Command> {
        self.press_key(key(code))
    }

    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c));
        }
    }
}
