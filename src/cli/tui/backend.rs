//! Seams between the session state machine and the services it drives.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

use crate::app_config::{AppType, McpServer, ViewMode};
use crate::error::AppError;
use crate::provider::Provider;
use crate::services::{
    BackupInfo, ConfigService, McpService, MoveDirection, ProviderService, Template,
    TemplateCategory, TemplateService, TemplateTarget,
};
use crate::store::AppState;

pub trait ConfigManager {
    fn providers(&self, app: AppType) -> Result<Vec<Provider>, AppError>;
    fn current_provider(&self, app: AppType) -> Result<String, AppError>;
    fn get_provider(&self, app: AppType, id: &str) -> Result<Option<Provider>, AppError>;
    fn add_provider(&mut self, app: AppType, provider: Provider) -> Result<(), AppError>;
    fn update_provider(&mut self, app: AppType, provider: Provider) -> Result<(), AppError>;
    fn delete_provider(&mut self, app: AppType, id: &str) -> Result<(), AppError>;
    fn move_provider(
        &mut self,
        app: AppType,
        id: &str,
        direction: MoveDirection,
    ) -> Result<(), AppError>;
    fn switch_provider(&mut self, app: AppType, id: &str) -> Result<(), AppError>;
    /// The tool's live config, used to pre-fill the first provider.
    fn read_live_settings(&self, app: AppType) -> Result<Option<Value>, AppError>;

    fn mcp_servers(&self) -> Result<Vec<McpServer>, AppError>;
    /// `Ok(None)` means the server does not exist; any other failure is an error.
    fn get_mcp_server(&self, id: &str) -> Result<Option<McpServer>, AppError>;
    fn upsert_mcp_server(&mut self, server: McpServer) -> Result<(), AppError>;
    fn delete_mcp_server(&mut self, id: &str) -> Result<(), AppError>;
    fn sync_mcp_server(&mut self, id: &str) -> Result<(), AppError>;
    fn unlink_mcp_server(&mut self, app: AppType, id: &str) -> Result<(), AppError>;

    fn save(&mut self) -> Result<(), AppError>;
    fn reload(&mut self) -> Result<(), AppError>;
    fn modified_time(&self) -> Option<SystemTime>;
    fn view_mode_preference(&self) -> ViewMode;
}

pub trait BackupStore {
    /// Returns the new backup id, empty when there was nothing to back up.
    fn create_backup(&mut self) -> Result<String, AppError>;
    /// Newest first.
    fn list_backups(&self) -> Result<Vec<BackupInfo>, AppError>;
    fn restore_backup(&mut self, path: &Path) -> Result<String, AppError>;
}

pub trait TemplateStore {
    fn list(&self, category: TemplateCategory) -> Result<Vec<Template>, AppError>;
    fn get(&self, id: &str) -> Result<Option<Template>, AppError>;
    fn add_from_file(
        &mut self,
        name: &str,
        category: TemplateCategory,
        source: &Path,
    ) -> Result<Template, AppError>;
    fn delete(&mut self, id: &str) -> Result<(), AppError>;
    fn diff(&self, template: &Template, target: &Path) -> Result<String, AppError>;
    fn apply(&mut self, template: &Template, target: &Path) -> Result<(), AppError>;
    fn targets(&self, category: TemplateCategory) -> Vec<TemplateTarget>;
}

/// Collaborators borrowed for the duration of one dispatch step.
pub struct Services<'a> {
    pub config: &'a mut dyn ConfigManager,
    pub backups: &'a mut dyn BackupStore,
    pub templates: &'a mut dyn TemplateStore,
}

/// [`ConfigManager`] over the on-disk `config.json`.
pub struct LiveConfig {
    state: AppState,
}

impl LiveConfig {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn config_path(&self) -> PathBuf {
        self.state.path().to_path_buf()
    }
}

impl ConfigManager for LiveConfig {
    fn providers(&self, app: AppType) -> Result<Vec<Provider>, AppError> {
        ProviderService::list(&self.state, app)
    }

    fn current_provider(&self, app: AppType) -> Result<String, AppError> {
        ProviderService::current(&self.state, app)
    }

    fn get_provider(&self, app: AppType, id: &str) -> Result<Option<Provider>, AppError> {
        ProviderService::get(&self.state, app, id)
    }

    fn add_provider(&mut self, app: AppType, provider: Provider) -> Result<(), AppError> {
        ProviderService::add(&self.state, app, provider)
    }

    fn update_provider(&mut self, app: AppType, provider: Provider) -> Result<(), AppError> {
        ProviderService::update(&self.state, app, provider)
    }

    fn delete_provider(&mut self, app: AppType, id: &str) -> Result<(), AppError> {
        ProviderService::delete(&self.state, app, id)
    }

    fn move_provider(
        &mut self,
        app: AppType,
        id: &str,
        direction: MoveDirection,
    ) -> Result<(), AppError> {
        ProviderService::move_provider(&self.state, app, id, direction)
    }

    fn switch_provider(&mut self, app: AppType, id: &str) -> Result<(), AppError> {
        ProviderService::switch(&self.state, app, id)
    }

    fn read_live_settings(&self, app: AppType) -> Result<Option<Value>, AppError> {
        ProviderService::read_live_settings(app)
    }

    fn mcp_servers(&self) -> Result<Vec<McpServer>, AppError> {
        McpService::list(&self.state)
    }

    fn get_mcp_server(&self, id: &str) -> Result<Option<McpServer>, AppError> {
        McpService::get(&self.state, id)
    }

    fn upsert_mcp_server(&mut self, server: McpServer) -> Result<(), AppError> {
        McpService::upsert(&self.state, server)
    }

    fn delete_mcp_server(&mut self, id: &str) -> Result<(), AppError> {
        McpService::delete(&self.state, id).map(|_| ())
    }

    fn sync_mcp_server(&mut self, id: &str) -> Result<(), AppError> {
        McpService::sync_server(&self.state, id)
    }

    fn unlink_mcp_server(&mut self, app: AppType, id: &str) -> Result<(), AppError> {
        McpService::remove_server_from_app(app, id).map(|_| ())
    }

    fn save(&mut self) -> Result<(), AppError> {
        self.state.save()
    }

    fn reload(&mut self) -> Result<(), AppError> {
        self.state.reload()
    }

    fn modified_time(&self) -> Option<SystemTime> {
        self.state.modified_time()
    }

    fn view_mode_preference(&self) -> ViewMode {
        crate::settings::get_settings().view_mode
    }
}

/// [`BackupStore`] for the backups directory next to `config.json`.
pub struct LiveBackups {
    config_path: PathBuf,
}

impl LiveBackups {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }
}

impl BackupStore for LiveBackups {
    fn create_backup(&mut self) -> Result<String, AppError> {
        ConfigService::create_backup(&self.config_path, None)
    }

    fn list_backups(&self) -> Result<Vec<BackupInfo>, AppError> {
        ConfigService::list_backups(&self.config_path)
    }

    fn restore_backup(&mut self, path: &Path) -> Result<String, AppError> {
        ConfigService::restore_backup(path, &self.config_path)
    }
}

pub struct LiveTemplates;

impl TemplateStore for LiveTemplates {
    fn list(&self, category: TemplateCategory) -> Result<Vec<Template>, AppError> {
        TemplateService::list(category)
    }

    fn get(&self, id: &str) -> Result<Option<Template>, AppError> {
        TemplateService::get(id)
    }

    fn add_from_file(
        &mut self,
        name: &str,
        category: TemplateCategory,
        source: &Path,
    ) -> Result<Template, AppError> {
        TemplateService::add_from_file(name, category, source)
    }

    fn delete(&mut self, id: &str) -> Result<(), AppError> {
        TemplateService::delete(id)
    }

    fn diff(&self, template: &Template, target: &Path) -> Result<String, AppError> {
        TemplateService::diff(template, target)
    }

    fn apply(&mut self, template: &Template, target: &Path) -> Result<(), AppError> {
        TemplateService::apply(template, target)
    }

    fn targets(&self, category: TemplateCategory) -> Vec<TemplateTarget> {
        TemplateService::targets(category)
    }
}
