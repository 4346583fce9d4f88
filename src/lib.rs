mod app_config;
mod config;
mod error;
mod provider;
mod services;
mod settings;
mod store;

pub mod cli;

pub use app_config::{AppType, McpApps, McpServer, MultiAppConfig, PerApp, ViewMode};
pub use config::{
    get_app_config_path, get_claude_mcp_path, get_claude_settings_path, get_codex_auth_path,
    get_codex_config_path, get_gemini_env_path, get_gemini_settings_path, read_json_file,
};
pub use error::AppError;
pub use provider::Provider;
pub use services::{
    BackupInfo, ConfigService, McpService, MoveDirection, ProviderService, Template,
    TemplateCategory, TemplateService, TemplateTarget, UpdateCheckInfo,
};
pub use settings::{get_settings, update_settings, AppSettings};
pub use store::AppState;
