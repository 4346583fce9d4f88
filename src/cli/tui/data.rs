use serde_json::Value;

use crate::app_config::{AppType, McpServer, PerApp};
use crate::error::AppError;
use crate::provider::Provider;
use crate::services::{BackupInfo, Template, TemplateCategory};

use super::backend::{BackupStore, ConfigManager, Services, TemplateStore};

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRow {
    pub id: String,
    pub provider: Provider,
    pub api_url: Option<String>,
    pub is_current: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvidersSnapshot {
    pub current_id: String,
    pub rows: Vec<ProviderRow>,
}

impl ProvidersSnapshot {
    pub fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }
}

/// Read-through caches of everything the session lists. Refreshed explicitly
/// after each mutation.
#[derive(Debug, Clone, Default)]
pub struct UiData {
    pub providers: PerApp<ProvidersSnapshot>,
    pub backups: Vec<BackupInfo>,
    pub template_category: TemplateCategory,
    pub templates: Vec<Template>,
    pub mcp: Vec<McpServer>,
}

impl UiData {
    pub fn load(services: &Services<'_>, category: TemplateCategory) -> Result<Self, AppError> {
        let mut data = Self::default();
        data.refresh_providers(&*services.config)?;
        data.refresh_backups(&*services.backups)?;
        data.refresh_templates(&*services.templates, category)?;
        data.refresh_mcp(&*services.config)?;
        Ok(data)
    }

    pub fn lens(&self) -> PerApp<usize> {
        PerApp::from_fn(|app| self.providers[app].rows.len())
    }

    pub fn refresh_providers(&mut self, config: &dyn ConfigManager) -> Result<(), AppError> {
        for app in AppType::ALL {
            self.providers[app] = load_providers(config, app)?;
        }
        Ok(())
    }

    pub fn refresh_backups(&mut self, backups: &dyn BackupStore) -> Result<(), AppError> {
        self.backups = backups.list_backups()?;
        Ok(())
    }

    pub fn refresh_templates(
        &mut self,
        templates: &dyn TemplateStore,
        category: TemplateCategory,
    ) -> Result<(), AppError> {
        self.templates = templates.list(category)?;
        self.template_category = category;
        Ok(())
    }

    pub fn refresh_mcp(&mut self, config: &dyn ConfigManager) -> Result<(), AppError> {
        self.mcp = config.mcp_servers()?;
        Ok(())
    }

    pub fn refresh_all(&mut self, services: &Services<'_>) -> Result<(), AppError> {
        let category = self.template_category;
        *self = Self::load(services, category)?;
        Ok(())
    }
}

fn load_providers(
    config: &dyn ConfigManager,
    app_type: AppType,
) -> Result<ProvidersSnapshot, AppError> {
    let current_id = config.current_provider(app_type)?;
    let rows = config
        .providers(app_type)?
        .into_iter()
        .map(|provider| ProviderRow {
            api_url: extract_api_url(&provider.settings_config, app_type),
            is_current: provider.id == current_id,
            id: provider.id.clone(),
            provider,
        })
        .collect::<Vec<_>>();

    Ok(ProvidersSnapshot { current_id, rows })
}

pub(crate) fn extract_api_url(settings_config: &Value, app_type: AppType) -> Option<String> {
    match app_type {
        AppType::Claude => settings_config
            .get("env")?
            .get("ANTHROPIC_BASE_URL")?
            .as_str()
            .map(|s| s.to_string()),
        AppType::Codex => {
            let config_str = settings_config.get("config")?.as_str()?;
            config_str
                .lines()
                .map(str::trim)
                .filter(|line| line.starts_with("base_url"))
                .filter_map(|line| line.split_once('=').map(|(_, v)| v))
                .map(|v| v.trim().trim_matches('"').trim_matches('\''))
                .find(|url| !url.is_empty())
                .map(|url| url.to_string())
        }
        AppType::Gemini => settings_config
            .get("env")
            .and_then(|env| {
                env.get("GOOGLE_GEMINI_BASE_URL")
                    .or_else(|| env.get("GEMINI_BASE_URL"))
            })?
            .as_str()
            .map(|s| s.to_string()),
    }
}
