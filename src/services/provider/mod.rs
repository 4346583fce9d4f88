mod live;

pub(crate) use live::{merge_codex_config, parse_env};

use chrono::Utc;
use serde_json::Value;

use crate::app_config::AppType;
use crate::error::AppError;
use crate::provider::Provider;
use crate::store::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Provider CRUD, ordering and switching for one tool at a time.
pub struct ProviderService;

impl ProviderService {
    /// Providers of a tool in display order.
    pub fn list(state: &AppState, app_type: AppType) -> Result<Vec<Provider>, AppError> {
        let config = state.config.read()?;
        Ok(config.manager(app_type).sorted())
    }

    /// Id of the active provider; self-heals to the first provider when the
    /// recorded one no longer exists.
    pub fn current(state: &AppState, app_type: AppType) -> Result<String, AppError> {
        {
            let config = state.config.read()?;
            let manager = config.manager(app_type);
            if manager.current.is_empty() || manager.providers.contains_key(&manager.current) {
                return Ok(manager.current.clone());
            }
        }

        let mut config = state.config.write()?;
        let manager = config.manager_mut(app_type);
        let first = manager.sorted().first().map(|p| p.id.clone());
        manager.current = first.unwrap_or_default();
        log::warn!(
            "current {app_type} provider was missing, falling back to '{}'",
            manager.current
        );
        Ok(manager.current.clone())
    }

    pub fn get(
        state: &AppState,
        app_type: AppType,
        id: &str,
    ) -> Result<Option<Provider>, AppError> {
        let config = state.config.read()?;
        Ok(config.manager(app_type).providers.get(id).cloned())
    }

    /// Adds a provider; the first provider of a tool becomes current and is written live.
    pub fn add(state: &AppState, app_type: AppType, provider: Provider) -> Result<(), AppError> {
        let mut provider = provider;
        Self::validate_provider_settings(app_type, &provider)?;

        let became_current = {
            let mut config = state.config.write()?;
            let manager = config.manager_mut(app_type);
            if manager.providers.contains_key(&provider.id) {
                return Err(AppError::InvalidInput(format!(
                    "Provider id already exists: {}",
                    provider.id
                )));
            }

            if provider.created_at.is_none() {
                provider.created_at = Some(Utc::now().timestamp_millis());
            }
            if provider.sort_index.is_none() {
                let next = manager
                    .providers
                    .values()
                    .filter_map(|p| p.sort_index)
                    .max()
                    .map(|max| max + 1)
                    .unwrap_or(manager.providers.len());
                provider.sort_index = Some(next);
            }

            let was_empty = manager.providers.is_empty();
            manager
                .providers
                .insert(provider.id.clone(), provider.clone());
            if was_empty && manager.current.is_empty() {
                manager.current = provider.id.clone();
                true
            } else {
                false
            }
        };

        if became_current {
            live::write_live(app_type, &provider)?;
        }
        log::info!("added {app_type} provider '{}'", provider.id);
        state.save()
    }

    /// Replaces an existing provider, keeping its creation time and position.
    pub fn update(state: &AppState, app_type: AppType, provider: Provider) -> Result<(), AppError> {
        Self::validate_provider_settings(app_type, &provider)?;

        let (merged, is_current) = {
            let mut config = state.config.write()?;
            let manager = config.manager_mut(app_type);
            let existing = manager
                .providers
                .get(&provider.id)
                .ok_or_else(|| AppError::NotFound(format!("provider {}", provider.id)))?;

            let mut merged = provider;
            merged.created_at = merged.created_at.or(existing.created_at);
            merged.sort_index = merged.sort_index.or(existing.sort_index);
            manager.providers.insert(merged.id.clone(), merged.clone());
            let is_current = manager.current == merged.id;
            (merged, is_current)
        };

        if is_current {
            live::write_live(app_type, &merged)?;
        }
        state.save()
    }

    pub fn delete(state: &AppState, app_type: AppType, provider_id: &str) -> Result<(), AppError> {
        {
            let mut config = state.config.write()?;
            let manager = config.manager_mut(app_type);
            if manager.current == provider_id {
                return Err(AppError::InvalidInput(
                    "Cannot delete the provider currently in use".into(),
                ));
            }
            if manager.providers.shift_remove(provider_id).is_none() {
                return Err(AppError::NotFound(format!("provider {provider_id}")));
            }
        }
        log::info!("deleted {app_type} provider '{provider_id}'");
        state.save()
    }

    /// Swaps the provider with its neighbour and renumbers `sort_index` contiguously.
    pub fn move_provider(
        state: &AppState,
        app_type: AppType,
        provider_id: &str,
        direction: MoveDirection,
    ) -> Result<(), AppError> {
        {
            let mut config = state.config.write()?;
            let manager = config.manager_mut(app_type);
            let mut order = manager
                .sorted()
                .into_iter()
                .map(|p| p.id)
                .collect::<Vec<_>>();
            let idx = order
                .iter()
                .position(|id| id == provider_id)
                .ok_or_else(|| AppError::NotFound(format!("provider {provider_id}")))?;

            let target = match direction {
                MoveDirection::Up if idx > 0 => idx - 1,
                MoveDirection::Down if idx + 1 < order.len() => idx + 1,
                _ => {
                    return Err(AppError::InvalidInput(
                        "Provider is already at the boundary".into(),
                    ))
                }
            };
            order.swap(idx, target);

            for (sort_index, id) in order.iter().enumerate() {
                if let Some(provider) = manager.providers.get_mut(id) {
                    provider.sort_index = Some(sort_index);
                }
            }
        }
        state.save()
    }

    /// Makes `provider_id` current: writes its live config and re-syncs MCP servers for the tool.
    pub fn switch(state: &AppState, app_type: AppType, provider_id: &str) -> Result<(), AppError> {
        let provider = Self::get(state, app_type, provider_id)?
            .ok_or_else(|| AppError::NotFound(format!("provider {provider_id}")))?;

        live::write_live(app_type, &provider)?;
        {
            let mut config = state.config.write()?;
            config.manager_mut(app_type).current = provider_id.to_string();
        }
        crate::services::McpService::sync_enabled_to_app(state, app_type)?;
        log::info!("switched {app_type} to provider '{provider_id}'");
        state.save()
    }

    pub fn read_live_settings(app_type: AppType) -> Result<Option<Value>, AppError> {
        live::read_live(app_type)
    }

    fn validate_provider_settings(app_type: AppType, provider: &Provider) -> Result<(), AppError> {
        if provider.id.trim().is_empty() {
            return Err(AppError::InvalidInput("Provider id is required".into()));
        }
        if !provider.settings_config.is_object() {
            return Err(AppError::InvalidInput(format!(
                "{} settings must be a JSON object",
                app_type.display_name()
            )));
        }
        if app_type == AppType::Codex {
            if let Some(cfg) = provider
                .settings_config
                .get("config")
                .and_then(Value::as_str)
            {
                cfg.parse::<toml_edit::DocumentMut>().map_err(|e| {
                    AppError::InvalidInput(format!("Codex config is not valid TOML: {e}"))
                })?;
            }
        }
        Ok(())
    }
}
