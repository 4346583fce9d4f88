use std::ops::{Index, IndexMut};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::Provider;

/// The CLI tools whose configuration is managed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Claude,
    Codex,
    Gemini,
}

impl AppType {
    pub const ALL: [AppType; 3] = [AppType::Claude, AppType::Codex, AppType::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppType::Claude => "claude",
            AppType::Codex => "codex",
            AppType::Gemini => "gemini",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AppType::Claude => "Claude Code",
            AppType::Codex => "Codex",
            AppType::Gemini => "Gemini CLI",
        }
    }

    /// Column position of this tool in the multi-column view.
    pub fn index(&self) -> usize {
        match self {
            AppType::Claude => 0,
            AppType::Codex => 1,
            AppType::Gemini => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<AppType> {
        Self::ALL.get(index).copied()
    }

    pub fn next(&self) -> AppType {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> AppType {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for AppType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppType {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(AppType::Claude),
            "codex" => Ok(AppType::Codex),
            "gemini" => Ok(AppType::Gemini),
            other => Err(crate::error::AppError::InvalidInput(format!(
                "Unknown app type: {other}"
            ))),
        }
    }
}

/// One value per managed tool, indexed by [`AppType`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerApp<T> {
    #[serde(default)]
    pub claude: T,
    #[serde(default)]
    pub codex: T,
    #[serde(default)]
    pub gemini: T,
}

impl<T> PerApp<T> {
    pub fn from_fn(mut f: impl FnMut(AppType) -> T) -> Self {
        Self {
            claude: f(AppType::Claude),
            codex: f(AppType::Codex),
            gemini: f(AppType::Gemini),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AppType, &T)> {
        AppType::ALL.into_iter().map(move |app| (app, &self[app]))
    }
}

impl<T> Index<AppType> for PerApp<T> {
    type Output = T;

    fn index(&self, app: AppType) -> &T {
        match app {
            AppType::Claude => &self.claude,
            AppType::Codex => &self.codex,
            AppType::Gemini => &self.gemini,
        }
    }
}

impl<T> IndexMut<AppType> for PerApp<T> {
    fn index_mut(&mut self, app: AppType) -> &mut T {
        match app {
            AppType::Claude => &mut self.claude,
            AppType::Codex => &mut self.codex,
            AppType::Gemini => &mut self.gemini,
        }
    }
}

/// Whether the provider list shows one tool or all three side by side.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Single,
    Multi,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Single => ViewMode::Multi,
            ViewMode::Multi => ViewMode::Single,
        }
    }
}

/// Per-tool enablement flags of an MCP server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpApps {
    #[serde(default)]
    pub claude: bool,
    #[serde(default)]
    pub codex: bool,
    #[serde(default)]
    pub gemini: bool,
}

impl McpApps {
    pub fn is_enabled_for(&self, app: AppType) -> bool {
        match app {
            AppType::Claude => self.claude,
            AppType::Codex => self.codex,
            AppType::Gemini => self.gemini,
        }
    }

    pub fn set_enabled_for(&mut self, app: AppType, enabled: bool) {
        match app {
            AppType::Claude => self.claude = enabled,
            AppType::Codex => self.codex = enabled,
            AppType::Gemini => self.gemini = enabled,
        }
    }

    pub fn toggle(&mut self, app: AppType) {
        let enabled = self.is_enabled_for(app);
        self.set_enabled_for(app, !enabled);
    }

    pub fn enabled_apps(&self) -> Vec<AppType> {
        AppType::ALL
            .into_iter()
            .filter(|app| self.is_enabled_for(*app))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub id: String,
    pub name: String,
    /// Transport definition (`command`/`args`/`env` or `url`), written verbatim
    /// into each tool's own config.
    pub server: Value,
    #[serde(default)]
    pub apps: McpApps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderManager {
    #[serde(default)]
    pub providers: IndexMap<String, Provider>,
    #[serde(default)]
    pub current: String,
}

impl ProviderManager {
    /// Providers in display order: explicit `sort_index` first, then creation time.
    pub fn sorted(&self) -> Vec<Provider> {
        let mut items = self.providers.values().cloned().collect::<Vec<_>>();
        items.sort_by(|a, b| match (a.sort_index, b.sort_index) {
            (Some(idx_a), Some(idx_b)) => idx_a.cmp(&idx_b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.created_at.cmp(&b.created_at),
        });
        items
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpRoot {
    #[serde(default)]
    pub servers: IndexMap<String, McpServer>,
}

/// Everything persisted in `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAppConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(flatten)]
    pub apps: PerApp<ProviderManager>,
    #[serde(default)]
    pub mcp: McpRoot,
}

fn default_version() -> u32 {
    2
}

impl Default for MultiAppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            apps: PerApp::default(),
            mcp: McpRoot::default(),
        }
    }
}

impl MultiAppConfig {
    pub fn manager(&self, app: AppType) -> &ProviderManager {
        &self.apps[app]
    }

    pub fn manager_mut(&mut self, app: AppType) -> &mut ProviderManager {
        &mut self.apps[app]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_type_cycles_in_both_directions() {
        assert_eq!(AppType::Claude.next(), AppType::Codex);
        assert_eq!(AppType::Gemini.next(), AppType::Claude);
        assert_eq!(AppType::Claude.prev(), AppType::Gemini);
        assert_eq!(AppType::Codex.prev(), AppType::Claude);
    }

    #[test]
    fn per_app_index_matches_fields() {
        let mut per = PerApp::from_fn(|app| app.index());
        assert_eq!(per[AppType::Codex], 1);
        per[AppType::Gemini] = 9;
        assert_eq!(per.gemini, 9);
        let collected = per.iter().map(|(app, v)| (app, *v)).collect::<Vec<_>>();
        assert_eq!(
            collected,
            vec![(AppType::Claude, 0), (AppType::Codex, 1), (AppType::Gemini, 9)]
        );
    }

    #[test]
    fn mcp_apps_toggle_flips_single_flag() {
        let mut apps = McpApps::default();
        apps.toggle(AppType::Codex);
        assert!(apps.codex);
        assert!(!apps.claude && !apps.gemini);
        assert_eq!(apps.enabled_apps(), vec![AppType::Codex]);
    }

    #[test]
    fn multi_app_config_round_trips_flattened_apps() {
        let raw = json!({
            "version": 2,
            "claude": { "providers": {}, "current": "" },
            "codex": { "current": "x" },
            "mcp": { "servers": {} }
        });
        let cfg: MultiAppConfig = serde_json::from_value(raw).expect("parse config");
        assert_eq!(cfg.manager(AppType::Codex).current, "x");
        assert!(cfg.manager(AppType::Gemini).providers.is_empty());

        let out = serde_json::to_value(&cfg).expect("serialize config");
        assert!(out.get("gemini").is_some());
    }
}
