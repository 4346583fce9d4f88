//! The interactive session: one value, transformed once per event.

use std::time::SystemTime;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app_config::{AppType, ViewMode};
use crate::error::AppError;
use crate::provider::Provider;
use crate::services::{TemplateCategory, UpdateCheckInfo};

use super::backend::Services;
use super::cursor::{self, ColumnCursors};
use super::data::{ProviderRow, UiData};
use super::mcp::{McpFlow, McpMode};
use super::provider_form::{FormKind, ProviderForm};
use super::template::{TemplateFlow, TemplateMode};

#[derive(Debug, Clone, Default)]
pub enum Mode {
    #[default]
    List,
    Form(ProviderForm),
    DeleteConfirm {
        app: AppType,
        id: String,
        name: String,
    },
    AppSelect {
        cursor: usize,
    },
    BackupList {
        cursor: usize,
    },
    Templates(TemplateFlow),
    Mcp(McpFlow),
}

/// Payload-free tag of [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryMode {
    List,
    FormAdd,
    FormEdit,
    DeleteConfirm,
    AppSelect,
    BackupList,
    TemplateManager,
    McpManager,
}

impl Mode {
    pub fn primary(&self) -> PrimaryMode {
        match self {
            Mode::List => PrimaryMode::List,
            Mode::Form(form) => match form.kind {
                FormKind::Add => PrimaryMode::FormAdd,
                FormKind::Edit { .. } => PrimaryMode::FormEdit,
            },
            Mode::DeleteConfirm { .. } => PrimaryMode::DeleteConfirm,
            Mode::AppSelect { .. } => PrimaryMode::AppSelect,
            Mode::BackupList { .. } => PrimaryMode::BackupList,
            Mode::Templates(_) => PrimaryMode::TemplateManager,
            Mode::Mcp(_) => PrimaryMode::McpManager,
        }
    }

    /// Modes where printable keys are typed into a field.
    pub fn accepts_text(&self) -> bool {
        match self {
            Mode::Form(_) => true,
            Mode::Templates(flow) => matches!(flow.mode, TemplateMode::SaveInputName { .. }),
            Mode::Mcp(flow) => matches!(flow.mode, McpMode::Add(_) | McpMode::Edit { .. }),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    Tick,
    UpdateChecked(Result<UpdateCheckInfo, String>),
    UpdateInstalled(Result<String, String>),
}

/// Slow work the caller runs outside the dispatch step; results come back as [`Event`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CheckUpdate,
    DownloadUpdate { tag: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdateStatus {
    #[default]
    Idle,
    Checking,
    Available {
        current: String,
        latest: String,
    },
    Installing,
    Installed(String),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub mode: Mode,
    pub view: ViewMode,
    /// Tool shown by the single-column view.
    pub app: AppType,
    /// Row of `app` in the single-column view.
    pub cursor: usize,
    pub columns: ColumnCursors,
    pub data: UiData,
    pub message: Option<String>,
    pub err: Option<String>,
    /// Provider staged by `c`, consumed by the next add form for the same tool.
    pub staged_copy: Option<(AppType, Provider)>,
    pub config_mtime: Option<SystemTime>,
    pub update: UpdateStatus,
    pub show_help: bool,
    pub should_quit: bool,
    /// Set when the last key had no binding in the current mode.
    key_ignored: bool,
}

impl Session {
    pub fn new(
        app: AppType,
        view: Option<ViewMode>,
        services: &mut Services<'_>,
    ) -> Result<Self, AppError> {
        let view = view.unwrap_or_else(|| services.config.view_mode_preference());
        let data = UiData::load(services, TemplateCategory::for_app(app))?;
        let mut columns = ColumnCursors::new(app);
        let lens = data.lens();

        let cursor = data.providers[app]
            .position(&data.providers[app].current_id)
            .unwrap_or(0);
        for tool in AppType::ALL {
            columns.cursors[tool] = data.providers[tool]
                .position(&data.providers[tool].current_id)
                .unwrap_or(0);
        }
        columns.focus(app, cursor, &lens);

        Ok(Self {
            mode: Mode::List,
            view,
            app,
            cursor,
            columns,
            data,
            message: None,
            err: None,
            staged_copy: None,
            config_mtime: services.config.modified_time(),
            update: UpdateStatus::Idle,
            show_help: false,
            should_quit: false,
            key_ignored: false,
        })
    }

    /// Consumes the session and one event, returning the next session and any deferred work.
    pub fn update(mut self, event: Event, services: &mut Services<'_>) -> (Self, Vec<Command>) {
        let mut commands = Vec::new();
        match event {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Press {
                    self.on_key(key, services, &mut commands);
                }
            }
            Event::Tick => self.on_tick(services),
            Event::UpdateChecked(result) => self.on_update_checked(result),
            Event::UpdateInstalled(result) => self.on_update_installed(result),
        }
        (self, commands)
    }

    fn on_key(&mut self, key: KeyEvent, services: &mut Services<'_>, commands: &mut Vec<Command>) {
        let status = (self.message.take(), self.err.take());
        self.key_ignored = false;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if key.code == KeyCode::Char('?') && !self.mode.accepts_text() {
            self.show_help = !self.show_help;
            return;
        }

        let before = self.mode.primary();
        let mode = std::mem::take(&mut self.mode);
        self.mode = match mode {
            Mode::List => self.on_list_key(key, services, commands),
            Mode::Form(form) => self.on_form_key(form, key, services),
            Mode::DeleteConfirm { app, id, name } => {
                self.on_delete_confirm_key(app, id, name, key, services)
            }
            Mode::AppSelect { cursor } => self.on_app_select_key(cursor, key),
            Mode::BackupList { cursor } => self.on_backup_key(cursor, key, services),
            Mode::Templates(flow) => self.on_template_key(flow, key, services),
            Mode::Mcp(flow) => self.on_mcp_key(flow, key, services),
        };
        if self.key_ignored {
            (self.message, self.err) = status;
        }
        if self.mode.primary() != before {
            log::debug!("mode {:?} -> {:?}", before, self.mode.primary());
        }
    }

    fn on_tick(&mut self, services: &mut Services<'_>) {
        if !matches!(self.mode, Mode::List) {
            return;
        }
        let mtime = services.config.modified_time();
        if mtime.is_none() || mtime == self.config_mtime {
            return;
        }
        log::info!("config changed on disk, reloading");
        let result = services
            .config
            .reload()
            .and_then(|()| self.data.refresh_all(services));
        self.config_mtime = mtime;
        match result {
            Ok(()) => {
                self.clamp_cursors();
                self.set_message("Configuration changed on disk; reloaded");
            }
            Err(e) => self.set_err(format!("Failed to reload configuration: {e}")),
        }
    }

    fn on_update_checked(&mut self, result: Result<UpdateCheckInfo, String>) {
        match result {
            Ok(info) if info.has_update() => {
                self.set_message(format!(
                    "Update available: {} (current v{}); press U to install",
                    info.target_tag, info.current_version
                ));
                self.update = UpdateStatus::Available {
                    current: info.current_version,
                    latest: info.target_tag,
                };
            }
            Ok(info) => {
                self.update = UpdateStatus::Idle;
                self.set_message(format!("Already up to date (v{})", info.current_version));
            }
            Err(e) => {
                self.update = UpdateStatus::Idle;
                self.set_err(format!("Update check failed: {e}"));
            }
        }
    }

    fn on_update_installed(&mut self, result: Result<String, String>) {
        match result {
            Ok(tag) => {
                self.set_message(format!("Installed {tag}; restart cc-switch-tui to use it"));
                self.update = UpdateStatus::Installed(tag);
            }
            Err(e) => {
                self.update = UpdateStatus::Idle;
                self.set_err(format!("Update failed: {e}"));
            }
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.err = None;
    }

    /// Marks the current key as unbound so the status line survives it.
    pub(crate) fn ignore_key(&mut self) {
        self.key_ignored = true;
    }

    pub fn set_err(&mut self, err: impl Into<String>) {
        let err = err.into();
        log::warn!("{err}");
        self.err = Some(err);
        self.message = None;
    }

    /// Tool whose list has the focus in the current view.
    pub fn focused_app(&self) -> AppType {
        match self.view {
            ViewMode::Single => self.app,
            ViewMode::Multi => self.columns.column,
        }
    }

    pub fn focused_row_index(&self) -> usize {
        match self.view {
            ViewMode::Single => self.cursor,
            ViewMode::Multi => self.columns.current(),
        }
    }

    pub fn selected_row(&self) -> Option<&ProviderRow> {
        self.data.providers[self.focused_app()]
            .rows
            .get(self.focused_row_index())
    }

    pub(crate) fn clamp_cursors(&mut self) {
        let lens = self.data.lens();
        self.cursor = cursor::clamp(self.cursor, lens[self.app]);
        self.columns.clamp_all(&lens);
    }

    /// Puts the cursor of `app` on `id` if it is still listed.
    pub(crate) fn anchor_on(&mut self, app: AppType, id: &str) {
        if let Some(row) = self.data.providers[app].position(id) {
            self.columns.cursors[app] = row;
            if self.app == app {
                self.cursor = row;
            }
            if self.view == ViewMode::Multi && self.columns.column == app {
                self.columns.desired_row = row;
            }
        }
        self.clamp_cursors();
    }

    pub(crate) fn record_mtime(&mut self, services: &Services<'_>) {
        self.config_mtime = services.config.modified_time();
    }

    /// Re-reads the provider lists after a mutation and keeps `anchor` selected.
    pub(crate) fn refresh_providers(
        &mut self,
        services: &Services<'_>,
        anchor: Option<(AppType, &str)>,
    ) -> Result<(), AppError> {
        self.data.refresh_providers(&*services.config)?;
        self.record_mtime(services);
        match anchor {
            Some((app, id)) => self.anchor_on(app, id),
            None => self.clamp_cursors(),
        }
        Ok(())
    }

    pub(crate) fn select_app(&mut self, app: AppType) {
        let lens = self.data.lens();
        match self.view {
            ViewMode::Single => {
                self.columns.cursors[self.app] = self.cursor;
                self.app = app;
                self.cursor = cursor::clamp(self.columns.cursors[app], lens[app]);
            }
            ViewMode::Multi => {
                self.columns.land_on(app, &lens);
                self.app = app;
            }
        }
    }

    pub(crate) fn toggle_view(&mut self) {
        let lens = self.data.lens();
        self.view = self.view.toggle();
        match self.view {
            ViewMode::Multi => self.columns.focus(self.app, self.cursor, &lens),
            ViewMode::Single => {
                self.app = self.columns.column;
                self.cursor = cursor::clamp(self.columns.current(), lens[self.app]);
            }
        }
    }
}
