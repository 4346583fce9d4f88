//! Provider list, provider form, delete confirmation and tool selection.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app_config::{AppType, ViewMode};
use crate::services::{MoveDirection, TemplateCategory};

use super::backend::Services;
use super::cursor;
use super::form::FormKeyResult;
use super::mcp::McpFlow;
use super::provider_form::{self, FormKind, FormSeed, ProviderForm};
use super::session::{Command, Mode, Session, UpdateStatus};
use super::template::TemplateFlow;

impl Session {
    pub(crate) fn on_list_key(
        &mut self,
        key: KeyEvent,
        services: &mut Services<'_>,
        commands: &mut Vec<Command>,
    ) -> Mode {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Up if shift => self.reorder(MoveDirection::Up, services),
            KeyCode::Down if shift => self.reorder(MoveDirection::Down, services),
            KeyCode::Char('K') => self.reorder(MoveDirection::Up, services),
            KeyCode::Char('J') => self.reorder(MoveDirection::Down, services),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(MoveDirection::Up),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(MoveDirection::Down),
            KeyCode::Left | KeyCode::Char('h') if self.view == ViewMode::Multi => {
                self.columns.left(&self.data.lens());
            }
            KeyCode::Right | KeyCode::Char('l') if self.view == ViewMode::Multi => {
                self.columns.right(&self.data.lens());
            }
            KeyCode::Char('[') => self.select_app(self.focused_app().prev()),
            KeyCode::Char(']') => self.select_app(self.focused_app().next()),
            KeyCode::Char('v') => self.toggle_view(),
            KeyCode::Enter => self.switch_selected(services),
            KeyCode::Char('a') => return self.open_add_form(services),
            KeyCode::Char('e') => {
                if let Some(row) = self.selected_row() {
                    let form = provider_form::init_form(
                        self.focused_app(),
                        FormKind::Edit { id: row.id.clone() },
                        FormSeed::Existing(&row.provider),
                    );
                    return Mode::Form(form);
                }
            }
            KeyCode::Char('c') => {
                if let Some(row) = self.selected_row() {
                    let name = row.provider.name.clone();
                    self.staged_copy = Some((self.focused_app(), row.provider.clone()));
                    self.set_message(format!(
                        "Copied '{name}'; press a to add it as a new provider"
                    ));
                }
            }
            KeyCode::Char('d') => {
                if let Some(row) = self.selected_row() {
                    if row.is_current {
                        self.set_err("Cannot delete the provider currently in use");
                    } else {
                        return Mode::DeleteConfirm {
                            app: self.focused_app(),
                            id: row.id.clone(),
                            name: row.provider.name.clone(),
                        };
                    }
                }
            }
            KeyCode::Tab => {
                return Mode::AppSelect {
                    cursor: self.focused_app().index(),
                }
            }
            KeyCode::Char('b') => match self.data.refresh_backups(&*services.backups) {
                Ok(()) => return Mode::BackupList { cursor: 0 },
                Err(e) => self.set_err(format!("Failed to list backups: {e}")),
            },
            KeyCode::Char('B') => self.create_backup(services),
            KeyCode::Char('t') => {
                let category = TemplateCategory::for_app(self.focused_app());
                match self.data.refresh_templates(&*services.templates, category) {
                    Ok(()) => return Mode::Templates(TemplateFlow::new(category)),
                    Err(e) => self.set_err(format!("Failed to load templates: {e}")),
                }
            }
            KeyCode::Char('m') => match self.data.refresh_mcp(&*services.config) {
                Ok(()) => return Mode::Mcp(McpFlow::default()),
                Err(e) => self.set_err(format!("Failed to load MCP servers: {e}")),
            },
            KeyCode::Char('u') => {
                self.update = UpdateStatus::Checking;
                self.set_message("Checking for updates...");
                commands.push(Command::CheckUpdate);
            }
            KeyCode::Char('U') => match &self.update {
                UpdateStatus::Available { latest, .. } => {
                    let tag = latest.clone();
                    self.set_message(format!("Installing {tag}..."));
                    self.update = UpdateStatus::Installing;
                    commands.push(Command::DownloadUpdate { tag });
                }
                UpdateStatus::Installing => {
                    self.set_message("An update is already being installed")
                }
                _ => self.set_message("No update available; press u to check"),
            },
            KeyCode::Char('q') | KeyCode::Esc => match services.config.save() {
                Ok(()) => self.should_quit = true,
                Err(e) => self.set_err(format!("Failed to save configuration: {e}")),
            },
            _ => self.ignore_key(),
        }
        Mode::List
    }

    fn move_cursor(&mut self, direction: MoveDirection) {
        let lens = self.data.lens();
        match (self.view, direction) {
            (ViewMode::Single, MoveDirection::Up) => {
                self.cursor = cursor::wrap_prev(self.cursor, lens[self.app]);
            }
            (ViewMode::Single, MoveDirection::Down) => {
                self.cursor = cursor::wrap_next(self.cursor, lens[self.app]);
            }
            (ViewMode::Multi, MoveDirection::Up) => self.columns.up(&lens),
            (ViewMode::Multi, MoveDirection::Down) => self.columns.down(&lens),
        }
    }

    fn reorder(&mut self, direction: MoveDirection, services: &mut Services<'_>) {
        let app = self.focused_app();
        let index = self.focused_row_index();
        let len = self.data.providers[app].rows.len();
        let Some(row) = self.selected_row() else {
            return;
        };
        let (id, name) = (row.id.clone(), row.provider.name.clone());

        match direction {
            MoveDirection::Up if index == 0 => {
                self.set_message(format!("'{name}' is already at the top"));
                return;
            }
            MoveDirection::Down if index + 1 >= len => {
                self.set_message(format!("'{name}' is already at the bottom"));
                return;
            }
            _ => {}
        }

        if let Err(e) = services.config.move_provider(app, &id, direction) {
            self.set_err(e.to_string());
            return;
        }
        match self.refresh_providers(services, Some((app, id.as_str()))) {
            Ok(()) => self.set_message(format!("Moved '{name}'")),
            Err(e) => self.set_err(e.to_string()),
        }
    }

    fn switch_selected(&mut self, services: &mut Services<'_>) {
        let app = self.focused_app();
        let Some(row) = self.selected_row() else {
            return;
        };
        let (id, name) = (row.id.clone(), row.provider.name.clone());
        if row.is_current {
            self.set_message(format!("'{name}' is already the current provider"));
            return;
        }

        let result = services
            .config
            .switch_provider(app, &id)
            .and_then(|()| self.refresh_providers(services, Some((app, id.as_str()))));
        match result {
            Ok(()) => self.set_message(format!("Switched {} to '{name}'", app.display_name())),
            Err(e) => self.set_err(format!("Failed to switch provider: {e}")),
        }
    }

    fn open_add_form(&mut self, services: &Services<'_>) -> Mode {
        let app = self.focused_app();
        if matches!(&self.staged_copy, Some((staged, _)) if *staged == app) {
            if let Some((_, source)) = self.staged_copy.take() {
                return Mode::Form(provider_form::init_form(
                    app,
                    FormKind::Add,
                    FormSeed::Copy(&source),
                ));
            }
        }

        let live = if self.data.providers[app].rows.is_empty() {
            services.config.read_live_settings(app).unwrap_or_else(|e| {
                log::warn!("cannot read live {} settings: {e}", app.as_str());
                self.set_message(format!(
                    "Could not read live {} settings: {e}",
                    app.display_name()
                ));
                None
            })
        } else {
            None
        };
        Mode::Form(provider_form::init_form(
            app,
            FormKind::Add,
            FormSeed::Defaults(live.as_ref()),
        ))
    }

    pub(crate) fn create_backup(&mut self, services: &mut Services<'_>) {
        let result = services
            .backups
            .create_backup()
            .and_then(|id| self.data.refresh_backups(&*services.backups).map(|()| id));
        match result {
            Ok(id) if id.is_empty() => self.set_message("Nothing to back up yet"),
            Ok(id) => self.set_message(format!("Created backup {id}")),
            Err(e) => self.set_err(format!("Backup failed: {e}")),
        }
    }

    pub(crate) fn on_form_key(
        &mut self,
        mut form: ProviderForm,
        key: KeyEvent,
        services: &mut Services<'_>,
    ) -> Mode {
        match form.state.handle_key(key) {
            FormKeyResult::Submit => return self.submit_form(form, services),
            FormKeyResult::Cancel => return Mode::List,
            FormKeyResult::ReadOnly(label) => {
                self.set_err(format!("{label} is read-only; press Enter to pick a value"));
            }
            FormKeyResult::Cleared => self.set_message("Cleared all fields (Ctrl+Z to undo)"),
            FormKeyResult::Undone => self.set_message("Restored cleared fields"),
            FormKeyResult::UndoEmpty => self.set_err("Nothing to undo"),
            FormKeyResult::Ignored => self.ignore_key(),
            FormKeyResult::Handled => {}
        }
        Mode::Form(form)
    }

    fn submit_form(&mut self, form: ProviderForm, services: &mut Services<'_>) -> Mode {
        if let Err(msg) = provider_form::validate(&form.state) {
            self.set_err(msg);
            return Mode::Form(form);
        }

        let app = form.app;
        let existing = match &form.kind {
            FormKind::Add => None,
            FormKind::Edit { id } => match services.config.get_provider(app, id) {
                Ok(Some(provider)) => Some(provider),
                Ok(None) => {
                    self.set_err(format!("Provider '{id}' no longer exists"));
                    return Mode::Form(form);
                }
                Err(e) => {
                    self.set_err(e.to_string());
                    return Mode::Form(form);
                }
            },
        };
        let ids = self.data.providers[app]
            .rows
            .iter()
            .map(|row| row.id.clone())
            .collect::<Vec<_>>();
        let provider = provider_form::build_provider(&form, &ids, existing.as_ref());
        let (id, name) = (provider.id.clone(), provider.name.clone());

        let (result, verb) = match form.kind {
            FormKind::Add => (services.config.add_provider(app, provider), "Added"),
            FormKind::Edit { .. } => (services.config.update_provider(app, provider), "Updated"),
        };
        if let Err(e) = result {
            self.set_err(e.to_string());
            return Mode::Form(form);
        }

        match self.refresh_providers(services, Some((app, id.as_str()))) {
            Ok(()) => self.set_message(format!("{verb} provider '{name}'")),
            Err(e) => self.set_err(e.to_string()),
        }
        Mode::List
    }

    pub(crate) fn on_delete_confirm_key(
        &mut self,
        app: AppType,
        id: String,
        name: String,
        key: KeyEvent,
        services: &mut Services<'_>,
    ) -> Mode {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let result = services
                    .config
                    .delete_provider(app, &id)
                    .and_then(|()| self.refresh_providers(services, None));
                match result {
                    Ok(()) => self.set_message(format!("Deleted provider '{name}'")),
                    Err(e) => self.set_err(format!("Failed to delete '{name}': {e}")),
                }
                Mode::List
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Mode::List,
            _ => {
                self.ignore_key();
                Mode::DeleteConfirm { app, id, name }
            }
        }
    }

    pub(crate) fn on_app_select_key(&mut self, cursor: usize, key: KeyEvent) -> Mode {
        let len = AppType::ALL.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Mode::AppSelect {
                cursor: cursor::wrap_prev(cursor, len),
            },
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => Mode::AppSelect {
                cursor: cursor::wrap_next(cursor, len),
            },
            KeyCode::Enter => {
                if let Some(app) = AppType::from_index(cursor) {
                    self.select_app(app);
                }
                Mode::List
            }
            KeyCode::Esc | KeyCode::Char('q') => Mode::List,
            _ => {
                self.ignore_key();
                Mode::AppSelect { cursor }
            }
        }
    }
}
