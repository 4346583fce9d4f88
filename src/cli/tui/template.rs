//! Template manager: preview, apply through a diff preview, save from a file, delete.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};

use crate::app_config::AppType;
use crate::services::{Template, TemplateCategory, TemplateTarget};

use super::backend::Services;
use super::cursor::{self, PAGE_SIZE};
use super::form::TextInput;
use super::session::{Mode, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFlow {
    pub category: TemplateCategory,
    pub cursor: usize,
    pub mode: TemplateMode,
}

impl TemplateFlow {
    pub fn new(category: TemplateCategory) -> Self {
        Self {
            category,
            cursor: 0,
            mode: TemplateMode::List,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateMode {
    #[default]
    List,
    Preview {
        id: String,
        scroll: usize,
    },
    ApplySelectTarget {
        id: String,
        targets: Vec<TemplateTarget>,
        cursor: usize,
    },
    ApplyPreviewDiff {
        id: String,
        target: TemplateTarget,
        diff: String,
        scroll: usize,
        /// Restored when backing out of the preview.
        targets: Vec<TemplateTarget>,
        target_cursor: usize,
    },
    SaveSelectSource {
        targets: Vec<TemplateTarget>,
        cursor: usize,
    },
    SaveInputName {
        source: PathBuf,
        name: TextInput,
    },
    DeleteConfirm {
        id: String,
        name: String,
    },
}

enum Scroll {
    Up(usize),
    Down(usize),
}

fn scroll_key(key: &KeyEvent) -> Option<Scroll> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Scroll::Up(1)),
        KeyCode::Down | KeyCode::Char('j') => Some(Scroll::Down(1)),
        KeyCode::PageUp => Some(Scroll::Up(PAGE_SIZE)),
        KeyCode::PageDown | KeyCode::Char(' ') => Some(Scroll::Down(PAGE_SIZE)),
        _ => None,
    }
}

fn apply_scroll(offset: usize, scroll: Scroll, text: &str) -> usize {
    let lines = text.lines().count();
    match scroll {
        Scroll::Up(by) => cursor::scroll_up(offset, by, lines),
        Scroll::Down(by) => cursor::scroll_down(offset, by, lines),
    }
}

impl Session {
    fn template_by_id(&self, id: &str) -> Option<&Template> {
        self.data.templates.iter().find(|t| t.id == id)
    }

    pub(crate) fn on_template_key(
        &mut self,
        mut flow: TemplateFlow,
        key: KeyEvent,
        services: &mut Services<'_>,
    ) -> Mode {
        let mode = std::mem::take(&mut flow.mode);
        flow.mode = match mode {
            TemplateMode::List => match self.on_template_list_key(&mut flow, key, services) {
                Some(mode) => mode,
                None => return Mode::List,
            },
            TemplateMode::Preview { id, scroll } => match (key.code, scroll_key(&key)) {
                (_, Some(step)) => {
                    let content = self
                        .template_by_id(&id)
                        .map(|t| t.content.as_str())
                        .unwrap_or_default();
                    let scroll = apply_scroll(scroll, step, content);
                    TemplateMode::Preview { id, scroll }
                }
                (KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('p'), _) => TemplateMode::List,
                _ => {
                    self.ignore_key();
                    TemplateMode::Preview { id, scroll }
                }
            },
            TemplateMode::ApplySelectTarget {
                id,
                targets,
                cursor,
            } => self.on_apply_select_key(id, targets, cursor, key, services),
            TemplateMode::ApplyPreviewDiff {
                id,
                target,
                diff,
                scroll,
                targets,
                target_cursor,
            } => match (key.code, scroll_key(&key)) {
                (KeyCode::Char('y') | KeyCode::Char('Y'), _) => {
                    match self.apply_template(&id, &target, services) {
                        Ok(()) => TemplateMode::List,
                        Err(e) => {
                            self.set_err(e);
                            TemplateMode::ApplyPreviewDiff {
                                id,
                                target,
                                diff,
                                scroll,
                                targets,
                                target_cursor,
                            }
                        }
                    }
                }
                (KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc, _) => {
                    TemplateMode::ApplySelectTarget {
                        id,
                        targets,
                        cursor: target_cursor,
                    }
                }
                (_, Some(step)) => TemplateMode::ApplyPreviewDiff {
                    scroll: apply_scroll(scroll, step, &diff),
                    id,
                    target,
                    diff,
                    targets,
                    target_cursor,
                },
                _ => {
                    self.ignore_key();
                    TemplateMode::ApplyPreviewDiff {
                        id,
                        target,
                        diff,
                        scroll,
                        targets,
                        target_cursor,
                    }
                }
            },
            TemplateMode::SaveSelectSource { targets, cursor } => match key.code {
                KeyCode::Up | KeyCode::Char('k') => TemplateMode::SaveSelectSource {
                    cursor: cursor::wrap_prev(cursor, targets.len()),
                    targets,
                },
                KeyCode::Down | KeyCode::Char('j') => TemplateMode::SaveSelectSource {
                    cursor: cursor::wrap_next(cursor, targets.len()),
                    targets,
                },
                KeyCode::Enter => match targets.get(cursor).map(|t| (t.exists, t.path.clone())) {
                    Some((true, source)) => TemplateMode::SaveInputName {
                        source,
                        name: TextInput::default(),
                    },
                    Some((false, source)) => {
                        self.set_err(format!("{} does not exist", source.display()));
                        TemplateMode::SaveSelectSource { targets, cursor }
                    }
                    None => TemplateMode::SaveSelectSource { targets, cursor },
                },
                KeyCode::Esc | KeyCode::Char('q') => TemplateMode::List,
                _ => {
                    self.ignore_key();
                    TemplateMode::SaveSelectSource { targets, cursor }
                }
            },
            TemplateMode::SaveInputName { source, mut name } => match key.code {
                KeyCode::Enter => self.save_template(&mut flow, source, name, services),
                KeyCode::Esc => TemplateMode::List,
                _ => {
                    name.handle_edit_key(key);
                    TemplateMode::SaveInputName { source, name }
                }
            },
            TemplateMode::DeleteConfirm { id, name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    let result = services
                        .templates
                        .delete(&id)
                        .and_then(|()| {
                            self.data
                                .refresh_templates(&*services.templates, flow.category)
                        });
                    match result {
                        Ok(()) => {
                            flow.cursor = cursor::clamp(flow.cursor, self.data.templates.len());
                            self.set_message(format!("Deleted template '{name}'"));
                            TemplateMode::List
                        }
                        Err(e) => {
                            self.set_err(format!("Failed to delete template: {e}"));
                            TemplateMode::DeleteConfirm { id, name }
                        }
                    }
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => TemplateMode::List,
                _ => {
                    self.ignore_key();
                    TemplateMode::DeleteConfirm { id, name }
                }
            },
        };
        Mode::Templates(flow)
    }

    /// `None` leaves the template manager.
    fn on_template_list_key(
        &mut self,
        flow: &mut TemplateFlow,
        key: KeyEvent,
        services: &mut Services<'_>,
    ) -> Option<TemplateMode> {
        let len = self.data.templates.len();
        let selected = self.data.templates.get(flow.cursor).cloned();
        let mode = match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                flow.cursor = cursor::wrap_prev(flow.cursor, len);
                TemplateMode::List
            }
            KeyCode::Down | KeyCode::Char('j') => {
                flow.cursor = cursor::wrap_next(flow.cursor, len);
                TemplateMode::List
            }
            KeyCode::Left | KeyCode::Char('[') => {
                let app = flow.category.app().prev();
                self.switch_category(flow, app, services);
                TemplateMode::List
            }
            KeyCode::Right | KeyCode::Char(']') => {
                let app = flow.category.app().next();
                self.switch_category(flow, app, services);
                TemplateMode::List
            }
            KeyCode::Enter => match selected {
                Some(template) => TemplateMode::ApplySelectTarget {
                    id: template.id,
                    targets: services.templates.targets(flow.category),
                    cursor: 0,
                },
                None => TemplateMode::List,
            },
            KeyCode::Char('p') => match selected {
                Some(template) => TemplateMode::Preview {
                    id: template.id,
                    scroll: 0,
                },
                None => TemplateMode::List,
            },
            KeyCode::Char('s') => TemplateMode::SaveSelectSource {
                targets: services.templates.targets(flow.category),
                cursor: 0,
            },
            KeyCode::Char('d') => match selected {
                Some(template) if template.built_in => {
                    self.set_err("Built-in templates cannot be deleted");
                    TemplateMode::List
                }
                Some(template) => TemplateMode::DeleteConfirm {
                    id: template.id,
                    name: template.name,
                },
                None => TemplateMode::List,
            },
            KeyCode::Esc | KeyCode::Char('q') => return None,
            _ => {
                self.ignore_key();
                TemplateMode::List
            }
        };
        Some(mode)
    }

    fn switch_category(
        &mut self,
        flow: &mut TemplateFlow,
        app: AppType,
        services: &mut Services<'_>,
    ) {
        let category = TemplateCategory::for_app(app);
        match self.data.refresh_templates(&*services.templates, category) {
            Ok(()) => {
                flow.category = category;
                flow.cursor = 0;
            }
            Err(e) => self.set_err(format!("Failed to load templates: {e}")),
        }
    }

    fn on_apply_select_key(
        &mut self,
        id: String,
        targets: Vec<TemplateTarget>,
        cursor: usize,
        key: KeyEvent,
        services: &mut Services<'_>,
    ) -> TemplateMode {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => TemplateMode::ApplySelectTarget {
                cursor: cursor::wrap_prev(cursor, targets.len()),
                id,
                targets,
            },
            KeyCode::Down | KeyCode::Char('j') => TemplateMode::ApplySelectTarget {
                cursor: cursor::wrap_next(cursor, targets.len()),
                id,
                targets,
            },
            KeyCode::Enter => {
                let Some(target) = targets.get(cursor).cloned() else {
                    return TemplateMode::ApplySelectTarget {
                        id,
                        targets,
                        cursor,
                    };
                };
                let diff = match self.template_by_id(&id) {
                    Some(template) => services
                        .templates
                        .diff(template, &target.path)
                        .map_err(|e| format!("Failed to compute diff: {e}")),
                    None => Err(format!("Template '{id}' no longer exists")),
                };
                match diff {
                    Ok(diff) => {
                        if diff.is_empty() {
                            self.set_message(format!(
                                "{} already matches this template",
                                target.label
                            ));
                        }
                        TemplateMode::ApplyPreviewDiff {
                            id,
                            target,
                            diff,
                            scroll: 0,
                            targets,
                            target_cursor: cursor,
                        }
                    }
                    Err(e) => {
                        self.set_err(e);
                        TemplateMode::ApplySelectTarget {
                            id,
                            targets,
                            cursor,
                        }
                    }
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => TemplateMode::List,
            _ => {
                self.ignore_key();
                TemplateMode::ApplySelectTarget {
                    id,
                    targets,
                    cursor,
                }
            }
        }
    }

    fn apply_template(
        &mut self,
        id: &str,
        target: &TemplateTarget,
        services: &mut Services<'_>,
    ) -> Result<(), String> {
        let template = services
            .templates
            .get(id)
            .map_err(|e| format!("Failed to load template: {e}"))?
            .ok_or_else(|| format!("Template '{id}' no longer exists"))?;
        services
            .templates
            .apply(&template, &target.path)
            .map_err(|e| format!("Failed to apply template: {e}"))?;
        self.set_message(format!(
            "Applied '{}' to {}",
            template.name,
            target.path.display()
        ));
        Ok(())
    }

    fn save_template(
        &mut self,
        flow: &mut TemplateFlow,
        source: PathBuf,
        name: TextInput,
        services: &mut Services<'_>,
    ) -> TemplateMode {
        if name.is_blank() {
            self.set_err("Template name is required");
            return TemplateMode::SaveInputName { source, name };
        }
        let result = services
            .templates
            .add_from_file(name.value.trim(), flow.category, &source)
            .and_then(|saved| {
                self.data
                    .refresh_templates(&*services.templates, flow.category)
                    .map(|()| saved)
            });
        match result {
            Ok(saved) => {
                flow.cursor = self
                    .data
                    .templates
                    .iter()
                    .position(|t| t.id == saved.id)
                    .unwrap_or(0);
                self.set_message(format!("Saved template '{}'", saved.name));
                TemplateMode::List
            }
            Err(e) => {
                self.set_err(format!("Failed to save template: {e}"));
                TemplateMode::SaveInputName { source, name }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tui::fake::Harness;
    use crate::cli::tui::session::PrimaryMode;

    fn flow(h: &Harness) -> &TemplateFlow {
        match &h.session().mode {
            Mode::Templates(flow) => flow,
            other => panic!("expected template manager, got {other:?}"),
        }
    }

    fn open(h: &mut Harness) {
        h.press(KeyCode::Char('t'));
        assert_eq!(h.session().mode.primary(), PrimaryMode::TemplateManager);
    }

    #[test]
    fn apply_to_missing_target_writes_template_bytes() {
        let mut h = Harness::with_providers(&[]);
        open(&mut h);
        h.press(KeyCode::Enter);
        assert!(matches!(flow(&h).mode, TemplateMode::ApplySelectTarget { .. }));

        h.press(KeyCode::Enter);
        let TemplateMode::ApplyPreviewDiff { diff, target, .. } = &flow(&h).mode else {
            panic!("expected diff preview");
        };
        assert!(!target.exists);
        let template = &h.session().data.templates[0];
        let added = diff.lines().filter(|l| l.starts_with('+') && !l.starts_with("+++"));
        assert_eq!(added.count(), template.content.lines().count());
        let (path, content) = (target.path.clone(), template.content.clone());

        h.press(KeyCode::Char('y'));
        assert_eq!(flow(&h).mode, TemplateMode::List);
        assert_eq!(h.templates.files.get(&path), Some(&content));
        assert!(h.session().message.as_deref().is_some_and(|m| m.starts_with("Applied")));
    }

    #[test]
    fn backing_out_of_diff_returns_to_target_selection() {
        let mut h = Harness::with_providers(&[]);
        open(&mut h);
        h.press(KeyCode::Enter);
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.press(KeyCode::Char('n'));
        assert!(matches!(
            flow(&h).mode,
            TemplateMode::ApplySelectTarget { cursor: 1, .. }
        ));
        assert!(h.templates.files.is_empty());
    }

    #[test]
    fn apply_failure_stays_on_diff_preview() {
        let mut h = Harness::with_providers(&[]);
        h.templates.fail_apply = true;
        open(&mut h);
        h.press(KeyCode::Enter);
        h.press(KeyCode::Enter);
        h.press(KeyCode::Char('y'));
        assert!(matches!(flow(&h).mode, TemplateMode::ApplyPreviewDiff { .. }));
        assert!(h.session().err.is_some());
    }

    #[test]
    fn built_in_templates_never_reach_delete_confirm() {
        let mut h = Harness::with_providers(&[]);
        open(&mut h);
        h.press(KeyCode::Char('d'));
        assert_eq!(flow(&h).mode, TemplateMode::List);
        assert_eq!(
            h.session().err.as_deref(),
            Some("Built-in templates cannot be deleted")
        );
    }

    #[test]
    fn preview_scroll_is_clamped() {
        let mut h = Harness::with_providers(&[]);
        h.templates.add_user("Long", &"line\n".repeat(25));
        open(&mut h);
        h.press(KeyCode::Up);
        h.press(KeyCode::Char('p'));
        for _ in 0..5 {
            h.press(KeyCode::PageDown);
        }
        assert!(matches!(flow(&h).mode, TemplateMode::Preview { scroll: 15, .. }));
        h.press(KeyCode::PageUp);
        h.press(KeyCode::Up);
        assert!(matches!(flow(&h).mode, TemplateMode::Preview { scroll: 4, .. }));
        h.press(KeyCode::Esc);
        assert_eq!(flow(&h).mode, TemplateMode::List);
    }

    #[test]
    fn save_requires_existing_source_and_a_name() {
        let mut h = Harness::with_providers(&[]);
        open(&mut h);
        h.press(KeyCode::Char('s'));
        h.press(KeyCode::Enter);
        assert!(matches!(flow(&h).mode, TemplateMode::SaveSelectSource { .. }));
        assert!(h.session().err.as_deref().is_some_and(|e| e.ends_with("does not exist")));

        let TemplateMode::SaveSelectSource { targets, .. } = &flow(&h).mode else {
            panic!("expected source selection");
        };
        let global = targets[0].path.clone();
        h.templates.files.insert(global, "# mine\n".into());
        h.press(KeyCode::Esc);
        h.press(KeyCode::Char('s'));
        h.press(KeyCode::Enter);
        assert!(matches!(flow(&h).mode, TemplateMode::SaveInputName { .. }));

        h.press(KeyCode::Enter);
        assert_eq!(h.session().err.as_deref(), Some("Template name is required"));

        h.type_text("Mine");
        h.press(KeyCode::Enter);
        assert_eq!(flow(&h).mode, TemplateMode::List);
        let selected = &h.session().data.templates[flow(&h).cursor];
        assert_eq!(selected.name, "Mine");
        assert_eq!(selected.content, "# mine\n");
    }

    #[test]
    fn user_template_delete_round_trip() {
        let mut h = Harness::with_providers(&[]);
        h.templates.add_user("Scratch", "x\n");
        open(&mut h);
        h.press(KeyCode::Up);
        h.press(KeyCode::Char('d'));
        assert!(matches!(flow(&h).mode, TemplateMode::DeleteConfirm { .. }));
        h.press(KeyCode::Char('y'));
        assert_eq!(flow(&h).mode, TemplateMode::List);
        assert!(h.session().data.templates.iter().all(|t| t.built_in));
        assert_eq!(flow(&h).cursor, 1);
    }

    #[test]
    fn category_follows_arrow_keys() {
        let mut h = Harness::with_providers(&[]);
        open(&mut h);
        assert_eq!(flow(&h).category, TemplateCategory::ClaudeMd);
        h.press(KeyCode::Right);
        assert_eq!(flow(&h).category, TemplateCategory::AgentsMd);
        assert_eq!(h.session().data.template_category, TemplateCategory::AgentsMd);
        h.press(KeyCode::Esc);
        assert_eq!(h.session().mode.primary(), PrimaryMode::List);
    }
}
