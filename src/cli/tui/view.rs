//! What each mode shows, computed purely from the session.

use unicode_width::UnicodeWidthStr;

use crate::app_config::{AppType, McpApps, ViewMode};
use crate::services::McpService;

use super::data::ProvidersSnapshot;
use super::form::FormState;
use super::mcp::McpMode;
use super::provider_form::FormKind;
use super::session::{Mode, Session, UpdateStatus};
use super::template::TemplateMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub title: String,
    pub lines: Vec<String>,
    /// Highlighted line for list panes; `None` for text panes.
    pub selected: Option<usize>,
    pub focused: bool,
    pub scroll: usize,
}

impl Pane {
    fn list(title: impl Into<String>, lines: Vec<String>, selected: usize) -> Self {
        let selected = (!lines.is_empty()).then_some(selected);
        Self {
            title: title.into(),
            lines,
            selected,
            focused: true,
            scroll: 0,
        }
    }

    fn text(title: impl Into<String>, lines: Vec<String>, scroll: usize) -> Self {
        Self {
            title: title.into(),
            lines,
            selected: None,
            focused: true,
            scroll,
        }
    }

    fn or_placeholder(mut self, placeholder: &str) -> Self {
        if self.lines.is_empty() {
            self.lines.push(placeholder.to_string());
            self.selected = None;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub header: String,
    pub panes: Vec<Pane>,
    pub keys: &'static [(&'static str, &'static str)],
    pub show_help: bool,
    pub status: Option<(StatusKind, String)>,
}

const LIST_KEYS: &[(&str, &str)] = &[
    ("↑↓", "move"),
    ("enter", "switch"),
    ("a", "add"),
    ("e", "edit"),
    ("c", "copy"),
    ("d", "delete"),
    ("K/J", "reorder"),
    ("v", "view"),
    ("[ ]", "tool"),
    ("tab", "pick tool"),
    ("b/B", "backups"),
    ("t", "templates"),
    ("m", "mcp"),
    ("u/U", "update"),
    ("q", "quit"),
];
const MULTI_EXTRA_KEYS: &[(&str, &str)] = &[
    ("←→", "column"),
    ("↑↓", "move"),
    ("enter", "switch"),
    ("a/e/c/d", "add/edit/copy/delete"),
    ("K/J", "reorder"),
    ("v", "single view"),
    ("q", "quit"),
];
const FORM_KEYS: &[(&str, &str)] = &[
    ("tab/↑↓", "field"),
    ("enter", "pick/next"),
    ("ctrl+s", "save"),
    ("ctrl+d", "clear"),
    ("ctrl+z", "undo clear"),
    ("esc", "cancel"),
];
const CONFIRM_KEYS: &[(&str, &str)] = &[("y", "confirm"), ("n/esc", "cancel")];
const PICK_KEYS: &[(&str, &str)] = &[("↑↓", "move"), ("enter", "select"), ("esc", "back")];
const BACKUP_KEYS: &[(&str, &str)] = &[
    ("↑↓", "move"),
    ("enter", "restore"),
    ("n", "new backup"),
    ("esc", "back"),
];
const TEMPLATE_KEYS: &[(&str, &str)] = &[
    ("↑↓", "move"),
    ("←→", "category"),
    ("enter", "apply"),
    ("p", "preview"),
    ("s", "save from file"),
    ("d", "delete"),
    ("esc", "back"),
];
const SCROLL_KEYS: &[(&str, &str)] = &[("↑↓/pgup/pgdn", "scroll"), ("esc", "back")];
const DIFF_KEYS: &[(&str, &str)] = &[
    ("↑↓/pgup/pgdn", "scroll"),
    ("y", "apply"),
    ("n/esc", "back"),
];
const NAME_KEYS: &[(&str, &str)] = &[("enter", "save"), ("esc", "cancel")];
const MCP_KEYS: &[(&str, &str)] = &[
    ("↑↓", "move"),
    ("enter", "tools"),
    ("a", "add"),
    ("e", "edit"),
    ("d", "delete"),
    ("p", "presets"),
    ("esc", "back"),
];
const TOGGLE_KEYS: &[(&str, &str)] = &[
    ("↑↓", "move"),
    ("space", "toggle"),
    ("enter", "save"),
    ("esc", "cancel"),
];

pub fn mask_api_key(key: &str) -> String {
    let mut iter = key.chars();
    let prefix: String = iter.by_ref().take(8).collect();
    if iter.next().is_some() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

fn flags(apps: &McpApps) -> String {
    AppType::ALL
        .into_iter()
        .map(|app| {
            if apps.is_enabled_for(app) {
                app.display_name()
            } else {
                "-"
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn pad_to_display_width(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{text}{}", " ".repeat(pad))
}

/// One row per provider, URLs aligned on the widest name.
fn provider_lines(snapshot: &ProvidersSnapshot) -> Vec<String> {
    let name_width = snapshot
        .rows
        .iter()
        .map(|row| UnicodeWidthStr::width(row.provider.name.as_str()))
        .max()
        .unwrap_or(0);
    snapshot
        .rows
        .iter()
        .map(|row| {
            let marker = if row.is_current { "●" } else { " " };
            match &row.api_url {
                Some(url) => format!(
                    "{marker} {}  {url}",
                    pad_to_display_width(&row.provider.name, name_width)
                ),
                None => format!("{marker} {}", row.provider.name),
            }
        })
        .collect()
}

fn providers_pane(session: &Session, app: AppType, selected: usize, focused: bool) -> Pane {
    let mut pane = Pane::list(
        app.display_name(),
        provider_lines(&session.data.providers[app]),
        selected,
    )
    .or_placeholder("(no providers, press a to add)");
    pane.focused = focused;
    pane
}

/// Field lines, with the picker's options inlined below the focused field.
fn form_pane(title: String, form: &FormState) -> Pane {
    let mut lines = Vec::new();
    let mut selected = 0;
    for (index, field) in form.fields.iter().enumerate() {
        let focused = index == form.focus;
        let mut value = field.input.value.clone();
        if field.label == "API Key" && !focused {
            value = mask_api_key(&value);
        }
        let required = if field.required { "*" } else { "" };
        let read_only = if field.read_only { " (read-only)" } else { "" };
        let pick = if field.options.is_empty() { "" } else { " ▾" };
        if focused {
            selected = lines.len();
        }
        lines.push(format!("{}{required}: {value}{pick}{read_only}", field.label));

        if let (true, Some(picker)) = (focused, form.picker) {
            for (option_index, option) in field.options.iter().enumerate() {
                if option_index == picker.cursor {
                    selected = lines.len();
                }
                lines.push(format!("    {}", option.label));
            }
        }
    }
    Pane::list(title, lines, selected)
}

fn confirm_pane(title: &str, question: String) -> Pane {
    Pane::text(title, vec![question, String::new(), "y: yes   n: no".to_string()], 0)
}

fn list_screen(session: &Session) -> (Vec<Pane>, &'static [(&'static str, &'static str)]) {
    match session.view {
        ViewMode::Single => (
            vec![providers_pane(session, session.app, session.cursor, true)],
            LIST_KEYS,
        ),
        ViewMode::Multi => (
            AppType::ALL
                .into_iter()
                .map(|app| {
                    providers_pane(
                        session,
                        app,
                        session.columns.cursors[app],
                        session.columns.column == app,
                    )
                })
                .collect(),
            MULTI_EXTRA_KEYS,
        ),
    }
}

fn template_panes(
    session: &Session,
    flow: &super::template::TemplateFlow,
) -> (Pane, &'static [(&'static str, &'static str)]) {
    let name_of = |id: &str| {
        session
            .data
            .templates
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let target_lines = |targets: &[crate::services::TemplateTarget]| {
        targets
            .iter()
            .map(|t| {
                let state = if t.exists { "exists" } else { "missing" };
                format!("{}  {}  [{state}]", t.label, t.path.display())
            })
            .collect::<Vec<_>>()
    };

    match &flow.mode {
        TemplateMode::List => {
            let lines = session
                .data
                .templates
                .iter()
                .map(|t| {
                    if t.built_in {
                        format!("{}  (built-in)", t.name)
                    } else {
                        t.name.clone()
                    }
                })
                .collect();
            (
                Pane::list(
                    format!("Templates · {}", flow.category.file_name()),
                    lines,
                    flow.cursor,
                )
                .or_placeholder("(no templates)"),
                TEMPLATE_KEYS,
            )
        }
        TemplateMode::Preview { id, scroll } => {
            let content = session
                .data
                .templates
                .iter()
                .find(|t| &t.id == id)
                .map(|t| t.content.lines().map(str::to_string).collect())
                .unwrap_or_default();
            (
                Pane::text(format!("Preview · {}", name_of(id)), content, *scroll),
                SCROLL_KEYS,
            )
        }
        TemplateMode::ApplySelectTarget {
            id,
            targets,
            cursor,
        } => (
            Pane::list(
                format!("Apply '{}' to", name_of(id)),
                target_lines(targets),
                *cursor,
            ),
            PICK_KEYS,
        ),
        TemplateMode::ApplyPreviewDiff {
            target,
            diff,
            scroll,
            ..
        } => {
            let lines = if diff.is_empty() {
                vec!["(no changes)".to_string()]
            } else {
                diff.lines().map(str::to_string).collect()
            };
            (
                Pane::text(format!("Diff · {}", target.path.display()), lines, *scroll),
                DIFF_KEYS,
            )
        }
        TemplateMode::SaveSelectSource { targets, cursor } => (
            Pane::list("Save template from", target_lines(targets), *cursor),
            PICK_KEYS,
        ),
        TemplateMode::SaveInputName { source, name } => (
            Pane::text(
                "New template",
                vec![
                    format!("Source: {}", source.display()),
                    format!("Name: {}_", name.value),
                ],
                0,
            ),
            NAME_KEYS,
        ),
        TemplateMode::DeleteConfirm { name, .. } => (
            confirm_pane("Delete template", format!("Delete template '{name}'?")),
            CONFIRM_KEYS,
        ),
    }
}

fn mcp_panes(
    session: &Session,
    flow: &super::mcp::McpFlow,
) -> (Pane, &'static [(&'static str, &'static str)]) {
    match &flow.mode {
        McpMode::List => {
            let lines = session
                .data
                .mcp
                .iter()
                .map(|s| format!("{}  {}  [{}]", s.id, s.name, flags(&s.apps)))
                .collect();
            (
                Pane::list("MCP servers", lines, flow.cursor)
                    .or_placeholder("(no MCP servers, press a to add or p for presets)"),
                MCP_KEYS,
            )
        }
        McpMode::Add(form) => (form_pane("Add MCP server".into(), form), FORM_KEYS),
        McpMode::Edit { id, form } => (
            form_pane(format!("Edit MCP server '{id}'"), form),
            FORM_KEYS,
        ),
        McpMode::Delete { name, .. } => (
            confirm_pane(
                "Delete MCP server",
                format!("Delete '{name}' and remove it from every tool?"),
            ),
            CONFIRM_KEYS,
        ),
        McpMode::Preset { cursor } => {
            let lines = McpService::presets()
                .into_iter()
                .map(|p| format!("{}  {}", p.name, p.description.unwrap_or_default()))
                .collect();
            (Pane::list("MCP presets", lines, *cursor), PICK_KEYS)
        }
        McpMode::AppsToggle {
            server,
            apps,
            cursor,
        } => {
            let lines = AppType::ALL
                .into_iter()
                .map(|app| {
                    let mark = if apps.is_enabled_for(app) { "x" } else { " " };
                    format!("[{mark}] {}", app.display_name())
                })
                .collect();
            (
                Pane::list(format!("Enable '{}' for", server.name), lines, *cursor),
                TOGGLE_KEYS,
            )
        }
    }
}

fn header(session: &Session) -> String {
    let view = match session.view {
        ViewMode::Single => session.app.display_name().to_string(),
        ViewMode::Multi => "all tools".to_string(),
    };
    let update = match &session.update {
        UpdateStatus::Idle => String::new(),
        UpdateStatus::Checking => "  ·  checking for updates".to_string(),
        UpdateStatus::Available { latest, .. } => format!("  ·  {latest} available (U)"),
        UpdateStatus::Installing => "  ·  installing update".to_string(),
        UpdateStatus::Installed(tag) => format!("  ·  {tag} installed, restart to use"),
    };
    format!("cc-switch · {view}{update}")
}

pub fn screen(session: &Session) -> Screen {
    let (panes, keys) = match &session.mode {
        Mode::List => list_screen(session),
        Mode::Form(form) => {
            let verb = match form.kind {
                FormKind::Add => "Add",
                FormKind::Edit { .. } => "Edit",
            };
            let title = format!("{verb} {} provider", form.app.display_name());
            (vec![form_pane(title, &form.state)], FORM_KEYS)
        }
        Mode::DeleteConfirm { app, name, .. } => (
            vec![confirm_pane(
                "Delete provider",
                format!("Delete '{name}' from {}?", app.display_name()),
            )],
            CONFIRM_KEYS,
        ),
        Mode::AppSelect { cursor } => {
            let lines = AppType::ALL
                .into_iter()
                .map(|app| app.display_name().to_string())
                .collect();
            (vec![Pane::list("Select tool", lines, *cursor)], PICK_KEYS)
        }
        Mode::BackupList { cursor } => {
            let lines = session
                .data
                .backups
                .iter()
                .map(|b| format!("{}  {}", b.display_name, b.id))
                .collect();
            (
                vec![Pane::list("Backups", lines, *cursor)
                    .or_placeholder("(no backups, press n to create one)")],
                BACKUP_KEYS,
            )
        }
        Mode::Templates(flow) => {
            let (pane, keys) = template_panes(session, flow);
            (vec![pane], keys)
        }
        Mode::Mcp(flow) => {
            let (pane, keys) = mcp_panes(session, flow);
            (vec![pane], keys)
        }
    };

    let status = match (&session.err, &session.message) {
        (Some(err), _) => Some((StatusKind::Error, err.clone())),
        (None, Some(message)) => Some((StatusKind::Info, message.clone())),
        (None, None) => None,
    };

    Screen {
        header: header(session),
        panes,
        keys,
        show_help: session.show_help,
        status,
    }
}

/// Plain-text rendering of [`screen`] for assertions.
#[cfg(test)]
pub fn render(session: &Session) -> String {
    let screen = screen(session);
    let mut out = vec![screen.header.clone()];

    for pane in &screen.panes {
        let focus = if pane.focused { "*" } else { "" };
        out.push(format!("== {}{focus} ==", pane.title));
        for (index, line) in pane.lines.iter().enumerate().skip(pane.scroll) {
            let marker = if pane.selected == Some(index) { ">" } else { " " };
            out.push(format!("{marker} {line}"));
        }
    }

    if screen.show_help {
        out.extend(screen.keys.iter().map(|(k, v)| format!("  {k:<14} {v}")));
    } else {
        out.push("? help".to_string());
    }
    match &screen.status {
        Some((StatusKind::Error, text)) => out.push(format!("error: {text}")),
        Some((StatusKind::Info, text)) => out.push(text.clone()),
        None => {}
    }
    out.join("\n")
}
