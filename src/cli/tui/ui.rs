use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app_config::AppType;

use super::session::Session;
use super::view::{self, Pane, Screen, StatusKind};

struct Theme {
    accent: Color,
    no_color: bool,
}

fn theme_for(app: AppType) -> Theme {
    let no_color = std::env::var_os("NO_COLOR").is_some();
    let accent = match app {
        AppType::Claude => Color::Cyan,
        AppType::Codex => Color::Green,
        AppType::Gemini => Color::Magenta,
    };
    Theme { accent, no_color }
}

fn selection_style(theme: &Theme) -> Style {
    if theme.no_color {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    }
}

fn border_style(focused: bool, theme: &Theme) -> Style {
    match (focused, theme.no_color) {
        (true, true) => Style::default().add_modifier(Modifier::BOLD),
        (true, false) => Style::default().fg(theme.accent),
        (false, _) => Style::default().fg(Color::DarkGray),
    }
}

fn chip_style(theme: &Theme) -> Style {
    if theme.no_color {
        Style::default()
    } else {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    }
}

fn key_bar_line(theme: &Theme, items: &[(&str, &str)]) -> Line<'static> {
    if theme.no_color {
        let parts: Vec<String> = items.iter().map(|(k, v)| format!("{k}={v}")).collect();
        return Line::raw(parts.join("  "));
    }

    let base = chip_style(theme);
    let key = base.add_modifier(Modifier::BOLD);
    let mut spans: Vec<Span<'static>> = vec![Span::styled(" ", base)];
    for (idx, (k, v)) in items.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  ", base));
        }
        spans.push(Span::styled((*k).to_string(), key));
        spans.push(Span::styled(" ", base));
        spans.push(Span::styled((*v).to_string(), base));
    }
    spans.push(Span::styled(" ", base));
    Line::from(spans)
}

fn status_line(theme: &Theme, status: &Option<(StatusKind, String)>) -> Line<'static> {
    match status {
        None => Line::raw(""),
        Some((kind, text)) if theme.no_color => {
            let prefix = if *kind == StatusKind::Error { "error: " } else { "" };
            Line::raw(format!("{prefix}{text}"))
        }
        Some((StatusKind::Error, text)) => Line::styled(
            text.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Some((StatusKind::Info, text)) => {
            Line::styled(text.clone(), Style::default().fg(Color::Green))
        }
    }
}

fn render_pane(frame: &mut Frame<'_>, area: Rect, pane: &Pane, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(pane.focused, theme))
        .title(format!(" {} ", pane.title));

    match pane.selected {
        Some(selected) => {
            let items: Vec<ListItem> = pane
                .lines
                .iter()
                .map(|line| ListItem::new(line.clone()))
                .collect();
            let mut state = ListState::default();
            if pane.focused {
                state.select(Some(selected));
            }
            let list = List::new(items)
                .block(block)
                .highlight_style(selection_style(theme))
                .highlight_symbol("> ");
            frame.render_stateful_widget(list, area, &mut state);
        }
        None => {
            let text: Vec<Line> = pane.lines.iter().map(|l| Line::raw(l.clone())).collect();
            let scroll = u16::try_from(pane.scroll).unwrap_or(u16::MAX);
            let paragraph = Paragraph::new(text)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0));
            frame.render_widget(paragraph, area);
        }
    }
}

fn bottom(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    Rect {
        y: area.y + area.height - height,
        height,
        ..area
    }
}

fn render_help(frame: &mut Frame<'_>, area: Rect, screen: &Screen, theme: &Theme) {
    let lines: Vec<Line> = screen
        .keys
        .iter()
        .map(|(k, v)| {
            Line::from(vec![
                Span::styled(
                    format!("{k:<14}"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw((*v).to_string()),
            ])
        })
        .collect();
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let footer = bottom(area, height);
    frame.render_widget(Clear, footer);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(true, theme))
                .title(" Keys (? to close) "),
        ),
        footer,
    );
}

pub fn render(frame: &mut Frame<'_>, session: &Session) {
    let theme = theme_for(session.focused_app());
    let screen = view::screen(session);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header_style = if theme.no_color {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    };
    frame.render_widget(
        Paragraph::new(Line::styled(screen.header.clone(), header_style)),
        rows[0],
    );

    let count = u32::try_from(screen.panes.len().max(1)).unwrap_or(1);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, count); screen.panes.len().max(1)])
        .split(rows[1]);
    for (pane, area) in screen.panes.iter().zip(columns.iter()) {
        render_pane(frame, *area, pane, &theme);
    }

    frame.render_widget(Paragraph::new(key_bar_line(&theme, screen.keys)), rows[2]);
    frame.render_widget(Paragraph::new(status_line(&theme, &screen.status)), rows[3]);

    if screen.show_help {
        render_help(frame, rows[1], &screen, &theme);
    }
}
