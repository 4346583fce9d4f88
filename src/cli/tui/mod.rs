//! Interactive terminal UI.
//!
//! [`session::Session`] holds all interactive state and is advanced one
//! [`session::Event`] at a time. This module owns the terminal, turns
//! crossterm input and timer ticks into events, and runs update checks on a
//! worker thread so the UI never blocks on the network.

mod backend;
mod backup;
mod cursor;
mod data;
mod form;
mod mcp;
mod provider_form;
mod providers;
mod session;
mod template;
mod terminal;
mod ui;
mod view;

#[cfg(test)]
mod fake;

use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event;

use crate::app_config::{AppType, ViewMode};
use crate::error::AppError;
use crate::services::update;
use crate::settings;
use crate::store::AppState;

use backend::{LiveBackups, LiveConfig, LiveTemplates, Services};
use session::{Command, Event, Session, UpdateStatus};
use terminal::{PanicRestoreHookGuard, TuiTerminal};

const TICK_RATE: Duration = Duration::from_millis(200);

struct UpdateSystem {
    req_tx: mpsc::Sender<Command>,
    result_rx: mpsc::Receiver<Event>,
    _handle: std::thread::JoinHandle<()>,
}

fn start_update_system() -> Result<UpdateSystem, AppError> {
    let (result_tx, result_rx) = mpsc::channel::<Event>();
    let (req_tx, req_rx) = mpsc::channel::<Command>();

    let handle = std::thread::Builder::new()
        .name("cc-switch-update".to_string())
        .spawn(move || update_worker_loop(req_rx, result_tx))
        .map_err(|e| AppError::Message(format!("failed to spawn update worker thread: {e}")))?;

    Ok(UpdateSystem {
        req_tx,
        result_rx,
        _handle: handle,
    })
}

fn update_worker_loop(rx: mpsc::Receiver<Command>, tx: mpsc::Sender<Event>) {
    while let Ok(req) = rx.recv() {
        let event = match req {
            Command::CheckUpdate => {
                log::debug!("checking for updates");
                Event::UpdateChecked(update::check_for_update_blocking().map_err(|e| e.to_string()))
            }
            Command::DownloadUpdate { tag } => {
                log::info!("installing {tag}");
                Event::UpdateInstalled(
                    update::download_and_apply_blocking(&tag)
                        .map(|()| tag)
                        .map_err(|e| e.to_string()),
                )
            }
        };
        if tx.send(event).is_err() {
            return;
        }
    }
}

fn dispatch(updates: Option<&UpdateSystem>, commands: Vec<Command>) -> Vec<Event> {
    let mut immediate = Vec::new();
    for command in commands {
        let sent = updates.map(|u| u.req_tx.send(command.clone()).is_ok());
        if sent != Some(true) {
            let reason = "update worker unavailable".to_string();
            immediate.push(match command {
                Command::CheckUpdate => Event::UpdateChecked(Err(reason)),
                Command::DownloadUpdate { .. } => Event::UpdateInstalled(Err(reason)),
            });
        }
    }
    immediate
}

/// Runs the interactive session until the user quits.
pub fn run(app: Option<AppType>, view: Option<ViewMode>) -> Result<(), AppError> {
    let state = AppState::try_new()?;
    let mut config = LiveConfig::new(state);
    let mut backups = LiveBackups::new(config.config_path());
    let mut templates = LiveTemplates;
    let mut services = Services {
        config: &mut config,
        backups: &mut backups,
        templates: &mut templates,
    };

    let mut session = Session::new(app.unwrap_or(AppType::Claude), view, &mut services)?;

    let updates = match start_update_system() {
        Ok(system) => Some(system),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    };

    let mut pending = Vec::new();
    if settings::get_settings().check_update_on_startup {
        pending.extend(dispatch(updates.as_ref(), vec![Command::CheckUpdate]));
        session.update = UpdateStatus::Checking;
    }

    let _panic_hook = PanicRestoreHookGuard::install();
    let mut terminal = TuiTerminal::new()?;
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::render(f, &session))?;

        if let Some(u) = updates.as_ref() {
            while let Ok(event) = u.result_rx.try_recv() {
                pending.push(event);
            }
        }

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).map_err(|e| AppError::Message(e.to_string()))? {
            if let event::Event::Key(key) =
                event::read().map_err(|e| AppError::Message(e.to_string()))?
            {
                pending.push(Event::Key(key));
            }
        }
        if last_tick.elapsed() >= TICK_RATE {
            pending.push(Event::Tick);
            last_tick = Instant::now();
        }

        while !pending.is_empty() {
            for event in std::mem::take(&mut pending) {
                let (next, commands) = session.update(event, &mut services);
                session = next;
                pending.extend(dispatch(updates.as_ref(), commands));
            }
        }

        if session.should_quit {
            return Ok(());
        }
    }
}
