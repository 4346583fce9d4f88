use crossterm::event::{KeyCode, KeyEvent};

use super::backend::Services;
use super::cursor;
use super::session::{Mode, Session};

impl Session {
    pub(crate) fn on_backup_key(
        &mut self,
        cursor: usize,
        key: KeyEvent,
        services: &mut Services<'_>,
    ) -> Mode {
        let len = self.data.backups.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Mode::BackupList {
                cursor: cursor::wrap_prev(cursor, len),
            },
            KeyCode::Down | KeyCode::Char('j') => Mode::BackupList {
                cursor: cursor::wrap_next(cursor, len),
            },
            KeyCode::Char('n') => {
                self.create_backup(services);
                Mode::BackupList { cursor: 0 }
            }
            KeyCode::Enter => self.restore_selected(cursor, services),
            KeyCode::Esc | KeyCode::Char('q') => Mode::List,
            _ => {
                self.ignore_key();
                Mode::BackupList {
                    cursor: cursor::clamp(cursor, len),
                }
            }
        }
    }

    fn restore_selected(&mut self, cursor: usize, services: &mut Services<'_>) -> Mode {
        let Some(backup) = self.data.backups.get(cursor).cloned() else {
            return Mode::BackupList { cursor: 0 };
        };

        let safety_id = match services.backups.restore_backup(&backup.path) {
            Ok(id) => id,
            Err(e) => {
                self.set_err(format!("Restore failed: {e}"));
                return Mode::BackupList { cursor };
            }
        };

        let refreshed = services
            .config
            .reload()
            .and_then(|()| self.data.refresh_all(services));
        self.record_mtime(services);
        if let Err(e) = refreshed {
            self.set_err(format!("Restored {}, but reload failed: {e}", backup.display_name));
            return Mode::List;
        }
        self.clamp_cursors();

        if safety_id.is_empty() {
            self.set_message(format!("Restored backup {}", backup.display_name));
        } else {
            self.set_message(format!(
                "Restored backup {} (previous config saved as {safety_id})",
                backup.display_name
            ));
        }
        Mode::List
    }
}
