use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::cursor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.value.chars().count();
        self.cursor = (self.cursor + 1).min(len);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn insert_char(&mut self, c: char) -> bool {
        let idx = Self::byte_index(&self.value, self.cursor);
        self.value.insert(idx, c);
        self.cursor += 1;
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 || self.value.is_empty() {
            return false;
        }
        let start = Self::byte_index(&self.value, self.cursor.saturating_sub(1));
        let end = Self::byte_index(&self.value, self.cursor);
        self.value.replace_range(start..end, "");
        self.cursor = self.cursor.saturating_sub(1);
        true
    }

    pub fn delete(&mut self) -> bool {
        let len = self.value.chars().count();
        if self.value.is_empty() || self.cursor >= len {
            return false;
        }
        let start = Self::byte_index(&self.value, self.cursor);
        let end = Self::byte_index(&self.value, self.cursor + 1);
        self.value.replace_range(start..end, "");
        true
    }

    /// Applies a plain editing key; returns false for keys it does not handle.
    pub fn handle_edit_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(c)
            }
            KeyCode::Backspace => {
                self.backspace();
                true
            }
            KeyCode::Delete => {
                self.delete();
                true
            }
            KeyCode::Left => {
                self.move_left();
                true
            }
            KeyCode::Right => {
                self.move_right();
                true
            }
            KeyCode::Home => {
                self.move_home();
                true
            }
            KeyCode::End => {
                self.move_end();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name,
    ApiKey,
    BaseUrl,
    Model,
    ReasoningEffort,
    McpId,
    McpName,
    McpCommand,
    McpArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOption {
    pub label: String,
    pub value: String,
}

impl PickerOption {
    pub fn new(value: &str) -> Self {
        Self {
            label: value.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub key: FieldKey,
    pub label: &'static str,
    pub input: TextInput,
    pub required: bool,
    /// Rejects typing; the value can only change through the picker.
    pub read_only: bool,
    pub options: Vec<PickerOption>,
}

impl FormField {
    pub fn text(key: FieldKey, label: &'static str, required: bool) -> Self {
        Self {
            key,
            label,
            input: TextInput::default(),
            required,
            read_only: false,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|v| PickerOption::new(v)).collect();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.input.set(value);
        self
    }
}

/// Option list overlay on top of the focused field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picker {
    pub cursor: usize,
}

const UNDO_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKeyResult {
    Handled,
    Submit,
    Cancel,
    /// Typing into a read-only field; carries the field label.
    ReadOnly(&'static str),
    Cleared,
    Undone,
    UndoEmpty,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub picker: Option<Picker>,
    undo: Vec<Vec<String>>,
}

impl FormState {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            focus: 0,
            picker: None,
            undo: Vec::new(),
        }
    }

    pub fn field(&self, key: FieldKey) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn value(&self, key: FieldKey) -> &str {
        self.field(key)
            .map(|f| f.input.value.trim())
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, key: FieldKey, value: impl Into<String>) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.key == key) {
            field.input.set(value);
        }
    }

    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    pub fn focus_next(&mut self) {
        self.picker = None;
        self.focus = cursor::wrap_next(self.focus, self.fields.len());
    }

    pub fn focus_prev(&mut self) {
        self.picker = None;
        self.focus = cursor::wrap_prev(self.focus, self.fields.len());
    }

    /// Opens the overlay on the focused field, pre-selecting its current value.
    pub fn open_picker(&mut self) -> bool {
        let Some(field) = self.focused() else {
            return false;
        };
        if field.options.is_empty() {
            return false;
        }
        let cursor = field
            .options
            .iter()
            .position(|o| o.value == field.input.value.trim())
            .unwrap_or(0);
        self.picker = Some(Picker { cursor });
        true
    }

    pub fn picker_up(&mut self) {
        if let Some(picker) = self.picker.as_mut() {
            picker.cursor = picker.cursor.saturating_sub(1);
        }
    }

    pub fn picker_down(&mut self) {
        let len = self.focused().map(|f| f.options.len()).unwrap_or(0);
        if let Some(picker) = self.picker.as_mut() {
            picker.cursor = cursor::clamp(picker.cursor + 1, len);
        }
    }

    pub fn confirm_picker(&mut self) {
        let Some(picker) = self.picker.take() else {
            return;
        };
        if let Some(field) = self.fields.get_mut(self.focus) {
            if let Some(option) = field.options.get(picker.cursor) {
                let value = option.value.clone();
                field.input.set(value);
            }
        }
    }

    pub fn cancel_picker(&mut self) {
        self.picker = None;
    }

    /// Blanks every field, remembering the previous values when any was set.
    pub fn clear_all(&mut self) {
        if self.fields.iter().any(|f| !f.input.value.is_empty()) {
            let snapshot = self.fields.iter().map(|f| f.input.value.clone()).collect();
            self.undo.push(snapshot);
            if self.undo.len() > UNDO_LIMIT {
                self.undo.remove(0);
            }
        }
        for field in &mut self.fields {
            field.input.set("");
        }
    }

    /// Restores the last cleared values; false when there is nothing to undo.
    pub fn undo_clear(&mut self) -> bool {
        let Some(snapshot) = self.undo.pop() else {
            return false;
        };
        for (field, value) in self.fields.iter_mut().zip(snapshot) {
            field.input.set(value);
        }
        true
    }

    /// First required field left blank, in field order.
    pub fn first_missing_required(&self) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|f| f.required && f.input.is_blank())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormKeyResult {
        if self.picker.is_some() {
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.picker_up(),
                KeyCode::Down | KeyCode::Char('j') => self.picker_down(),
                KeyCode::Enter => self.confirm_picker(),
                KeyCode::Esc => self.cancel_picker(),
                _ => return FormKeyResult::Ignored,
            }
            return FormKeyResult::Handled;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('s') => FormKeyResult::Submit,
                KeyCode::Char('d') => {
                    self.clear_all();
                    FormKeyResult::Cleared
                }
                KeyCode::Char('z') => {
                    if self.undo_clear() {
                        FormKeyResult::Undone
                    } else {
                        FormKeyResult::UndoEmpty
                    }
                }
                _ => FormKeyResult::Ignored,
            };
        }

        match key.code {
            KeyCode::Esc => FormKeyResult::Cancel,
            KeyCode::Tab | KeyCode::Down => {
                self.focus_next();
                FormKeyResult::Handled
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus_prev();
                FormKeyResult::Handled
            }
            KeyCode::Enter => {
                if self.open_picker() {
                    FormKeyResult::Handled
                } else if self.focus + 1 >= self.fields.len() {
                    FormKeyResult::Submit
                } else {
                    self.focus_next();
                    FormKeyResult::Handled
                }
            }
            KeyCode::Char(_) | KeyCode::Backspace | KeyCode::Delete => {
                let Some(field) = self.fields.get_mut(self.focus) else {
                    return FormKeyResult::Ignored;
                };
                if field.read_only {
                    return FormKeyResult::ReadOnly(field.label);
                }
                field.input.handle_edit_key(key);
                FormKeyResult::Handled
            }
            _ => match self.fields.get_mut(self.focus) {
                Some(field) => {
                    if field.input.handle_edit_key(key) {
                        FormKeyResult::Handled
                    } else {
                        FormKeyResult::Ignored
                    }
                }
                None => FormKeyResult::Ignored,
            },
        }
    }
}
