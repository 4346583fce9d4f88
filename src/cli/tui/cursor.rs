use crate::app_config::{AppType, PerApp};

/// Lines moved by page-up/page-down in scrollable panes.
pub const PAGE_SIZE: usize = 10;

pub fn wrap_next(cursor: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (clamp(cursor, len) + 1) % len
}

pub fn wrap_prev(cursor: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (clamp(cursor, len) + len - 1) % len
}

/// Forces `cursor` into `[0, len)`, or 0 for an empty list.
pub fn clamp(cursor: usize, len: usize) -> usize {
    cursor.min(len.saturating_sub(1))
}

/// Largest valid top line for a pane of `page` lines over `line_count` lines.
pub fn max_scroll(line_count: usize, page: usize) -> usize {
    line_count.saturating_sub(page)
}

pub fn scroll_down(offset: usize, by: usize, line_count: usize) -> usize {
    offset.saturating_add(by).min(max_scroll(line_count, PAGE_SIZE))
}

pub fn scroll_up(offset: usize, by: usize, line_count: usize) -> usize {
    offset
        .saturating_sub(by)
        .min(max_scroll(line_count, PAGE_SIZE))
}

/// Per-tool cursors of the three-column view.
///
/// `desired_row` only changes on vertical moves, so walking across a short
/// column does not lose the row chosen in a long one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCursors {
    pub cursors: PerApp<usize>,
    pub column: AppType,
    pub desired_row: usize,
}

impl ColumnCursors {
    pub fn new(column: AppType) -> Self {
        Self {
            cursors: PerApp::default(),
            column,
            desired_row: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.cursors[self.column]
    }

    pub fn up(&mut self, lens: &PerApp<usize>) {
        let row = wrap_prev(self.current(), lens[self.column]);
        self.cursors[self.column] = row;
        self.desired_row = row;
    }

    pub fn down(&mut self, lens: &PerApp<usize>) {
        let row = wrap_next(self.current(), lens[self.column]);
        self.cursors[self.column] = row;
        self.desired_row = row;
    }

    pub fn left(&mut self, lens: &PerApp<usize>) {
        self.land_on(self.column.prev(), lens);
    }

    pub fn right(&mut self, lens: &PerApp<usize>) {
        self.land_on(self.column.next(), lens);
    }

    /// Moves sideways onto `column`, clamping the remembered row to its length.
    pub fn land_on(&mut self, column: AppType, lens: &PerApp<usize>) {
        self.column = column;
        self.cursors[column] = clamp(self.desired_row, lens[column]);
    }

    /// Puts the focus on `row` of `column`, as when entering the view from a single list.
    pub fn focus(&mut self, column: AppType, row: usize, lens: &PerApp<usize>) {
        self.column = column;
        self.cursors[column] = clamp(row, lens[column]);
        self.desired_row = self.cursors[column];
    }

    pub fn clamp_all(&mut self, lens: &PerApp<usize>) {
        for app in AppType::ALL {
            self.cursors[app] = clamp(self.cursors[app], lens[app]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens(claude: usize, codex: usize, gemini: usize) -> PerApp<usize> {
        PerApp {
            claude,
            codex,
            gemini,
        }
    }

    #[test]
    fn wrap_helpers_cycle_and_handle_empty_lists() {
        assert_eq!(wrap_next(2, 3), 0);
        assert_eq!(wrap_prev(0, 3), 2);
        assert_eq!(wrap_next(0, 0), 0);
        assert_eq!(wrap_prev(0, 0), 0);
        assert_eq!(wrap_next(7, 3), 0, "out-of-range cursor is clamped first");
    }

    #[test]
    fn pressing_down_len_times_returns_to_start() {
        for len in 1..6 {
            for start in 0..len {
                let mut cursor = start;
                for _ in 0..len {
                    cursor = wrap_next(cursor, len);
                }
                assert_eq!(cursor, start);
            }
        }
    }

    #[test]
    fn scroll_is_clamped_to_last_page() {
        assert_eq!(scroll_down(0, PAGE_SIZE, 25), 10);
        assert_eq!(scroll_down(10, PAGE_SIZE, 25), 15);
        assert_eq!(scroll_down(0, 1, 4), 0);
        assert_eq!(scroll_up(3, PAGE_SIZE, 25), 0);
        assert_eq!(max_scroll(25, PAGE_SIZE), 15);
    }

    #[test]
    fn lateral_moves_keep_desired_row() {
        let lens = lens(5, 1, 4);
        let mut cols = ColumnCursors::new(AppType::Claude);
        for _ in 0..3 {
            cols.down(&lens);
        }
        assert_eq!(cols.current(), 3);

        cols.right(&lens);
        assert_eq!(cols.column, AppType::Codex);
        assert_eq!(cols.current(), 0);
        assert_eq!(cols.desired_row, 3);

        cols.right(&lens);
        assert_eq!(cols.column, AppType::Gemini);
        assert_eq!(cols.current(), 3);
    }

    #[test]
    fn empty_column_lands_on_zero() {
        let lens = lens(2, 0, 1);
        let mut cols = ColumnCursors::new(AppType::Claude);
        cols.down(&lens);
        cols.right(&lens);
        assert_eq!(cols.current(), 0);
        cols.down(&lens);
        assert_eq!(cols.current(), 0);
        assert_eq!(cols.desired_row, 0);
    }
}
