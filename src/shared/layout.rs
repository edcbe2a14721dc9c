use serde::{Deserialize, Serialize};

/// Blank cells between neighbouring panes
pub const PANE_GAP: u16 = 1;

/// Smallest pane that still has an interior
pub const MIN_PANE_SIZE: u16 = 2;

/// Position and size of a pane, border included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneRect {
    pub rows: u16,
    pub cols: u16,
    pub start_row: u16,
    pub start_col: u16,
}

impl PaneRect {
    pub fn new(rows: u16, cols: u16, start_row: u16, start_col: u16) -> Self {
        Self {
            rows,
            cols,
            start_row,
            start_col,
        }
    }

    pub fn has_interior(&self) -> bool {
        self.rows >= MIN_PANE_SIZE && self.cols >= MIN_PANE_SIZE
    }

    pub fn inner_rows(&self) -> u16 {
        self.rows.saturating_sub(2)
    }

    pub fn inner_cols(&self) -> u16 {
        self.cols.saturating_sub(2)
    }

    pub fn end_row(&self) -> u16 {
        self.start_row.saturating_add(self.rows)
    }

    pub fn end_col(&self) -> u16 {
        self.start_col.saturating_add(self.cols)
    }

    pub fn overlaps(&self, other: &PaneRect) -> bool {
        self.start_row < other.end_row()
            && other.start_row < self.end_row()
            && self.start_col < other.end_col()
            && other.start_col < self.end_col()
    }
}

/// How pane rectangles follow the terminal size
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPolicy {
    /// Keep whatever geometry the panes were created with
    Fixed,
    /// Side by side, even widths
    #[default]
    Columns,
    /// Stacked, even heights
    Rows,
}

impl LayoutPolicy {
    /// Rectangles for `count` panes on a `term_rows` x `term_cols` terminal.
    /// `None` means the current geometry stays.
    ///
    /// The bottom row is left free for the command prompt.
    pub fn arrange(&self, count: usize, term_rows: u16, term_cols: u16) -> Option<Vec<PaneRect>> {
        if count == 0 {
            return Some(Vec::new());
        }
        let usable_rows = term_rows.saturating_sub(1);
        match self {
            LayoutPolicy::Fixed => None,
            LayoutPolicy::Columns => Some(
                split_even(term_cols, count)
                    .into_iter()
                    .map(|(start, len)| PaneRect::new(usable_rows, len, 0, start))
                    .collect(),
            ),
            LayoutPolicy::Rows => Some(
                split_even(usable_rows, count)
                    .into_iter()
                    .map(|(start, len)| PaneRect::new(len, term_cols, start, 0))
                    .collect(),
            ),
        }
    }
}

/// Split `total` cells into `count` runs separated by `PANE_GAP`; the last run takes the remainder
fn split_even(total: u16, count: usize) -> Vec<(u16, u16)> {
    let count_u16 = u16::try_from(count).unwrap_or(u16::MAX);
    let gaps = PANE_GAP.saturating_mul(count_u16.saturating_sub(1));
    let available = total.saturating_sub(gaps);
    let each = available / count_u16.max(1);
    let remainder = available - each * count_u16.max(1);

    let mut runs = Vec::with_capacity(count);
    let mut start = 0u16;
    for i in 0..count {
        let len = if i + 1 == count { each + remainder } else { each };
        runs.push((start, len));
        start = start.saturating_add(len).saturating_add(PANE_GAP);
    }
    runs
}
