use std::io;

use crate::shared::Pane;

use super::surface::RenderSurface;

/// `+----+` spanning `cols` cells
pub fn border_edge(cols: u16) -> String {
    format!("+{}+", "-".repeat(cols.saturating_sub(2) as usize))
}

/// Every row of a pane, top border to bottom border.
/// Panes smaller than 2x2 have no interior and produce nothing.
pub fn pane_lines(pane: &Pane) -> Vec<String> {
    if !pane.rect().has_interior() {
        return Vec::new();
    }

    let edge = border_edge(pane.cols());
    let mut lines = Vec::with_capacity(pane.rows() as usize);
    lines.push(edge.clone());
    for content in pane.interior_lines() {
        lines.push(format!("|{}|", content));
    }
    lines.push(edge);
    lines
}

/// Full repaint: clear, every pane, one refresh
pub fn draw<S: RenderSurface + ?Sized>(surface: &mut S, panes: &[Pane]) -> io::Result<()> {
    surface.clear()?;
    for pane in panes {
        for (offset, line) in pane_lines(pane).iter().enumerate() {
            let row = pane.start_row().saturating_add(offset as u16);
            surface.draw_text(row, pane.start_col(), line)?;
        }
    }
    surface.refresh()
}
