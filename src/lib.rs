// pmux library - pane/process model and the terminal front end

// Panes, processes, layout and config (no display code)
pub mod shared;

// Keyboard routing and border drawing on a real terminal
pub mod tui;

#[cfg(test)]
mod testing;
