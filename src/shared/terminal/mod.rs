// Terminal cell interpretation for pane output

mod screen;

pub use screen::PaneScreen;
