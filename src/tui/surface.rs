// Display + keyboard boundary of the multiplexer

use std::io::{self, Stdout};
use std::time::Duration;

use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    crossterm::event,
    layout::{Position, Rect},
    style::Style,
    Terminal,
};
use unicode_width::UnicodeWidthStr;

use crate::shared::InterruptFlag;

use super::guard::TerminalGuard;
use super::input::Key;

/// How often line-input mode looks at the interrupt flag
const LINE_POLL: Duration = Duration::from_millis(50);

/// Result of collecting one line in line-input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    Submitted(String),
    /// Esc pressed
    Cancelled,
    /// Ctrl-C pressed, or the interrupt flag was raised
    Interrupted,
}

/// A character grid with cursor positioning and a key source.
/// Coordinates are zero based `(row, col)`; text past the edge is clipped.
pub trait RenderSurface {
    fn clear(&mut self) -> io::Result<()>;
    fn draw_text(&mut self, row: u16, col: u16, text: &str) -> io::Result<()>;
    fn refresh(&mut self) -> io::Result<()>;

    /// Wait up to `timeout` for a key
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>>;

    fn read_key(&mut self) -> io::Result<Key> {
        loop {
            if let Some(key) = self.poll_key(Duration::from_secs(3600))? {
                return Ok(key);
            }
        }
    }

    fn set_echo(&mut self, on: bool) -> io::Result<()>;
    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Block until a full line is entered at the current cursor position.
    /// Gives up with `Interrupted` as soon as `interrupt` is raised.
    fn read_line(&mut self, interrupt: &InterruptFlag) -> io::Result<LineInput>;

    /// `(rows, cols)`
    fn size(&self) -> io::Result<(u16, u16)>;
}

/// The real terminal: ratatui does the diffing, crossterm supplies keys
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    frame: Buffer,
    cursor: (u16, u16),
    cursor_visible: bool,
    echo: bool,
    // Dropped last so the terminal is restored after ratatui is done with it
    _guard: TerminalGuard,
}

impl TerminalSurface {
    pub fn new() -> io::Result<Self> {
        let guard = TerminalGuard::acquire()?;
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        let size = terminal.size()?;
        Ok(Self {
            terminal,
            frame: Buffer::empty(Rect::new(0, 0, size.width, size.height)),
            cursor: (0, 0),
            cursor_visible: false,
            echo: false,
            _guard: guard,
        })
    }

    fn sync_frame_size(&mut self) -> io::Result<()> {
        let size = self.terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        if self.frame.area != area {
            self.frame.resize(area);
        }
        Ok(())
    }
}

impl RenderSurface for TerminalSurface {
    fn clear(&mut self) -> io::Result<()> {
        self.sync_frame_size()?;
        self.frame.reset();
        self.cursor = (0, 0);
        Ok(())
    }

    fn draw_text(&mut self, row: u16, col: u16, text: &str) -> io::Result<()> {
        let area = self.frame.area;
        if row >= area.height || col >= area.width {
            return Ok(());
        }
        let max_width = (area.width - col) as usize;
        let (x, y) = self
            .frame
            .set_stringn(col, row, text, max_width, Style::default());
        self.cursor = (y, x);
        Ok(())
    }

    fn refresh(&mut self) -> io::Result<()> {
        let frame = &self.frame;
        let cursor = self.cursor_visible.then_some(self.cursor);
        self.terminal.draw(|f| {
            f.buffer_mut().merge(frame);
            if let Some((row, col)) = cursor {
                f.set_cursor_position(Position::new(col, row));
            }
        })?;
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let ev = event::read()?;
        let key = Key::from_event(&ev);
        if key == Some(Key::Resize) {
            self.sync_frame_size()?;
        }
        Ok(key)
    }

    fn set_echo(&mut self, on: bool) -> io::Result<()> {
        self.echo = on;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_visible = visible;
        Ok(())
    }

    fn read_line(&mut self, interrupt: &InterruptFlag) -> io::Result<LineInput> {
        let (row, start_col) = self.cursor;
        let mut line = String::new();
        loop {
            if interrupt.is_raised() {
                return Ok(LineInput::Interrupted);
            }
            let Some(key) = self.poll_key(LINE_POLL)? else {
                continue;
            };
            match key {
                Key::Enter => return Ok(LineInput::Submitted(line)),
                Key::Esc => return Ok(LineInput::Cancelled),
                Key::Interrupt => return Ok(LineInput::Interrupted),
                Key::Backspace => {
                    line.pop();
                }
                Key::Char(c) => line.push(c),
                _ => continue,
            }
            if self.echo {
                let width = UnicodeWidthStr::width(line.as_str()) as u16;
                // Blank one extra cell so a deleted character disappears
                self.draw_text(row, start_col, &format!("{} ", line))?;
                self.cursor = (row, start_col.saturating_add(width));
                self.refresh()?;
            }
        }
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        let size = self.terminal.size()?;
        Ok((size.height, size.width))
    }
}
