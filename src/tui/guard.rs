// Raw mode, alternate screen and hidden cursor as one scoped resource

use std::io::{self, Write};

use ratatui::crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Restores the terminal exactly once, on `restore()` or on drop,
/// whichever comes first. Every exit path that unwinds goes through it.
pub struct TerminalGuard<W: Write = io::Stdout> {
    out: W,
    raw: bool,
    restored: bool,
}

impl TerminalGuard<io::Stdout> {
    pub fn acquire() -> io::Result<Self> {
        Self::acquire_with(io::stdout(), true)
    }
}

impl<W: Write> TerminalGuard<W> {
    /// `raw` is false when there is no tty to put into raw mode
    pub fn acquire_with(mut out: W, raw: bool) -> io::Result<Self> {
        if raw {
            enable_raw_mode()?;
        }
        if let Err(e) = execute!(out, EnterAlternateScreen, cursor::Hide) {
            if raw {
                let _ = disable_raw_mode();
            }
            return Err(e);
        }
        Ok(Self {
            out,
            raw,
            restored: false,
        })
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        let raw = if self.raw { disable_raw_mode() } else { Ok(()) };
        execute!(self.out, LeaveAlternateScreen, cursor::Show)?;
        raw
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::error!("failed to restore terminal: {}", e);
        }
    }
}
