// Cell grid for one pane, driven by the vt100 parser
// Escape sequences are interpreted here; the multiplexer only ever asks for text rows

use unicode_width::UnicodeWidthStr;

/// Interior text of a pane
pub struct PaneScreen {
    parser: vt100::Parser,
    rows: u16,
    cols: u16,
}

impl PaneScreen {
    pub fn new(rows: u16, cols: u16, scrollback: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            parser: vt100::Parser::new(rows, cols, scrollback),
            rows,
            cols,
        }
    }

    /// Feed raw child output
    ///
    /// Pipes have no line discipline, so `crlf` turns each bare `\n` into
    /// `\r\n` to start the next line at column 0.
    pub fn process(&mut self, data: &[u8], crlf: bool) {
        if !crlf {
            self.parser.process(data);
            return;
        }

        let mut translated = Vec::with_capacity(data.len() + 8);
        for &byte in data {
            if byte == b'\n' {
                translated.push(b'\r');
            }
            translated.push(byte);
        }
        self.parser.process(&translated);
    }

    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.rows = rows.max(1);
        self.cols = cols.max(1);
        self.parser.set_size(self.rows, self.cols);
    }

    /// Forget everything drawn so far
    pub fn reset(&mut self, scrollback: usize) {
        self.parser = vt100::Parser::new(self.rows, self.cols, scrollback);
    }

    pub fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    /// Visible rows, each padded with spaces to exactly `width` display cells
    pub fn lines(&self, height: u16, width: u16) -> Vec<String> {
        let screen = self.parser.screen();
        let mut lines: Vec<String> = screen
            .rows(0, width)
            .take(height as usize)
            .map(|row| pad_to_width(row, width as usize))
            .collect();
        while lines.len() < height as usize {
            lines.push(" ".repeat(width as usize));
        }
        lines
    }

    /// Plain text of the whole grid, trailing blanks trimmed
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    pub fn cursor_position(&self) -> (u16, u16) {
        self.parser.screen().cursor_position()
    }
}

fn pad_to_width(mut text: String, width: usize) -> String {
    let used = UnicodeWidthStr::width(text.as_str());
    if used < width {
        text.push_str(&" ".repeat(width - used));
    }
    text
}
