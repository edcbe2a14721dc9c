// Fakes shared by the unit tests

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::shared::InterruptFlag;
use crate::shared::process::{
    OutputStream, PaneSize, ProcessHandle, SpawnError, Spawned, Spawner, StreamKind,
};
use crate::tui::{Key, LineInput, RenderSurface};

#[derive(Default)]
struct ChildState {
    command: String,
    input: Vec<u8>,
    size: Option<PaneSize>,
    exited: bool,
    terminated: bool,
    broken_pipe: bool,
}

/// Test-side view of a process spawned by `MockSpawner`
#[derive(Clone)]
pub struct MockChild(Arc<Mutex<ChildState>>);

impl MockChild {
    pub fn command(&self) -> String {
        self.0.lock().command.clone()
    }

    pub fn input(&self) -> Vec<u8> {
        self.0.lock().input.clone()
    }

    pub fn size(&self) -> PaneSize {
        self.0.lock().size.unwrap_or(PaneSize::new(0, 0))
    }

    pub fn terminated(&self) -> bool {
        self.0.lock().terminated
    }

    /// The child exits on its own
    pub fn exit(&self) {
        self.0.lock().exited = true;
    }

    /// Input closed but the child keeps running
    pub fn break_pipe(&self) {
        self.0.lock().broken_pipe = true;
    }
}

struct MockProcess(MockChild);

impl ProcessHandle for MockProcess {
    fn write_input(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = (self.0).0.lock();
        if state.broken_pipe || state.exited || state.terminated {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        state.input.extend_from_slice(data);
        Ok(())
    }

    fn terminate(&mut self) -> io::Result<()> {
        (self.0).0.lock().terminated = true;
        Ok(())
    }

    fn has_exited(&mut self) -> bool {
        let state = (self.0).0.lock();
        state.exited || state.terminated
    }

    fn resize(&mut self, size: PaneSize) -> io::Result<()> {
        (self.0).0.lock().size = Some(size);
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }
}

/// Spawner that records every child instead of starting processes
#[derive(Default)]
pub struct MockSpawner {
    children: Mutex<Vec<MockChild>>,
    output: Vec<u8>,
    fail: bool,
}

impl MockSpawner {
    /// Every child prints `output` on stdout and closes it
    pub fn with_output(output: &[u8]) -> Self {
        Self {
            output: output.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn children(&self) -> Vec<MockChild> {
        self.children.lock().clone()
    }

    pub fn last(&self) -> Option<MockChild> {
        self.children.lock().last().cloned()
    }
}

impl Spawner for MockSpawner {
    fn spawn(&self, command: &str, size: PaneSize) -> Result<Spawned, SpawnError> {
        if self.fail {
            return Err(SpawnError::Io {
                command: command.to_string(),
                source: io::ErrorKind::NotFound.into(),
            });
        }
        let child = MockChild(Arc::new(Mutex::new(ChildState {
            command: command.to_string(),
            size: Some(size),
            ..ChildState::default()
        })));
        self.children.lock().push(child.clone());

        let streams = if self.output.is_empty() {
            Vec::new()
        } else {
            vec![OutputStream {
                kind: StreamKind::Stdout,
                reader: Box::new(Cursor::new(self.output.clone())),
            }]
        };
        Ok(Spawned {
            handle: Box::new(MockProcess(child)),
            streams,
            crlf: true,
        })
    }
}

/// In-memory character grid with a scripted keyboard
pub struct RecordingSurface {
    rows: u16,
    cols: u16,
    grid: Vec<Vec<char>>,
    cursor: (u16, u16),
    pub refreshes: usize,
    pub clears: usize,
    pub echo: bool,
    pub cursor_visible: bool,
    /// Every `set_echo` / `set_cursor_visible` call, in order
    pub mode_changes: Vec<(&'static str, bool)>,
    /// Snapshot of the grid at each refresh
    pub frames: Vec<Vec<String>>,
    pub keys: VecDeque<Key>,
    pub lines: VecDeque<LineInput>,
}

impl RecordingSurface {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            grid: vec![vec![' '; cols as usize]; rows as usize],
            cursor: (0, 0),
            refreshes: 0,
            clears: 0,
            echo: false,
            cursor_visible: false,
            mode_changes: Vec::new(),
            frames: Vec::new(),
            keys: VecDeque::new(),
            lines: VecDeque::new(),
        }
    }

    pub fn set_size(&mut self, rows: u16, cols: u16) {
        *self = Self {
            keys: std::mem::take(&mut self.keys),
            lines: std::mem::take(&mut self.lines),
            refreshes: self.refreshes,
            clears: self.clears,
            ..Self::new(rows, cols)
        };
    }

    pub fn row(&self, row: u16) -> String {
        self.grid[row as usize].iter().collect()
    }

    /// `len` characters of `row` starting at `col`
    pub fn text_at(&self, row: u16, col: u16, len: usize) -> String {
        self.grid[row as usize]
            .iter()
            .skip(col as usize)
            .take(len)
            .collect()
    }
}

impl RenderSurface for RecordingSurface {
    fn clear(&mut self) -> io::Result<()> {
        for row in &mut self.grid {
            row.fill(' ');
        }
        self.cursor = (0, 0);
        self.clears += 1;
        Ok(())
    }

    fn draw_text(&mut self, row: u16, col: u16, text: &str) -> io::Result<()> {
        if row >= self.rows {
            return Ok(());
        }
        let mut c = col;
        for ch in text.chars() {
            if c >= self.cols {
                break;
            }
            self.grid[row as usize][c as usize] = ch;
            c += 1;
        }
        self.cursor = (row, c);
        Ok(())
    }

    fn refresh(&mut self) -> io::Result<()> {
        self.refreshes += 1;
        self.frames
            .push((0..self.rows).map(|r| self.row(r)).collect());
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<Key>> {
        match self.keys.pop_front() {
            Some(key) => Ok(Some(key)),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted keys left")),
        }
    }

    fn set_echo(&mut self, on: bool) -> io::Result<()> {
        self.echo = on;
        self.mode_changes.push(("echo", on));
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_visible = visible;
        self.mode_changes.push(("cursor", visible));
        Ok(())
    }

    fn read_line(&mut self, interrupt: &InterruptFlag) -> io::Result<LineInput> {
        if interrupt.is_raised() {
            return Ok(LineInput::Interrupted);
        }
        Ok(self.lines.pop_front().unwrap_or(LineInput::Cancelled))
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        Ok((self.rows, self.cols))
    }
}
