// Child process backends for panes
// A pane only sees the ProcessHandle trait; pipe and pty backends sit behind it

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use portable_pty::{native_pty_system, Child as PtyChild, CommandBuilder, MasterPty, PtySize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interior size of a pane in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneSize {
    pub rows: u16,
    pub cols: u16,
}

impl PaneSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to spawn `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("pty error for `{command}`: {message}")]
    Pty { command: String, message: String },
}

/// Which child stream a drained reader is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
    Pty,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
            StreamKind::Pty => "pty",
        }
    }
}

pub struct OutputStream {
    pub kind: StreamKind,
    pub reader: Box<dyn Read + Send>,
}

/// A freshly spawned child, ready to be owned by a pane
pub struct Spawned {
    pub handle: Box<dyn ProcessHandle>,
    pub streams: Vec<OutputStream>,
    /// Output needs `\n` -> `\r\n` before it reaches the cell interpreter
    pub crlf: bool,
}

/// OS-level handle on one running child
pub trait ProcessHandle: Send {
    /// Write to the child's input and flush immediately
    fn write_input(&mut self, data: &[u8]) -> io::Result<()>;

    /// Ask the child to exit. Does not wait.
    fn terminate(&mut self) -> io::Result<()>;

    /// Non-blocking liveness probe
    fn has_exited(&mut self) -> bool;

    fn resize(&mut self, _size: PaneSize) -> io::Result<()> {
        Ok(())
    }

    fn pid(&self) -> Option<u32>;
}

pub trait Spawner: Send + Sync {
    fn spawn(&self, command: &str, size: PaneSize) -> Result<Spawned, SpawnError>;
}

/// Which spawner the config selects
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessBackend {
    #[default]
    Pipe,
    Pty,
}

impl ProcessBackend {
    pub fn spawner(&self, shell: &str) -> Box<dyn Spawner> {
        match self {
            ProcessBackend::Pipe => Box::new(PipeSpawner::new(shell)),
            ProcessBackend::Pty => Box::new(PtySpawner::new(shell)),
        }
    }
}

/// Runs `<shell> -c <command>` with three separate pipes
pub struct PipeSpawner {
    shell: String,
}

impl PipeSpawner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Spawner for PipeSpawner {
    fn spawn(&self, command: &str, _size: PaneSize) -> Result<Spawned, SpawnError> {
        if command.trim().is_empty() {
            return Err(SpawnError::EmptyCommand);
        }

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SpawnError::Io {
                command: command.to_string(),
                source,
            })?;

        let mut streams = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            streams.push(OutputStream {
                kind: StreamKind::Stdout,
                reader: Box::new(stdout),
            });
        }
        if let Some(stderr) = child.stderr.take() {
            streams.push(OutputStream {
                kind: StreamKind::Stderr,
                reader: Box::new(stderr),
            });
        }
        let stdin = child.stdin.take();

        log::debug!("spawned `{}` as pid {}", command, child.id());

        Ok(Spawned {
            handle: Box::new(PipeProcess { child, stdin }),
            streams,
            crlf: true,
        })
    }
}

pub struct PipeProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl ProcessHandle for PipeProcess {
    fn write_input(&mut self, data: &[u8]) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        stdin.write_all(data)?;
        stdin.flush()
    }

    fn terminate(&mut self) -> io::Result<()> {
        match self.child.kill() {
            // Already reaped
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

impl Drop for PipeProcess {
    fn drop(&mut self) {
        // Close stdin first so well-behaved children can finish on EOF
        self.stdin.take();
        if !self.has_exited() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Runs `<shell> -c <command>` inside a pseudo-terminal
pub struct PtySpawner {
    shell: String,
}

impl PtySpawner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Spawner for PtySpawner {
    fn spawn(&self, command: &str, size: PaneSize) -> Result<Spawned, SpawnError> {
        if command.trim().is_empty() {
            return Err(SpawnError::EmptyCommand);
        }
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| pty_error(command, e))?;

        let mut cmd = CommandBuilder::new(&self.shell);
        cmd.arg("-c");
        cmd.arg(command);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| pty_error(command, e))?;
        // The reader only sees EOF once our copy of the slave is gone
        drop(pair.slave);

        let reader = pair.master.try_clone_reader().map_err(|e| pty_error(command, e))?;
        let writer = pair.master.take_writer().map_err(|e| pty_error(command, e))?;

        log::debug!("spawned `{}` in pty as pid {:?}", command, child.process_id());

        Ok(Spawned {
            handle: Box::new(PtyProcess {
                master: pair.master,
                writer,
                child,
            }),
            streams: vec![OutputStream {
                kind: StreamKind::Pty,
                reader,
            }],
            crlf: false,
        })
    }
}

fn pty_error(command: &str, e: impl std::fmt::Display) -> SpawnError {
    SpawnError::Pty {
        command: command.to_string(),
        message: e.to_string(),
    }
}

pub struct PtyProcess {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn PtyChild + Send + Sync>,
}

impl ProcessHandle for PtyProcess {
    fn write_input(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    fn resize(&mut self, size: PaneSize) -> io::Result<()> {
        self.master
            .resize(PtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }

    fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
