// A pane: one bordered rectangle bound to at most one child process

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::mpsc::SyncSender;
use std::thread;

use super::events::{MuxEvent, PaneId};
use super::layout::PaneRect;
use super::process::{OutputStream, PaneSize, ProcessHandle, SpawnError, Spawner};
use super::terminal::PaneScreen;

/// Per-pane buffering limits
#[derive(Debug, Clone, Copy)]
pub struct PaneLimits {
    pub scrollback_lines: usize,
    pub history_bytes: usize,
}

impl Default for PaneLimits {
    fn default() -> Self {
        Self {
            scrollback_lines: 100,
            history_bytes: 64 * 1024,
        }
    }
}

pub struct Pane {
    id: PaneId,
    rect: PaneRect,
    process: Option<Box<dyn ProcessHandle>>,
    generation: u64,
    crlf: bool,
    command: Option<String>,
    screen: PaneScreen,
    history: VecDeque<u8>,
    limits: PaneLimits,
}

impl Pane {
    pub fn new(id: PaneId, rect: PaneRect, limits: PaneLimits) -> Self {
        Self {
            id,
            rect,
            process: None,
            generation: 0,
            crlf: false,
            command: None,
            screen: PaneScreen::new(rect.inner_rows(), rect.inner_cols(), limits.scrollback_lines),
            history: VecDeque::new(),
            limits,
        }
    }

    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn rect(&self) -> PaneRect {
        self.rect
    }

    pub fn rows(&self) -> u16 {
        self.rect.rows
    }

    pub fn cols(&self) -> u16 {
        self.rect.cols
    }

    pub fn start_row(&self) -> u16 {
        self.rect.start_row
    }

    pub fn start_col(&self) -> u16 {
        self.rect.start_col
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Command most recently started here
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn has_process(&self) -> bool {
        self.process.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid())
    }

    pub fn screen(&self) -> &PaneScreen {
        &self.screen
    }

    fn inner_size(&self) -> PaneSize {
        PaneSize::new(self.rect.inner_rows(), self.rect.inner_cols())
    }

    /// Spawn `command` and start draining its output into `events`.
    ///
    /// A process that is still running here is terminated first. `events`
    /// is bounded: a drain thread blocks on a full queue, so a child that
    /// outruns the control thread stalls on its own pipe instead of
    /// growing memory.
    pub fn start(
        &mut self,
        command: &str,
        spawner: &dyn Spawner,
        events: &SyncSender<MuxEvent>,
    ) -> Result<(), SpawnError> {
        let spawned = spawner.spawn(command, self.inner_size())?;

        if let Some(mut old) = self.process.take() {
            if !old.has_exited() {
                log::info!("{}: replacing running process {:?}", self.id, old.pid());
                if let Err(e) = old.terminate() {
                    log::warn!("{}: failed to terminate old process: {}", self.id, e);
                }
            }
        }

        self.generation += 1;
        self.crlf = spawned.crlf;
        self.command = Some(command.to_string());
        self.screen.reset(self.limits.scrollback_lines);
        self.history.clear();
        self.process = Some(spawned.handle);

        for stream in spawned.streams {
            spawn_drain(self.id, self.generation, stream, events.clone());
        }

        log::info!("{}: started `{}` (generation {})", self.id, command, self.generation);
        Ok(())
    }

    /// Request termination. Keeps the handle; does not wait.
    pub fn stop(&mut self) {
        if let Some(process) = self.process.as_mut() {
            if let Err(e) = process.terminate() {
                log::warn!("{}: terminate failed: {}", self.id, e);
            }
        }
    }

    /// Change size only; the caller redraws
    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.rect.rows = rows;
        self.rect.cols = cols;
        self.screen.resize(self.rect.inner_rows(), self.rect.inner_cols());

        let size = self.inner_size();
        if let Some(process) = self.process.as_mut() {
            if let Err(e) = process.resize(size) {
                log::warn!("{}: failed to resize process: {}", self.id, e);
            }
        }
    }

    /// Move and resize in one step
    pub fn set_geometry(&mut self, rect: PaneRect) {
        self.rect.start_row = rect.start_row;
        self.rect.start_col = rect.start_col;
        if rect.rows != self.rect.rows || rect.cols != self.rect.cols {
            self.resize(rect.rows, rect.cols);
        }
    }

    /// Write to the child's input. No process means nothing to do.
    pub fn send_input(&mut self, data: &[u8]) -> io::Result<()> {
        match self.process.as_mut() {
            Some(process) => process.write_input(data),
            None => Ok(()),
        }
    }

    /// Output drained since the last call, or `None` without a process
    pub fn read_output(&mut self) -> Option<Vec<u8>> {
        self.process.as_ref()?;
        Some(self.history.drain(..).collect())
    }

    /// Non-blocking: true while a process exists and has not exited
    pub fn is_alive(&mut self) -> bool {
        match self.process.as_mut() {
            Some(process) => !process.has_exited(),
            None => false,
        }
    }

    /// Take bytes from a drain thread. Output from a replaced process is dropped.
    pub fn apply_output(&mut self, generation: u64, data: &[u8]) -> bool {
        if generation != self.generation {
            log::trace!("{}: dropping {} stale bytes", self.id, data.len());
            return false;
        }

        self.screen.process(data, self.crlf);

        self.history.extend(data.iter().copied());
        let cap = self.limits.history_bytes;
        if self.history.len() > cap {
            let excess = self.history.len() - cap;
            self.history.drain(..excess);
        }
        true
    }

    /// Interior rows as drawn between the side borders
    pub fn interior_lines(&self) -> Vec<String> {
        self.screen.lines(self.rect.inner_rows(), self.rect.inner_cols())
    }
}

impl Drop for Pane {
    fn drop(&mut self) {
        // The handle's own Drop kills and reaps the child
        if let Some(process) = self.process.take() {
            log::debug!("{}: dropping process {:?}", self.id, process.pid());
        }
    }
}

fn spawn_drain(pane: PaneId, generation: u64, stream: OutputStream, events: SyncSender<MuxEvent>) {
    let OutputStream { kind, mut reader } = stream;
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let event = MuxEvent::Output {
                        pane,
                        generation,
                        data: buf[..n].to_vec(),
                    };
                    if events.send(event).is_err() {
                        // Control thread is gone
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("{}: {} read error: {}", pane, kind.as_str(), e);
                    break;
                }
            }
        }
        let _ = events.send(MuxEvent::Eof { pane, generation });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::process::PipeSpawner;
    use crate::testing::MockSpawner;
    use std::sync::mpsc::{sync_channel, Receiver};
    use std::thread;
    use std::time::{Duration, Instant};

    fn channel() -> (SyncSender<MuxEvent>, Receiver<MuxEvent>) {
        sync_channel(64)
    }

    fn pane(rows: u16, cols: u16) -> Pane {
        Pane::new(PaneId(0), PaneRect::new(rows, cols, 0, 0), PaneLimits::default())
    }

    #[test]
    fn test_new_pane_has_no_process() {
        let mut pane = pane(10, 50);

        assert!(!pane.has_process());
        assert!(!pane.is_alive());
        assert_eq!(pane.read_output(), None);
        assert_eq!(pane.generation(), 0);
    }

    #[test]
    fn test_stop_and_send_without_process_are_noops() {
        let mut pane = pane(10, 50);

        pane.stop();
        assert!(pane.send_input(b"x").is_ok());
    }

    #[test]
    fn test_start_stop_keeps_handle() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let mut pane = pane(10, 50);

        pane.start("echo hi", &spawner, &tx).unwrap();
        assert!(pane.has_process());
        assert_eq!(pane.command(), Some("echo hi"));
        assert_eq!(spawner.last().unwrap().size(), PaneSize::new(8, 48));

        pane.stop();
        assert!(pane.has_process());
        assert!(spawner.last().unwrap().terminated());
        assert!(!pane.is_alive());
    }

    #[test]
    fn test_restart_terminates_running_process() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let mut pane = pane(10, 50);

        pane.start("first", &spawner, &tx).unwrap();
        pane.start("second", &spawner, &tx).unwrap();

        let children = spawner.children();
        assert!(children[0].terminated());
        assert!(!children[1].terminated());
        assert_eq!(pane.generation(), 2);
    }

    #[test]
    fn test_send_input_writes_to_child() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let mut pane = pane(10, 50);

        pane.start("cat", &spawner, &tx).unwrap();
        pane.send_input(b"ab").unwrap();
        pane.send_input(b"c").unwrap();

        assert_eq!(spawner.last().unwrap().input(), b"abc".to_vec());
    }

    #[test]
    fn test_send_input_propagates_broken_pipe() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let mut pane = pane(10, 50);

        pane.start("cat", &spawner, &tx).unwrap();
        spawner.last().unwrap().break_pipe();

        let err = pane.send_input(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_drain_thread_forwards_output_then_eof() {
        let spawner = MockSpawner::with_output(b"hello\n");
        let (tx, rx) = channel();
        let mut pane = pane(5, 20);

        pane.start("echo hello", &spawner, &tx).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            first,
            MuxEvent::Output {
                pane: PaneId(0),
                generation: 1,
                data: b"hello\n".to_vec()
            }
        );
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second, MuxEvent::Eof { pane: PaneId(0), generation: 1 });
    }

    #[test]
    fn test_apply_output_updates_screen_and_history() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let mut pane = pane(4, 12);

        pane.start("echo", &spawner, &tx).unwrap();
        assert!(pane.apply_output(1, b"Pane 1\n"));

        let lines = pane.interior_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Pane 1    ");
        assert_eq!(pane.read_output(), Some(b"Pane 1\n".to_vec()));
        assert_eq!(pane.read_output(), Some(Vec::new()));
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let mut pane = pane(4, 12);

        pane.start("one", &spawner, &tx).unwrap();
        pane.start("two", &spawner, &tx).unwrap();

        assert!(!pane.apply_output(1, b"old"));
        assert_eq!(pane.read_output(), Some(Vec::new()));
    }

    #[test]
    fn test_history_is_bounded() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let limits = PaneLimits {
            scrollback_lines: 0,
            history_bytes: 4,
        };
        let mut pane = Pane::new(PaneId(3), PaneRect::new(4, 12, 0, 0), limits);

        pane.start("yes", &spawner, &tx).unwrap();
        pane.apply_output(1, b"abcdef");

        assert_eq!(pane.read_output(), Some(b"cdef".to_vec()));
    }

    #[test]
    fn test_resize_reaches_process() {
        let spawner = MockSpawner::default();
        let (tx, _rx) = channel();
        let mut pane = pane(10, 50);

        pane.start("top", &spawner, &tx).unwrap();
        pane.resize(6, 20);

        assert_eq!((pane.rows(), pane.cols()), (6, 20));
        assert_eq!(pane.interior_lines().len(), 4);
        assert_eq!(spawner.last().unwrap().size(), PaneSize::new(4, 18));
    }

    #[test]
    fn test_set_geometry_moves_pane() {
        let mut pane = pane(10, 50);
        pane.set_geometry(PaneRect::new(10, 50, 3, 7));

        assert_eq!((pane.start_row(), pane.start_col()), (3, 7));
        assert_eq!((pane.rows(), pane.cols()), (10, 50));
    }

    #[test]
    fn test_spawn_failure_leaves_pane_untouched() {
        let spawner = MockSpawner::failing();
        let (tx, _rx) = channel();
        let mut pane = pane(10, 50);

        assert!(pane.start("nope", &spawner, &tx).is_err());
        assert!(!pane.has_process());
        assert_eq!(pane.generation(), 0);
    }

    #[test]
    fn test_flooding_child_is_held_back_by_bounded_queue() {
        const DEPTH: usize = 4;
        let spawner = PipeSpawner::new("/bin/sh");
        let (tx, rx) = sync_channel(DEPTH);
        let mut pane = pane(10, 50);

        pane.start("exec yes", &spawner, &tx).unwrap();
        // Nobody receives while the child writes as fast as it can
        thread::sleep(Duration::from_millis(300));
        pane.stop();

        let mut bytes = 0;
        let mut eofs = 0;
        let deadline = Instant::now() + Duration::from_secs(10);
        while eofs < 2 && Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(MuxEvent::Output { data, .. }) => bytes += data.len(),
                Ok(MuxEvent::Eof { .. }) => eofs += 1,
                Err(_) => {}
            }
        }

        assert_eq!(eofs, 2);
        // Queued chunks, one held by each blocked drain thread, and
        // whatever the kernel pipe buffered before the kill
        let bound = (DEPTH + 2) * 4096 + 1024 * 1024;
        assert!(bytes <= bound, "drained {} bytes after a stalled flood", bytes);
    }
}
