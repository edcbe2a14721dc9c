// The multiplexer: ordered panes, one active, keys in, borders out

use std::io;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::time::Duration;

use thiserror::Error;

use crate::shared::{
    Config, InterruptFlag, LayoutPolicy, MuxEvent, Pane, PaneId, PaneLimits, PaneRect, SpawnError,
    Spawner,
};

use super::action::{Action, KeyMap};
use super::input::Key;
use super::surface::{LineInput, RenderSurface};
use super::ui;

const PROMPT: &str = "> ";

/// Drain threads block once this many events are waiting
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// Events applied per pump, so keys are still read during a flood
pub const MAX_EVENTS_PER_PUMP: usize = 64;

#[derive(Debug, Error)]
pub enum MuxError {
    #[error("there are no panes")]
    NoPanes,
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error("display error: {0}")]
    Surface(#[from] io::Error),
}

/// Why a keystroke did not reach a child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    NoProcess,
    ProcessExited,
    BrokenPipe,
    WriteFailed(io::ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Discarded(DiscardReason),
}

/// What one `pump_events` call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pumped {
    pub events: usize,
    /// Some pane's screen changed
    pub dirty: bool,
    /// The cap was hit; more events are probably waiting
    pub backlog: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Multiplexer<S: RenderSurface> {
    surface: S,
    spawner: Box<dyn Spawner>,
    panes: Vec<Pane>,
    active: Option<usize>,
    next_id: u64,
    layout: LayoutPolicy,
    limits: PaneLimits,
    keymap: KeyMap,
    poll_interval: Duration,
    event_tx: SyncSender<MuxEvent>,
    event_rx: Receiver<MuxEvent>,
    interrupt: InterruptFlag,
}

impl<S: RenderSurface> Multiplexer<S> {
    pub fn new(surface: S, spawner: Box<dyn Spawner>, config: &Config) -> Self {
        let (event_tx, event_rx) = sync_channel(EVENT_QUEUE_DEPTH);
        Self {
            surface,
            spawner,
            panes: Vec::new(),
            active: None,
            next_id: 0,
            layout: config.layout,
            limits: config.pane_limits(),
            keymap: KeyMap::default(),
            poll_interval: config.poll_interval(),
            event_tx,
            event_rx,
            interrupt: InterruptFlag::default(),
        }
    }

    /// Raise this from a signal handler to quit, even from `:` mode
    pub fn interrupt_handle(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    pub fn keymap_mut(&mut self) -> &mut KeyMap {
        &mut self.keymap
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    /// Active index without resolving the default
    pub fn active_index(&self) -> Option<usize> {
        match self.active {
            Some(index) => Some(index),
            None if self.panes.is_empty() => None,
            None => Some(0),
        }
    }

    fn resolve_active(&mut self) -> Result<usize, MuxError> {
        if self.panes.is_empty() {
            return Err(MuxError::NoPanes);
        }
        Ok(*self.active.get_or_insert(0))
    }

    fn pane_by_id(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|p| p.id() == id)
    }

    /// Append a pane. Nothing is started or drawn.
    pub fn create_pane(&mut self, rows: u16, cols: u16, start_row: u16, start_col: u16) -> &mut Pane {
        let id = PaneId(self.next_id);
        self.next_id += 1;
        let rect = PaneRect::new(rows, cols, start_row, start_col);
        log::debug!("{}: created at {:?}", id, rect);
        self.panes.push(Pane::new(id, rect, self.limits));
        let last = self.panes.len() - 1;
        &mut self.panes[last]
    }

    /// The active pane, pane 0 until something else is selected
    pub fn get_active_pane(&mut self) -> Result<&mut Pane, MuxError> {
        let index = self.resolve_active()?;
        Ok(&mut self.panes[index])
    }

    /// Select `index` and redraw. Out of range is ignored; returns whether it switched.
    pub fn switch_active_pane(&mut self, index: usize) -> Result<bool, MuxError> {
        if index >= self.panes.len() {
            log::debug!("ignoring switch to pane index {}", index);
            return Ok(false);
        }
        self.active = Some(index);
        self.draw_panes()?;
        Ok(true)
    }

    pub fn resize_active_pane(&mut self, rows: u16, cols: u16) -> Result<(), MuxError> {
        self.get_active_pane()?.resize(rows, cols);
        self.draw_panes()?;
        Ok(())
    }

    pub fn start_active_pane(&mut self, command: &str) -> Result<(), MuxError> {
        let index = self.resolve_active()?;
        let pane = &mut self.panes[index];
        pane.start(command, self.spawner.as_ref(), &self.event_tx)?;
        self.draw_panes()?;
        Ok(())
    }

    pub fn stop_active_pane(&mut self) -> Result<(), MuxError> {
        self.get_active_pane()?.stop();
        self.draw_panes()?;
        Ok(())
    }

    /// Deliver keystrokes. A pane without a live process swallows them;
    /// the only error is having no panes at all.
    pub fn send_input_to_active_pane(&mut self, data: &[u8]) -> Result<Delivery, MuxError> {
        let pane = self.get_active_pane()?;
        let delivery = if !pane.has_process() {
            Delivery::Discarded(DiscardReason::NoProcess)
        } else if !pane.is_alive() {
            Delivery::Discarded(DiscardReason::ProcessExited)
        } else {
            match pane.send_input(data) {
                Ok(()) => Delivery::Delivered,
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    Delivery::Discarded(DiscardReason::BrokenPipe)
                }
                Err(e) => {
                    log::warn!("{}: write failed: {}", pane.id(), e);
                    Delivery::Discarded(DiscardReason::WriteFailed(e.kind()))
                }
            }
        };

        if let Delivery::Discarded(reason) = delivery {
            log::debug!("{}: discarded {} bytes ({:?})", pane.id(), data.len(), reason);
        }
        Ok(delivery)
    }

    /// Clear and repaint every pane, then refresh once
    pub fn draw_panes(&mut self) -> io::Result<()> {
        ui::draw(&mut self.surface, &self.panes)
    }

    /// Recompute pane rectangles for the current surface size
    pub fn relayout(&mut self) -> io::Result<()> {
        let (rows, cols) = self.surface.size()?;
        if let Some(rects) = self.layout.arrange(self.panes.len(), rows, cols) {
            log::debug!("relayout for {}x{}", rows, cols);
            for (pane, rect) in self.panes.iter_mut().zip(rects) {
                pane.set_geometry(rect);
            }
        }
        Ok(())
    }

    /// Apply what the drain threads have sent so far, at most
    /// `MAX_EVENTS_PER_PUMP` events. Never blocks.
    pub fn pump_events(&mut self) -> Pumped {
        let mut pumped = Pumped::default();
        while pumped.events < MAX_EVENTS_PER_PUMP {
            let Ok(event) = self.event_rx.try_recv() else {
                return pumped;
            };
            pumped.events += 1;
            match event {
                MuxEvent::Output {
                    pane,
                    generation,
                    data,
                } => {
                    if let Some(pane) = self.pane_by_id(pane) {
                        pumped.dirty |= pane.apply_output(generation, &data);
                    }
                }
                MuxEvent::Eof { pane, generation } => {
                    log::debug!("{}: output stream closed (generation {})", pane, generation);
                }
            }
        }
        pumped.backlog = true;
        pumped
    }

    pub fn interrupted(&self) -> bool {
        self.interrupt.is_raised()
    }

    /// One key, one transition
    pub fn handle_input(&mut self, key: Key) -> Result<Flow, MuxError> {
        match self.keymap.action(key) {
            Action::Quit => return Ok(Flow::Quit),
            Action::NextPane => {
                if !self.panes.is_empty() {
                    let current = self.resolve_active()?;
                    self.switch_active_pane((current + 1) % self.panes.len())?;
                }
            }
            Action::Redraw => {
                self.relayout()?;
                self.draw_panes()?;
            }
            Action::CommandLine => return self.command_line(),
            Action::Forward => {
                let bytes = key.to_bytes();
                if !bytes.is_empty() {
                    self.send_input_to_active_pane(&bytes)?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// `:` mode. Echo and cursor come back off on every path.
    fn command_line(&mut self) -> Result<Flow, MuxError> {
        self.surface.set_echo(true)?;
        self.surface.set_cursor_visible(true)?;
        let input = self.prompt();
        let restored = self
            .surface
            .set_echo(false)
            .and_then(|_| self.surface.set_cursor_visible(false));
        let input = input?;
        restored?;

        match input {
            LineInput::Submitted(line) if !line.trim().is_empty() => {
                self.start_active_pane(line.trim())?;
            }
            LineInput::Interrupted => return Ok(Flow::Quit),
            // Wipe the prompt
            _ => self.draw_panes()?,
        }
        Ok(Flow::Continue)
    }

    fn prompt(&mut self) -> io::Result<LineInput> {
        let (rows, _) = self.surface.size()?;
        self.surface.draw_text(rows.saturating_sub(1), 0, PROMPT)?;
        self.surface.refresh()?;
        self.surface.read_line(&self.interrupt)
    }

    /// Draw, then process keys and child output until quit or interrupt
    pub fn run(&mut self) -> Result<(), MuxError> {
        self.draw_panes()?;
        loop {
            let pumped = self.pump_events();
            if pumped.dirty {
                self.draw_panes()?;
            }
            if self.interrupted() {
                log::info!("interrupted, shutting down");
                return Ok(());
            }

            // Only peek at the keyboard while output is still queued
            let timeout = if pumped.backlog {
                Duration::ZERO
            } else {
                self.poll_interval
            };
            let Some(key) = self.surface.poll_key(timeout)? else {
                continue;
            };
            match self.handle_input(key) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => {
                    log::info!("quit requested");
                    return Ok(());
                }
                Err(MuxError::NoPanes) => log::debug!("{:?} ignored: no panes", key),
                Err(MuxError::Spawn(e)) => log::warn!("{}", e),
                Err(e) => return Err(e),
            }
        }
    }

    /// Signal every pane's process. Handles reap their children when dropped.
    pub fn shutdown(&mut self) {
        for pane in &mut self.panes {
            pane.stop();
        }
    }
}

impl<S: RenderSurface> Drop for Multiplexer<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
