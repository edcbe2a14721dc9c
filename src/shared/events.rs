use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stable identity of a pane, independent of its index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(pub u64);

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pane-{}", self.0)
    }
}

/// Messages from drain threads into the control thread. Drain threads
/// never touch panes directly; they only send these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxEvent {
    /// Bytes read from one of a child's output streams
    Output {
        pane: PaneId,
        generation: u64,
        data: Vec<u8>,
    },
    /// One output stream reached EOF or failed
    Eof { pane: PaneId, generation: u64 },
}

/// Raised from outside the control thread (SIGINT); checked by the run
/// loop and by line-input mode on every poll. Handled like `q`.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
