// Terminal front end: key model, display surface and the multiplexer itself

pub mod action;
pub mod guard;
pub mod input;
pub mod multiplexer;
pub mod surface;
pub mod ui;

// Re-export commonly used types
pub use action::{Action, KeyMap};
pub use guard::TerminalGuard;
pub use input::Key;
pub use multiplexer::{
    Delivery, DiscardReason, Flow, Multiplexer, MuxError, Pumped, EVENT_QUEUE_DEPTH,
    MAX_EVENTS_PER_PUMP,
};
pub use surface::{LineInput, RenderSurface, TerminalSurface};
