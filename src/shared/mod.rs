// Pane and process model, independent of any display

pub mod config;
pub mod events;
pub mod layout;
pub mod pane;
pub mod process;
pub mod terminal;

// Re-export commonly used types
pub use config::{Config, PaneConfig};
pub use events::{InterruptFlag, MuxEvent, PaneId};
pub use layout::{LayoutPolicy, PaneRect};
pub use pane::{Pane, PaneLimits};
pub use process::{PaneSize, ProcessBackend, ProcessHandle, SpawnError, Spawned, Spawner};
pub use terminal::PaneScreen;
