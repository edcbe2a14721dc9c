use std::collections::HashMap;

use super::input::Key;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Quit,
    NextPane,
    Redraw,
    CommandLine,
    /// Send the key to the active pane
    Forward,
}

/// Keys with a multiplexer meaning; everything else is forwarded
pub struct KeyMap {
    bindings: HashMap<Key, Action>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(Key::Char('q'), Action::Quit);
        bindings.insert(Key::Interrupt, Action::Quit);
        bindings.insert(Key::Tab, Action::NextPane);
        bindings.insert(Key::Resize, Action::Redraw);
        bindings.insert(Key::Char(':'), Action::CommandLine);
        Self { bindings }
    }
}

impl KeyMap {
    pub fn action(&self, key: Key) -> Action {
        self.bindings.get(&key).copied().unwrap_or(Action::Forward)
    }

    pub fn bind(&mut self, key: Key, action: Action) {
        self.bindings.insert(key, action);
    }
}
