use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// One unit of keyboard input as the multiplexer sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    /// Ctrl + ASCII character other than `c`
    Ctrl(char),
    /// Ctrl-C; the terminal is raw so SIGINT arrives as a key
    Interrupt,
    Tab,
    Enter,
    Backspace,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Shift-Tab
    BackTab,
    F(u8),
    /// The terminal changed size
    Resize,
}

impl Key {
    /// Translate a crossterm event; `None` for events we do not route
    pub fn from_event(event: &Event) -> Option<Key> {
        match event {
            Event::Key(key) => Self::from_key_event(key),
            Event::Resize(_, _) => Some(Key::Resize),
            _ => None,
        }
    }

    fn from_key_event(key: &KeyEvent) -> Option<Key> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        Some(match key.code {
            KeyCode::Char('c') if ctrl => Key::Interrupt,
            KeyCode::Char(c) if ctrl && c.is_ascii() => Key::Ctrl(c.to_ascii_lowercase()),
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Tab => Key::Tab,
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Esc => Key::Esc,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Insert => Key::Insert,
            KeyCode::Delete => Key::Delete,
            KeyCode::BackTab => Key::BackTab,
            KeyCode::F(n) => Key::F(n),
            _ => return None,
        })
    }

    /// Bytes a child process expects for this key
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Key::Ctrl(c) if c.is_ascii() => vec![(*c as u8) & 0x1f],
            Key::Char(c) | Key::Ctrl(c) => {
                let mut b = [0; 4];
                c.encode_utf8(&mut b).as_bytes().to_vec()
            }
            Key::Interrupt => vec![3],
            Key::Tab => vec![b'\t'],
            Key::Enter => vec![b'\n'],
            Key::Backspace => vec![0x7f],
            Key::Esc => vec![27],
            Key::Up => vec![27, 91, 65],
            Key::Down => vec![27, 91, 66],
            Key::Right => vec![27, 91, 67],
            Key::Left => vec![27, 91, 68],
            Key::Home => b"\x1b[H".to_vec(),
            Key::End => b"\x1b[F".to_vec(),
            Key::PageUp => b"\x1b[5~".to_vec(),
            Key::PageDown => b"\x1b[6~".to_vec(),
            Key::Insert => b"\x1b[2~".to_vec(),
            Key::Delete => b"\x1b[3~".to_vec(),
            Key::BackTab => b"\x1b[Z".to_vec(),
            Key::F(n) => function_key_bytes(*n),
            Key::Resize => vec![],
        }
    }
}

/// xterm encoding: SS3 for F1-F4, CSI `n~` above that
fn function_key_bytes(n: u8) -> Vec<u8> {
    let code = match n {
        1..=4 => return vec![27, b'O', b'P' + (n - 1)],
        5 => 15,
        6..=10 => n + 11,
        11..=12 => n + 12,
        _ => return vec![],
    };
    format!("\x1b[{}~", code).into_bytes()
}
