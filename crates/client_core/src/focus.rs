use shared::domain::MediaItem;
use tokio::sync::broadcast::{self, error::TryRecvError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    ArrowLeft,
    ArrowRight,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The dimmed area around the enlarged item.
    Backdrop,
    Content,
}

/// Process-wide key event source. Listeners only see presses made while they
/// are attached.
#[derive(Debug, Clone)]
pub struct KeyboardHub {
    tx: broadcast::Sender<Key>,
}

impl Default for KeyboardHub {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Returns how many listeners received the press.
    pub fn press(&self, key: Key) -> usize {
        self.tx.send(key).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn attach(&self) -> EscapeListener {
        EscapeListener {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug)]
struct EscapeListener {
    rx: broadcast::Receiver<Key>,
}

impl EscapeListener {
    fn escape_pressed(&mut self) -> bool {
        let mut seen = false;
        loop {
            match self.rx.try_recv() {
                Ok(Key::Escape) => seen = true,
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return seen,
            }
        }
    }
}

/// Lightbox state: closed, or open on exactly one item.
#[derive(Debug)]
pub struct FocusController {
    hub: KeyboardHub,
    selected: Option<MediaItem>,
    listener: Option<EscapeListener>,
}

impl FocusController {
    pub fn new(hub: &KeyboardHub) -> Self {
        Self {
            hub: hub.clone(),
            selected: None,
            listener: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected(&self) -> Option<&MediaItem> {
        self.selected.as_ref()
    }

    pub fn open(&mut self, item: MediaItem) {
        if self.listener.is_none() {
            self.listener = Some(self.hub.attach());
        }
        self.selected = Some(item);
    }

    /// Returns whether anything was open.
    pub fn close(&mut self) -> bool {
        self.listener = None;
        self.selected.take().is_some()
    }

    pub fn pointer(&mut self, target: PointerTarget) -> bool {
        match target {
            PointerTarget::Backdrop if self.is_open() => self.close(),
            _ => false,
        }
    }

    /// Consumes pending key presses; closes on escape.
    pub fn pump(&mut self) -> bool {
        let escaped = self
            .listener
            .as_mut()
            .is_some_and(EscapeListener::escape_pressed);
        escaped && self.close()
    }
}

#[cfg(test)]
#[path = "tests/focus_tests.rs"]
mod tests;
