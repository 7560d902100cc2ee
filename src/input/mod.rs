//! Raw key events and the sources that produce them
//!
//! ```text
//! KeySource ──► CollectorHandle ──► mpsc::Receiver<RawInputEvent> ──► KeyEventLoop
//! (blocking)    (spawn_blocking)     (bounded)
//! ```

pub mod collector;
#[cfg(feature = "evdev")]
pub mod evdev_source;
pub mod scripted;

pub use collector::CollectorHandle;
#[cfg(feature = "evdev")]
pub use evdev_source::EvdevSource;
pub use scripted::ScriptedSource;

use chrono::{DateTime, Local};

/// Linux input event type for key events (`EV_KEY`)
pub const EV_KEY: u16 = 0x01;
/// Linux input event type for synchronization markers (`EV_SYN`)
pub const EV_SYN: u16 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Key,
    Sync,
    Other(u16),
}

impl EventKind {
    pub fn from_raw(kind: u16) -> Self {
        match kind {
            EV_KEY => EventKind::Key,
            EV_SYN => EventKind::Sync,
            other => EventKind::Other(other),
        }
    }
}

/// Press-state value carried by a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressState {
    Released,
    Pressed,
    // Auto-repeat; the mapper ignores it
    Held,
}

impl PressState {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(PressState::Released),
            1 => Some(PressState::Pressed),
            2 => Some(PressState::Held),
            _ => None,
        }
    }
}

// Raw input event with chrono timestamp
#[derive(Debug, Clone)]
pub struct RawInputEvent {
    pub kind: EventKind,
    pub code: u16,
    pub value: i32,
    pub timestamp: DateTime<Local>,
}

impl RawInputEvent {
    pub fn new(kind: EventKind, code: u16, value: i32) -> Self {
        Self {
            kind,
            code,
            value,
            timestamp: Local::now(),
        }
    }

    pub fn key(code: u16, value: i32) -> Self {
        Self::new(EventKind::Key, code, value)
    }

    pub fn is_key(&self) -> bool {
        self.kind == EventKind::Key
    }
}

// Input errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input source is closed")]
    Closed,

    #[error("Input device error: {0}")]
    Device(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Blocking producer of raw input events
///
/// `fetch` blocks until at least one event is available and returns everything
/// read in that call. Returning [`InputError::Closed`] ends the stream. The
/// source is dropped, and the underlying device released, when the collector
/// task that owns it finishes.
pub trait KeySource: Send + 'static {
    fn fetch(&mut self) -> Result<Vec<RawInputEvent>, InputError>;

    fn describe(&self) -> String {
        "input source".to_string()
    }
}

impl<S: KeySource + ?Sized> KeySource for Box<S> {
    fn fetch(&mut self) -> Result<Vec<RawInputEvent>, InputError> {
        (**self).fetch()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_values() {
        assert_eq!(PressState::from_value(0), Some(PressState::Released));
        assert_eq!(PressState::from_value(1), Some(PressState::Pressed));
        assert_eq!(PressState::from_value(2), Some(PressState::Held));
        assert_eq!(PressState::from_value(7), None);
    }

    #[test]
    fn event_kinds() {
        assert_eq!(EventKind::from_raw(1), EventKind::Key);
        assert_eq!(EventKind::from_raw(0), EventKind::Sync);
        assert_eq!(EventKind::from_raw(4), EventKind::Other(4));
        assert!(RawInputEvent::key(36, 1).is_key());
        assert!(!RawInputEvent::new(EventKind::Sync, 0, 0).is_key());
    }
}
