//! Translation of raw key events into controller actions.
//!
//! [`KeyMap`] fixes which key code does what, [`KeyEventMapper`] applies one
//! event to the controller and [`KeyEventLoop`] drives the mapper from a live
//! event stream while flushing the controller state on a fixed cadence.

pub mod error;
pub mod event_loop;
pub mod key_mapper;
pub mod mapping_types;

// Re-exports
pub use error::MappingError;
pub use event_loop::{EventBatch, FlushOutcome, KeyEventLoop, LoopExit, LoopSettings};
pub use key_mapper::KeyEventMapper;
pub use mapping_types::{KeyAction, KeyBinding, KeyMap, StickDirection};
