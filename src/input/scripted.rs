use super::{InputError, KeySource, RawInputEvent};
use std::collections::VecDeque;

/// Source that replays fixed batches of events, then reports itself closed
#[derive(Debug, Default)]
pub struct ScriptedSource {
    batches: VecDeque<Vec<RawInputEvent>>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<RawInputEvent>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }

    /// One batch per `(code, value)` key event.
    pub fn from_keys(keys: &[(u16, i32)]) -> Self {
        Self::new(
            keys.iter()
                .map(|&(code, value)| vec![RawInputEvent::key(code, value)])
                .collect(),
        )
    }
}

impl KeySource for ScriptedSource {
    fn fetch(&mut self) -> Result<Vec<RawInputEvent>, InputError> {
        self.batches.pop_front().ok_or(InputError::Closed)
    }

    fn describe(&self) -> String {
        format!("scripted source ({} batches left)", self.batches.len())
    }
}
