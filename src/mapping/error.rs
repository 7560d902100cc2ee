//! Errors of the key mapping layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// Two bindings claim the same key code
    #[error("Key code {0} is bound more than once")]
    DuplicateKeyCode(u16),

    /// A binding names a button the controller does not expose
    #[error("Key code {code} is bound to unavailable button \"{button}\"")]
    UnavailableButton { code: u16, button: String },

    #[error("Key map is empty")]
    EmptyKeyMap,
}
