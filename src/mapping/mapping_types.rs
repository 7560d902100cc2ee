//! Key code → action table

use crate::controller::{Button, ButtonState, StickSide};
use crate::mapping::MappingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickDirection {
    Up,
    Down,
    Left,
    Right,
}

/// What a key does on the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyAction {
    /// Press/release edge of a named button
    Button { button: Button },
    /// One direction of one stick; release re-centers only that axis
    Stick {
        side: StickSide,
        direction: StickDirection,
    },
}

/// One `[[key_map]]` entry of the configuration file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub code: u16,
    pub action: KeyAction,
}

/// Immutable lookup from Linux key code to [`KeyAction`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMap {
    actions: HashMap<u16, KeyAction>,
}

macro_rules! bind_button {
    ($map:expr, $code:expr, $button:expr) => {
        $map.insert($code, KeyAction::Button { button: $button });
    };
}

macro_rules! bind_stick {
    ($map:expr, $code:expr, $side:expr, $direction:expr) => {
        $map.insert(
            $code,
            KeyAction::Stick {
                side: $side,
                direction: $direction,
            },
        );
    };
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::default_config()
    }
}

impl KeyMap {
    /// Keyboard layout: `j k i l u o t y p` for buttons, `w a s d` for the left stick
    pub fn default_config() -> Self {
        let mut actions = HashMap::new();
        bind_button!(actions, 36, Button::A); // j
        bind_button!(actions, 37, Button::B); // k
        bind_button!(actions, 23, Button::X); // i
        bind_button!(actions, 38, Button::Y); // l
        bind_button!(actions, 22, Button::L); // u
        bind_button!(actions, 24, Button::R); // o
        bind_button!(actions, 20, Button::Plus); // t
        bind_button!(actions, 21, Button::Minus); // y
        bind_button!(actions, 25, Button::Home); // p

        bind_stick!(actions, 17, StickSide::Left, StickDirection::Up); // w
        bind_stick!(actions, 30, StickSide::Left, StickDirection::Left); // a
        bind_stick!(actions, 31, StickSide::Left, StickDirection::Down); // s
        bind_stick!(actions, 32, StickSide::Left, StickDirection::Right); // d

        Self { actions }
    }

    /// Builds a table from configured bindings, rejecting duplicate codes and
    /// buttons the controller does not expose.
    pub fn from_bindings(bindings: &[KeyBinding]) -> Result<Self, MappingError> {
        let buttons = ButtonState::default();
        let mut actions = HashMap::with_capacity(bindings.len());
        for binding in bindings {
            if let KeyAction::Button { button } = binding.action {
                if !buttons.is_available(button) {
                    return Err(MappingError::UnavailableButton {
                        code: binding.code,
                        button: button.to_string(),
                    });
                }
            }
            if actions.insert(binding.code, binding.action).is_some() {
                return Err(MappingError::DuplicateKeyCode(binding.code));
            }
        }
        let map = Self { actions };
        if map.is_empty() {
            return Err(MappingError::EmptyKeyMap);
        }
        Ok(map)
    }

    pub fn get(&self, code: u16) -> Option<&KeyAction> {
        self.actions.get(&code)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Bindings sorted by key code.
    pub fn bindings(&self) -> Vec<KeyBinding> {
        let mut bindings: Vec<KeyBinding> = self
            .actions
            .iter()
            .map(|(code, action)| KeyBinding {
                code: *code,
                action: *action,
            })
            .collect();
        bindings.sort_by_key(|binding| binding.code);
        bindings
    }
}
