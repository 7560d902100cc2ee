use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// Button type
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Y,
    X,
    B,
    A,
    R,
    Zr,
    Minus,
    Plus,
    RStick,
    LStick,
    Home,
    Capture,
    Down,
    Up,
    Right,
    Left,
    L,
    Zl,
}

impl Button {
    pub const ALL: [Button; 18] = [
        Button::Y,
        Button::X,
        Button::B,
        Button::A,
        Button::R,
        Button::Zr,
        Button::Minus,
        Button::Plus,
        Button::RStick,
        Button::LStick,
        Button::Home,
        Button::Capture,
        Button::Down,
        Button::Up,
        Button::Right,
        Button::Left,
        Button::L,
        Button::Zl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Y => "y",
            Button::X => "x",
            Button::B => "b",
            Button::A => "a",
            Button::R => "r",
            Button::Zr => "zr",
            Button::Minus => "minus",
            Button::Plus => "plus",
            Button::RStick => "r_stick",
            Button::LStick => "l_stick",
            Button::Home => "home",
            Button::Capture => "capture",
            Button::Down => "down",
            Button::Up => "up",
            Button::Right => "right",
            Button::Left => "left",
            Button::L => "l",
            Button::Zl => "zl",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Button::ALL
            .iter()
            .find(|button| button.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// Pressed/released state of every button the controller exposes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    pressed: BTreeSet<Button>,
}

impl ButtonState {
    pub fn get_available_buttons(&self) -> &'static [Button] {
        &Button::ALL
    }

    pub fn is_available(&self, button: Button) -> bool {
        self.get_available_buttons().contains(&button)
    }

    pub fn set_button(&mut self, button: Button, pushed: bool) {
        if pushed {
            self.pressed.insert(button);
        } else {
            self.pressed.remove(&button);
        }
    }

    pub fn get_button(&self, button: Button) -> bool {
        self.pressed.contains(&button)
    }

    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        self.pressed.iter().copied()
    }
}
