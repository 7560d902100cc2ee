//! Controller model the shell and the key mapper write into
//!
//! Holds the button set and both sticks, and flushes a snapshot of them through
//! a pluggable [`Transport`]:
//!
//! ```text
//! Shell / KeyEventMapper ──► ControllerState ──► Transport ──► remote
//!                            (buttons, sticks)   (send)
//! ```
//!
//! Report encoding and pairing live behind the transport; this module only
//! knows which buttons are pressed and where the sticks point.

pub mod button;
pub mod stick;
pub mod transport;

pub use button::{Button, ButtonState};
pub use stick::{Axis, StickCalibration, StickError, StickSide, StickState};
pub use transport::{ChannelTransport, LogTransport, Transport};

use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Errors raised by the controller or its transport
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The transport is down; flushing is impossible until it reconnects
    #[error("Controller is not connected")]
    NotConnected,

    #[error("Unknown button \"{0}\"")]
    UnknownButton(String),

    #[error(transparent)]
    Stick(#[from] StickError),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Copy of the controller state handed to the transport on every flush
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub pressed: Vec<Button>,
    pub left_stick: (u16, u16),
    pub right_stick: (u16, u16),
}

impl fmt::Display for ControllerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pressed: Vec<&str> = self.pressed.iter().map(Button::as_str).collect();
        write!(
            f,
            "L:({},{}) R:({},{}) Buttons:[{}]",
            self.left_stick.0,
            self.left_stick.1,
            self.right_stick.0,
            self.right_stick.1,
            pressed.join(",")
        )
    }
}

pub struct ControllerState {
    button_state: ButtonState,
    l_stick_state: StickState,
    r_stick_state: StickState,
    transport: Box<dyn Transport>,
}

impl ControllerState {
    pub fn new(
        transport: Box<dyn Transport>,
        left: StickCalibration,
        right: StickCalibration,
    ) -> Self {
        Self {
            button_state: ButtonState::default(),
            l_stick_state: StickState::new(StickSide::Left, left),
            r_stick_state: StickState::new(StickSide::Right, right),
            transport,
        }
    }

    /// Controller with default calibration on both sticks.
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self::new(
            transport,
            StickCalibration::default(),
            StickCalibration::default(),
        )
    }

    pub fn button_state(&self) -> &ButtonState {
        &self.button_state
    }

    pub fn stick(&self, side: StickSide) -> &StickState {
        match side {
            StickSide::Left => &self.l_stick_state,
            StickSide::Right => &self.r_stick_state,
        }
    }

    pub fn stick_mut(&mut self, side: StickSide) -> &mut StickState {
        match side {
            StickSide::Left => &mut self.l_stick_state,
            StickSide::Right => &mut self.r_stick_state,
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            pressed: self.button_state.pressed().collect(),
            left_stick: (self.l_stick_state.h(), self.l_stick_state.v()),
            right_stick: (self.r_stick_state.h(), self.r_stick_state.v()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connects the transport unless it already is.
    pub async fn connect(&mut self) -> Result<(), ControllerError> {
        if self.transport.is_connected() {
            return Ok(());
        }
        info!("Connecting controller transport");
        self.transport.connect().await
    }

    /// Flushes the current state through the transport.
    pub async fn send(&mut self) -> Result<(), ControllerError> {
        let snapshot = self.snapshot();
        debug!("Flushing controller state: {}", snapshot);
        self.transport.send(&snapshot).await
    }

    fn check_available(&self, button: Button) -> Result<(), ControllerError> {
        if self.button_state.is_available(button) {
            Ok(())
        } else {
            Err(ControllerError::UnknownButton(button.to_string()))
        }
    }

    /// Sets every given button to `pushed` and flushes once.
    pub async fn set_buttons(
        &mut self,
        buttons: &[Button],
        pushed: bool,
    ) -> Result<(), ControllerError> {
        for button in buttons {
            self.check_available(*button)?;
        }
        for button in buttons {
            self.button_state.set_button(*button, pushed);
        }
        self.send().await
    }

    pub async fn button_press(&mut self, button: Button) -> Result<(), ControllerError> {
        debug!("Button press edge: {}", button);
        self.set_buttons(&[button], true).await
    }

    pub async fn button_release(&mut self, button: Button) -> Result<(), ControllerError> {
        debug!("Button release edge: {}", button);
        self.set_buttons(&[button], false).await
    }

    /// Presses, holds for `hold` and releases a button, flushing both edges.
    pub async fn button_push(
        &mut self,
        button: Button,
        hold: Duration,
    ) -> Result<(), ControllerError> {
        self.button_press(button).await?;
        tokio::time::sleep(hold).await;
        self.button_release(button).await
    }
}
