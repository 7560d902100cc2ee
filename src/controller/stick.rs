//! Two-axis stick state with calibrated fixed positions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Exclusive upper bound of a 12-bit stick axis.
pub const STICK_AXIS_LIMIT: u16 = 0x1000;

// Stick side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickSide {
    Left,
    Right,
}

impl fmt::Display for StickSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StickSide::Left => write!(f, "Left"),
            StickSide::Right => write!(f, "Right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StickError {
    #[error("Stick {axis} value {value} must be in [0, {limit})", limit = STICK_AXIS_LIMIT)]
    OutOfRange { axis: Axis, value: i64 },
}

/// Center and maximum deflection of one stick
///
/// The fixed positions (`up`, `left`, ...) are derived from these values, so two
/// controllers with different calibration report different raw values for the
/// same symbolic direction.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct StickCalibration {
    pub h_center: u16,
    pub v_center: u16,
    pub h_max_above_center: u16,
    pub v_max_above_center: u16,
    pub h_max_below_center: u16,
    pub v_max_below_center: u16,
}

impl Default for StickCalibration {
    fn default() -> Self {
        Self {
            h_center: 2048,
            v_center: 2048,
            h_max_above_center: 1800,
            v_max_above_center: 1800,
            h_max_below_center: 1800,
            v_max_below_center: 1800,
        }
    }
}

impl StickCalibration {
    fn clamp(value: u16) -> u16 {
        value.min(STICK_AXIS_LIMIT - 1)
    }

    pub fn up(&self) -> u16 {
        Self::clamp(self.v_center.saturating_add(self.v_max_above_center))
    }

    pub fn down(&self) -> u16 {
        self.v_center.saturating_sub(self.v_max_below_center)
    }

    pub fn right(&self) -> u16 {
        Self::clamp(self.h_center.saturating_add(self.h_max_above_center))
    }

    pub fn left(&self) -> u16 {
        self.h_center.saturating_sub(self.h_max_below_center)
    }
}

/// Current horizontal/vertical position of one stick
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StickState {
    side: StickSide,
    h: u16,
    v: u16,
    calibration: StickCalibration,
}

impl StickState {
    /// Creates a centered stick.
    pub fn new(side: StickSide, calibration: StickCalibration) -> Self {
        Self {
            side,
            h: Self::clamp_center(calibration.h_center),
            v: Self::clamp_center(calibration.v_center),
            calibration,
        }
    }

    fn clamp_center(value: u16) -> u16 {
        value.min(STICK_AXIS_LIMIT - 1)
    }

    fn check(axis: Axis, value: i64) -> Result<u16, StickError> {
        if (0..i64::from(STICK_AXIS_LIMIT)).contains(&value) {
            Ok(value as u16)
        } else {
            Err(StickError::OutOfRange { axis, value })
        }
    }

    pub fn side(&self) -> StickSide {
        self.side
    }

    pub fn h(&self) -> u16 {
        self.h
    }

    pub fn v(&self) -> u16 {
        self.v
    }

    pub fn set_h(&mut self, value: i64) -> Result<(), StickError> {
        self.h = Self::check(Axis::Horizontal, value)?;
        Ok(())
    }

    pub fn set_v(&mut self, value: i64) -> Result<(), StickError> {
        self.v = Self::check(Axis::Vertical, value)?;
        Ok(())
    }

    pub fn set_center(&mut self) {
        self.release_horizontal();
        self.release_vertical();
    }

    pub fn set_up(&mut self) {
        self.v = self.calibration.up();
    }

    pub fn set_down(&mut self) {
        self.v = self.calibration.down();
    }

    pub fn set_left(&mut self) {
        self.h = self.calibration.left();
    }

    pub fn set_right(&mut self) {
        self.h = self.calibration.right();
    }

    /// Re-centers the horizontal axis, leaving the vertical one untouched.
    pub fn release_horizontal(&mut self) {
        self.h = Self::clamp_center(self.calibration.h_center);
    }

    /// Re-centers the vertical axis, leaving the horizontal one untouched.
    pub fn release_vertical(&mut self) {
        self.v = Self::clamp_center(self.calibration.v_center);
    }
}
