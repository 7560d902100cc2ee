//! `stick <side> <direction> [value]`

use crate::controller::{ControllerState, StickSide, StickState};
use crate::shell::registry::CommandError;

pub fn resolve_side(side: &str) -> Result<StickSide, CommandError> {
    match side {
        "l" | "left" => Ok(StickSide::Left),
        "r" | "right" => Ok(StickSide::Right),
        _ => Err(CommandError::InvalidArgument(
            "Value of side must be \"l\", \"left\" or \"r\", \"right\"".to_string(),
        )),
    }
}

fn parse_value(value: Option<&str>) -> Result<i64, CommandError> {
    let value = value.ok_or(CommandError::MissingValue)?;
    value
        .parse::<i64>()
        .map_err(|_| CommandError::InvalidValue(format!("Unexpected stick value \"{}\"", value)))
}

/// Applies a symbolic direction or raw axis value to `stick`.
///
/// Returns a confirmation with the position read back from the stick.
pub fn set_stick(
    stick: &mut StickState,
    direction: &str,
    value: Option<&str>,
) -> Result<String, CommandError> {
    match direction {
        "center" => stick.set_center(),
        "up" => stick.set_up(),
        "down" => stick.set_down(),
        "left" => stick.set_left(),
        "right" => stick.set_right(),
        "h" | "horizontal" => {
            let value = parse_value(value)?;
            stick
                .set_h(value)
                .map_err(|e| CommandError::InvalidValue(e.to_string()))?;
        }
        "v" | "vertical" => {
            let value = parse_value(value)?;
            stick
                .set_v(value)
                .map_err(|e| CommandError::InvalidValue(e.to_string()))?;
        }
        _ => {
            return Err(CommandError::InvalidArgument(format!(
                "Unexpected argument \"{}\"",
                direction
            )))
        }
    }

    Ok(format!(
        "{} stick was set to ({}, {}).",
        stick.side(),
        stick.h(),
        stick.v()
    ))
}

/// Runs the `stick` built-in and flushes the new position.
pub async fn stick_command(
    controller: &mut ControllerState,
    args: &[String],
) -> Result<Option<String>, CommandError> {
    let (side, direction, value) = match args {
        [side, direction] => (side, direction, None),
        [side, direction, value] => (side, direction, Some(value.as_str())),
        _ => {
            return Err(CommandError::InvalidArgument(
                "Usage: stick <side> <direction> [value]".to_string(),
            ))
        }
    };

    let side = resolve_side(side)?;
    let confirmation = set_stick(controller.stick_mut(side), direction, value)?;
    controller.send().await?;
    Ok(Some(confirmation))
}
