//! Translation of single key events into controller edges

use crate::controller::{ControllerError, ControllerState};
use crate::input::PressState;
use crate::mapping::mapping_types::{KeyAction, KeyMap, StickDirection};
use tracing::debug;

/// Stateless translator from `(code, value)` pairs to controller mutations
///
/// Everything it changes lives in the [`ControllerState`]; the mapper itself
/// only holds the immutable [`KeyMap`].
#[derive(Clone, Debug, Default)]
pub struct KeyEventMapper {
    key_map: KeyMap,
}

impl KeyEventMapper {
    pub fn new(key_map: KeyMap) -> Self {
        Self { key_map }
    }

    /// Applies one key event to the controller.
    ///
    /// Connects first (no-op when already connected). Button codes produce a
    /// press or release edge, each flushed by the controller; stick codes move
    /// or re-center one axis and flush once. Held, unknown press values and
    /// unmapped codes change nothing.
    pub async fn handle(
        &self,
        controller: &mut ControllerState,
        code: u16,
        value: i32,
    ) -> Result<(), ControllerError> {
        controller.connect().await?;

        let Some(press) = PressState::from_value(value) else {
            debug!("Ignoring key {} with unknown press value {}", code, value);
            return Ok(());
        };
        let Some(action) = self.key_map.get(code).copied() else {
            debug!("Key {} is not mapped", code);
            return Ok(());
        };

        match (press, action) {
            (PressState::Held, _) => Ok(()),
            (PressState::Pressed, KeyAction::Button { button }) => {
                controller.button_press(button).await
            }
            (PressState::Released, KeyAction::Button { button }) => {
                controller.button_release(button).await
            }
            (PressState::Pressed, KeyAction::Stick { side, direction }) => {
                let stick = controller.stick_mut(side);
                match direction {
                    StickDirection::Up => stick.set_up(),
                    StickDirection::Down => stick.set_down(),
                    StickDirection::Left => stick.set_left(),
                    StickDirection::Right => stick.set_right(),
                }
                debug!("{} stick moved {:?}", side, direction);
                controller.send().await
            }
            (PressState::Released, KeyAction::Stick { side, direction }) => {
                let stick = controller.stick_mut(side);
                match direction {
                    StickDirection::Up | StickDirection::Down => stick.release_vertical(),
                    StickDirection::Left | StickDirection::Right => stick.release_horizontal(),
                }
                debug!("{} stick released {:?}", side, direction);
                controller.send().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Button, ChannelTransport, ControllerSnapshot, StickSide};
    use tokio::sync::mpsc;

    fn controller() -> (ControllerState, mpsc::Receiver<ControllerSnapshot>) {
        let (transport, receiver) = ChannelTransport::new(32);
        (ControllerState::with_transport(Box::new(transport)), receiver)
    }

    fn idle() -> ControllerSnapshot {
        ControllerSnapshot {
            pressed: Vec::new(),
            left_stick: (2048, 2048),
            right_stick: (2048, 2048),
        }
    }

    fn drain(receiver: &mut mpsc::Receiver<ControllerSnapshot>) -> Vec<ControllerSnapshot> {
        let mut snapshots = Vec::new();
        while let Ok(snapshot) = receiver.try_recv() {
            snapshots.push(snapshot);
        }
        snapshots
    }

    #[tokio::test]
    async fn handle_connects_before_anything_else() {
        let (mut controller, _receiver) = controller();
        let mapper = KeyEventMapper::default();

        mapper.handle(&mut controller, 999, 1).await.unwrap();
        assert!(controller.is_connected());
    }

    #[tokio::test]
    async fn button_press_then_release_gives_two_edges() {
        let (mut controller, mut receiver) = controller();
        let mapper = KeyEventMapper::default();

        mapper.handle(&mut controller, 36, 1).await.unwrap();
        mapper.handle(&mut controller, 36, 0).await.unwrap();

        let snapshots = drain(&mut receiver);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].pressed, vec![Button::A]);
        assert!(snapshots[1].pressed.is_empty());
        assert_eq!(snapshots[1], idle());
    }

    #[tokio::test]
    async fn stick_press_and_release_touch_one_axis() {
        let (mut controller, mut receiver) = controller();
        let mapper = KeyEventMapper::default();
        controller.stick_mut(StickSide::Left).set_h(1000).unwrap();
        let before = controller.stick(StickSide::Left).v();

        // w: left stick up
        mapper.handle(&mut controller, 17, 1).await.unwrap();
        assert_eq!(drain(&mut receiver).len(), 1);
        assert_eq!(controller.stick(StickSide::Left).v(), 3848);
        assert_eq!(controller.stick(StickSide::Left).h(), 1000);

        mapper.handle(&mut controller, 17, 0).await.unwrap();
        let snapshots = drain(&mut receiver);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].left_stick, (1000, before));
    }

    #[tokio::test]
    async fn horizontal_release_keeps_vertical_deflection() {
        let (mut controller, mut receiver) = controller();
        let mapper = KeyEventMapper::default();

        // s then d held together, then d released
        mapper.handle(&mut controller, 31, 1).await.unwrap();
        mapper.handle(&mut controller, 32, 1).await.unwrap();
        mapper.handle(&mut controller, 32, 0).await.unwrap();

        let snapshots = drain(&mut receiver);
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[1].left_stick, (3848, 248));
        assert_eq!(snapshots[2].left_stick, (2048, 248));
    }

    #[tokio::test]
    async fn held_and_unmapped_keys_are_no_ops() {
        let (mut controller, mut receiver) = controller();
        let mapper = KeyEventMapper::default();

        mapper.handle(&mut controller, 36, 2).await.unwrap();
        mapper.handle(&mut controller, 17, 2).await.unwrap();
        mapper.handle(&mut controller, 36, 5).await.unwrap();
        mapper.handle(&mut controller, 200, 1).await.unwrap();

        assert!(drain(&mut receiver).is_empty());
        assert_eq!(controller.snapshot(), idle());
    }

    #[tokio::test]
    async fn lost_connection_surfaces_as_not_connected() {
        let (mut controller, receiver) = controller();
        let mapper = KeyEventMapper::default();
        controller.connect().await.unwrap();
        drop(receiver);

        let result = mapper.handle(&mut controller, 36, 1).await;
        assert!(matches!(result, Err(ControllerError::NotConnected)));
    }
}
