use super::{EventKind, InputError, KeySource, RawInputEvent};
use std::path::{Path, PathBuf};
use tracing::info;

/// Key events read from a Linux evdev node such as `/dev/input/event1`
pub struct EvdevSource {
    device: evdev::Device,
    path: PathBuf,
}

impl EvdevSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref().to_path_buf();
        let device = evdev::Device::open(&path)
            .map_err(|e| InputError::Device(format!("{}: {}", path.display(), e)))?;
        info!(
            "Opened input device {} ({})",
            path.display(),
            device.name().unwrap_or("unnamed")
        );
        Ok(Self { device, path })
    }
}

impl KeySource for EvdevSource {
    fn fetch(&mut self) -> Result<Vec<RawInputEvent>, InputError> {
        let events = self
            .device
            .fetch_events()?
            .map(|event| {
                RawInputEvent::new(
                    EventKind::from_raw(event.event_type().0),
                    event.code(),
                    event.value(),
                )
            })
            .collect();
        Ok(events)
    }

    fn describe(&self) -> String {
        format!(
            "device {}, name \"{}\"",
            self.path.display(),
            self.device.name().unwrap_or("unnamed")
        )
    }
}
