use super::{InputError, KeySource, RawInputEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Owns a running key source
///
/// The source is moved onto a blocking task that forwards its events into a
/// bounded channel. Dropping the handle cancels the task. A `fetch` that is
/// already blocked cannot be interrupted, so the source (and the device it
/// holds open) is released when that read returns, at the latest with the
/// next input event.
pub struct CollectorHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    // Spawn the collector on the blocking pool and return the event receiver
    pub fn spawn<S: KeySource>(
        source: S,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<RawInputEvent>) {
        info!("Spawning key collector for {}", source.describe());

        let (sender, receiver) = mpsc::channel(capacity);
        debug!("Created event channel with buffer capacity {}", capacity);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || run_collection_loop(source, sender, token));

        (
            Self {
                cancel,
                task: Some(task),
            },
            receiver,
        )
    }

    /// Cancels the collector and waits for it to release its source.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Key collector task failed: {}", e);
            }
        }
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn run_collection_loop<S: KeySource>(
    mut source: S,
    sender: mpsc::Sender<RawInputEvent>,
    cancel: CancellationToken,
) {
    info!("Starting key collector loop");
    let mut forwarded: u64 = 0;

    while !cancel.is_cancelled() {
        match source.fetch() {
            Ok(events) => {
                for event in events {
                    debug!(
                        "Captured event: {:?} code={} value={} at {}",
                        event.kind,
                        event.code,
                        event.value,
                        event.timestamp.format("%H:%M:%S.%3f")
                    );
                    if sender.blocking_send(event).is_err() {
                        info!("Event receiver dropped, stopping key collector");
                        return;
                    }
                    forwarded += 1;
                }
            }
            Err(InputError::Closed) => {
                info!("Input source closed after {} events", forwarded);
                return;
            }
            Err(e) => {
                error!("Failed to read input events: {}", e);
                return;
            }
        }
    }
    info!("Key collector cancelled after {} events", forwarded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedSource;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Source whose reads block for a while and that flags when it is dropped
    struct SlowSource {
        released: Arc<AtomicBool>,
    }

    impl KeySource for SlowSource {
        fn fetch(&mut self) -> Result<Vec<RawInputEvent>, InputError> {
            std::thread::sleep(Duration::from_millis(20));
            Ok(vec![])
        }

        fn describe(&self) -> String {
            "slow source".to_string()
        }
    }

    impl Drop for SlowSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn forwards_every_event_then_closes() {
        let source = ScriptedSource::new(vec![
            vec![RawInputEvent::key(36, 1), RawInputEvent::key(36, 0)],
            vec![RawInputEvent::key(17, 1)],
        ]);
        let (handle, mut receiver) = CollectorHandle::spawn(source, 8);

        let mut codes = Vec::new();
        while let Some(event) = receiver.recv().await {
            codes.push((event.code, event.value));
        }
        assert_eq!(codes, vec![(36, 1), (36, 0), (17, 1)]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn stops_when_receiver_is_dropped() {
        let batches = (0..64).map(|_| vec![RawInputEvent::key(36, 1)]).collect();
        let (handle, receiver) = CollectorHandle::spawn(ScriptedSource::new(batches), 1);
        drop(receiver);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_the_handle_releases_the_source_after_the_pending_read() {
        let released = Arc::new(AtomicBool::new(false));
        let source = SlowSource {
            released: released.clone(),
        };
        let (handle, _receiver) = CollectorHandle::spawn(source, 4);
        tokio::time::sleep(Duration::from_millis(5)).await;

        drop(handle);
        for _ in 0..100 {
            if released.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_waits_until_the_source_is_released() {
        let released = Arc::new(AtomicBool::new(false));
        let source = SlowSource {
            released: released.clone(),
        };
        let (handle, _receiver) = CollectorHandle::spawn(source, 4);

        handle.shutdown().await;
        assert!(released.load(Ordering::SeqCst));
    }
}
