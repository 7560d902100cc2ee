//! Outbound side of the controller: where flushed snapshots go.

use super::{ControllerError, ControllerSnapshot};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Connection the controller state is flushed through
///
/// Implementations own the pairing lifecycle. `send` must fail with
/// [`ControllerError::NotConnected`] once the remote side is gone; the device
/// loop treats that error as the end of the session.
#[async_trait]
pub trait Transport: Send {
    /// Establishes the connection. Calling it on a connected transport is a no-op.
    async fn connect(&mut self) -> Result<(), ControllerError>;

    fn is_connected(&self) -> bool;

    async fn send(&mut self, snapshot: &ControllerSnapshot) -> Result<(), ControllerError>;
}

/// Transport that forwards every snapshot into a bounded tokio channel
///
/// The connection counts as lost as soon as the receiving half is dropped.
pub struct ChannelTransport {
    sender: mpsc::Sender<ControllerSnapshot>,
    connected: bool,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ControllerSnapshot>) {
        let (sender, receiver) = mpsc::channel(capacity);
        debug!("Created snapshot channel with buffer capacity {}", capacity);
        (
            Self {
                sender,
                connected: false,
            },
            receiver,
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&mut self) -> Result<(), ControllerError> {
        if self.connected {
            return Ok(());
        }
        if self.sender.is_closed() {
            warn!("Snapshot receiver is gone, cannot connect");
            return Err(ControllerError::NotConnected);
        }
        self.connected = true;
        info!("Channel transport connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected && !self.sender.is_closed()
    }

    async fn send(&mut self, snapshot: &ControllerSnapshot) -> Result<(), ControllerError> {
        if !self.connected {
            return Err(ControllerError::NotConnected);
        }
        if self.sender.send(snapshot.clone()).await.is_err() {
            self.connected = false;
            return Err(ControllerError::NotConnected);
        }
        Ok(())
    }
}

/// Transport that only traces what would have been sent
#[derive(Debug, Default)]
pub struct LogTransport {
    connected: bool,
    sent: u64,
}

impl LogTransport {
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn connect(&mut self) -> Result<(), ControllerError> {
        if !self.connected {
            info!("Log transport connected");
            self.connected = true;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, snapshot: &ControllerSnapshot) -> Result<(), ControllerError> {
        if !self.connected {
            return Err(ControllerError::NotConnected);
        }
        self.sent += 1;
        debug!("Sending controller state #{}: {}", self.sent, snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_transport_requires_connect() {
        let (mut transport, mut receiver) = ChannelTransport::new(4);
        let snapshot = ControllerSnapshot::default();

        assert!(matches!(
            transport.send(&snapshot).await,
            Err(ControllerError::NotConnected)
        ));

        transport.connect().await.unwrap();
        transport.connect().await.unwrap();
        transport.send(&snapshot).await.unwrap();
        assert_eq!(receiver.recv().await, Some(snapshot));
    }

    #[tokio::test]
    async fn dropped_receiver_means_connection_lost() {
        let (mut transport, receiver) = ChannelTransport::new(4);
        transport.connect().await.unwrap();
        drop(receiver);

        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(&ControllerSnapshot::default()).await,
            Err(ControllerError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn log_transport_counts_sends() {
        let mut transport = LogTransport::default();
        transport.connect().await.unwrap();
        transport.send(&ControllerSnapshot::default()).await.unwrap();
        transport.send(&ControllerSnapshot::default()).await.unwrap();
        assert_eq!(transport.sent(), 2);
    }
}
