//! Device-driven loop: drain key events, translate them, flush
//!
//! # State Machine
//!
//! ```text
//! Connecting ──► Collecting ──► Processing(EventBatch) ──► Flushing
//!                    ▲                                        │
//!                    └────────────────────────────────────────┘
//! ```
//!
//! Every tick of the flush interval drains whatever the collector has queued
//! without waiting, applies it through the [`KeyEventMapper`] and then flushes
//! unconditionally, so the send cadence does not depend on how fast keys
//! arrive. The loop ends when the transport reports the connection lost or
//! the input channel closes.

use crate::controller::{ControllerError, ControllerState};
use crate::input::RawInputEvent;
use crate::mapping::key_mapper::KeyEventMapper;
use chrono::Local;
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

// Event batch for the processing state
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub events: Vec<RawInputEvent>,
}

#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub flush_interval_ms: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            flush_interval_ms: 15,
        }
    }
}

/// Why the loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    ConnectionLost,
    InputClosed,
}

#[state]
#[derive(Debug, Clone)]
pub enum LoopState {
    Connecting,
    Collecting,
    Processing(EventBatch),
    Flushing,
}

#[machine]
pub struct KeyEventLoop<S: LoopState> {
    controller: ControllerState,
    mapper: KeyEventMapper,
    event_receiver: mpsc::Receiver<RawInputEvent>,
    settings: LoopSettings,
    input_closed: bool,
    connection_lost: bool,
}

/// Result of one flush: keep going or hand the controller back
pub enum FlushOutcome {
    Continue(KeyEventLoop<Collecting>),
    Finished(LoopExit, ControllerState),
}

impl KeyEventLoop<Connecting> {
    pub fn create(
        controller: ControllerState,
        mapper: KeyEventMapper,
        event_receiver: mpsc::Receiver<RawInputEvent>,
        settings: Option<LoopSettings>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        info!("Creating key event loop with settings: {:?}", settings);
        Self::new(controller, mapper, event_receiver, settings, false, false)
    }

    /// Makes sure the controller is connected before any event is processed.
    pub async fn connect(mut self) -> Result<KeyEventLoop<Collecting>, ControllerError> {
        self.controller.connect().await?;
        info!("Controller connected, transitioning to Collecting state");
        Ok(self.transition())
    }
}

impl KeyEventLoop<Collecting> {
    /// Takes every event that is already queued, without waiting for more.
    pub fn collect(mut self) -> KeyEventLoop<Processing> {
        let mut events = Vec::new();
        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if !self.input_closed {
                        info!("Event channel closed");
                    }
                    self.input_closed = true;
                    break;
                }
            }
        }
        if !events.is_empty() {
            debug!("Collected batch of {} events", events.len());
        }
        self.transition_with(EventBatch { events })
    }

    /// Runs collect → process → flush on every tick until the loop terminates.
    pub async fn run(self) -> (LoopExit, ControllerState) {
        let period = Duration::from_millis(self.settings.flush_interval_ms.max(1));
        info!("Starting key event loop with {:?} flush interval", period);

        let mut interval_timer = tokio::time::interval(period);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles: u64 = 0;
        let mut total_events: u64 = 0;
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);

        let mut collecting = self;
        loop {
            interval_timer.tick().await;

            let processing = collecting.collect();
            total_events += processing
                .get_state_data()
                .map_or(0, |batch| batch.events.len()) as u64;

            let flushing = processing.process().await;
            collecting = match flushing.flush().await {
                FlushOutcome::Continue(next) => next,
                FlushOutcome::Finished(exit, controller) => {
                    info!(
                        "Key event loop finished ({:?}) after {} cycles",
                        exit, cycles
                    );
                    return (exit, controller);
                }
            };
            cycles += 1;

            let now = Local::now();
            if now - last_stats_time > stats_interval {
                let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
                info!(
                    "Key loop stats: {} flushes, {} events in {} seconds",
                    cycles, total_events, elapsed_seconds
                );
                cycles = 0;
                total_events = 0;
                last_stats_time = now;
            }
        }
    }
}

impl KeyEventLoop<Processing> {
    /// Applies the collected key events in arrival order.
    pub async fn process(mut self) -> KeyEventLoop<Flushing> {
        let events = self
            .get_state_data()
            .map(|batch| batch.events.clone())
            .unwrap_or_default();

        for event in events.iter().filter(|event| event.is_key()) {
            match self
                .mapper
                .handle(&mut self.controller, event.code, event.value)
                .await
            {
                Ok(()) => {}
                Err(ControllerError::NotConnected) => {
                    self.connection_lost = true;
                    break;
                }
                Err(e) => {
                    error!(
                        "Failed to apply key {} (value {}): {}",
                        event.code, event.value, e
                    );
                }
            }
        }
        self.transition()
    }
}

impl KeyEventLoop<Flushing> {
    /// Flushes the controller state; a lost connection ends the loop.
    pub async fn flush(mut self) -> FlushOutcome {
        let lost = if self.connection_lost {
            true
        } else {
            match self.controller.send().await {
                Ok(()) => false,
                Err(ControllerError::NotConnected) => true,
                Err(e) => {
                    warn!("Failed to flush controller state: {}", e);
                    false
                }
            }
        };

        if lost {
            info!("Connection was lost.");
            return FlushOutcome::Finished(LoopExit::ConnectionLost, self.controller);
        }
        if self.input_closed {
            return FlushOutcome::Finished(LoopExit::InputClosed, self.controller);
        }
        FlushOutcome::Continue(self.transition())
    }
}
