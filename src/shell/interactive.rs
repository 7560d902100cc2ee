//! Top-level read-eval loop
//!
//! A [`Shell`] runs in exactly one mode, picked when it is built:
//!
//! - [`ShellInput::Lines`]: reads command lines and hands them to the
//!   [`Dispatcher`] until `exit` or end of input.
//! - [`ShellInput::Device`]: feeds a live key source through the
//!   [`KeyEventLoop`] until the connection is lost or the source closes.

use crate::controller::{ControllerError, ControllerState};
use crate::input::{CollectorHandle, KeySource};
use crate::mapping::{KeyEventLoop, KeyEventMapper, KeyMap, LoopExit, LoopSettings};
use crate::shell::dispatcher::{Dispatcher, Flow};
use crate::shell::registry::{Command, CommandError};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
}

/// Where the shell reads from
pub enum ShellInput {
    Lines(Box<dyn AsyncBufRead + Unpin + Send>),
    Device(Box<dyn KeySource>),
}

/// Why [`Shell::run`] returned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellExit {
    /// `exit` was entered
    Exit,
    /// Text input reached end of file
    EndOfInput,
    /// The key source closed
    InputClosed,
    /// The transport reported the connection lost during a flush
    ConnectionLost,
}

impl From<LoopExit> for ShellExit {
    fn from(exit: LoopExit) -> Self {
        match exit {
            LoopExit::ConnectionLost => ShellExit::ConnectionLost,
            LoopExit::InputClosed => ShellExit::InputClosed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ShellSettings {
    pub prompt: String,
    pub button_push: Duration,
    pub flush_interval: Duration,
    pub event_channel_capacity: usize,
    pub key_map: KeyMap,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            prompt: "cmd >> ".to_string(),
            button_push: Duration::from_millis(100),
            flush_interval: Duration::from_millis(15),
            event_channel_capacity: 1000,
            key_map: KeyMap::default_config(),
        }
    }
}

pub struct Shell<W: Write + Send> {
    dispatcher: Dispatcher,
    controller: ControllerState,
    input: ShellInput,
    settings: ShellSettings,
    out: W,
}

impl<W: Write + Send> Shell<W> {
    pub fn new(
        controller: ControllerState,
        input: ShellInput,
        settings: ShellSettings,
        out: W,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(settings.button_push),
            controller,
            input,
            settings,
            out,
        }
    }

    /// Adds a command next to the built-ins; fails if the name is taken.
    pub fn register<C: Command + 'static>(
        &mut self,
        name: impl Into<String>,
        command: C,
    ) -> Result<(), CommandError> {
        self.dispatcher.register(name, command)
    }

    /// Runs until the mode's termination condition and hands the controller back.
    ///
    /// In device mode the key source is released once the loop ends and its
    /// in-flight read returns. A read blocked in the kernel only returns with
    /// the next input event; a binary that exits right away should shut its
    /// runtime down with `shutdown_background` rather than wait for it.
    pub async fn run(self) -> Result<(ShellExit, ControllerState), ShellError> {
        let Shell {
            dispatcher,
            mut controller,
            input,
            settings,
            mut out,
        } = self;

        match input {
            ShellInput::Lines(reader) => {
                controller.connect().await?;
                let exit =
                    run_lines(&dispatcher, &mut controller, reader, &settings.prompt, &mut out)
                        .await?;
                Ok((exit, controller))
            }
            ShellInput::Device(source) => {
                writeln!(out, "Reading key events from {}", source.describe())?;
                out.flush()?;
                let (exit, controller) = run_device(controller, source, &settings).await?;
                if exit == ShellExit::ConnectionLost {
                    writeln!(out, "Connection was lost.")?;
                }
                Ok((exit, controller))
            }
        }
    }
}

async fn run_lines<W: Write>(
    dispatcher: &Dispatcher,
    controller: &mut ControllerState,
    reader: Box<dyn AsyncBufRead + Unpin + Send>,
    prompt: &str,
    out: &mut W,
) -> Result<ShellExit, ShellError> {
    info!("Starting text shell");
    let mut lines = reader.lines();
    loop {
        write!(out, "{}", prompt)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            info!("End of input, leaving shell");
            return Ok(ShellExit::EndOfInput);
        };
        if line.trim().is_empty() {
            continue;
        }

        debug!("Read line: {}", line);
        if dispatcher.dispatch(&line, controller, out).await? == Flow::Exit {
            info!("Leaving shell on exit");
            return Ok(ShellExit::Exit);
        }
        out.flush()?;
    }
}

async fn run_device(
    controller: ControllerState,
    source: Box<dyn KeySource>,
    settings: &ShellSettings,
) -> Result<(ShellExit, ControllerState), ShellError> {
    let (collector, events) = CollectorHandle::spawn(source, settings.event_channel_capacity);

    let loop_settings = LoopSettings {
        flush_interval_ms: settings.flush_interval.as_millis() as u64,
    };
    let mapper = KeyEventMapper::new(settings.key_map.clone());
    let running = KeyEventLoop::create(controller, mapper, events, Some(loop_settings))
        .connect()
        .await?;
    let (exit, controller) = running.run().await;

    // Releases the device once its pending read returns
    drop(collector);
    Ok((exit.into(), controller))
}
