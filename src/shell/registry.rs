//! Named commands available to the dispatcher

use crate::controller::{ControllerError, ControllerState};
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

/// Name that always ends the shell and can never be registered
pub const EXIT_COMMAND: &str = "exit";

/// Errors raised while registering or running a command
///
/// Everything except [`CommandError::DuplicateCommand`] is caught at the
/// dispatch boundary and printed; the chain carries on with the next command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command {0} already registered.")]
    DuplicateCommand(String),

    #[error("command {0} not found, call help for help.")]
    UnknownCommand(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Missing value")]
    MissingValue,

    #[error("{0}")]
    InvalidValue(String),

    /// Tokenizing the sub-command failed (unbalanced quotes)
    #[error("Could not parse \"{0}\"")]
    Parse(String),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Free-form failure of an embedder command
    #[error("{0}")]
    Failed(String),
}

/// A command an embedding application adds to the shell
///
/// Arguments arrive already tokenized. A returned `Some(text)` is printed.
#[async_trait]
pub trait Command: Send + Sync {
    /// Documentation shown by `help`; indentation is normalized before printing.
    fn doc(&self) -> Option<&str> {
        None
    }

    async fn call(
        &self,
        controller: &mut ControllerState,
        args: &[String],
    ) -> Result<Option<String>, CommandError>;
}

/// Keeps a retired command name answering with a notice instead of
/// "not found"
pub struct DeprecatedCommand {
    message: String,
}

impl DeprecatedCommand {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Command for DeprecatedCommand {
    async fn call(
        &self,
        _controller: &mut ControllerState,
        _args: &[String],
    ) -> Result<Option<String>, CommandError> {
        Ok(Some(self.message.clone()))
    }
}

/// Commands the shell implements itself
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Help,
    Stick,
    Hold,
    Release,
}

const HELP_DOC: &str = "
    help - Lists the available buttons and commands.
";

const STICK_DOC: &str = "
    stick - Command to set stick positions.
    :param side: 'l', 'left' for left control stick; 'r', 'right' for right control stick
    :param direction: 'center', 'up', 'down', 'left', 'right';
                      'h', 'horizontal' or 'v', 'vertical' to set the value directly to the \"value\" argument
    :param value: horizontal or vertical value
";

const HOLD_DOC: &str = "
    hold - Press buttons and keep them pressed.
    :param buttons: one or more button names
";

const RELEASE_DOC: &str = "
    release - Release pressed buttons.
    :param buttons: one or more button names
";

impl Builtin {
    pub const ALL: [(&'static str, Builtin); 4] = [
        ("help", Builtin::Help),
        ("stick", Builtin::Stick),
        ("hold", Builtin::Hold),
        ("release", Builtin::Release),
    ];

    pub fn doc(&self) -> &'static str {
        match self {
            Builtin::Help => HELP_DOC,
            Builtin::Stick => STICK_DOC,
            Builtin::Hold => HOLD_DOC,
            Builtin::Release => RELEASE_DOC,
        }
    }
}

pub enum Handler {
    Builtin(Builtin),
    Registered(Box<dyn Command>),
}

impl Handler {
    pub fn doc(&self) -> Option<&str> {
        match self {
            Handler::Builtin(builtin) => Some(builtin.doc()),
            Handler::Registered(command) => command.doc(),
        }
    }
}

/// Name → handler table with the built-ins pre-populated
pub struct CommandRegistry {
    commands: BTreeMap<String, Handler>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        let commands = Builtin::ALL
            .iter()
            .map(|(name, builtin)| (name.to_string(), Handler::Builtin(*builtin)))
            .collect();
        Self { commands }
    }

    /// Binds `name` to `command`; an existing binding is never replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        command: Box<dyn Command>,
    ) -> Result<(), CommandError> {
        let name = name.into();
        if name == EXIT_COMMAND || self.commands.contains_key(&name) {
            return Err(CommandError::DuplicateCommand(name));
        }
        info!("Registered command {}", name);
        self.commands.insert(name, Handler::Registered(command));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        let handler = self.commands.get(name);
        if handler.is_none() {
            debug!("No command named {}", name);
        }
        handler
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Documentation strings, built-ins first, then registered commands.
    pub fn docs(&self) -> Vec<&str> {
        let builtins = self
            .commands
            .values()
            .filter(|handler| matches!(handler, Handler::Builtin(_)));
        let registered = self
            .commands
            .values()
            .filter(|handler| matches!(handler, Handler::Registered(_)));
        builtins
            .chain(registered)
            .filter_map(Handler::doc)
            .collect()
    }
}
