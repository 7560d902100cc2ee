//! Command interpreter
//!
//! ```text
//! line ──► parse_chain ──► Dispatcher ──► builtin | registered Command | button push
//!                              │
//!                              └──► ControllerState ──► send()
//! ```
//!
//! Sub-commands of a chain (`a && b && c`) run left to right; each failure is
//! printed and the chain continues. Only `exit` cuts a chain short.

pub mod dispatcher;
pub mod help;
pub mod interactive;
pub mod registry;
pub mod stick;

pub use dispatcher::{parse_chain, Dispatcher, Flow, CHAIN_DELIMITER};
pub use help::format_doc;
pub use interactive::{Shell, ShellError, ShellExit, ShellInput, ShellSettings};
pub use registry::{
    Builtin, Command, CommandError, CommandRegistry, DeprecatedCommand, EXIT_COMMAND,
};
