//! Parsing and execution of `&&`-chained command lines

use crate::controller::{Button, ControllerState};
use crate::shell::help::format_doc;
use crate::shell::registry::{
    Builtin, Command, CommandError, CommandRegistry, Handler, EXIT_COMMAND,
};
use crate::shell::stick::stick_command;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Delimiter between chained sub-commands
pub const CHAIN_DELIMITER: &str = "&&";

/// What the shell loop should do after a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Escapes every `#` outside quotes so shlex keeps it as a literal character
/// instead of starting a comment.
fn escape_hashes(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    let mut quote: Option<char> = None;
    let mut chars = part.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '#') => escaped.push_str("\\#"),
            (None, '\'' | '"') => {
                quote = Some(c);
                escaped.push(c);
            }
            (Some(open), _) if c == open => {
                quote = None;
                escaped.push(c);
            }
            // an escaped character never opens, closes or comments
            (None, '\\') | (Some('"'), '\\') => {
                escaped.push(c);
                if let Some(next) = chars.next() {
                    escaped.push(next);
                }
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Splits a line into tokenized sub-commands.
///
/// Empty sub-commands are dropped; one that cannot be tokenized yields
/// [`CommandError::Parse`] in its slot so the rest of the chain still runs.
/// `#` is an ordinary character, not a comment marker.
pub fn parse_chain(line: &str) -> Vec<Result<Vec<String>, CommandError>> {
    line.split(CHAIN_DELIMITER)
        .filter_map(|part| match shlex::split(&escape_hashes(part)) {
            Some(tokens) if tokens.is_empty() => None,
            Some(tokens) => Some(Ok(tokens)),
            None => Some(Err(CommandError::Parse(part.trim().to_string()))),
        })
        .collect()
}

fn parse_buttons(args: &[String]) -> Result<Vec<Button>, CommandError> {
    if args.is_empty() {
        return Err(CommandError::MissingValue);
    }
    args.iter()
        .map(|arg| {
            arg.parse::<Button>()
                .map_err(|name| CommandError::InvalidArgument(format!("Unknown button \"{}\"", name)))
        })
        .collect()
}

pub struct Dispatcher {
    registry: CommandRegistry,
    button_push: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl Dispatcher {
    /// `button_push` is how long a button named directly on the command line
    /// stays pressed.
    pub fn new(button_push: Duration) -> Self {
        Self {
            registry: CommandRegistry::new(),
            button_push,
        }
    }

    pub fn register<C: Command + 'static>(
        &mut self,
        name: impl Into<String>,
        command: C,
    ) -> Result<(), CommandError> {
        self.registry.register(name, Box::new(command))
    }

    /// Runs every sub-command of `line` in order and writes results and
    /// diagnostics to `out`.
    ///
    /// A failing or unknown sub-command never stops the chain; only `exit`
    /// does, and then the remaining sub-commands are skipped.
    pub async fn dispatch<W: Write>(
        &self,
        line: &str,
        controller: &mut ControllerState,
        out: &mut W,
    ) -> std::io::Result<Flow> {
        for parsed in parse_chain(line) {
            let tokens = match parsed {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("{}", e);
                    writeln!(out, "{}", e)?;
                    continue;
                }
            };
            let Some((name, args)) = tokens.split_first() else {
                continue;
            };

            if name == EXIT_COMMAND {
                debug!("exit requested");
                return Ok(Flow::Exit);
            }

            debug!("Running {} with {:?}", name, args);
            match self.execute(name, args, controller).await {
                Ok(Some(result)) if !result.is_empty() => writeln!(out, "{}", result)?,
                Ok(_) => {}
                Err(e @ CommandError::UnknownCommand(_)) => {
                    warn!("{}", e);
                    writeln!(out, "{}", e)?;
                }
                Err(e) => {
                    error!("Command {} failed: {}", name, e);
                    writeln!(out, "{}", e)?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    async fn execute(
        &self,
        name: &str,
        args: &[String],
        controller: &mut ControllerState,
    ) -> Result<Option<String>, CommandError> {
        match self.registry.get(name) {
            Some(Handler::Builtin(builtin)) => self.run_builtin(*builtin, args, controller).await,
            Some(Handler::Registered(command)) => command.call(controller, args).await,
            None => match name.parse::<Button>() {
                Ok(button) if controller.button_state().is_available(button) => {
                    controller.button_push(button, self.button_push).await?;
                    Ok(None)
                }
                _ => Err(CommandError::UnknownCommand(name.to_string())),
            },
        }
    }

    async fn run_builtin(
        &self,
        builtin: Builtin,
        args: &[String],
        controller: &mut ControllerState,
    ) -> Result<Option<String>, CommandError> {
        match builtin {
            Builtin::Help => Ok(Some(self.help(controller))),
            Builtin::Stick => stick_command(controller, args).await,
            Builtin::Hold => {
                let buttons = parse_buttons(args)?;
                controller.set_buttons(&buttons, true).await?;
                Ok(None)
            }
            Builtin::Release => {
                let buttons = parse_buttons(args)?;
                controller.set_buttons(&buttons, false).await?;
                Ok(None)
            }
        }
    }

    fn help(&self, controller: &ControllerState) -> String {
        let buttons: Vec<&str> = controller
            .button_state()
            .get_available_buttons()
            .iter()
            .map(Button::as_str)
            .collect();

        let mut lines = vec![
            "Button commands:".to_string(),
            buttons.join(", "),
            String::new(),
            "Commands:".to_string(),
        ];
        lines.extend(self.registry.docs().into_iter().map(format_doc));
        lines.push("Commands can be chained using \"&&\"".to_string());
        lines.push("Type \"exit\" to close.".to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ChannelTransport, ControllerSnapshot, StickSide};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Records its name on every call, optionally failing.
    struct Recorder {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Command for Recorder {
        fn doc(&self) -> Option<&str> {
            Some("\n        recorder - records calls\n    ")
        }

        async fn call(
            &self,
            _controller: &mut ControllerState,
            args: &[String],
        ) -> Result<Option<String>, CommandError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}{:?}", self.name, args));
            if self.fail {
                Err(CommandError::Failed(format!("{} broke", self.name)))
            } else {
                Ok(Some(format!("{} done", self.name)))
            }
        }
    }

    struct Setup {
        dispatcher: Dispatcher,
        controller: ControllerState,
        snapshots: mpsc::Receiver<ControllerSnapshot>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    async fn setup() -> Setup {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new(Duration::from_millis(1));
        for (name, fail) in [("one", false), ("two", true), ("three", false)] {
            dispatcher
                .register(
                    name,
                    Recorder {
                        name,
                        calls: calls.clone(),
                        fail,
                    },
                )
                .unwrap();
        }
        let (transport, snapshots) = ChannelTransport::new(64);
        let mut controller = ControllerState::with_transport(Box::new(transport));
        controller.connect().await.unwrap();
        Setup {
            dispatcher,
            controller,
            snapshots,
            calls,
        }
    }

    async fn run(setup: &mut Setup, line: &str) -> (Flow, String) {
        let mut out = Vec::new();
        let flow = setup
            .dispatcher
            .dispatch(line, &mut setup.controller, &mut out)
            .await
            .unwrap();
        (flow, String::from_utf8(out).unwrap())
    }

    #[test]
    fn chain_parsing_respects_quotes() {
        let parsed = parse_chain("say \"hello world\" && stick l up &&  && x 'a b'");
        let tokens: Vec<Vec<String>> = parsed.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            tokens,
            vec![
                vec!["say".to_string(), "hello world".to_string()],
                vec!["stick".to_string(), "l".to_string(), "up".to_string()],
                vec!["x".to_string(), "a b".to_string()],
            ]
        );
        assert!(matches!(
            parse_chain("say \"oops")[0],
            Err(CommandError::Parse(_))
        ));

        let line = "x #a && #foo && hold a #b 'c #d' \"#e\" \\#f g#h";
        let tokens: Vec<Vec<String>> = parse_chain(line).into_iter().map(Result::unwrap).collect();
        assert_eq!(
            tokens,
            vec![
                vec!["x".to_string(), "#a".to_string()],
                vec!["#foo".to_string()],
                vec![
                    "hold".to_string(),
                    "a".to_string(),
                    "#b".to_string(),
                    "c #d".to_string(),
                    "#e".to_string(),
                    "#f".to_string(),
                    "g#h".to_string(),
                ],
            ]
        );
    }

    #[tokio::test]
    async fn failing_command_does_not_abort_the_chain() {
        let mut setup = setup().await;
        let (flow, out) = run(&mut setup, "one && two x && three").await;

        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            *setup.calls.lock().unwrap(),
            vec!["one[]", "two[\"x\"]", "three[]"]
        );
        assert_eq!(out, "one done\ntwo broke\nthree done\n");
    }

    #[tokio::test]
    async fn exit_skips_the_rest_of_the_chain() {
        let mut setup = setup().await;
        let (flow, out) = run(&mut setup, "one && exit && three").await;

        assert_eq!(flow, Flow::Exit);
        assert_eq!(*setup.calls.lock().unwrap(), vec!["one[]"]);
        assert_eq!(out, "one done\n");
    }

    #[tokio::test]
    async fn unknown_commands_are_reported_and_skipped() {
        let mut setup = setup().await;
        let (flow, out) = run(&mut setup, "nope && three && 'unbalanced").await;

        assert_eq!(flow, Flow::Continue);
        assert_eq!(*setup.calls.lock().unwrap(), vec!["three[]"]);
        assert_eq!(
            out,
            "command nope not found, call help for help.\nthree done\nCould not parse \"'unbalanced\"\n"
        );

        let (flow, out) = run(&mut setup, "#foo && one #a").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            *setup.calls.lock().unwrap(),
            vec!["three[]", "one[\"#a\"]"]
        );
        assert_eq!(out, "command #foo not found, call help for help.\none done\n");
    }

    #[tokio::test]
    async fn stick_commands_through_the_dispatcher() {
        let mut setup = setup().await;
        let (_, out) = run(&mut setup, "stick l up").await;
        assert_eq!(out, "Left stick was set to (2048, 3848).\n");

        let (_, out) = run(&mut setup, "stick r horizontal 1500").await;
        assert_eq!(out, "Right stick was set to (1500, 2048).\n");
        assert_eq!(setup.controller.stick(StickSide::Right).h(), 1500);

        let (_, out) = run(
            &mut setup,
            "stick r horizontal abc && stick r horizontal && stick middle up",
        )
        .await;
        assert_eq!(
            out,
            "Unexpected stick value \"abc\"\nMissing value\nValue of side must be \"l\", \"left\" or \"r\", \"right\"\n"
        );
        assert_eq!(setup.controller.stick(StickSide::Right).h(), 1500);
    }

    #[tokio::test]
    async fn button_names_push_the_button() {
        let mut setup = setup().await;
        let (_, out) = run(&mut setup, "a").await;
        assert!(out.is_empty());

        let pressed = setup.snapshots.recv().await.unwrap();
        let released = setup.snapshots.recv().await.unwrap();
        assert_eq!(pressed.pressed, vec![Button::A]);
        assert!(released.pressed.is_empty());
    }

    #[tokio::test]
    async fn hold_and_release() {
        let mut setup = setup().await;
        run(&mut setup, "hold zl zr").await;
        assert_eq!(
            setup.snapshots.recv().await.unwrap().pressed,
            vec![Button::Zr, Button::Zl]
        );

        let (_, out) = run(&mut setup, "release zl && hold start && release").await;
        assert_eq!(out, "Unknown button \"start\"\nMissing value\n");
        assert_eq!(
            setup.snapshots.recv().await.unwrap().pressed,
            vec![Button::Zr]
        );
        assert!(setup.snapshots.try_recv().is_err());
    }

    #[tokio::test]
    async fn help_lists_buttons_commands_and_chaining() {
        let mut setup = setup().await;
        let (_, out) = run(&mut setup, "help").await;

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Button commands:");
        assert!(lines[1].starts_with("y, x, b, a, r, zr"));
        assert_eq!(lines[3], "Commands:");
        assert!(lines.contains(&"stick - Command to set stick positions."));
        assert!(lines.contains(&"recorder - records calls"));
        // continuation lines keep their indentation relative to the first line
        let continuation = format!(
            "{}'h', 'horizontal' or 'v', 'vertical' to set the value directly to the \"value\" argument",
            " ".repeat(18)
        );
        assert!(lines.contains(&continuation.as_str()));
        assert_eq!(lines[lines.len() - 2], "Commands can be chained using \"&&\"");
        assert_eq!(lines[lines.len() - 1], "Type \"exit\" to close.");
    }

    #[tokio::test]
    async fn registered_commands_cannot_shadow_builtins() {
        let mut setup = setup().await;
        let err = setup
            .dispatcher
            .register(
                "one",
                Recorder {
                    name: "dup",
                    calls: setup.calls.clone(),
                    fail: false,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CommandError::DuplicateCommand(_)));

        run(&mut setup, "one").await;
        assert_eq!(*setup.calls.lock().unwrap(), vec!["one[]"]);
    }
}
