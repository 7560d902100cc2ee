use color_eyre::{eyre::eyre, Result};
use padshell::config::{AppConfig, RunMode};
use padshell::controller::{ControllerState, LogTransport};
use padshell::shell::{Shell, ShellExit, ShellInput};
use tokio::io::BufReader;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    setup()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run());
    // A device read blocked in the kernel would otherwise hold the runtime open
    runtime.shutdown_background();
    result
}

async fn run() -> Result<()> {
    let config = AppConfig::load().await?;
    let settings = config.shell_settings()?;
    info!("Starting in {:?} mode", config.mode);

    let controller = ControllerState::new(
        Box::new(LogTransport::default()),
        config.left_stick,
        config.right_stick,
    );

    let input = match config.mode {
        RunMode::Text => ShellInput::Lines(Box::new(BufReader::new(tokio::io::stdin()))),
        RunMode::Device => open_device(&config)?,
    };

    let shell = Shell::new(controller, input, settings, std::io::stdout());
    let (exit, _controller) = shell.run().await?;

    match exit {
        ShellExit::ConnectionLost => warn!("Shell stopped: controller connection lost"),
        other => info!("Shell stopped: {:?}", other),
    }
    Ok(())
}

#[cfg(feature = "evdev")]
fn open_device(config: &AppConfig) -> Result<ShellInput> {
    let source = padshell::input::EvdevSource::open(&config.device_path)
        .map_err(|e| eyre!("Failed to open {}: {}", config.device_path.display(), e))?;
    Ok(ShellInput::Device(Box::new(source)))
}

#[cfg(not(feature = "evdev"))]
fn open_device(config: &AppConfig) -> Result<ShellInput> {
    Err(eyre!(
        "Device mode needs the `evdev` feature (configured device: {})",
        config.device_path.display()
    ))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}
