use clap::Parser;
use color_eyre::Result;
use kiosknav::input::{EngineEvent, EngineHandle, FocusFlag, Key, NavigationEvent, Orientation};
use kiosknav::AppConfig;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Kiosk launcher input demo
///
/// Type `up`, `down`, `left`, `right`, `enter`, `esc` or `x` followed by
/// return to simulate a key press, or use a gamepad.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    log: bool,

    /// Navigate with left/right instead of up/down
    #[arg(long)]
    horizontal: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

const ENTRIES: [&str; 5] = ["Browser", "Media Center", "Emulator", "Settings", "Terminal"];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup(args.log)?;

    let path = args.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&path).await?;
    if args.horizontal {
        config.orientation = Orientation::Horizontal;
    }
    info!(
        "Starting launcher: orientation={}, multiple_displays={}",
        config.orientation, config.multiple_displays
    );

    let (event_tx, mut event_rx) = mpsc::channel::<EngineEvent>(100);
    let mut engine = EngineHandle::spawn_with_gilrs(
        config.orientation,
        Some(config.engine.clone()),
        FocusFlag::new(true),
        event_tx,
    );
    log_control_hints(engine.is_gamepad_connected());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut selected = 0usize;
    let mut display = 0usize;
    info!("Selected: {}", ENTRIES[selected]);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_key(line.trim()) {
                    Some(key) => {
                        engine.key_down(key);
                        engine.key_up(key);
                    }
                    None => warn!("Unknown key: {:?}", line.trim()),
                },
                Ok(None) => {
                    debug!("stdin closed, gamepad only");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin, gamepad only: {}", e);
                    stdin_open = false;
                }
            },

            event = event_rx.recv() => match event {
                Some(EngineEvent::Navigation(NavigationEvent::Move(step))) => {
                    selected = wrap(selected, step.offset(), ENTRIES.len());
                    info!("Selected: {}", ENTRIES[selected]);
                }
                Some(EngineEvent::Navigation(NavigationEvent::Launch)) => {
                    info!("Launching {}", ENTRIES[selected]);
                }
                Some(EngineEvent::Navigation(NavigationEvent::Exit)) => {
                    info!("Exit requested");
                    break;
                }
                Some(EngineEvent::Navigation(NavigationEvent::ToggleDisplay)) => {
                    if config.multiple_displays {
                        display = (display + 1) % 2;
                        let display_index = display;
                        info!("Switched to display {}", display_index);
                    } else {
                        debug!("Single display, ignoring toggle");
                    }
                }
                Some(EngineEvent::ConnectionChanged(connected)) => log_control_hints(connected),
                None => {
                    warn!("Input engine stopped");
                    break;
                }
            },
        }
    }

    engine.shutdown().await;
    Ok(())
}

fn setup(debug_logging: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(if debug_logging {
        Level::DEBUG
    } else {
        Level::INFO
    });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn log_control_hints(connected: bool) {
    if connected {
        info!("Controls: D-pad/stick to move, A launch, B exit, X switch display");
    } else {
        info!("Controls: arrows to move, Enter launch, Esc exit, X switch display");
    }
}

fn parse_key(input: &str) -> Option<Key> {
    match input.to_ascii_lowercase().as_str() {
        "up" | "w" => Some(Key::ArrowUp),
        "down" | "s" => Some(Key::ArrowDown),
        "left" | "a" => Some(Key::ArrowLeft),
        "right" | "d" => Some(Key::ArrowRight),
        "enter" | "" => Some(Key::Enter),
        "esc" | "q" => Some(Key::Escape),
        "x" => Some(Key::Char('x')),
        _ => None,
    }
}

fn wrap(index: usize, offset: i32, len: usize) -> usize {
    (index as i64 + offset as i64).rem_euclid(len as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_wraps_at_both_ends() {
        assert_eq!(wrap(0, -1, 5), 4);
        assert_eq!(wrap(4, 1, 5), 0);
        assert_eq!(wrap(2, 1, 5), 3);
    }

    #[test]
    fn parses_demo_keys() {
        assert_eq!(parse_key("UP"), Some(Key::ArrowUp));
        assert_eq!(parse_key("x"), Some(Key::Char('x')));
        assert_eq!(parse_key(""), Some(Key::Enter));
        assert_eq!(parse_key("jump"), None);
    }
}
