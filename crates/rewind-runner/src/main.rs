//! Interactive host loop for a rewindable session.
//!
//! This binary:
//! 1. Loads the clock configuration (`REWIND_CONFIG`, env overrides)
//! 2. Populates a session with demo entities
//! 3. Ticks at `REWIND_TARGET_FPS`, also while time is frozen
//!
//! Commands:
//! - `f` or `freeze` - Toggle frozen time
//! - `r` or `rewind` - Rewind (freezes first)
//! - `p` or `replay` - Replay toward the newest cycle
//! - `s` or `stop` - Stop rewinding or replaying
//! - `pause` - Toggle pause
//! - `status` - Print clock state
//! - `q` or `quit` - Quit

mod config;
mod demo;

use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute};
use rewind_clock::WallClock;
use rewind_session::Session;
use tracing::{error, info, warn};

use crate::config::RunnerConfig;

/// Commands that can be sent from the input thread
enum Command {
    Freeze,
    Rewind,
    Replay,
    Stop,
    Pause,
    Status,
    Quit,
    Help,
    Unknown(String),
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rewind_runner=info".parse()?)
                .add_directive("rewind_session=info".parse()?),
        )
        .init();

    let config = RunnerConfig::load()?;
    info!(
        window = config.clock.rewind_window_secs,
        fps = config.target_fps,
        capacity = config.clock.capacity(),
        "Starting rewind runner"
    );

    let mut session = Session::new(config.clock, WallClock::new())?;
    demo::populate(&mut session)?;

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    thread::spawn(move || input_thread(cmd_tx));

    terminal::enable_raw_mode().ok();
    prompt();

    let target_delta = Duration::from_secs_f64(1.0 / config.target_fps);

    'run: loop {
        let start = Instant::now();

        for cmd in cmd_rx.try_iter() {
            clear_line();
            if !handle(&mut session, cmd) {
                break 'run;
            }
            prompt();
        }

        // Keep ticking while frozen so unfreeze and rewind commands land.
        if let Err(err) = session.tick() {
            clear_line();
            if err.is_desync() {
                error!("{err}; resetting session");
                session.reset();
            } else {
                warn!("tick failed: {err}");
            }
            prompt();
        }

        if let Some(rest) = target_delta.checked_sub(start.elapsed()) {
            thread::sleep(rest);
        }
    }

    terminal::disable_raw_mode().ok();
    info!(ticks = session.ticks(), "Shutting down");
    Ok(())
}

/// Returns `false` once the loop should stop.
fn handle(session: &mut Session, cmd: Command) -> bool {
    let clock = session.clock_mut();
    match cmd {
        Command::Freeze => {
            let frozen = !clock.is_frozen();
            if clock.set_frozen(frozen) {
                info!("Time {}", if frozen { "frozen" } else { "resumed" });
            } else {
                info!("Freeze unchanged (paused?)");
            }
        }
        Command::Rewind => {
            clock.set_frozen(true);
            if clock.initiate_rewind() {
                info!("Rewinding from cycle {}", clock.cycle_number());
            } else {
                info!("Nothing to rewind");
            }
        }
        Command::Replay => {
            if clock.initiate_replay() {
                info!("Replaying from cycle {}", clock.cycle_number());
            } else {
                info!("Nothing to replay");
            }
        }
        Command::Stop => {
            let stopped = clock.stop_rewind() | clock.stop_replay();
            info!(stopped, mode = %clock.mode(), "Stop requested");
        }
        Command::Pause => {
            let paused = !clock.is_paused();
            clock.set_paused(paused);
            info!("Simulation {}", if paused { "paused" } else { "resumed" });
        }
        Command::Status => {
            let state = *clock.state();
            info!(
                mode = %clock.mode(),
                cycle = state.cycle_number,
                oldest = state.oldest_recorded_cycle,
                newest = state.newest_recorded_cycle,
                limit = state.oldest_cycle_within_rewind_limit,
                time = state.time,
                "Clock"
            );
            info!("{}", demo::describe(session));
        }
        Command::Quit => {
            info!("Shutting down...");
            return false;
        }
        Command::Help => {
            info!("\r\nCommands:");
            info!("  f, freeze  - Toggle frozen time");
            info!("  r, rewind  - Rewind (freezes first)");
            info!("  p, replay  - Replay toward the newest cycle");
            info!("  s, stop    - Stop rewinding or replaying");
            info!("  pause      - Toggle pause");
            info!("  status     - Print clock state");
            info!("  q, quit    - Quit");
        }
        Command::Unknown(s) => {
            if !s.is_empty() {
                info!("Unknown command: '{}'. Type 'help' for commands.", s);
            }
        }
    }
    true
}

/// Forwards one command per entered line until quit or the channel closes.
fn input_thread(tx: mpsc::Sender<Command>) {
    let mut line = String::new();

    loop {
        let key = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(_) => continue,
            Err(_) => return,
        };

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = tx.send(Command::Quit);
                return;
            }
            KeyCode::Enter => {
                let cmd = parse_command(&line);
                line.clear();
                let quit = matches!(cmd, Command::Quit);
                if tx.send(cmd).is_err() || quit {
                    return;
                }
            }
            KeyCode::Char(c) => {
                line.push(c);
                echo(c);
            }
            KeyCode::Backspace if line.pop().is_some() => echo("\x08 \x08"),
            _ => {}
        }
    }
}

fn parse_command(input: &str) -> Command {
    match input.trim().to_lowercase().as_str() {
        "f" | "freeze" => Command::Freeze,
        "r" | "rewind" => Command::Rewind,
        "p" | "replay" => Command::Replay,
        "s" | "stop" => Command::Stop,
        "pause" => Command::Pause,
        "status" => Command::Status,
        "q" | "quit" | "exit" => Command::Quit,
        "help" | "h" | "?" => Command::Help,
        other => Command::Unknown(other.to_string()),
    }
}

fn echo(text: impl std::fmt::Display) {
    execute!(io::stdout(), Print(text)).ok();
}

/// Wipe the partially typed line so log output starts at column zero.
fn clear_line() {
    execute!(
        io::stdout(),
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine)
    )
    .ok();
}

fn prompt() {
    execute!(io::stdout(), cursor::MoveToColumn(0), Print("> ")).ok();
}
