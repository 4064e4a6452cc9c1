//! STACKFALL - falling blocks in the terminal
//!
//! Steer the falling pieces, fill rows, and keep the stack below the top.

mod board;
mod collision;
mod game;
mod input;
mod piece;
mod randomizer;
mod score;
mod settings;
mod tetromino;
mod ui;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use game::{Action, Game, GameState};
use input::{FallTimer, InputHandler};
use randomizer::Randomizer;
use ratatui::{Terminal, backend::CrosstermBackend};
use settings::Settings;
use std::{
    io::{self, stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Target frame rate
const TARGET_FPS: u64 = 60;
const FRAME_DURATION: Duration = Duration::from_micros(1_000_000 / TARGET_FPS);

/// Get the stackfall temp directory, creating it if needed
fn stackfall_temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("stackfall");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn main() -> io::Result<()> {
    // Generate session ID for this instance
    let session_id: u32 = rand::random();

    let log_dir = stackfall_temp_dir();
    let log_file = format!("{:08x}.log", session_id);

    // Setup tracing to log file
    let file_appender = tracing_appender::rolling::never(&log_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stackfall=debug")),
        )
        .with_ansi(false)
        .init();

    info!(
        "STACKFALL starting up, session={:08x}, log={}",
        session_id,
        log_dir.join(&log_file).display()
    );

    let settings = Settings::load().inspect_err(|e| error!("could not load settings: {}", e))?;
    write_default_settings(&settings);

    let config = settings
        .game_config()
        .inspect_err(|e| error!("invalid configuration: {}", e))?;
    let source = match settings.gameplay.seed {
        Some(seed) => Randomizer::with_seed(seed),
        None => Randomizer::new(),
    };
    let mut game = Game::with_source(config, Box::new(source))?;

    // Setup terminal
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut game, &settings);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;

    if let Err(e) = &result {
        error!("terminal error: {}", e);
    }

    let score = game.score();
    info!(score = score.points, lines = score.lines, "session over");
    println!("Thanks for playing STACKFALL!");
    println!("Final Score: {} | Lines: {}", score.points, score.lines);

    result
}

/// Write the defaults out once so there is a file to edit
fn write_default_settings(settings: &Settings) {
    if Settings::settings_path().is_some_and(|path| path.exists()) {
        return;
    }
    match settings.save() {
        Ok(path) => info!("wrote default settings to {}", path.display()),
        Err(e) => warn!("could not save default settings: {}", e),
    }
}

/// How long to wait for input before the next frame. A running game wakes
/// up early for its next gravity tick; a finished one has no timer to honour.
fn poll_timeout(game_over: bool, timer: &FallTimer, now: Instant) -> Duration {
    if game_over {
        FRAME_DURATION
    } else {
        FRAME_DURATION.min(timer.remaining(now))
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    game: &mut Game,
    settings: &Settings,
) -> io::Result<()> {
    let input = InputHandler::from_settings(settings);
    let mut timer = FallTimer::new(game.fall_interval(), Instant::now());

    loop {
        // Render
        let view = game.view();
        terminal.draw(|frame| ui::render_game(frame, &view, settings))?;

        // Collect everything pressed during this frame
        let mut actions = Vec::new();
        let start = Instant::now();
        let deadline = start + poll_timeout(game.is_over(), &timer, start);
        while event::poll(deadline.saturating_duration_since(Instant::now()))? {
            if let Event::Key(key) = event::read()? {
                actions.extend(input.key_down(key));
            }
        }

        // Finished games only wait for the quit key
        if game.is_over() {
            if actions.contains(&Action::Quit) {
                return Ok(());
            }
            continue;
        }

        let now = Instant::now();
        actions.extend(timer.poll(now));

        let report = game.tick(&actions);
        if report.locked {
            debug!(points = report.points, "piece locked");
        }
        if report.lines_cleared > 0 {
            info!(
                lines = report.lines_cleared,
                points = report.points,
                total = game.score().points,
                "lines cleared"
            );
        }
        if report.speed_changed {
            timer.reset(game.fall_interval(), now);
            info!(interval_ms = timer.interval().as_millis() as u64, "speed up");
        }

        if report.game_over {
            info!(score = game.score().points, "game over");
        }
        if game.state() == GameState::Quit {
            return Ok(());
        }
    }
}
