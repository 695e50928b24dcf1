mod config;
mod render;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::stream::{self, StreamExt};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teletype_common::{traits::TerminalFrontend, types::Size};
use teletype_core::{SessionManager, Terminal, XorShiftRng};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, Overrides};
use render::CrosstermFrontend;

#[derive(Parser, Debug)]
#[command(author, version, about = "Typed terminal playback", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Write logs to this file (the screen belongs to the terminals)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// TOML file with scripts and defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script to play; repeat for several panels (defaults to all)
    #[arg(short, long = "script")]
    scripts: Vec<String>,

    /// Text for the {purpose} placeholder
    #[arg(long, default_value = "make the web a little weirder")]
    purpose: String,

    /// Delay between characters in milliseconds
    #[arg(long)]
    speed: Option<i64>,

    /// Glitch probability per character (0.0 - 1.0)
    #[arg(long)]
    glitch: Option<f64>,

    /// Seed for reproducible glitches
    #[arg(long)]
    seed: Option<u64>,

    /// Show the prompts without typing
    #[arg(long)]
    no_typing: bool,

    /// List available scripts and exit
    #[arg(long)]
    list: bool,
}

/// User input, as seen by the main loop
#[derive(Debug)]
enum Action {
    Quit,
    ToggleTyping,
    Restart,
    Resize(Size),
}

/// Puts the real terminal back however the program exits
struct ScreenGuard;

impl ScreenGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Clear(ClearType::All), Hide)?;
        Ok(Self)
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let filter = if args.debug {
        "teletype=debug"
    } else {
        "teletype=info"
    };
    let file = File::create(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("Starting teletype");

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::builtin(),
    };

    if args.list {
        for script in &config.scripts {
            println!("{} ({} commands)", script.name, script.commands.len());
        }
        return Ok(());
    }

    let cli = Overrides {
        typing_enabled: args.no_typing.then_some(false),
        glitch_probability: args.glitch,
        typing_speed_ms: args.speed,
        ..Overrides::default()
    };

    let scripts = config.select(&args.scripts)?;
    let manager = SessionManager::new();
    let mut panels = Vec::with_capacity(scripts.len());
    let mut sessions = Vec::with_capacity(scripts.len());

    for (index, script) in scripts.iter().enumerate() {
        let terminal_config = config.terminal_config(script, &cli, &args.purpose);
        let terminal = match args.seed {
            Some(seed) => Terminal::with_rng(
                terminal_config.clone(),
                XorShiftRng::seeded(seed.wrapping_add(index as u64)),
            ),
            None => Terminal::new(terminal_config.clone()),
        };
        panels.push((script.name.clone(), terminal_config.commands.len()));
        let info = manager
            .create_session_with(script.name.clone(), terminal_config, terminal)
            .await;
        sessions.push(info.id);
    }

    let (width, height) = terminal::size().unwrap_or((80, 24));
    let size = Size::new(width.max(1), height.max(1));
    info!("Screen size: {:?}", size);

    let guard = ScreenGuard::enter()?;
    let mut frontend = CrosstermFrontend::new(io::stdout(), size, &panels);

    // One stream of (panel, snapshot) for every terminal
    let mut streams = Vec::with_capacity(sessions.len());
    for (panel, id) in sessions.iter().enumerate() {
        let receiver = manager.snapshot_receiver(*id).await?;
        streams.push(
            tokio_stream::wrappers::WatchStream::new(receiver)
                .map(move |snapshot| (panel, snapshot))
                .boxed(),
        );
    }
    let mut updates = stream::select_all(streams);

    let (action_tx, mut actions) = mpsc::channel(16);
    let input_task = tokio::task::spawn_blocking(move || handle_input(action_tx));

    let mut typing = !args.no_typing;
    let result = async {
        loop {
            tokio::select! {
                Some((panel, snapshot)) = updates.next() => {
                    frontend.update(panel, &snapshot).await?;
                    frontend.refresh().await?;
                }
                action = actions.recv() => {
                    match action {
                        Some(Action::Quit) | None => {
                            info!("Quit requested");
                            break;
                        }
                        Some(Action::ToggleTyping) => {
                            typing = !typing;
                            info!(typing, "Toggling typing");
                            manager.set_typing_all(typing).await?;
                        }
                        Some(Action::Restart) => {
                            info!("Restarting all terminals");
                            manager.restart_all().await?;
                            typing = !args.no_typing;
                        }
                        Some(Action::Resize(size)) => {
                            frontend.resize(size).await?;
                            frontend.refresh().await?;
                        }
                    }
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    drop(actions);
    if let Err(e) = manager.close_all().await {
        error!("Failed to close terminals: {}", e);
    }
    drop(guard);
    match input_task.await {
        Ok(Err(e)) => error!("Input handler failed: {}", e),
        Err(e) => error!("Input handler panicked: {}", e),
        Ok(Ok(())) => {}
    }

    info!("Teletype exiting");
    result
}

/// Translate key presses into actions until the receiver goes away
fn handle_input(actions: mpsc::Sender<Action>) -> Result<()> {
    debug!("Input handler started");
    while !actions.is_closed() {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            })
            | Event::Key(KeyEvent {
                code: KeyCode::Char('q') | KeyCode::Esc,
                ..
            }) => Action::Quit,
            Event::Key(KeyEvent {
                code: KeyCode::Char(' '),
                ..
            }) => Action::ToggleTyping,
            Event::Key(KeyEvent {
                code: KeyCode::Char('r'),
                ..
            }) => Action::Restart,
            Event::Resize(cols, rows) => {
                info!("Screen resized to {}x{}", cols, rows);
                Action::Resize(Size::new(cols, rows))
            }
            other => {
                debug!("Unhandled input event: {:?}", other);
                continue;
            }
        };
        if actions.blocking_send(action).is_err() {
            break;
        }
    }
    debug!("Input handler exiting");
    Ok(())
}
