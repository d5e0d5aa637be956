// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};

mod app;
mod config;
mod data;
mod events;
mod logbook;
mod message;
mod mqtt;
mod source;
mod ui;

use app::{App, View};
use config::ConnectionConfig;
use data::TelemetryWindow;

#[derive(Parser, Debug)]
#[command(name = "mqttwatch")]
#[command(about = "Terminal dashboard for monitoring MQTT device telemetry")]
struct Args {
    /// Path to the connection config blob
    #[arg(short, long, default_value = "mqttwatch.json")]
    config: PathBuf,

    /// Broker URL override (ws://host:port/path or tcp://host:port)
    #[arg(short, long)]
    broker: Option<String>,

    /// Subscribe topic override
    #[arg(long)]
    subscribe_topic: Option<String>,

    /// Publish topic override
    #[arg(long)]
    publish_topic: Option<String>,

    /// Heartbeat interval override in seconds
    #[arg(long)]
    heartbeat_interval: Option<u64>,

    /// Heartbeat topic override
    #[arg(long)]
    heartbeat_topic: Option<String>,

    /// Chart look-back window in seconds
    #[arg(short, long, default_value = "60")]
    window: u64,

    /// Chart slot width in seconds
    #[arg(short, long, default_value = "5")]
    slot: u64,

    /// Connect to the broker on startup
    #[arg(long)]
    connect: bool,

    /// Write tracing output to this file (the TUI owns the terminal)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Arc::new(file))
            .with_ansi(false)
            .init();
    }

    // Load the persisted config and apply CLI overrides on top.
    let mut config = ConnectionConfig::load(&args.config);
    if let Some(broker) = args.broker {
        config.broker_url = broker;
    }
    if let Some(topic) = args.subscribe_topic {
        config.subscribe_topic = topic;
    }
    if let Some(topic) = args.publish_topic {
        config.publish_topic = topic;
    }
    if let Some(interval) = args.heartbeat_interval {
        config.heartbeat_interval = interval;
    }
    if let Some(topic) = args.heartbeat_topic {
        config.heartbeat_topic = topic;
    }

    let window = TelemetryWindow::new(
        args.window.max(1) as i64 * 1000,
        args.slot.max(1) as i64 * 1000,
    );

    // The supervisor runs on this runtime; the TUI stays on the main
    // thread. The runtime must outlive the app.
    let runtime = tokio::runtime::Runtime::new()?;

    let mut app = App::new(config, args.config.clone(), window, Some(runtime.handle().clone()));
    if args.connect {
        app.connect();
    }

    run_tui(&mut app)
}

/// Run the TUI main loop
fn run_tui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 16;

    while app.running {
        // Drain link events and drive the liveness deadline
        app.on_tick();

        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(0, area.height / 2 - 2, area.width, 5);
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(12),   // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Dashboard => ui::dashboard::render(frame, app, chunks[2]),
                View::Log => ui::log::render(frame, app, chunks[2]),
                View::Settings => ui::settings::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout; the timeout doubles as
        // the refresh cadence while idle
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}
