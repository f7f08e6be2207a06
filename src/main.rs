use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use crossterm::event::{poll as event_poll, read as event_read, Event as CrosstermEvent, KeyEventKind};
use ratatui::{backend::CrosstermBackend, Terminal};
use shellpane::app::ShellApp;
use shellpane::config::Config;
use shellpane::services::terminal_modes::{self, TerminalModes};
use shellpane::services::{log_dirs, tracing_setup};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// A line-buffered terminal front-end for an interactive shell
#[derive(Parser, Debug)]
#[command(name = "shellpane")]
#[command(about = "Run an interactive shell behind a line-buffered input area", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to log file for diagnostics (default: the state directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Print the JSON Schema of the configuration file and exit
    #[arg(long)]
    dump_schema: bool,
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    if args.dump_schema {
        let json = serde_json::to_string_pretty(&Config::schema())
            .context("Failed to serialize schema")?;
        println!("{}", json);
        return Ok(());
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;

    if args.dump_config {
        let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{}", json);
        return Ok(());
    }

    let log_file = args.log_file.clone().unwrap_or_else(log_dirs::main_log_path);
    if !tracing_setup::init_global(&log_file) {
        eprintln!("Warning: logging disabled, could not open {}", log_file.display());
    }
    log_dirs::cleanup_stale_logs();
    tracing::info!("shellpane starting, log file {:?}", log_file);

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        terminal_modes::emergency_cleanup();
        original_hook(panic);
    }));

    let mut app = ShellApp::from_config(&config).context("Invalid shell configuration")?;

    let _modes = TerminalModes::enable(config.view.mouse)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    app.start();
    let result = run_event_loop(&mut app, &mut terminal);

    if let Err(e) = &result {
        tracing::error!("Event loop failed: {:#}", e);
    }
    tracing::info!("shellpane exiting");
    result
}

fn run_event_loop(
    app: &mut ShellApp,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> AnyhowResult<()> {
    const FRAME_DURATION: Duration = Duration::from_millis(16); // 60fps
    let mut last_render = Instant::now();
    let mut needs_render = true;

    loop {
        if app.process_async_messages() {
            needs_render = true;
        }

        if app.should_quit() {
            break;
        }

        if needs_render && last_render.elapsed() >= FRAME_DURATION {
            terminal.draw(|frame| app.render(frame))?;
            last_render = Instant::now();
            needs_render = false;
        }

        let timeout = if needs_render {
            FRAME_DURATION.saturating_sub(last_render.elapsed())
        } else {
            // Short enough that process output shows up promptly
            Duration::from_millis(10)
        };
        if !event_poll(timeout)? {
            continue;
        }

        match event_read()? {
            CrosstermEvent::Key(key_event) => {
                if key_event.kind == KeyEventKind::Press {
                    app.handle_key(key_event);
                    needs_render = true;
                }
            }
            CrosstermEvent::Mouse(mouse_event) => {
                if app.handle_mouse(mouse_event) {
                    needs_render = true;
                }
            }
            CrosstermEvent::Resize(_, _) => {
                needs_render = true;
            }
            CrosstermEvent::Paste(text) => {
                app.paste_text(text);
                needs_render = true;
            }
            _ => {}
        }
    }

    Ok(())
}
