//! Interactive story reader TUI.
//!
//! A terminal interface for reading branching stories, with an optional
//! AI storyteller chat.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-based interface suitable for automated testing:
//!
//! ```bash
//! cargo run -p storyteller -- --headless --story story-1
//! ```

mod app;
mod events;
mod headless;
mod services;
mod toasts;
mod ui;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io::{self, stdout};
use std::sync::Mutex;
use std::time::Duration;
use storyteller_core::ReaderConfig;
use tracing_subscriber::EnvFilter;

use app::App;
use events::{handle_event, EventResult};
use services::Services;
use ui::render;

const DEFAULT_LOG_FILTER: &str = "storyteller=info,storyteller_core=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = match ReaderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let headless = args.iter().any(|a| a == "--headless");
    if headless {
        // Headless output goes to stdout, so logs go to stderr.
        tracing_subscriber::fmt()
            .with_env_filter(log_filter())
            .with_writer(io::stderr)
            .init();
    } else {
        // The TUI owns the terminal, so logs go to a file.
        std::fs::create_dir_all(config.data_dir())?;
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log_path())?;
        tracing_subscriber::fmt()
            .with_env_filter(log_filter())
            .with_writer(Mutex::new(log_file))
            .with_ansi(false)
            .init();
    }

    let services = match Services::load(config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load stories: {e}");
            std::process::exit(1);
        }
    };

    if headless {
        let story = headless::parse_story_from_args(&args);
        return headless::run_headless(services, story)
            .await
            .map_err(|e| e.into());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(services)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    // Track a submitted chat prompt for async processing
    let mut pending_prompt: Option<String> = None;

    loop {
        app.pull_toasts();
        terminal.draw(|f| render(f, &app))?;

        if let Some(prompt) = pending_prompt.take() {
            app.chat_pending = true;
            app.set_status("The storyteller is thinking...");
            terminal.draw(|f| render(f, &app))?;

            app.ask_storyteller(&prompt).await;
            continue;
        }

        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            match handle_event(&mut app, ev) {
                EventResult::Quit => return Ok(()),
                EventResult::SubmitPrompt(prompt) => pending_prompt = Some(prompt),
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        }
    }
}

fn print_help() {
    println!("Storyteller - interactive branching stories");
    println!();
    println!("USAGE:");
    println!("  storyteller [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help       Show this help message");
    println!("  --headless       Run in headless mode (text-only, no TUI)");
    println!();
    println!("HEADLESS OPTIONS (only with --headless):");
    println!("  --story <ID>     Open a story right away (e.g. story-1)");
    println!();
    println!("ENVIRONMENT:");
    println!("  STORYTELLER_DATA_DIR       Where progress and logs are kept (default: .storyteller)");
    println!("  STORYTELLER_CATALOG        Extra stories to load from a JSON file");
    println!("  STORYTELLER_FLAGS          Local feature flags, comma separated");
    println!("  STORYTELLER_SHARE_URL      Base URL of shared story links");
    println!("  FLAGSMITH_ENVIRONMENT_ID   Fetch feature flags from Flagsmith");
    println!("  GROQ_API_KEY               Enable the AI storyteller");
    println!("  GROQ_MODEL                 Model used by the AI storyteller");
    println!("  RUST_LOG                   Log filter");
    println!();
    println!("EXAMPLES:");
    println!("  storyteller                               # Interactive TUI mode");
    println!("  storyteller --headless --story story-2    # Headless reading");
}
