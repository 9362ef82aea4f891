mod app;
mod clipboard;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::supports_keyboard_enhancement;
use parley_core::config::{DATA_DIR_ENV, ENDPOINT_ENV};
use parley_core::logging::init_file_logging;
use parley_core::{
    AppConfig, ChatStateRepository, ConversationController, HttpAssistantClient, JsonFileStore,
};
use tracing::{info, warn};

use crate::app::App;

/// Terminal chat client for the Parley assistant
#[derive(Debug, Parser)]
#[command(name = "parley", version, about)]
struct Args {
    /// Assistant reply endpoint (overrides config and PARLEY_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory holding chats, preferences and the log file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where exported messages are written (defaults to the working directory)
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(|key| match key {
            ENDPOINT_ENV => args.endpoint.clone(),
            DATA_DIR_ENV => args.data_dir.as_ref().map(|d| d.display().to_string()),
            _ => None,
        })
        .context("Invalid command line option")?;

    let data_dir = config
        .resolved_data_dir()
        .context("Failed to resolve data directory")?;
    let log_path = init_file_logging(&data_dir, &config.log_filter)
        .context("Failed to initialize logging")?;
    info!(log = %log_path.display(), endpoint = %config.endpoint, "Starting Parley");

    let store = JsonFileStore::open(&data_dir)
        .with_context(|| format!("Failed to open storage in {}", data_dir.display()))?;
    let store = match config.storage_quota_bytes {
        Some(quota) => store.with_quota(quota),
        None => store,
    };
    let controller = ConversationController::load(ChatStateRepository::new(store));
    let client = Arc::new(HttpAssistantClient::new(config.endpoint.clone()));

    let export_dir = match args.export_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read working directory")?,
    };

    let app = App::new(controller, client, export_dir, config.share_base_url.clone());

    let mut terminal = ratatui::try_init().context("Failed to initialize terminal")?;
    // Lets Shift+Enter arrive as a modified Enter instead of a bare one
    let enhanced = matches!(supports_keyboard_enhancement(), Ok(true))
        && execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .is_ok();

    let result = app.run(&mut terminal).await;

    if enhanced && let Err(e) = execute!(std::io::stdout(), PopKeyboardEnhancementFlags) {
        warn!(error = ?e, "Failed to restore keyboard mode");
    }
    ratatui::restore();

    info!("Parley exited");
    result
}
