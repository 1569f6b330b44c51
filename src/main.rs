// main.rs

// Module declarations
mod app;
mod backend;
mod config;
mod location;
mod map;
mod message;
mod orchestrator;
mod state;
mod terminal;
mod timeline;
mod transcript;

use crate::app::App;
use crate::backend::HttpAnswerBackend;
use crate::config::{Config, CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH};
use crate::location::{DisabledLocationExtractor, LocationExtractor, OllamaLocationExtractor};
use crate::map::{MapView, MapZoomNotifier};
use crate::orchestrator::QueryOrchestrator;
use crate::state::OrchestratorState;
use crate::terminal::TerminalGuard;
use colored::*;
use log::{info, warn};
use std::cell::RefCell;
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::task::LocalSet;

/// Environment variable read by cli-log to pick the log level.
const LOG_LEVEL_VAR: &str = "FLOATCHAT_LOG";

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Load configuration file
    let config_path = env::var(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let first_run = !config_path.exists();
    let config = Config::load_or_default(&config_path)?;

    if config.debug && env::var_os(LOG_LEVEL_VAR).is_none() {
        env::set_var(LOG_LEVEL_VAR, "debug");
    }
    cli_log::init_cli_log!();
    if first_run {
        // Leave an editable copy of the defaults behind.
        match config.save(&config_path) {
            Ok(()) => info!("wrote default configuration to {}", config_path.display()),
            Err(e) => warn!("could not write {}: {}", config_path.display(), e),
        }
    } else {
        info!("configuration loaded from {}", config_path.display());
    }

    let question = env::args().skip(1).collect::<Vec<_>>().join(" ");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if question.trim().is_empty() {
        let local = LocalSet::new();
        local.block_on(&runtime, run_tui(&config))
    } else {
        runtime.block_on(run_once(&config, question))
    }
}

/// Wires the orchestrator to its services and to a fresh map.
fn build_session(
    config: &Config,
    greeting: Option<&str>,
) -> color_eyre::Result<(QueryOrchestrator, Rc<RefCell<MapView>>)> {
    let locations: Rc<dyn LocationExtractor> = if config.location.enabled {
        Rc::new(OllamaLocationExtractor::new(
            config.location.ollama_host.clone(),
            config.location.ollama_port,
            config.location.model.clone(),
        )?)
    } else {
        Rc::new(DisabledLocationExtractor)
    };
    let backend = Rc::new(HttpAnswerBackend::new(config.backend.query_url.clone()));
    info!("answering questions with {}", backend.query_url());

    let map = Rc::new(RefCell::new(MapView::new()));
    let target = Rc::clone(&map);
    let notifier: MapZoomNotifier = Rc::new(move |location: &str| target.borrow_mut().zoom_to_location(location));

    let orchestrator = QueryOrchestrator::new(OrchestratorState::new(greeting), locations, backend, notifier);
    Ok((orchestrator, map))
}

async fn run_tui(config: &Config) -> color_eyre::Result<()> {
    let (orchestrator, map) = build_session(config, config.greeting.as_deref())?;
    let mut app = App::new(orchestrator, map);

    let mut guard = TerminalGuard::enter()?;
    app.run(guard.terminal_mut()).await?;
    Ok(())
}

/// Answers a single question from the command line and prints the result.
async fn run_once(config: &Config, question: String) -> color_eyre::Result<()> {
    let (orchestrator, map) = build_session(config, None)?;
    let local = LocalSet::new();

    tokio::select! {
        _ = local.run_until(orchestrator.submit_query(question)) => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("query interrupted");
            println!("{}", "Interrupted.".yellow());
            return Ok(());
        }
    }
    // Let the location lookup land before printing the map.
    tokio::select! {
        _ = local => {}
        _ = tokio::signal::ctrl_c() => warn!("location lookup abandoned"),
    }

    transcript::print_transcript(&orchestrator.messages(), &map.borrow());
    Ok(())
}
