mod db;
mod models;
mod run;
mod search;
mod state;
mod stats;
mod ui;
mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use db::{KeyValueStore, MemoryStore, Storage};

const DATA_DIR_VAR: &str = "FINTRACK_DATA_DIR";
const DB_FILE: &str = "fintrack.db";
const LOG_FILE: &str = "fintrack.log";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let data_dir = get_data_dir()?;
    let interactive = args.len() == 1;
    init_logging(&data_dir, interactive)?;

    let mut state = state::AppState::load(Storage::new(open_store(&data_dir.join(DB_FILE))));

    if interactive {
        run::as_tui(&mut state)
    } else {
        run::as_cli(&args, &mut state)
    }
}

fn get_rust_log() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into())
}

/// The terminal belongs to the TUI while it runs, so logs go to a file there
/// and to stderr for one-shot commands.
fn init_logging(data_dir: &Path, interactive: bool) -> Result<()> {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(get_rust_log()));
    if interactive {
        let path = data_dir.join(LOG_FILE);
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(log_file)),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

/// SQLite in the data directory, or a throwaway in-memory store when the
/// database cannot be opened.
fn open_store(path: &Path) -> Box<dyn KeyValueStore> {
    match db::Database::open(path) {
        Ok(db) => {
            info!(path = %path.display(), "using database");
            Box::new(db)
        }
        Err(e) => {
            warn!("{e:#}; changes will not outlive this session");
            eprintln!("Warning: {e:#}. Changes will not be saved.");
            Box::new(MemoryStore::default())
        }
    }
}

fn get_data_dir() -> Result<PathBuf> {
    let data_dir = match std::env::var_os(DATA_DIR_VAR) {
        Some(dir) => PathBuf::from(dir),
        None => directories::ProjectDirs::from("com", "fintrack", "FinTrack")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir)
}
