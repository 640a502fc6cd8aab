use clap::Parser;
use papershelf::config::{self, Settings};
use papershelf::{logging, Database};
use std::path::PathBuf;

/// Open a paper library, print its MetaInfo, and close it again.
#[derive(Parser, Debug)]
#[command(name = "papershelf", version, about)]
struct Cli {
    /// Library file to open (created if missing)
    path: Option<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // An explicit PATH doesn't need the settings, so a broken file only warns.
    let (settings, settings_err) = match cli.path {
        Some(_) => Settings::load_or_default(),
        None => (Settings::load()?, None),
    };
    let _guard = logging::init(settings.log_filter.as_deref(), settings.log_dir.as_deref());
    if let Some(e) = &settings_err {
        tracing::warn!("Ignoring unreadable settings: {}", e);
    }

    let path = match cli.path {
        Some(path) => path,
        None => {
            let path = settings.resolve_library_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
    };

    let db = Database::open(&path)?;
    match db.meta_info() {
        Ok(meta) => println!("{}", serde_json::to_string_pretty(&meta)?),
        Err(e) => {
            // Still release the handle before reporting.
            let _ = db.close();
            return Err(e.into());
        }
    }
    db.close()?;

    // Leave an unreadable settings file as it is rather than overwrite it.
    if settings_err.is_none() {
        let mut settings = settings;
        settings.remember_library(&path);
        settings.save()?;
        tracing::debug!("Recorded {:?} in {:?}", path, config::settings_path()?);
    }

    Ok(())
}
