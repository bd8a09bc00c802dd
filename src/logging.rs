use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;

/// Log file location. The terminal belongs to the UI, so logs go to disk.
pub fn log_path() -> PathBuf {
    let state_dir = if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        PathBuf::from(xdg)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local").join("state")
    } else {
        std::env::temp_dir()
    };
    state_dir.join("mailpage").join("mailpage.log")
}

/// Route the `log` macros to the log file. `RUST_LOG` picks the level,
/// defaulting to info. Falls back to stderr if the file can't be opened.
pub fn init() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let path = log_path();
    let file = path
        .parent()
        .map(fs::create_dir_all)
        .unwrap_or(Ok(()))
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));
    match file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("Cannot open log file {}: {}", path.display(), e),
    }

    let _ = builder.try_init();
}

pub fn clear() -> io::Result<()> {
    let path = log_path();
    if path.exists() {
        fs::write(&path, "")?;
    }
    Ok(())
}
