//! Tracing setup: a terminal layer on stderr and an append-only log file.
//!
//! `RUST_LOG` overrides the flag-derived filter when set. A log file that
//! cannot be created degrades to terminal-only logging with a warning on
//! stderr; with `--quiet` that leaves no sinks, which is what quiet asks
//! for.

use std::{fs, path::Path, sync::Arc};

use tracing_subscriber::{
  EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::config::ServerConfig;

const LOG_FILE: &str = "ovaldict.log";

pub fn init(cfg: &ServerConfig) {
  let filter = match EnvFilter::try_from_default_env() {
    Ok(filter) => filter,
    Err(_) => {
      let mut directives =
        String::from(if cfg.debug { "debug" } else { "info" });
      if cfg.debug_sql {
        directives.push_str(",sqlx=debug");
      }
      EnvFilter::new(directives)
    }
  };

  let file_layer = open_log_file(&cfg.log_dir).map(|file| {
    fmt::layer()
      .with_ansi(false)
      .with_writer(Arc::new(file))
  });
  let stderr_layer = (!cfg.quiet)
    .then(|| fmt::layer().with_writer(std::io::stderr));

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .with(stderr_layer)
    .init();
}

/// Open `<dir>/ovaldict.log` for appending, creating the directory first.
/// Failure is not fatal; logging falls back to the terminal layer.
fn open_log_file(dir: &Path) -> Option<fs::File> {
  if !dir.exists() {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::DirBuilderExt as _;
      builder.mode(0o700);
    }
    if let Err(err) = builder.create(dir) {
      eprintln!("failed to create log directory {}: {err}", dir.display());
      return None;
    }
  }

  let path = dir.join(LOG_FILE);
  match fs::OpenOptions::new().create(true).append(true).open(&path) {
    Ok(file) => Some(file),
    Err(err) => {
      eprintln!("failed to open log file {}: {err}", path.display());
      None
    }
  }
}
