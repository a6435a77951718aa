//! The `ovaldict` OVAL dictionary lookup server.
//!
//! # Usage
//!
//! ```
//! ovaldict server
//! ovaldict server --dbtype mysql --dbpath mysql://oval@db:3306/oval
//! OVALDICT_PORT=8000 ovaldict server --quiet
//! ```
//!
//! Configuration errors (unknown dialect, mismatched target, unreadable
//! config file) exit with status 2 before touching the database; runtime
//! failures exit with status 1.

mod config;
mod logging;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ovaldict_store::OvalDb;
use tokio::net::TcpListener;

use crate::config::{ServerArgs, ServerConfig};

// ─── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ovaldict", version, about = "OVAL dictionary lookup server")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Start the HTTP lookup server.
  Server(ServerArgs),
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  match cli.command {
    Command::Server(args) => serve(args).await,
  }
}

async fn serve(args: ServerArgs) -> ExitCode {
  let cfg = match ServerConfig::resolve(&args) {
    Ok(cfg) => cfg,
    Err(err) => {
      // Logging is not up yet; report the config problem directly.
      eprintln!("{err:#}");
      return ExitCode::from(2);
    }
  };

  logging::init(&cfg);

  match run(cfg).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      tracing::error!("{err:#}");
      ExitCode::FAILURE
    }
  }
}

async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
  // Open errors already name the dialect and a credential-free target.
  let db = OvalDb::open(cfg.dialect, &cfg.dbpath, cfg.debug_sql).await?;

  let app = ovaldict_api::router(Arc::new(db));
  let address = format!("{}:{}", cfg.bind, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  tracing::info!(dialect = %cfg.dialect, "Listening on http://{address}");
  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
