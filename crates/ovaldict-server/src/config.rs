//! Server configuration: flags, config file, and environment, resolved
//! into one [`ServerConfig`].
//!
//! Precedence, lowest to highest: built-in defaults, the TOML config
//! file, `OVALDICT_*` environment variables, command-line flags. The
//! resolved dialect and target are validated here so a bad configuration
//! fails before any I/O happens.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use ovaldict_store::Dialect;
use serde::Deserialize;

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 1324;
const DEFAULT_LOG_DIR: &str = "/var/log/ovaldict";

// ─── CLI flags ───────────────────────────────────────────────────────────────

#[derive(Args, Debug, Default)]
pub struct ServerArgs {
  /// Path to a TOML configuration file.
  #[arg(short, long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Database dialect: sqlite3 or mysql.
  #[arg(long, value_name = "DIALECT")]
  pub dbtype: Option<String>,

  /// Database location: a file path for sqlite3, a DSN for mysql.
  #[arg(long, value_name = "PATH")]
  pub dbpath: Option<String>,

  /// Address to bind.
  #[arg(long, value_name = "ADDR")]
  pub bind: Option<String>,

  /// Port to listen on.
  #[arg(long, value_name = "PORT")]
  pub port: Option<u16>,

  /// Log debug and above.
  #[arg(long)]
  pub debug: bool,

  /// Log every SQL statement.
  #[arg(long = "debug-sql")]
  pub debug_sql: bool,

  /// Suppress terminal logging; the log file stays on.
  #[arg(long)]
  pub quiet: bool,

  /// Directory for the log file.
  #[arg(long, value_name = "DIR")]
  pub log_dir: Option<PathBuf>,
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file; every key may be omitted.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
  dbtype:  Option<String>,
  dbpath:  Option<String>,
  bind:    Option<String>,
  port:    Option<u16>,
  log_dir: Option<PathBuf>,
}

// ─── Resolved configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub dialect:   Dialect,
  pub dbpath:    String,
  pub bind:      String,
  pub port:      u16,
  pub debug:     bool,
  pub debug_sql: bool,
  pub quiet:     bool,
  pub log_dir:   PathBuf,
}

impl ServerConfig {
  /// Layer defaults, config file, environment, and flags into a validated
  /// configuration.
  pub fn resolve(args: &ServerArgs) -> Result<Self> {
    let mut builder = config::Config::builder();
    builder = match &args.config {
      // An explicitly named file must exist.
      Some(path) => builder.add_source(config::File::from(path.clone()).required(true)),
      None => builder.add_source(config::File::with_name("ovaldict").required(false)),
    };
    let settings = builder
      .add_source(config::Environment::with_prefix("OVALDICT").try_parsing(true))
      .build()
      .context("failed to read configuration")?;
    let file: FileConfig = settings
      .try_deserialize()
      .context("failed to deserialise configuration")?;

    let dbtype = args
      .dbtype
      .clone()
      .or(file.dbtype)
      .unwrap_or_else(|| Dialect::Sqlite3.as_str().to_string());
    let dialect = dbtype.parse::<Dialect>()?;

    let dbpath = match args.dbpath.clone().or(file.dbpath) {
      Some(path) => path,
      None => default_dbpath()?,
    };
    // Catches mismatched dialect/target pairs before any connection.
    dialect
      .connection_url(&dbpath)
      .with_context(|| format!("invalid {dialect} target {dbpath:?}"))?;

    Ok(ServerConfig {
      dialect,
      dbpath,
      bind: args
        .bind
        .clone()
        .or(file.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string()),
      port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
      debug: args.debug,
      debug_sql: args.debug_sql,
      quiet: args.quiet,
      log_dir: args
        .log_dir
        .clone()
        .or(file.log_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
    })
  }
}

/// `oval.sqlite3` in the working directory, as for the sqlite3 default
/// dialect.
fn default_dbpath() -> Result<String> {
  let dir = std::env::current_dir().context("resolving working directory")?;
  Ok(dir.join("oval.sqlite3").to_string_lossy().into_owned())
}
