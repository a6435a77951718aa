//! [`OvalDb`]: the dialect-qualified connection gateway and lookup
//! facade.

use std::{
  str::FromStr as _,
  sync::{
    Arc, OnceLock,
    atomic::{AtomicU32, Ordering},
  },
};

use ovaldict_core::{family::Family, models::Definition};
use sqlx::{
  AnyPool, ConnectOptions as _,
  any::{AnyConnectOptions, AnyPoolOptions},
};
use tokio::sync::Mutex;

use crate::{
  dialect::{Dialect, redact},
  driver::Driver,
  error::{Error, Result},
  schema,
};

// ─── Schema guard ────────────────────────────────────────────────────────────

/// Process-wide barrier ensuring schema migration runs exactly once no
/// matter how many connections are opened.
///
/// Cloning shares the barrier. Production opens go through the process
/// default (see [`OvalDb::open`]); tests construct their own guard to
/// observe the run counter in isolation.
#[derive(Clone, Default)]
pub struct SchemaGuard {
  inner: Arc<GuardInner>,
}

#[derive(Default)]
struct GuardInner {
  done: Mutex<bool>,
  runs: AtomicU32,
}

impl SchemaGuard {
  pub fn new() -> Self {
    Self::default()
  }

  /// How many times migration actually executed under this guard.
  pub fn runs(&self) -> u32 {
    self.inner.runs.load(Ordering::SeqCst)
  }

  /// Run migration under the barrier unless a previous call completed it.
  ///
  /// The lock is held across the migration itself so concurrent
  /// first-openers cannot race; a failed migration leaves the flag unset
  /// and the next open retries.
  async fn ensure(&self, pool: &AnyPool, dialect: Dialect) -> Result<()> {
    let mut done = self.inner.done.lock().await;
    if *done {
      return Ok(());
    }
    schema::migrate(pool, dialect).await?;
    self.inner.runs.fetch_add(1, Ordering::SeqCst);
    *done = true;
    Ok(())
  }
}

fn process_guard() -> &'static SchemaGuard {
  static GUARD: OnceLock<SchemaGuard> = OnceLock::new();
  GUARD.get_or_init(SchemaGuard::new)
}

/// The `Any` driver needs its concrete drivers registered once per
/// process before the first connection.
fn install_drivers() {
  static INSTALL: std::sync::Once = std::sync::Once::new();
  INSTALL.call_once(sqlx::any::install_default_drivers);
}

// ─── OvalDb ──────────────────────────────────────────────────────────────────

/// An opened OVAL dictionary database.
///
/// Cloning is cheap; the pool is reference-counted. One handle serves
/// every OS family; family-specific behavior lives in the [`Driver`]
/// built per lookup.
#[derive(Clone)]
pub struct OvalDb {
  pool:    AnyPool,
  dialect: Dialect,
}

impl OvalDb {
  /// Open (or create) the database behind `target` and make sure the
  /// schema exists.
  ///
  /// The first successful open in the process migrates; later opens skip
  /// it. sqlite additionally gets WAL journaling once per open and
  /// cascading foreign keys on every pooled connection.
  pub async fn open(dialect: Dialect, target: &str, debug_sql: bool) -> Result<Self> {
    Self::open_with_guard(dialect, target, debug_sql, process_guard().clone()).await
  }

  /// [`OvalDb::open`] with a caller-supplied migration barrier.
  pub async fn open_with_guard(
    dialect: Dialect,
    target: &str,
    debug_sql: bool,
    guard: SchemaGuard,
  ) -> Result<Self> {
    install_drivers();

    let url = dialect.connection_url(target)?;
    let mut options = AnyConnectOptions::from_str(&url).map_err(|e| Error::Open {
      dialect,
      target: redact(target),
      source: e,
    })?;
    if !debug_sql {
      options = options.disable_statement_logging();
    }

    let mut pool_options = AnyPoolOptions::new().max_connections(5);
    if dialect == Dialect::Sqlite3 {
      pool_options = pool_options.after_connect(|conn, _meta| {
        Box::pin(async move {
          // Cascading deletes need this on every sqlite connection.
          sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;
          Ok(())
        })
      });
    }

    let pool = pool_options
      .connect_with(options)
      .await
      .map_err(|e| Error::Open {
        dialect,
        target: redact(target),
        source: e,
      })?;

    guard.ensure(&pool, dialect).await?;

    if dialect == Dialect::Sqlite3 {
      // Lets readers proceed while a writer holds the file.
      sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await
        .map_err(|e| Error::Pragma { pragma: "journal_mode = WAL", source: e })?;
    }

    tracing::debug!(dialect = %dialect, target = %redact(target), "database opened");
    Ok(Self { pool, dialect })
  }

  pub fn dialect(&self) -> Dialect {
    self.dialect
  }

  pub(crate) fn pool(&self) -> &AnyPool {
    &self.pool
  }

  /// Release the pool. Queries on clones of this handle fail afterwards.
  pub async fn close(self) -> Result<()> {
    self.pool.close().await;
    Ok(())
  }

  // ─── Registry facade ───────────────────────────────────────────────────

  /// Driver for an already-parsed family.
  pub fn driver(&self, family: Family) -> Driver {
    Driver::new(family, self.pool.clone())
  }

  /// Parse `family` and build its driver. Unknown identifiers fail here,
  /// before any query runs.
  pub fn resolve(&self, family: &str) -> Result<Driver> {
    let family = family.parse::<Family>()?;
    Ok(self.driver(family))
  }

  /// Definitions matching `pack_name`, dispatching on the raw `family`
  /// identifier.
  pub async fn get_by_pack_name(
    &self,
    family: &str,
    os_ver: &str,
    pack_name: &str,
  ) -> Result<Vec<Definition>> {
    use ovaldict_core::store::OvalStore as _;
    self.resolve(family)?.get_by_pack_name(os_ver, pack_name).await
  }

  /// Definitions matching `cve_id`, dispatching on the raw `family`
  /// identifier.
  pub async fn get_by_cve_id(
    &self,
    family: &str,
    os_ver: &str,
    cve_id: &str,
  ) -> Result<Vec<Definition>> {
    use ovaldict_core::store::OvalStore as _;
    self.resolve(family)?.get_by_cve_id(os_ver, cve_id).await
  }
}
