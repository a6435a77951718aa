//! Schema DDL and the migration that applies it.
//!
//! The schema is an explicit table/index inventory, not anything
//! reflective: every entity of the model has exactly one table below, and
//! every lookup path has its index. Both dialects share table and column
//! names; only the type vocabulary and constraint syntax differ (MySQL
//! ignores inline `REFERENCES`, caps index key length, and has no
//! `CREATE INDEX IF NOT EXISTS`).

use sqlx::AnyPool;

use crate::{
  dialect::Dialect,
  error::{Error, Result},
};

// ─── Tables ──────────────────────────────────────────────────────────────────

static SQLITE_TABLES: [(&str, &str); 10] = [
  (
    "fetch_metas",
    "CREATE TABLE IF NOT EXISTS fetch_metas (
       id        INTEGER PRIMARY KEY AUTOINCREMENT,
       file_name TEXT NOT NULL UNIQUE,
       timestamp TEXT NOT NULL
     )",
  ),
  (
    "roots",
    "CREATE TABLE IF NOT EXISTS roots (
       id         INTEGER PRIMARY KEY AUTOINCREMENT,
       family     TEXT NOT NULL,
       os_version TEXT NOT NULL
     )",
  ),
  (
    "definitions",
    "CREATE TABLE IF NOT EXISTS definitions (
       id            INTEGER PRIMARY KEY AUTOINCREMENT,
       root_id       INTEGER NOT NULL REFERENCES roots(id) ON DELETE CASCADE,
       definition_id TEXT NOT NULL,
       title         TEXT NOT NULL,
       description   TEXT NOT NULL
     )",
  ),
  (
    "packages",
    "CREATE TABLE IF NOT EXISTS packages (
       id            INTEGER PRIMARY KEY AUTOINCREMENT,
       definition_id INTEGER NOT NULL REFERENCES definitions(id) ON DELETE CASCADE,
       name          TEXT NOT NULL,
       version       TEXT NOT NULL,
       not_fixed_yet INTEGER NOT NULL
     )",
  ),
  (
    "refs",
    "CREATE TABLE IF NOT EXISTS refs (
       id            INTEGER PRIMARY KEY AUTOINCREMENT,
       definition_id INTEGER NOT NULL REFERENCES definitions(id) ON DELETE CASCADE,
       source        TEXT NOT NULL,
       ref_id        TEXT NOT NULL,
       ref_url       TEXT NOT NULL
     )",
  ),
  (
    "advisories",
    "CREATE TABLE IF NOT EXISTS advisories (
       id            INTEGER PRIMARY KEY AUTOINCREMENT,
       definition_id INTEGER NOT NULL REFERENCES definitions(id) ON DELETE CASCADE,
       severity      TEXT NOT NULL,
       issued        TEXT,
       updated       TEXT
     )",
  ),
  (
    "cves",
    "CREATE TABLE IF NOT EXISTS cves (
       id          INTEGER PRIMARY KEY AUTOINCREMENT,
       advisory_id INTEGER NOT NULL REFERENCES advisories(id) ON DELETE CASCADE,
       cve_id      TEXT NOT NULL,
       cvss2       TEXT NOT NULL,
       cvss3       TEXT NOT NULL,
       cwe         TEXT NOT NULL,
       impact      TEXT NOT NULL,
       href        TEXT NOT NULL,
       public      TEXT NOT NULL
     )",
  ),
  (
    "bugzillas",
    "CREATE TABLE IF NOT EXISTS bugzillas (
       id          INTEGER PRIMARY KEY AUTOINCREMENT,
       advisory_id INTEGER NOT NULL REFERENCES advisories(id) ON DELETE CASCADE,
       bugzilla_id TEXT NOT NULL,
       url         TEXT NOT NULL,
       title       TEXT NOT NULL
     )",
  ),
  (
    "cpes",
    "CREATE TABLE IF NOT EXISTS cpes (
       id          INTEGER PRIMARY KEY AUTOINCREMENT,
       advisory_id INTEGER NOT NULL REFERENCES advisories(id) ON DELETE CASCADE,
       cpe         TEXT NOT NULL
     )",
  ),
  (
    "debians",
    "CREATE TABLE IF NOT EXISTS debians (
       id            INTEGER PRIMARY KEY AUTOINCREMENT,
       definition_id INTEGER NOT NULL REFERENCES definitions(id) ON DELETE CASCADE,
       cve_id        TEXT NOT NULL,
       moreinfo      TEXT NOT NULL,
       date          TEXT
     )",
  ),
];

static MYSQL_TABLES: [(&str, &str); 10] = [
  (
    "fetch_metas",
    "CREATE TABLE IF NOT EXISTS fetch_metas (
       id        BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       file_name VARCHAR(255) NOT NULL UNIQUE,
       timestamp VARCHAR(64) NOT NULL
     )",
  ),
  (
    "roots",
    "CREATE TABLE IF NOT EXISTS roots (
       id         BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       family     VARCHAR(255) NOT NULL,
       os_version VARCHAR(255) NOT NULL
     )",
  ),
  (
    "definitions",
    "CREATE TABLE IF NOT EXISTS definitions (
       id            BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       root_id       BIGINT NOT NULL,
       definition_id VARCHAR(255) NOT NULL,
       title         TEXT NOT NULL,
       description   TEXT NOT NULL,
       FOREIGN KEY (root_id) REFERENCES roots(id) ON DELETE CASCADE
     )",
  ),
  (
    "packages",
    "CREATE TABLE IF NOT EXISTS packages (
       id            BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       definition_id BIGINT NOT NULL,
       name          VARCHAR(255) NOT NULL,
       version       VARCHAR(255) NOT NULL,
       not_fixed_yet INTEGER NOT NULL,
       FOREIGN KEY (definition_id) REFERENCES definitions(id) ON DELETE CASCADE
     )",
  ),
  (
    "refs",
    "CREATE TABLE IF NOT EXISTS refs (
       id            BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       definition_id BIGINT NOT NULL,
       source        VARCHAR(255) NOT NULL,
       ref_id        VARCHAR(255) NOT NULL,
       ref_url       TEXT NOT NULL,
       FOREIGN KEY (definition_id) REFERENCES definitions(id) ON DELETE CASCADE
     )",
  ),
  (
    "advisories",
    "CREATE TABLE IF NOT EXISTS advisories (
       id            BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       definition_id BIGINT NOT NULL,
       severity      VARCHAR(255) NOT NULL,
       issued        VARCHAR(64),
       updated       VARCHAR(64),
       FOREIGN KEY (definition_id) REFERENCES definitions(id) ON DELETE CASCADE
     )",
  ),
  (
    "cves",
    "CREATE TABLE IF NOT EXISTS cves (
       id          BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       advisory_id BIGINT NOT NULL,
       cve_id      VARCHAR(255) NOT NULL,
       cvss2       VARCHAR(255) NOT NULL,
       cvss3       VARCHAR(255) NOT NULL,
       cwe         VARCHAR(255) NOT NULL,
       impact      VARCHAR(255) NOT NULL,
       href        TEXT NOT NULL,
       public      VARCHAR(255) NOT NULL,
       FOREIGN KEY (advisory_id) REFERENCES advisories(id) ON DELETE CASCADE
     )",
  ),
  (
    "bugzillas",
    "CREATE TABLE IF NOT EXISTS bugzillas (
       id          BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       advisory_id BIGINT NOT NULL,
       bugzilla_id VARCHAR(255) NOT NULL,
       url         TEXT NOT NULL,
       title       TEXT NOT NULL,
       FOREIGN KEY (advisory_id) REFERENCES advisories(id) ON DELETE CASCADE
     )",
  ),
  (
    "cpes",
    "CREATE TABLE IF NOT EXISTS cpes (
       id          BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       advisory_id BIGINT NOT NULL,
       cpe         VARCHAR(255) NOT NULL,
       FOREIGN KEY (advisory_id) REFERENCES advisories(id) ON DELETE CASCADE
     )",
  ),
  (
    "debians",
    "CREATE TABLE IF NOT EXISTS debians (
       id            BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
       definition_id BIGINT NOT NULL,
       cve_id        VARCHAR(255) NOT NULL,
       moreinfo      TEXT NOT NULL,
       date          VARCHAR(64),
       FOREIGN KEY (definition_id) REFERENCES definitions(id) ON DELETE CASCADE
     )",
  ),
];

pub(crate) fn table_ddl(dialect: Dialect) -> &'static [(&'static str, &'static str)] {
  match dialect {
    Dialect::Sqlite3 => &SQLITE_TABLES,
    Dialect::Mysql => &MYSQL_TABLES,
  }
}

// ─── Indexes ─────────────────────────────────────────────────────────────────

pub(crate) struct Index {
  pub name:   &'static str,
  pub table:  &'static str,
  pub column: &'static str,
}

/// The lookup indexes, one per child-to-parent edge plus the two query
/// entry points (package name, Debian CVE id). None enforce uniqueness.
pub(crate) static INDEXES: [Index; 10] = [
  Index { name: "idx_definitions_root_id", table: "definitions", column: "root_id" },
  Index { name: "idx_packages_definition_id", table: "packages", column: "definition_id" },
  Index { name: "idx_packages_name", table: "packages", column: "name" },
  Index { name: "idx_refs_definition_id", table: "refs", column: "definition_id" },
  Index { name: "idx_advisories_definition_id", table: "advisories", column: "definition_id" },
  Index { name: "idx_cves_advisory_id", table: "cves", column: "advisory_id" },
  Index { name: "idx_bugzillas_advisory_id", table: "bugzillas", column: "advisory_id" },
  Index { name: "idx_cpes_advisory_id", table: "cpes", column: "advisory_id" },
  Index { name: "idx_debians_definition_id", table: "debians", column: "definition_id" },
  Index { name: "idx_debians_cve_id", table: "debians", column: "cve_id" },
];

pub(crate) fn create_index_sql(idx: &Index, if_not_exists: bool) -> String {
  let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
  format!(
    "CREATE INDEX {guard}{} ON {} ({})",
    idx.name, idx.table, idx.column
  )
}

// ─── Migration ───────────────────────────────────────────────────────────────

/// Create every table and index, idempotently. Any failure aborts with the
/// object that failed; callers must not serve queries after an error.
pub(crate) async fn migrate(pool: &AnyPool, dialect: Dialect) -> Result<()> {
  for &(table, ddl) in table_ddl(dialect) {
    sqlx::query(ddl)
      .execute(pool)
      .await
      .map_err(|e| Error::Migration { object: table, source: e })?;
  }

  for idx in &INDEXES {
    match dialect {
      Dialect::Sqlite3 => {
        sqlx::query(&create_index_sql(idx, true))
          .execute(pool)
          .await
          .map_err(|e| Error::Migration { object: idx.name, source: e })?;
      }
      Dialect::Mysql => {
        // MySQL has no CREATE INDEX IF NOT EXISTS; probe the catalog.
        let exists = sqlx::query(
          "SELECT 1 FROM information_schema.statistics
           WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?",
        )
        .bind(idx.table)
        .bind(idx.name)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Migration { object: idx.name, source: e })?
        .is_some();

        if !exists {
          sqlx::query(&create_index_sql(idx, false))
            .execute(pool)
            .await
            .map_err(|e| Error::Migration { object: idx.name, source: e })?;
        }
      }
    }
  }

  tracing::debug!(dialect = %dialect, "schema migration complete");
  Ok(())
}
