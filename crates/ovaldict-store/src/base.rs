//! Shared driver core: the SQL common to every family driver.
//!
//! Family drivers decide *what* to ask (version scoping, which CVE join);
//! everything here is the *how*: transactions, tree writes, and
//! materialising [`Definition`] subtrees from rows. Timestamps are stored
//! as RFC 3339 text and booleans as integers, the common denominator of
//! the two dialects under the `Any` driver.

use chrono::{DateTime, Utc};
use ovaldict_core::{
  family::Family,
  models::{
    Advisory, Bugzilla, Cpe, Cve, Debian, Definition, FetchMeta, Package,
    Reference, Root,
  },
};
use sqlx::{
  Any, AnyPool, Row as _, Transaction,
  any::{AnyQueryResult, AnyRow},
};

use crate::error::{Error, Result};

// ─── Encoding helpers ────────────────────────────────────────────────────────

fn encode_ts(ts: &DateTime<Utc>) -> String {
  ts.to_rfc3339()
}

fn encode_ts_opt(ts: &Option<DateTime<Utc>>) -> Option<String> {
  ts.as_ref().map(encode_ts)
}

fn decode_ts(value: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(value)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Timestamp { value: value.to_string(), source: e })
}

fn decode_ts_opt(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
  value.as_deref().map(decode_ts).transpose()
}

fn insert_id(result: AnyQueryResult, table: &'static str) -> Result<i64> {
  result.last_insert_id().ok_or(Error::MissingInsertId { table })
}

// ─── Base ────────────────────────────────────────────────────────────────────

/// Family tag plus pool handle; every family driver wraps one of these.
#[derive(Debug)]
pub(crate) struct Base {
  pub(crate) family: Family,
  pool:              AnyPool,
}

impl Base {
  pub(crate) fn new(family: Family, pool: AnyPool) -> Self {
    Self { family, pool }
  }

  /// Text before the first `.` of a version string; most families store
  /// roots keyed by major version only.
  pub(crate) fn major(os_ver: &str) -> &str {
    os_ver.split('.').next().unwrap_or(os_ver)
  }

  // ─── Fetch metadata ────────────────────────────────────────────────────

  /// Idempotent upsert of one fetch-meta record, in its own transaction.
  ///
  /// When the stored timestamp already equals `meta.timestamp` nothing is
  /// written and the transaction is dropped uncommitted (sqlx rolls back
  /// on drop), so the no-op path still releases its resources.
  pub(crate) async fn insert_fetch_meta(&self, meta: &FetchMeta) -> Result<()> {
    let mut tx = self
      .pool
      .begin()
      .await
      .map_err(|e| Error::Write { what: "transaction", source: e })?;

    if upsert_fetch_meta(&mut tx, meta).await? {
      tx.commit()
        .await
        .map_err(|e| Error::Write { what: "transaction", source: e })?;
    }
    Ok(())
  }

  // ─── Oval tree writes ──────────────────────────────────────────────────

  /// Replace the stored batch for `root`'s family+version with `root` and
  /// record `meta`, all in one transaction.
  pub(crate) async fn insert_oval(&self, root: &Root, meta: &FetchMeta) -> Result<()> {
    let mut tx = self
      .pool
      .begin()
      .await
      .map_err(|e| Error::Write { what: "transaction", source: e })?;

    let old = sqlx::query("SELECT id FROM roots WHERE family = ? AND os_version = ?")
      .bind(root.family.as_str())
      .bind(root.os_version.as_str())
      .fetch_optional(&mut *tx)
      .await
      .map_err(Error::Query)?;

    if let Some(row) = old {
      let old_id: i64 = row.try_get("id").map_err(Error::Query)?;
      tracing::debug!(
        family = %root.family,
        os_version = %root.os_version,
        "replacing stored definitions"
      );
      // Cascades through the whole old subtree.
      sqlx::query("DELETE FROM roots WHERE id = ?")
        .bind(old_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Write { what: "oval root", source: e })?;
    }

    let result = sqlx::query("INSERT INTO roots (family, os_version) VALUES (?, ?)")
      .bind(root.family.as_str())
      .bind(root.os_version.as_str())
      .execute(&mut *tx)
      .await
      .map_err(|e| Error::Write { what: "oval root", source: e })?;
    let root_id = insert_id(result, "roots")?;

    for def in &root.definitions {
      insert_definition(&mut tx, root_id, def).await?;
    }

    upsert_fetch_meta(&mut tx, meta).await?;

    tx.commit()
      .await
      .map_err(|e| Error::Write { what: "transaction", source: e })?;

    tracing::info!(
      family = %root.family,
      os_version = %root.os_version,
      definitions = root.definitions.len(),
      "stored OVAL batch"
    );
    Ok(())
  }

  // ─── Lookups ───────────────────────────────────────────────────────────

  /// Definitions for this family whose package list contains `pack_name`,
  /// with `scoped_ver` already narrowed by the caller.
  pub(crate) async fn definitions_by_pack_name(
    &self,
    scoped_ver: &str,
    pack_name: &str,
  ) -> Result<Vec<Definition>> {
    let rows = sqlx::query(
      "SELECT DISTINCT d.id, d.definition_id, d.title, d.description
       FROM definitions d
       JOIN roots r ON r.id = d.root_id
       JOIN packages p ON p.definition_id = d.id
       WHERE r.family = ? AND r.os_version = ? AND p.name = ?
       ORDER BY d.id",
    )
    .bind(self.family.as_str())
    .bind(scoped_ver)
    .bind(pack_name)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;

    self.load_definitions(rows).await
  }

  /// Definitions linked to `cve_id` through their advisory's CVE records.
  pub(crate) async fn definitions_by_advisory_cve(
    &self,
    scoped_ver: &str,
    cve_id: &str,
  ) -> Result<Vec<Definition>> {
    let rows = sqlx::query(
      "SELECT DISTINCT d.id, d.definition_id, d.title, d.description
       FROM definitions d
       JOIN roots r ON r.id = d.root_id
       JOIN advisories a ON a.definition_id = d.id
       JOIN cves c ON c.advisory_id = a.id
       WHERE r.family = ? AND r.os_version = ? AND c.cve_id = ?
       ORDER BY d.id",
    )
    .bind(self.family.as_str())
    .bind(scoped_ver)
    .bind(cve_id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;

    self.load_definitions(rows).await
  }

  /// Definitions carrying `cve_id` directly on their Debian record.
  pub(crate) async fn definitions_by_debian_cve(
    &self,
    scoped_ver: &str,
    cve_id: &str,
  ) -> Result<Vec<Definition>> {
    let rows = sqlx::query(
      "SELECT DISTINCT d.id, d.definition_id, d.title, d.description
       FROM definitions d
       JOIN roots r ON r.id = d.root_id
       JOIN debians deb ON deb.definition_id = d.id
       WHERE r.family = ? AND r.os_version = ? AND deb.cve_id = ?
       ORDER BY d.id",
    )
    .bind(self.family.as_str())
    .bind(scoped_ver)
    .bind(cve_id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;

    self.load_definitions(rows).await
  }

  // ─── Materialisation ───────────────────────────────────────────────────

  async fn load_definitions(&self, rows: Vec<AnyRow>) -> Result<Vec<Definition>> {
    let mut definitions = Vec::with_capacity(rows.len());
    for row in rows {
      definitions.push(self.load_definition(&row).await?);
    }
    Ok(definitions)
  }

  /// Assemble one full [`Definition`] subtree from its header row.
  /// Child collections come back in insertion order (row id).
  async fn load_definition(&self, row: &AnyRow) -> Result<Definition> {
    let id: i64 = row.try_get("id").map_err(Error::Query)?;

    let mut definition = Definition {
      definition_id: row.try_get("definition_id").map_err(Error::Query)?,
      title: row.try_get("title").map_err(Error::Query)?,
      description: row.try_get("description").map_err(Error::Query)?,
      ..Definition::default()
    };

    let pack_rows = sqlx::query(
      "SELECT name, version, not_fixed_yet FROM packages
       WHERE definition_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;
    for p in pack_rows {
      let not_fixed: i64 = p.try_get("not_fixed_yet").map_err(Error::Query)?;
      definition.affected_packs.push(Package {
        name:          p.try_get("name").map_err(Error::Query)?,
        version:       p.try_get("version").map_err(Error::Query)?,
        not_fixed_yet: not_fixed != 0,
      });
    }

    let ref_rows = sqlx::query(
      "SELECT source, ref_id, ref_url FROM refs
       WHERE definition_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;
    for r in ref_rows {
      definition.references.push(Reference {
        source:  r.try_get("source").map_err(Error::Query)?,
        ref_id:  r.try_get("ref_id").map_err(Error::Query)?,
        ref_url: r.try_get("ref_url").map_err(Error::Query)?,
      });
    }

    if let Some(adv) = sqlx::query(
      "SELECT id, severity, issued, updated FROM advisories
       WHERE definition_id = ? ORDER BY id LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await
    .map_err(Error::Query)?
    {
      definition.advisory = self.load_advisory(&adv).await?;
    }

    if let Some(deb) = sqlx::query(
      "SELECT cve_id, moreinfo, date FROM debians
       WHERE definition_id = ? ORDER BY id LIMIT 1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await
    .map_err(Error::Query)?
    {
      definition.debian = Some(Debian {
        cve_id:   deb.try_get("cve_id").map_err(Error::Query)?,
        moreinfo: deb.try_get("moreinfo").map_err(Error::Query)?,
        date:     decode_ts_opt(deb.try_get("date").map_err(Error::Query)?)?,
      });
    }

    Ok(definition)
  }

  async fn load_advisory(&self, row: &AnyRow) -> Result<Advisory> {
    let advisory_id: i64 = row.try_get("id").map_err(Error::Query)?;

    let mut advisory = Advisory {
      severity: row.try_get("severity").map_err(Error::Query)?,
      issued:   decode_ts_opt(row.try_get("issued").map_err(Error::Query)?)?,
      updated:  decode_ts_opt(row.try_get("updated").map_err(Error::Query)?)?,
      ..Advisory::default()
    };

    let cve_rows = sqlx::query(
      "SELECT cve_id, cvss2, cvss3, cwe, impact, href, public FROM cves
       WHERE advisory_id = ? ORDER BY id",
    )
    .bind(advisory_id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;
    for c in cve_rows {
      advisory.cves.push(Cve {
        cve_id: c.try_get("cve_id").map_err(Error::Query)?,
        cvss2:  c.try_get("cvss2").map_err(Error::Query)?,
        cvss3:  c.try_get("cvss3").map_err(Error::Query)?,
        cwe:    c.try_get("cwe").map_err(Error::Query)?,
        impact: c.try_get("impact").map_err(Error::Query)?,
        href:   c.try_get("href").map_err(Error::Query)?,
        public: c.try_get("public").map_err(Error::Query)?,
      });
    }

    let bz_rows = sqlx::query(
      "SELECT bugzilla_id, url, title FROM bugzillas
       WHERE advisory_id = ? ORDER BY id",
    )
    .bind(advisory_id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;
    for b in bz_rows {
      advisory.bugzillas.push(Bugzilla {
        bugzilla_id: b.try_get("bugzilla_id").map_err(Error::Query)?,
        url:         b.try_get("url").map_err(Error::Query)?,
        title:       b.try_get("title").map_err(Error::Query)?,
      });
    }

    let cpe_rows = sqlx::query(
      "SELECT cpe FROM cpes WHERE advisory_id = ? ORDER BY id",
    )
    .bind(advisory_id)
    .fetch_all(&self.pool)
    .await
    .map_err(Error::Query)?;
    for c in cpe_rows {
      advisory.affected_cpe_list.push(Cpe {
        cpe: c.try_get("cpe").map_err(Error::Query)?,
      });
    }

    Ok(advisory)
  }
}

// ─── Transaction-scoped helpers ──────────────────────────────────────────────

/// Select-then-insert-or-update for one fetch-meta record. Returns whether
/// anything was written; `false` means the stored timestamp already
/// matched and the row was left untouched.
async fn upsert_fetch_meta(
  tx: &mut Transaction<'_, Any>,
  meta: &FetchMeta,
) -> Result<bool> {
  let existing = sqlx::query("SELECT id, timestamp FROM fetch_metas WHERE file_name = ?")
    .bind(meta.file_name.as_str())
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Query)?;

  match existing {
    None => {
      sqlx::query("INSERT INTO fetch_metas (file_name, timestamp) VALUES (?, ?)")
        .bind(meta.file_name.as_str())
        .bind(encode_ts(&meta.timestamp))
        .execute(&mut **tx)
        .await
        .map_err(|e| Error::Write { what: "fetch meta", source: e })?;
      Ok(true)
    }
    Some(row) => {
      let id: i64 = row.try_get("id").map_err(Error::Query)?;
      let stored: String = row.try_get("timestamp").map_err(Error::Query)?;
      if decode_ts(&stored)? == meta.timestamp {
        return Ok(false);
      }
      sqlx::query("UPDATE fetch_metas SET file_name = ?, timestamp = ? WHERE id = ?")
        .bind(meta.file_name.as_str())
        .bind(encode_ts(&meta.timestamp))
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| Error::Write { what: "fetch meta", source: e })?;
      Ok(true)
    }
  }
}

async fn insert_definition(
  tx: &mut Transaction<'_, Any>,
  root_id: i64,
  def: &Definition,
) -> Result<()> {
  let result = sqlx::query(
    "INSERT INTO definitions (root_id, definition_id, title, description)
     VALUES (?, ?, ?, ?)",
  )
  .bind(root_id)
  .bind(def.definition_id.as_str())
  .bind(def.title.as_str())
  .bind(def.description.as_str())
  .execute(&mut **tx)
  .await
  .map_err(|e| Error::Write { what: "definition", source: e })?;
  let def_id = insert_id(result, "definitions")?;

  for pack in &def.affected_packs {
    sqlx::query(
      "INSERT INTO packages (definition_id, name, version, not_fixed_yet)
       VALUES (?, ?, ?, ?)",
    )
    .bind(def_id)
    .bind(pack.name.as_str())
    .bind(pack.version.as_str())
    .bind(i64::from(pack.not_fixed_yet))
    .execute(&mut **tx)
    .await
    .map_err(|e| Error::Write { what: "package", source: e })?;
  }

  for reference in &def.references {
    sqlx::query(
      "INSERT INTO refs (definition_id, source, ref_id, ref_url)
       VALUES (?, ?, ?, ?)",
    )
    .bind(def_id)
    .bind(reference.source.as_str())
    .bind(reference.ref_id.as_str())
    .bind(reference.ref_url.as_str())
    .execute(&mut **tx)
    .await
    .map_err(|e| Error::Write { what: "reference", source: e })?;
  }

  let result = sqlx::query(
    "INSERT INTO advisories (definition_id, severity, issued, updated)
     VALUES (?, ?, ?, ?)",
  )
  .bind(def_id)
  .bind(def.advisory.severity.as_str())
  .bind(encode_ts_opt(&def.advisory.issued))
  .bind(encode_ts_opt(&def.advisory.updated))
  .execute(&mut **tx)
  .await
  .map_err(|e| Error::Write { what: "advisory", source: e })?;
  let advisory_id = insert_id(result, "advisories")?;

  for cve in &def.advisory.cves {
    sqlx::query(
      "INSERT INTO cves (advisory_id, cve_id, cvss2, cvss3, cwe, impact, href, public)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(advisory_id)
    .bind(cve.cve_id.as_str())
    .bind(cve.cvss2.as_str())
    .bind(cve.cvss3.as_str())
    .bind(cve.cwe.as_str())
    .bind(cve.impact.as_str())
    .bind(cve.href.as_str())
    .bind(cve.public.as_str())
    .execute(&mut **tx)
    .await
    .map_err(|e| Error::Write { what: "cve", source: e })?;
  }

  for bugzilla in &def.advisory.bugzillas {
    sqlx::query(
      "INSERT INTO bugzillas (advisory_id, bugzilla_id, url, title)
       VALUES (?, ?, ?, ?)",
    )
    .bind(advisory_id)
    .bind(bugzilla.bugzilla_id.as_str())
    .bind(bugzilla.url.as_str())
    .bind(bugzilla.title.as_str())
    .execute(&mut **tx)
    .await
    .map_err(|e| Error::Write { what: "bugzilla", source: e })?;
  }

  for cpe in &def.advisory.affected_cpe_list {
    sqlx::query("INSERT INTO cpes (advisory_id, cpe) VALUES (?, ?)")
      .bind(advisory_id)
      .bind(cpe.cpe.as_str())
      .execute(&mut **tx)
      .await
      .map_err(|e| Error::Write { what: "cpe", source: e })?;
  }

  if let Some(debian) = &def.debian {
    sqlx::query(
      "INSERT INTO debians (definition_id, cve_id, moreinfo, date)
       VALUES (?, ?, ?, ?)",
    )
    .bind(def_id)
    .bind(debian.cve_id.as_str())
    .bind(debian.moreinfo.as_str())
    .bind(encode_ts_opt(&debian.date))
    .execute(&mut **tx)
    .await
    .map_err(|e| Error::Write { what: "debian record", source: e })?;
  }

  Ok(())
}
