//! Integration tests for [`OvalDb`] against temp-file sqlite databases.
//!
//! Every test opens its own database under its own [`SchemaGuard`]; the
//! process-wide guard is deliberately avoided so migrations stay
//! observable per test.

use chrono::{DateTime, TimeZone as _, Utc};
use ovaldict_core::{
  Error as CoreError,
  family::{Family, SUSE_VARIANTS, SuseVariant},
  models::{
    Advisory, Bugzilla, Cpe, Cve, Debian, Definition, FetchMeta, Package,
    Reference, Root,
  },
  store::OvalStore as _,
};
use sqlx::Row as _;
use tempfile::TempDir;

use crate::{Dialect, Error, OvalDb, SchemaGuard};

/// Open a fresh sqlite database in its own temp dir. The dir handle must
/// stay alive for the duration of the test or the file vanishes.
async fn open_store() -> (OvalDb, SchemaGuard, TempDir) {
  let dir = tempfile::tempdir().expect("temp dir");
  let path = dir.path().join("oval.sqlite3");
  let guard = SchemaGuard::new();
  let db = OvalDb::open_with_guard(
    Dialect::Sqlite3,
    path.to_str().expect("utf-8 temp path"),
    false,
    guard.clone(),
  )
  .await
  .expect("sqlite store");
  (db, guard, dir)
}

async fn count(db: &OvalDb, table: &str) -> i64 {
  let sql = format!("SELECT COUNT(*) AS n FROM {table}");
  let row = sqlx::query(&sql).fetch_one(db.pool()).await.unwrap();
  row.try_get("n").unwrap()
}

fn ts(hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn meta(file_name: &str, hour: u32) -> FetchMeta {
  FetchMeta { file_name: file_name.into(), timestamp: ts(hour) }
}

// ─── Sample data ─────────────────────────────────────────────────────────────

fn openssl_definition() -> Definition {
  Definition {
    definition_id: "oval:com.redhat.rhsa:def:20160722".into(),
    title: "RHSA-2016:0722: openssl security update (Important)".into(),
    description: "OpenSSL is a toolkit that implements SSL and TLS protocols.".into(),
    advisory: Advisory {
      severity: "Important".into(),
      cves: vec![
        Cve {
          cve_id: "CVE-2016-2105".into(),
          cvss2: "5.0/AV:N/AC:L/Au:N/C:N/I:N/A:P".into(),
          cvss3: "".into(),
          cwe: "CWE-190".into(),
          impact: "low".into(),
          href: "https://access.redhat.com/security/cve/CVE-2016-2105".into(),
          public: "20160503".into(),
        },
        Cve {
          cve_id: "CVE-2016-2108".into(),
          cvss2: "10.0/AV:N/AC:L/Au:N/C:C/I:C/A:C".into(),
          cvss3: "".into(),
          cwe: "CWE-190".into(),
          impact: "important".into(),
          href: "https://access.redhat.com/security/cve/CVE-2016-2108".into(),
          public: "20160503".into(),
        },
      ],
      bugzillas: vec![Bugzilla {
        bugzilla_id: "1331426".into(),
        url: "https://bugzilla.redhat.com/1331426".into(),
        title: "CVE-2016-2108 OpenSSL: negative zero ASN.1 corruption".into(),
      }],
      affected_cpe_list: vec![Cpe { cpe: "cpe:/o:redhat:enterprise_linux:7".into() }],
      issued: Some(ts(9)),
      updated: Some(ts(10)),
    },
    debian: None,
    affected_packs: vec![
      Package {
        name:          "openssl".into(),
        version:       "1:1.0.1e-51.el7_2.5".into(),
        not_fixed_yet: false,
      },
      Package {
        name:          "openssl-libs".into(),
        version:       "1:1.0.1e-51.el7_2.5".into(),
        not_fixed_yet: false,
      },
    ],
    references: vec![
      Reference {
        source:  "RHSA".into(),
        ref_id:  "RHSA-2016:0722".into(),
        ref_url: "https://rhn.redhat.com/errata/RHSA-2016-0722.html".into(),
      },
      Reference {
        source:  "CVE".into(),
        ref_id:  "CVE-2016-2108".into(),
        ref_url: "https://access.redhat.com/security/cve/CVE-2016-2108".into(),
      },
    ],
  }
}

fn debian_definition(cve_id: &str, pack: &str) -> Definition {
  Definition {
    definition_id: format!("oval:org.debian:def:{cve_id}"),
    title: cve_id.into(),
    description: "security tracker entry".into(),
    debian: Some(Debian {
      cve_id:   cve_id.into(),
      moreinfo: "fixed in unstable".into(),
      date:     Some(ts(8)),
    }),
    affected_packs: vec![Package {
      name:          pack.into(),
      version:       "0".into(),
      not_fixed_yet: true,
    }],
    ..Definition::default()
  }
}

fn root(family: Family, os_version: &str, definitions: Vec<Definition>) -> Root {
  Root { family, os_version: os_version.into(), definitions }
}

// ─── Open and migrate ────────────────────────────────────────────────────────

#[tokio::test]
async fn open_creates_the_file_and_migrates() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("oval.sqlite3");

  let db = OvalDb::open_with_guard(
    Dialect::Sqlite3,
    path.to_str().unwrap(),
    false,
    SchemaGuard::new(),
  )
  .await
  .unwrap();

  assert_eq!(db.dialect(), Dialect::Sqlite3);
  assert!(path.exists());
  assert_eq!(count(&db, "fetch_metas").await, 0);
  assert_eq!(count(&db, "roots").await, 0);
}

#[tokio::test]
async fn migration_runs_once_per_guard() {
  let (db, guard, dir) = open_store().await;
  assert_eq!(guard.runs(), 1);

  let path = dir.path().join("oval.sqlite3");
  let again = OvalDb::open_with_guard(
    Dialect::Sqlite3,
    path.to_str().unwrap(),
    false,
    guard.clone(),
  )
  .await
  .unwrap();

  assert_eq!(guard.runs(), 1);

  // Both handles still serve queries.
  assert!(db.get_by_pack_name("redhat", "7", "openssl").await.unwrap().is_empty());
  assert!(again.get_by_pack_name("redhat", "7", "openssl").await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_first_opens_migrate_once() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("oval.sqlite3");
  let target = path.to_str().unwrap();
  let guard = SchemaGuard::new();

  let (a, b) = tokio::join!(
    OvalDb::open_with_guard(Dialect::Sqlite3, target, false, guard.clone()),
    OvalDb::open_with_guard(Dialect::Sqlite3, target, false, guard.clone()),
  );
  a.unwrap();
  b.unwrap();

  assert_eq!(guard.runs(), 1);
}

#[tokio::test]
async fn reopening_under_a_fresh_guard_is_idempotent() {
  let (db, _guard, dir) = open_store().await;
  let driver = db.driver(Family::Redhat);
  driver
    .insert_oval(&root(Family::Redhat, "7", vec![openssl_definition()]), &meta("rhel7.xml", 12))
    .await
    .unwrap();

  // A second process would start with its own guard; the migration must
  // tolerate the existing schema and leave the data alone.
  let path = dir.path().join("oval.sqlite3");
  let reopened = OvalDb::open_with_guard(
    Dialect::Sqlite3,
    path.to_str().unwrap(),
    false,
    SchemaGuard::new(),
  )
  .await
  .unwrap();

  let found = reopened.get_by_pack_name("redhat", "7", "openssl").await.unwrap();
  assert_eq!(found.len(), 1);
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_builds_a_driver_for_every_known_family() {
  let (db, _guard, _dir) = open_store().await;

  for ident in ["debian", "ubuntu", "redhat", "oracle"] {
    assert_eq!(db.resolve(ident).unwrap().family().as_str(), ident);
  }
  for ident in SUSE_VARIANTS {
    assert_eq!(db.resolve(ident).unwrap().family().as_str(), *ident);
  }
}

#[tokio::test]
async fn resolve_rejects_unknown_families_before_any_query() {
  let (db, _guard, _dir) = open_store().await;

  let err = db.resolve("windows").unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::UnknownFamily(ref f)) if f == "windows"));

  let err = db.resolve("suse-unknown-flavor").unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::UnknownVariant { .. })));
}

#[tokio::test]
async fn lookup_facade_surfaces_registry_errors() {
  let (db, _guard, _dir) = open_store().await;

  let err = db.get_by_pack_name("windows", "10", "openssl").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::UnknownFamily(_))));

  let err = db.get_by_cve_id("suse-unknown-flavor", "13.2", "CVE-2016-2108").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::UnknownVariant { .. })));
}

#[tokio::test]
async fn lookups_on_an_empty_store_return_nothing() {
  let (db, _guard, _dir) = open_store().await;

  assert!(db.get_by_pack_name("redhat", "7", "openssl").await.unwrap().is_empty());
  assert!(db.get_by_cve_id("debian", "11", "CVE-2016-2108").await.unwrap().is_empty());
}

// ─── Pack-name lookup ────────────────────────────────────────────────────────

#[tokio::test]
async fn openssl_definition_round_trips_through_pack_lookup() {
  let (db, _guard, _dir) = open_store().await;
  let def = openssl_definition();
  db.driver(Family::Redhat)
    .insert_oval(&root(Family::Redhat, "7", vec![def.clone()]), &meta("rhel7.xml", 12))
    .await
    .unwrap();

  // Scoping takes the major version, so "7.3" hits the stored "7" root.
  let found = db.get_by_pack_name("redhat", "7.3", "openssl").await.unwrap();
  assert_eq!(found, vec![def]);

  assert!(db.get_by_pack_name("redhat", "7.3", "bash").await.unwrap().is_empty());
  assert!(db.get_by_pack_name("redhat", "6.8", "openssl").await.unwrap().is_empty());
}

#[tokio::test]
async fn pack_lookup_is_scoped_to_the_family() {
  let (db, _guard, _dir) = open_store().await;
  db.driver(Family::Redhat)
    .insert_oval(&root(Family::Redhat, "7", vec![openssl_definition()]), &meta("rhel7.xml", 12))
    .await
    .unwrap();

  assert!(db.get_by_pack_name("oracle", "7", "openssl").await.unwrap().is_empty());
}

#[tokio::test]
async fn definitions_come_back_ordered_and_deduplicated() {
  let (db, _guard, _dir) = open_store().await;

  // Two packages of the same definition share the queried name prefix;
  // the definition itself must come back once.
  let mut def = openssl_definition();
  def.affected_packs[1].name = "openssl".into();
  let mut other = openssl_definition();
  other.definition_id = "oval:com.redhat.rhsa:def:20160996".into();

  db.driver(Family::Redhat)
    .insert_oval(&root(Family::Redhat, "7", vec![def, other]), &meta("rhel7.xml", 12))
    .await
    .unwrap();

  let found = db.get_by_pack_name("redhat", "7", "openssl").await.unwrap();
  assert_eq!(found.len(), 2);
  assert_eq!(found[0].definition_id, "oval:com.redhat.rhsa:def:20160722");
  assert_eq!(found[1].definition_id, "oval:com.redhat.rhsa:def:20160996");
}

// ─── CVE lookup ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn redhat_cve_lookup_goes_through_the_advisory() {
  let (db, _guard, _dir) = open_store().await;
  let def = openssl_definition();
  db.driver(Family::Redhat)
    .insert_oval(&root(Family::Redhat, "7", vec![def.clone()]), &meta("rhel7.xml", 12))
    .await
    .unwrap();

  let found = db.get_by_cve_id("redhat", "7.2", "CVE-2016-2108").await.unwrap();
  assert_eq!(found, vec![def]);

  assert!(db.get_by_cve_id("redhat", "7.2", "CVE-1999-0001").await.unwrap().is_empty());
}

#[tokio::test]
async fn debian_cve_lookup_uses_the_per_definition_record() {
  let (db, _guard, _dir) = open_store().await;

  // The advisory carries one CVE id, the Debian record another; only the
  // Debian record may answer for this family.
  let mut def = debian_definition("CVE-2016-2108", "openssl");
  def.advisory.cves.push(Cve { cve_id: "CVE-2016-2105".into(), ..Cve::default() });

  db.driver(Family::Debian)
    .insert_oval(&root(Family::Debian, "8", vec![def.clone()]), &meta("debian8.xml", 12))
    .await
    .unwrap();

  let found = db.get_by_cve_id("debian", "8.6", "CVE-2016-2108").await.unwrap();
  assert_eq!(found, vec![def]);

  assert!(db.get_by_cve_id("debian", "8.6", "CVE-2016-2105").await.unwrap().is_empty());
}

#[tokio::test]
async fn ubuntu_follows_the_debian_pattern() {
  let (db, _guard, _dir) = open_store().await;
  let def = debian_definition("CVE-2016-2108", "openssl");
  db.driver(Family::Ubuntu)
    .insert_oval(&root(Family::Ubuntu, "16", vec![def.clone()]), &meta("xenial.xml", 12))
    .await
    .unwrap();

  let found = db.get_by_cve_id("ubuntu", "16.04", "CVE-2016-2108").await.unwrap();
  assert_eq!(found, vec![def]);
}

// ─── SUSE scoping ────────────────────────────────────────────────────────────

#[tokio::test]
async fn suse_scopes_by_the_full_version_string() {
  let (db, _guard, _dir) = open_store().await;
  let family = Family::Suse(SuseVariant::OpenSuse);
  db.driver(family)
    .insert_oval(&root(family, "13.2", vec![openssl_definition()]), &meta("opensuse.xml", 12))
    .await
    .unwrap();

  let found = db.get_by_pack_name("opensuse", "13.2", "openssl").await.unwrap();
  assert_eq!(found.len(), 1);

  // "13.1" would match under major-version scoping; SUSE must not.
  assert!(db.get_by_pack_name("opensuse", "13.1", "openssl").await.unwrap().is_empty());

  let by_cve = db.get_by_cve_id("opensuse", "13.2", "CVE-2016-2108").await.unwrap();
  assert_eq!(by_cve.len(), 1);
}

// ─── Re-ingest ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reingesting_a_version_replaces_the_whole_batch() {
  let (db, _guard, _dir) = open_store().await;
  let driver = db.driver(Family::Redhat);

  driver
    .insert_oval(&root(Family::Redhat, "7", vec![openssl_definition()]), &meta("rhel7.xml", 12))
    .await
    .unwrap();

  let mut bash = openssl_definition();
  bash.definition_id = "oval:com.redhat.rhsa:def:20141306".into();
  bash.affected_packs = vec![Package {
    name:          "bash".into(),
    version:       "4.2.45-5.el7_0.4".into(),
    not_fixed_yet: false,
  }];
  driver
    .insert_oval(&root(Family::Redhat, "7", vec![bash]), &meta("rhel7.xml", 13))
    .await
    .unwrap();

  assert!(db.get_by_pack_name("redhat", "7", "openssl").await.unwrap().is_empty());
  assert_eq!(db.get_by_pack_name("redhat", "7", "bash").await.unwrap().len(), 1);

  // The old subtree is gone, not merely unhooked.
  assert_eq!(count(&db, "roots").await, 1);
  assert_eq!(count(&db, "definitions").await, 1);
  assert_eq!(count(&db, "packages").await, 1);
  assert_eq!(count(&db, "cves").await, 2);
  assert_eq!(count(&db, "bugzillas").await, 1);
}

#[tokio::test]
async fn reingest_only_touches_its_own_version() {
  let (db, _guard, _dir) = open_store().await;
  let driver = db.driver(Family::Redhat);

  driver
    .insert_oval(&root(Family::Redhat, "6", vec![openssl_definition()]), &meta("rhel6.xml", 12))
    .await
    .unwrap();
  driver
    .insert_oval(&root(Family::Redhat, "7", vec![openssl_definition()]), &meta("rhel7.xml", 12))
    .await
    .unwrap();
  driver
    .insert_oval(&root(Family::Redhat, "7", vec![]), &meta("rhel7.xml", 13))
    .await
    .unwrap();

  assert_eq!(db.get_by_pack_name("redhat", "6", "openssl").await.unwrap().len(), 1);
  assert!(db.get_by_pack_name("redhat", "7", "openssl").await.unwrap().is_empty());
  assert_eq!(count(&db, "roots").await, 2);
}

// ─── Fetch metadata ──────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_meta_upsert_is_idempotent() {
  let (db, _guard, _dir) = open_store().await;
  let driver = db.driver(Family::Redhat);

  driver.insert_fetch_meta(&meta("rhel7.xml", 12)).await.unwrap();
  driver.insert_fetch_meta(&meta("rhel7.xml", 12)).await.unwrap();
  assert_eq!(count(&db, "fetch_metas").await, 1);

  // A newer timestamp updates the record in place.
  driver.insert_fetch_meta(&meta("rhel7.xml", 14)).await.unwrap();
  assert_eq!(count(&db, "fetch_metas").await, 1);

  let row = sqlx::query("SELECT timestamp FROM fetch_metas WHERE file_name = ?")
    .bind("rhel7.xml")
    .fetch_one(db.pool())
    .await
    .unwrap();
  let stored: String = row.try_get("timestamp").unwrap();
  assert_eq!(stored, ts(14).to_rfc3339());
}

#[tokio::test]
async fn fetch_meta_records_are_keyed_by_file_name() {
  let (db, _guard, _dir) = open_store().await;
  let driver = db.driver(Family::Redhat);

  driver.insert_fetch_meta(&meta("rhel6.xml", 12)).await.unwrap();
  driver.insert_fetch_meta(&meta("rhel7.xml", 12)).await.unwrap();
  assert_eq!(count(&db, "fetch_metas").await, 2);
}

#[tokio::test]
async fn insert_oval_records_its_fetch_meta() {
  let (db, _guard, _dir) = open_store().await;
  db.driver(Family::Redhat)
    .insert_oval(&root(Family::Redhat, "7", vec![]), &meta("rhel7.xml", 12))
    .await
    .unwrap();

  assert_eq!(count(&db, "fetch_metas").await, 1);
}

// ─── Close ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn close_poisons_every_clone_of_the_handle() {
  let (db, _guard, _dir) = open_store().await;
  let clone = db.clone();

  clone.close().await.unwrap();

  assert!(db.get_by_pack_name("redhat", "7", "openssl").await.is_err());
}

// ─── Dialect ─────────────────────────────────────────────────────────────────

#[test]
fn dialect_parses_its_two_names() {
  assert_eq!("sqlite3".parse::<Dialect>().unwrap(), Dialect::Sqlite3);
  assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::Mysql);
  assert!(matches!(
    "postgres".parse::<Dialect>().unwrap_err(),
    Error::UnknownDialect(ref d) if d == "postgres"
  ));
}

#[test]
fn sqlite_targets_become_file_urls() {
  let url = Dialect::Sqlite3.connection_url("/tmp/oval.sqlite3").unwrap();
  assert_eq!(url, "sqlite:///tmp/oval.sqlite3?mode=rwc");

  // Already-formed URLs pass through untouched.
  let url = Dialect::Sqlite3.connection_url("sqlite:///tmp/x.db?mode=ro").unwrap();
  assert_eq!(url, "sqlite:///tmp/x.db?mode=ro");

  assert!(matches!(
    Dialect::Sqlite3.connection_url("mysql://root@localhost/oval").unwrap_err(),
    Error::InvalidTarget { dialect: Dialect::Sqlite3, .. }
  ));
}

#[test]
fn mysql_targets_must_be_dsns() {
  let url = Dialect::Mysql.connection_url("mysql://oval:pass@db:3306/oval").unwrap();
  assert_eq!(url, "mysql://oval:pass@db:3306/oval");

  assert!(matches!(
    Dialect::Mysql.connection_url("/tmp/oval.sqlite3").unwrap_err(),
    Error::InvalidTarget { dialect: Dialect::Mysql, .. }
  ));
}
