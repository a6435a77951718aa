//! The `OvalStore` trait: the query/write contract every family driver
//! satisfies.
//!
//! Implemented by the storage backend (`ovaldict-store`); higher layers
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::models::{Definition, FetchMeta, Root};

/// Operations common to every family driver.
///
/// Reads are scoped to an OS version string whose interpretation is
/// family-specific (most families match on the major version only).
/// Writes are failure-atomic: either the whole batch lands or none of it.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes (tokio with `axum`).
pub trait OvalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All definitions whose package list contains `pack_name`, scoped to
  /// this family's reading of `os_ver`. An empty result is not an error.
  fn get_by_pack_name<'a>(
    &'a self,
    os_ver: &'a str,
    pack_name: &'a str,
  ) -> impl Future<Output = Result<Vec<Definition>, Self::Error>> + Send + 'a;

  /// All definitions associated with `cve_id`, scoped to `os_ver`. The
  /// Debian pattern matches the per-definition record; other families go
  /// through advisory CVE entries.
  fn get_by_cve_id<'a>(
    &'a self,
    os_ver: &'a str,
    cve_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Definition>, Self::Error>> + Send + 'a;

  /// Persist a whole [`Root`] subtree and the matching fetch metadata as
  /// one unit, replacing any previous batch for the same family+version.
  fn insert_oval<'a>(
    &'a self,
    root: &'a Root,
    meta: &'a FetchMeta,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Idempotently record that `meta.file_name` was ingested at
  /// `meta.timestamp`. Re-running with an unchanged timestamp writes
  /// nothing.
  fn insert_fetch_meta<'a>(
    &'a self,
    meta: &'a FetchMeta,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
