//! Per-family drivers and the dispatching [`Driver`] enum.
//!
//! Every driver shares the same physical schema through [`Base`]; what
//! differs is how `os_ver` scopes a lookup and which join answers a CVE
//! query. Red Hat and Oracle key advisories through `advisories → cves`;
//! Debian and Ubuntu carry the CVE id directly on their per-definition
//! record; SUSE stores roots under the full version string instead of the
//! major version.

use ovaldict_core::{
  family::{Family, SuseVariant},
  models::{Definition, FetchMeta, Root},
  store::OvalStore,
};
use sqlx::AnyPool;

use crate::{
  base::Base,
  error::{Error, Result},
};

// ─── Red Hat ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RedhatDriver {
  base: Base,
}

impl RedhatDriver {
  pub(crate) fn new(pool: AnyPool) -> Self {
    Self { base: Base::new(Family::Redhat, pool) }
  }
}

impl OvalStore for RedhatDriver {
  type Error = Error;

  async fn get_by_pack_name(&self, os_ver: &str, pack_name: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_pack_name(Base::major(os_ver), pack_name).await
  }

  async fn get_by_cve_id(&self, os_ver: &str, cve_id: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_advisory_cve(Base::major(os_ver), cve_id).await
  }

  async fn insert_oval(&self, root: &Root, meta: &FetchMeta) -> Result<()> {
    self.base.insert_oval(root, meta).await
  }

  async fn insert_fetch_meta(&self, meta: &FetchMeta) -> Result<()> {
    self.base.insert_fetch_meta(meta).await
  }
}

// ─── Oracle ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct OracleDriver {
  base: Base,
}

impl OracleDriver {
  pub(crate) fn new(pool: AnyPool) -> Self {
    Self { base: Base::new(Family::Oracle, pool) }
  }
}

impl OvalStore for OracleDriver {
  type Error = Error;

  async fn get_by_pack_name(&self, os_ver: &str, pack_name: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_pack_name(Base::major(os_ver), pack_name).await
  }

  async fn get_by_cve_id(&self, os_ver: &str, cve_id: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_advisory_cve(Base::major(os_ver), cve_id).await
  }

  async fn insert_oval(&self, root: &Root, meta: &FetchMeta) -> Result<()> {
    self.base.insert_oval(root, meta).await
  }

  async fn insert_fetch_meta(&self, meta: &FetchMeta) -> Result<()> {
    self.base.insert_fetch_meta(meta).await
  }
}

// ─── Debian ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct DebianDriver {
  base: Base,
}

impl DebianDriver {
  pub(crate) fn new(pool: AnyPool) -> Self {
    Self { base: Base::new(Family::Debian, pool) }
  }
}

impl OvalStore for DebianDriver {
  type Error = Error;

  async fn get_by_pack_name(&self, os_ver: &str, pack_name: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_pack_name(Base::major(os_ver), pack_name).await
  }

  async fn get_by_cve_id(&self, os_ver: &str, cve_id: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_debian_cve(Base::major(os_ver), cve_id).await
  }

  async fn insert_oval(&self, root: &Root, meta: &FetchMeta) -> Result<()> {
    self.base.insert_oval(root, meta).await
  }

  async fn insert_fetch_meta(&self, meta: &FetchMeta) -> Result<()> {
    self.base.insert_fetch_meta(meta).await
  }
}

// ─── Ubuntu ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct UbuntuDriver {
  base: Base,
}

impl UbuntuDriver {
  pub(crate) fn new(pool: AnyPool) -> Self {
    Self { base: Base::new(Family::Ubuntu, pool) }
  }
}

impl OvalStore for UbuntuDriver {
  type Error = Error;

  async fn get_by_pack_name(&self, os_ver: &str, pack_name: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_pack_name(Base::major(os_ver), pack_name).await
  }

  async fn get_by_cve_id(&self, os_ver: &str, cve_id: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_debian_cve(Base::major(os_ver), cve_id).await
  }

  async fn insert_oval(&self, root: &Root, meta: &FetchMeta) -> Result<()> {
    self.base.insert_oval(root, meta).await
  }

  async fn insert_fetch_meta(&self, meta: &FetchMeta) -> Result<()> {
    self.base.insert_fetch_meta(meta).await
  }
}

// ─── SUSE ────────────────────────────────────────────────────────────────────

/// SUSE releases are not keyed on a major-version axis the way the other
/// families are, so roots are scoped by the full version string.
#[derive(Debug)]
pub struct SuseDriver {
  base: Base,
}

impl SuseDriver {
  pub(crate) fn new(variant: SuseVariant, pool: AnyPool) -> Self {
    Self { base: Base::new(Family::Suse(variant), pool) }
  }
}

impl OvalStore for SuseDriver {
  type Error = Error;

  async fn get_by_pack_name(&self, os_ver: &str, pack_name: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_pack_name(os_ver, pack_name).await
  }

  async fn get_by_cve_id(&self, os_ver: &str, cve_id: &str) -> Result<Vec<Definition>> {
    self.base.definitions_by_advisory_cve(os_ver, cve_id).await
  }

  async fn insert_oval(&self, root: &Root, meta: &FetchMeta) -> Result<()> {
    self.base.insert_oval(root, meta).await
  }

  async fn insert_fetch_meta(&self, meta: &FetchMeta) -> Result<()> {
    self.base.insert_fetch_meta(meta).await
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// A resolved family driver. Built by [`OvalDb`](crate::OvalDb) once the
/// family identifier has parsed; dispatch is a plain match, no trait
/// objects involved.
#[derive(Debug)]
pub enum Driver {
  Redhat(RedhatDriver),
  Oracle(OracleDriver),
  Debian(DebianDriver),
  Ubuntu(UbuntuDriver),
  Suse(SuseDriver),
}

impl Driver {
  pub(crate) fn new(family: Family, pool: AnyPool) -> Self {
    match family {
      Family::Redhat => Driver::Redhat(RedhatDriver::new(pool)),
      Family::Oracle => Driver::Oracle(OracleDriver::new(pool)),
      Family::Debian => Driver::Debian(DebianDriver::new(pool)),
      Family::Ubuntu => Driver::Ubuntu(UbuntuDriver::new(pool)),
      Family::Suse(variant) => Driver::Suse(SuseDriver::new(variant, pool)),
    }
  }

  fn base(&self) -> &Base {
    match self {
      Driver::Redhat(d) => &d.base,
      Driver::Oracle(d) => &d.base,
      Driver::Debian(d) => &d.base,
      Driver::Ubuntu(d) => &d.base,
      Driver::Suse(d) => &d.base,
    }
  }

  pub fn family(&self) -> Family {
    self.base().family
  }
}

impl OvalStore for Driver {
  type Error = Error;

  async fn get_by_pack_name(&self, os_ver: &str, pack_name: &str) -> Result<Vec<Definition>> {
    match self {
      Driver::Redhat(d) => d.get_by_pack_name(os_ver, pack_name).await,
      Driver::Oracle(d) => d.get_by_pack_name(os_ver, pack_name).await,
      Driver::Debian(d) => d.get_by_pack_name(os_ver, pack_name).await,
      Driver::Ubuntu(d) => d.get_by_pack_name(os_ver, pack_name).await,
      Driver::Suse(d) => d.get_by_pack_name(os_ver, pack_name).await,
    }
  }

  async fn get_by_cve_id(&self, os_ver: &str, cve_id: &str) -> Result<Vec<Definition>> {
    match self {
      Driver::Redhat(d) => d.get_by_cve_id(os_ver, cve_id).await,
      Driver::Oracle(d) => d.get_by_cve_id(os_ver, cve_id).await,
      Driver::Debian(d) => d.get_by_cve_id(os_ver, cve_id).await,
      Driver::Ubuntu(d) => d.get_by_cve_id(os_ver, cve_id).await,
      Driver::Suse(d) => d.get_by_cve_id(os_ver, cve_id).await,
    }
  }

  async fn insert_oval(&self, root: &Root, meta: &FetchMeta) -> Result<()> {
    self.base().insert_oval(root, meta).await
  }

  async fn insert_fetch_meta(&self, meta: &FetchMeta) -> Result<()> {
    self.base().insert_fetch_meta(meta).await
  }
}
