//! The OVAL entity tree.
//!
//! `Root → Definition → {Package, Reference, Advisory → {Cve, Bugzilla,
//! Cpe}, Debian}` is a strict ownership tree; nothing is shared between
//! two parents. [`FetchMeta`] sits outside the tree and is keyed only by
//! source file name. Row ids are assigned by the store and never appear
//! here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::family::Family;

/// Ingestion bookkeeping: when `file_name` was last successfully fetched.
/// At most one record per file name.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchMeta {
  pub file_name: String,
  pub timestamp: DateTime<Utc>,
}

/// One ingested batch of definitions for a family + OS version.
/// Re-ingesting the same family + version replaces the whole subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
  pub family:      Family,
  pub os_version:  String,
  pub definitions: Vec<Definition>,
}

/// A single security-advisory item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
  pub definition_id:  String,
  pub title:          String,
  pub description:    String,
  pub advisory:       Advisory,
  /// Debian/Ubuntu supplementary record; absent for other families.
  pub debian:         Option<Debian>,
  pub affected_packs: Vec<Package>,
  pub references:     Vec<Reference>,
}

/// An affected package name plus the fixed-version constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
  pub name:          String,
  pub version:       String,
  pub not_fixed_yet: bool,
}

/// External citation attached to a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
  pub source:  String,
  pub ref_id:  String,
  pub ref_url: String,
}

/// Severity/metadata envelope owning the CVE, Bugzilla, and CPE leaves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
  pub severity:          String,
  pub cves:              Vec<Cve>,
  pub bugzillas:         Vec<Bugzilla>,
  pub affected_cpe_list: Vec<Cpe>,
  pub issued:            Option<DateTime<Utc>>,
  pub updated:           Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cve {
  pub cve_id: String,
  pub cvss2:  String,
  pub cvss3:  String,
  pub cwe:    String,
  pub impact: String,
  pub href:   String,
  pub public: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bugzilla {
  pub bugzilla_id: String,
  pub url:         String,
  pub title:       String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cpe {
  pub cpe: String,
}

/// Debian-pattern extension: definitions carry their CVE id directly, so
/// CVE lookup for these families never goes through [`Advisory`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Debian {
  pub cve_id:   String,
  pub moreinfo: String,
  pub date:     Option<DateTime<Utc>>,
}
