//! Typed OS-family identifiers and the SUSE variant allow-list.
//!
//! Raw family strings arrive from configuration and from HTTP paths; they
//! are parsed into [`Family`] exactly once, at that boundary. Everything
//! past the boundary works with the enum, so unknown identifiers never
//! reach a driver.

use std::{fmt, str::FromStr};

use crate::error::Error;

/// Top-level OS families, each with its own advisory schema quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
  Debian,
  Ubuntu,
  Redhat,
  Oracle,
  Suse(SuseVariant),
}

/// Named SUSE flavors accepted by the registry.
///
/// Identifiers merely containing `suse` are not enough; the full variant
/// name must be on this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuseVariant {
  OpenSuse,
  OpenSuseLeap,
  EnterpriseServer,
  EnterpriseDesktop,
  OpenstackCloud,
}

/// Canonical identifiers for every accepted SUSE variant, in declaration
/// order. Quoted verbatim in the unknown-variant error message.
pub const SUSE_VARIANTS: &[&str] = &[
  "opensuse",
  "opensuse-leap",
  "suse-enterprise-server",
  "suse-enterprise-desktop",
  "suse-openstack-cloud",
];

impl SuseVariant {
  pub fn as_str(&self) -> &'static str {
    match self {
      SuseVariant::OpenSuse => "opensuse",
      SuseVariant::OpenSuseLeap => "opensuse-leap",
      SuseVariant::EnterpriseServer => "suse-enterprise-server",
      SuseVariant::EnterpriseDesktop => "suse-enterprise-desktop",
      SuseVariant::OpenstackCloud => "suse-openstack-cloud",
    }
  }

  fn from_ident(ident: &str) -> Option<Self> {
    match ident {
      "opensuse" => Some(SuseVariant::OpenSuse),
      "opensuse-leap" => Some(SuseVariant::OpenSuseLeap),
      "suse-enterprise-server" => Some(SuseVariant::EnterpriseServer),
      "suse-enterprise-desktop" => Some(SuseVariant::EnterpriseDesktop),
      "suse-openstack-cloud" => Some(SuseVariant::OpenstackCloud),
      _ => None,
    }
  }
}

impl Family {
  /// The canonical identifier; round-trips through [`FromStr`].
  pub fn as_str(&self) -> &'static str {
    match self {
      Family::Debian => "debian",
      Family::Ubuntu => "ubuntu",
      Family::Redhat => "redhat",
      Family::Oracle => "oracle",
      Family::Suse(v) => v.as_str(),
    }
  }
}

impl fmt::Display for Family {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Display for SuseVariant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Family {
  type Err = Error;

  /// Exact match on the top-level families; identifiers containing `suse`
  /// fall through to the variant allow-list. Everything else is unknown.
  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "debian" => Ok(Family::Debian),
      "ubuntu" => Ok(Family::Ubuntu),
      "redhat" => Ok(Family::Redhat),
      "oracle" => Ok(Family::Oracle),
      other if other.contains("suse") => SuseVariant::from_ident(other)
        .map(Family::Suse)
        .ok_or_else(|| Error::UnknownVariant {
          given:    other.to_string(),
          variants: SUSE_VARIANTS,
        }),
      other => Err(Error::UnknownFamily(other.to_string())),
    }
  }
}
