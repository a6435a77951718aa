//! Dialect selection and connection-target normalisation.

use std::{fmt, str::FromStr};

use crate::error::{Error, Result};

/// The two supported relational engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
  /// Embedded single-file engine; the target is a filesystem path.
  Sqlite3,
  /// Client/server engine; the target is a `mysql://` DSN.
  Mysql,
}

impl Dialect {
  pub fn as_str(&self) -> &'static str {
    match self {
      Dialect::Sqlite3 => "sqlite3",
      Dialect::Mysql => "mysql",
    }
  }

  /// Turn a configured target into the connection URL handed to the
  /// engine. Targets that cannot belong to this dialect fail here, before
  /// any I/O.
  pub fn connection_url(&self, target: &str) -> Result<String> {
    match self {
      Dialect::Sqlite3 => {
        if target.starts_with("mysql:") {
          return Err(Error::InvalidTarget {
            dialect: *self,
            target:  redact(target),
          });
        }
        if target.starts_with("sqlite:") {
          Ok(target.to_string())
        } else {
          // mode=rwc creates the file on first open.
          Ok(format!("sqlite://{target}?mode=rwc"))
        }
      }
      Dialect::Mysql => {
        if target.starts_with("mysql://") {
          Ok(target.to_string())
        } else {
          Err(Error::InvalidTarget {
            dialect: *self,
            target:  redact(target),
          })
        }
      }
    }
  }
}

/// Strip the userinfo from a DSN-shaped target so error messages never
/// echo credentials. Plain file paths pass through unchanged.
pub(crate) fn redact(target: &str) -> String {
  match (target.find("://"), target.rfind('@')) {
    (Some(scheme), Some(at)) if at > scheme + 2 => {
      format!("{}***{}", &target[..scheme + 3], &target[at..])
    }
    _ => target.to_string(),
  }
}

impl fmt::Display for Dialect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Dialect {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "sqlite3" => Ok(Dialect::Sqlite3),
      "mysql" => Ok(Dialect::Mysql),
      other => Err(Error::UnknownDialect(other.to_string())),
    }
  }
}

#[cfg(test)]
mod unit {
  use super::redact;

  #[test]
  fn redact_hides_dsn_userinfo_only() {
    assert_eq!(
      redact("mysql://oval:s3cret@db:3306/oval"),
      "mysql://***@db:3306/oval"
    );
    assert_eq!(redact("/var/lib/oval.sqlite3"), "/var/lib/oval.sqlite3");
    assert_eq!(redact("mysql://db:3306/oval"), "mysql://db:3306/oval");
  }
}
