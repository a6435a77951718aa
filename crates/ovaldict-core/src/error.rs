//! Error types for `ovaldict-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown OS family: {0}")]
  UnknownFamily(String),

  #[error("unknown SUSE variant {given}; specify one of: {}", .variants.join(", "))]
  UnknownVariant {
    given:    String,
    variants: &'static [&'static str],
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
