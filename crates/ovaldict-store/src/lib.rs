//! SQL backend for the OVAL dictionary.
//!
//! Both supported dialects (an embedded sqlite3 file and a MySQL server)
//! are driven through sqlx's `Any` driver, which routes to the concrete
//! engine by connection-URL scheme. One [`OvalDb`] handle serves every OS
//! family; family-specific query behavior lives in the [`Driver`] built
//! for each request.

mod base;
mod db;
mod dialect;
mod driver;
mod schema;

pub mod error;

pub use db::{OvalDb, SchemaGuard};
pub use dialect::Dialect;
pub use driver::{
  DebianDriver, Driver, OracleDriver, RedhatDriver, SuseDriver, UbuntuDriver,
};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
