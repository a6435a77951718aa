//! Core types and trait definitions for the OVAL dictionary.
//!
//! Everything here is plain data and contracts: the entity tree, the
//! OS-family registry keys, and the store trait the engines implement.
//! No HTTP types and no database handles leak into this crate.

pub mod error;
pub mod family;
pub mod models;
pub mod store;

pub use error::{Error, Result};
