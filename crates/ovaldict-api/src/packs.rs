//! Handler for `/packs` lookups.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/packs/{family}/{release}/{pack}` | Empty array when nothing matches |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use ovaldict_core::models::Definition;
use ovaldict_store::OvalDb;

use crate::error::ApiError;

/// `GET /packs/{family}/{release}/{pack}`
///
/// Axum percent-decodes the segments, so package names containing `/`
/// arrive intact when encoded.
pub async fn by_name(
  State(db): State<Arc<OvalDb>>,
  Path((family, release, pack)): Path<(String, String, String)>,
) -> Result<Json<Vec<Definition>>, ApiError> {
  tracing::debug!(family, release, pack, "pack lookup");
  let definitions = db.get_by_pack_name(&family, &release, &pack).await?;
  Ok(Json(definitions))
}
