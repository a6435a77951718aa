//! Handler for `/cves` lookups.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cves/{family}/{release}/{id}` | Empty array when nothing matches |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use ovaldict_core::models::Definition;
use ovaldict_store::OvalDb;

use crate::error::ApiError;

/// `GET /cves/{family}/{release}/{id}`
pub async fn by_id(
  State(db): State<Arc<OvalDb>>,
  Path((family, release, id)): Path<(String, String, String)>,
) -> Result<Json<Vec<Definition>>, ApiError> {
  tracing::debug!(family, release, cve = id, "cve lookup");
  let definitions = db.get_by_cve_id(&family, &release, &id).await?;
  Ok(Json(definitions))
}
