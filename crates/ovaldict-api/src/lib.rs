//! JSON lookup API for the OVAL dictionary.
//!
//! Exposes an axum [`Router`] backed by an opened
//! [`OvalDb`](ovaldict_store::OvalDb). Lookups are read-only; ingestion
//! happens out of band. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = ovaldict_api::router(Arc::new(db));
//! axum::serve(listener, app).await?;
//! ```

pub mod cves;
pub mod error;
pub mod packs;

use std::sync::Arc;

use axum::{Router, http::StatusCode, routing::get};
use ovaldict_store::OvalDb;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build the lookup router for `db`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn router(db: Arc<OvalDb>) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/packs/{family}/{release}/{pack}", get(packs::by_name))
    .route("/cves/{family}/{release}/{id}", get(cves::by_id))
    .layer(TraceLayer::new_for_http())
    .with_state(db)
}

/// `GET /health`: liveness probe, no body.
async fn health() -> StatusCode {
  StatusCode::OK
}

// ─── Integration tests ───────────────────────────────────────────────────────
