//! JSON REST API for Hostlink.
//!
//! Exposes an axum [`Router`] backed by an [`Engine`] over any
//! [`EngineStore`]. Authentication is the caller's responsibility: the
//! router trusts the user id in the `x-user-id` header (see [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", hostlink_api::api_router(engine.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod identifications;
pub mod observations;
pub mod relationships;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use hostlink_core::{Engine, store::EngineStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: EngineStore + 'static,
{
  Router::new()
    // Observations
    .route(
      "/observations",
      get(observations::list::<S>).post(observations::create::<S>),
    )
    .route(
      "/observations/{id}",
      get(observations::get_one::<S>)
        .patch(observations::edit::<S>)
        .delete(observations::delete::<S>),
    )
    .route("/observations/{id}/identifications", post(observations::identify::<S>))
    // Identifications
    .route("/identifications/{id}", get(identifications::get_one::<S>))
    .route("/identifications/{id}/votes", post(identifications::vote::<S>))
    // Relationships
    .route("/relationships", get(relationships::list::<S>))
    .route("/relationships/{id}", get(relationships::get_one::<S>))
    .route("/relationships/{id}/observations", get(relationships::observations::<S>))
    .route("/classify", get(relationships::classify::<S>))
    .with_state(engine)
}
