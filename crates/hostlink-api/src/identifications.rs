//! Handlers for `/identifications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/identifications/:id` | Identification with vote count and voters |
//! | `POST` | `/identifications/:id/votes` | Caller agrees; returns [`VoteOutcome`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use hostlink_core::{
  Engine,
  identification::{TalliedIdentification, VoteOutcome},
  store::EngineStore,
};
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError};

/// `GET /identifications/:id`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TalliedIdentification>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.get_identification(id).await?))
}

/// `POST /identifications/:id/votes`
///
/// Voting twice is not an error; the second call reports `inserted: false`.
pub async fn vote<S>(
  State(engine): State<Arc<Engine<S>>>,
  Actor(voter_id): Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<VoteOutcome>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.cast_vote(id, voter_id).await?))
}
