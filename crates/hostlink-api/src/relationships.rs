//! Handlers for `/relationships` and `/classify`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/relationships` | Optional `subject_taxon_id`, `host_taxon_id`, `tier`, `limit`, `offset` |
//! | `GET`  | `/relationships/:id` | 404 if not found |
//! | `GET`  | `/relationships/:id/observations` | Linked observations, newest first |
//! | `GET`  | `/classify` | `?verified=<n>&observations=<n>` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use hostlink_core::{
  Engine,
  classify::Tier,
  observation::Observation,
  relationship::{Relationship, RelationshipQuery},
  store::EngineStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Relationships ────────────────────────────────────────────────────────────

/// `GET /relationships[?subject_taxon_id=...][&host_taxon_id=...][&tier=...]`
pub async fn list<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(query): Query<RelationshipQuery>,
) -> Result<Json<Vec<Relationship>>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.list_relationships(&query).await?))
}

/// `GET /relationships/:id`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Relationship>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.get_relationship(id).await?))
}

/// `GET /relationships/:id/observations`
pub async fn observations<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Observation>>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.relationship_observations(id).await?))
}

// ─── Classify ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClassifyParams {
  #[serde(default)]
  pub verified:     u32,
  #[serde(default)]
  pub observations: u32,
}

#[derive(Debug, Serialize)]
pub struct Classification {
  pub verified_count:    u32,
  pub observation_count: u32,
  pub tier:              Tier,
}

/// `GET /classify?verified=<n>&observations=<n>`
///
/// The tier the configured thresholds assign to these counters.
pub async fn classify<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<ClassifyParams>,
) -> Json<Classification>
where
  S: EngineStore,
{
  Json(Classification {
    verified_count:    params.verified,
    observation_count: params.observations,
    tier:              engine.classify(params.verified, params.observations),
  })
}
