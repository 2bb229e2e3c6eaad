//! Handlers for `/observations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/observations` | Optional `owner_id`, `subject_taxon_id`, `host_taxon_id`, `limit`, `offset` |
//! | `POST`   | `/observations` | Body: [`CreateBody`]; returns 201 + stored observation |
//! | `GET`    | `/observations/:id` | Detail view with tallied identifications |
//! | `PATCH`  | `/observations/:id` | Body: [`ObservationEdit`]; owner only |
//! | `DELETE` | `/observations/:id` | Owner only; returns 204 |
//! | `POST`   | `/observations/:id/identifications` | Body: [`IdentifyBody`]; returns 201 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use hostlink_core::{
  Engine,
  engine::ObservationDetail,
  observation::{NewObservation, Observation, ObservationEdit, ObservationQuery},
  store::EngineStore,
  taxonomy::TaxonKind,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /observations[?owner_id=...][&subject_taxon_id=...][&host_taxon_id=...]`
pub async fn list<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(query): Query<ObservationQuery>,
) -> Result<Json<Vec<Observation>>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.list_observations(&query).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// The owner comes from the caller, never from the body.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub subject_taxon_id:       Option<Uuid>,
  pub host_taxon_id:          Option<Uuid>,
  #[serde(default)]
  pub subject_identification: String,
  #[serde(default)]
  pub host_identification:    String,
  pub notes:                  Option<String>,
}

/// `POST /observations`
pub async fn create<S>(
  State(engine): State<Arc<Engine<S>>>,
  Actor(owner_id): Actor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EngineStore,
{
  let input = NewObservation {
    owner_id,
    subject_taxon_id: body.subject_taxon_id,
    host_taxon_id: body.host_taxon_id,
    subject_identification: body.subject_identification,
    host_identification: body.host_identification,
    notes: body.notes,
  };
  let observation = engine.create_observation(input).await?;
  Ok((StatusCode::CREATED, Json(observation)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /observations/:id`
pub async fn get_one<S>(
  State(engine): State<Arc<Engine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ObservationDetail>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.observation_detail(id).await?))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

/// `PATCH /observations/:id`
pub async fn edit<S>(
  State(engine): State<Arc<Engine<S>>>,
  Actor(editor_id): Actor,
  Path(id): Path<Uuid>,
  Json(edit): Json<ObservationEdit>,
) -> Result<Json<Observation>, ApiError>
where
  S: EngineStore,
{
  Ok(Json(engine.edit_observation(id, editor_id, edit).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /observations/:id`
pub async fn delete<S>(
  State(engine): State<Arc<Engine<S>>>,
  Actor(requester_id): Actor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: EngineStore,
{
  engine.delete_observation(id, requester_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Identify ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IdentifyBody {
  pub kind:            TaxonKind,
  pub species_text:    String,
  pub scientific_name: Option<String>,
}

/// `POST /observations/:id/identifications`, body:
/// `{"kind":"subject","species_text":"Pieris rapae"}`
pub async fn identify<S>(
  State(engine): State<Arc<Engine<S>>>,
  Actor(author_id): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<IdentifyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EngineStore,
{
  let identification = engine
    .create_identification(id, author_id, body.kind, &body.species_text, body.scientific_name)
    .await?;
  Ok((StatusCode::CREATED, Json(identification)))
}
