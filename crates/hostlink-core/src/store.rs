//! Storage traits the engine is written against.
//!
//! Backends (e.g. `hostlink-store-sqlite`) implement all of them; the engine
//! only needs the [`EngineStore`] umbrella. Every trait shares the backend's
//! error type through [`Backend`].
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  classify::Thresholds,
  identification::{Identification, IdentificationVote, NewIdentification},
  observation::{NewObservation, Observation, ObservationEdit, ObservationQuery, TaxonPair},
  relationship::{Relationship, RelationshipQuery, Unlinked},
  taxonomy::{NewTaxon, TaxonKind, TaxonomyEntry},
};

/// The error type shared by every store trait of one backend.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Observations ────────────────────────────────────────────────────────────

pub trait ObservationStore: Backend {
  fn insert_observation(
    &self,
    input: NewObservation,
  ) -> impl Future<Output = Result<Observation, Self::Error>> + Send + '_;

  /// Returns `None` if not found.
  fn get_observation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Observation>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_observations<'a>(
    &'a self,
    query: &'a ObservationQuery,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + 'a;

  /// Apply `edit` and return the updated row, or `None` if not found.
  fn update_observation(
    &self,
    id: Uuid,
    edit: ObservationEdit,
  ) -> impl Future<Output = Result<Option<Observation>, Self::Error>> + Send + '_;

  /// Set the current identification text for one side. `taxon_id = None`
  /// leaves the stored taxon id untouched. Returns `false` if not found.
  fn update_current_identification(
    &self,
    id: Uuid,
    kind: TaxonKind,
    text: String,
    taxon_id: Option<Uuid>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete the observation; its relationship link row goes with it.
  /// Returns `false` if not found.
  fn delete_observation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Identifications ─────────────────────────────────────────────────────────

pub trait IdentificationStore: Backend {
  fn insert_identification(
    &self,
    input: NewIdentification,
  ) -> impl Future<Output = Result<Identification, Self::Error>> + Send + '_;

  fn get_identification(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identification>, Self::Error>> + Send + '_;

  /// Oldest first.
  fn list_identifications(
    &self,
    observation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Identification>, Self::Error>> + Send + '_;

  /// Flip `is_verified` to `true` if and only if it is currently `false`.
  ///
  /// Returns `true` when this call performed the transition. Concurrent
  /// callers racing past the threshold see exactly one `true`.
  fn set_verified(
    &self,
    id: Uuid,
    verifier_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Whether both sides of an observation carry a verified identification
  /// whose text matches the observation's current identification text.
  fn is_fully_verified(
    &self,
    observation_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Votes ───────────────────────────────────────────────────────────────────

pub trait VoteStore: Backend {
  /// Insert a vote unless `(identification_id, voter_id)` already exists.
  /// Returns whether a row was written.
  fn insert_vote(
    &self,
    identification_id: Uuid,
    voter_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Exact number of distinct voters.
  fn count_votes(
    &self,
    identification_id: Uuid,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Oldest first.
  fn list_votes(
    &self,
    identification_id: Uuid,
  ) -> impl Future<Output = Result<Vec<IdentificationVote>, Self::Error>> + Send + '_;
}

// ─── Taxonomy catalog ────────────────────────────────────────────────────────

pub trait TaxonomyCatalog: Backend {
  /// Case-insensitive substring match of `text` against the scientific name,
  /// common name, and genus of `kind` rows. First match only.
  fn find_taxonomy(
    &self,
    text: String,
    kind: TaxonKind,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  fn get_taxon(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TaxonomyEntry>, Self::Error>> + Send + '_;

  /// Catalog import. Never called on the identification path.
  fn add_taxon(
    &self,
    input: NewTaxon,
  ) -> impl Future<Output = Result<TaxonomyEntry, Self::Error>> + Send + '_;
}

// ─── Relationships ───────────────────────────────────────────────────────────

/// Atomic relationship primitives.
///
/// Each mutating method must run as one unit at the storage layer (a
/// transaction or equivalent): counters are incremented and decremented in
/// place, never read into memory, adjusted, and written back.
pub trait RelationshipStore: Backend {
  /// In one atomic step:
  ///
  /// 1. release any existing link of `observation_id` (decrementing by the
  ///    contribution that link recorded, deleting the row if it empties);
  /// 2. find or create the relationship for `pair`;
  /// 3. link the observation, adding 1 to `observation_count` and
  ///    `verified_contribution` to `verified_count`;
  /// 4. reclassify with `thresholds`.
  fn upsert_and_link(
    &self,
    pair: TaxonPair,
    observation_id: Uuid,
    verified_contribution: u32,
    thresholds: Thresholds,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  /// In one atomic step: remove the link of `observation_id`, subtract 1 from
  /// `observation_count` and `verified_delta` from `verified_count` (both
  /// floored at zero), reclassify, and delete the row if both reach zero.
  fn remove_link_and_decrement(
    &self,
    observation_id: Uuid,
    verified_delta: u32,
    thresholds: Thresholds,
  ) -> impl Future<Output = Result<Unlinked, Self::Error>> + Send + '_;

  /// Recompute every stored tier. Counters are not touched. Returns how many
  /// rows changed tier.
  fn reclassify_all(
    &self,
    thresholds: Thresholds,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_relationship(
    &self,
    pair: TaxonPair,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  fn get_relationship_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  /// The relationship `observation_id` currently contributes to.
  fn relationship_for_observation(
    &self,
    observation_id: Uuid,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  fn list_relationships<'a>(
    &'a self,
    query: &'a RelationshipQuery,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + 'a;

  /// Observations linked to a relationship, newest first.
  fn relationship_observations(
    &self,
    relationship_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + '_;
}

// ─── Umbrella ────────────────────────────────────────────────────────────────

/// Everything the engine needs from a backend.
pub trait EngineStore:
  ObservationStore + IdentificationStore + VoteStore + TaxonomyCatalog + RelationshipStore
{
}

impl<T> EngineStore for T where
  T: ObservationStore + IdentificationStore + VoteStore + TaxonomyCatalog + RelationshipStore
{
}
