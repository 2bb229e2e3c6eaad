//! Identifications (proposed species labels) and the votes that confirm them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::TaxonKind;

/// A proposal of a species label for one side of one observation.
///
/// `is_verified` is monotonic: once set it is never cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identification {
  pub identification_id: Uuid,
  pub observation_id:    Uuid,
  pub author_id:         Uuid,
  pub species_text:      String,
  pub scientific_name:   Option<String>,
  pub kind:              TaxonKind,
  pub is_verified:       bool,
  pub verified_at:       Option<DateTime<Utc>>,
  /// The voter whose vote crossed the threshold.
  pub verified_by:       Option<Uuid>,
  pub created_at:        DateTime<Utc>,
}

/// Input to [`crate::store::IdentificationStore::insert_identification`].
#[derive(Debug, Clone)]
pub struct NewIdentification {
  pub observation_id:  Uuid,
  pub author_id:       Uuid,
  pub kind:            TaxonKind,
  pub species_text:    String,
  pub scientific_name: Option<String>,
}

/// One voter's agreement with one identification. Unique per
/// `(identification_id, voter_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentificationVote {
  pub identification_id: Uuid,
  pub voter_id:          Uuid,
  pub created_at:        DateTime<Utc>,
}

/// Result of [`crate::Engine::cast_vote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
  /// `false` when the voter had already agreed; nothing else happened.
  pub inserted:     bool,
  /// `true` only on the vote that moved the identification to verified.
  pub verified_now: bool,
}

/// An identification together with its tally, for read views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalliedIdentification {
  #[serde(flatten)]
  pub identification: Identification,
  pub vote_count:     u32,
  pub votes:          Vec<IdentificationVote>,
}
