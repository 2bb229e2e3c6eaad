//! Relationships: the shared aggregate over every observation of one
//! subject/host taxon pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{classify::Tier, observation::TaxonPair};

/// A snapshot of one relationship row.
///
/// Counters are only ever changed by the atomic primitives on
/// [`crate::store::RelationshipStore`], driven by
/// [`crate::aggregate::RelationshipAggregator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
  pub relationship_id:   Uuid,
  pub subject_taxon_id:  Uuid,
  pub host_taxon_id:     Uuid,
  pub observation_count: u32,
  pub verified_count:    u32,
  pub tier:              Tier,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Relationship {
  pub fn pair(&self) -> TaxonPair {
    TaxonPair::new(self.subject_taxon_id, self.host_taxon_id)
  }

  pub fn is_empty(&self) -> bool {
    self.observation_count == 0 && self.verified_count == 0
  }
}

/// What releasing an observation's link did to the relationship it pointed at.
#[derive(Debug, Clone)]
pub enum Unlinked {
  /// The observation was not linked anywhere.
  NotLinked,
  /// Counters were decremented; the row survives.
  Updated(Relationship),
  /// Both counters reached zero and the row was deleted. Carries the final
  /// (zeroed) snapshot.
  Deleted(Relationship),
}

impl Unlinked {
  pub fn relationship(&self) -> Option<&Relationship> {
    match self {
      Self::NotLinked => None,
      Self::Updated(r) | Self::Deleted(r) => Some(r),
    }
  }
}

/// Parameters for [`crate::store::RelationshipStore::list_relationships`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipQuery {
  pub subject_taxon_id: Option<Uuid>,
  pub host_taxon_id:    Option<Uuid>,
  pub tier:             Option<Tier>,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}
