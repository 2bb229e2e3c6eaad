//! Observations: one reported subject/host pairing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::TaxonKind;

/// The `(subject taxon, host taxon)` key a relationship is aggregated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxonPair {
  pub subject_taxon_id: Uuid,
  pub host_taxon_id:    Uuid,
}

impl TaxonPair {
  pub fn new(subject_taxon_id: Uuid, host_taxon_id: Uuid) -> Self {
    Self { subject_taxon_id, host_taxon_id }
  }
}

/// A user's report of a subject organism found on a host organism.
///
/// `subject_identification` / `host_identification` hold the current
/// identification text shown to users; the taxon ids are filled in once that
/// text resolves against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
  pub observation_id:         Uuid,
  pub owner_id:               Uuid,
  pub subject_taxon_id:       Option<Uuid>,
  pub host_taxon_id:          Option<Uuid>,
  pub subject_identification: String,
  pub host_identification:    String,
  pub notes:                  Option<String>,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
}

impl Observation {
  /// The pair this observation contributes to, once both sides resolve.
  pub fn pair(&self) -> Option<TaxonPair> {
    match (self.subject_taxon_id, self.host_taxon_id) {
      (Some(s), Some(h)) => Some(TaxonPair::new(s, h)),
      _ => None,
    }
  }

  pub fn taxon_id(&self, kind: TaxonKind) -> Option<Uuid> {
    match kind {
      TaxonKind::Subject => self.subject_taxon_id,
      TaxonKind::Host => self.host_taxon_id,
    }
  }

  pub fn identification_text(&self, kind: TaxonKind) -> &str {
    match kind {
      TaxonKind::Subject => &self.subject_identification,
      TaxonKind::Host => &self.host_identification,
    }
  }
}

/// Input to [`crate::store::ObservationStore::insert_observation`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewObservation {
  pub owner_id:               Uuid,
  pub subject_taxon_id:       Option<Uuid>,
  pub host_taxon_id:          Option<Uuid>,
  #[serde(default)]
  pub subject_identification: String,
  #[serde(default)]
  pub host_identification:    String,
  pub notes:                  Option<String>,
}

/// A partial update applied by the owner. `None` leaves a field unchanged,
/// except that new identification text also replaces that side's taxon id,
/// so a `None` id alongside new text clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservationEdit {
  pub subject_taxon_id:       Option<Uuid>,
  pub host_taxon_id:          Option<Uuid>,
  pub subject_identification: Option<String>,
  pub host_identification:    Option<String>,
  pub notes:                  Option<String>,
}

impl ObservationEdit {
  pub fn is_empty(&self) -> bool {
    self.subject_taxon_id.is_none()
      && self.host_taxon_id.is_none()
      && self.subject_identification.is_none()
      && self.host_identification.is_none()
      && self.notes.is_none()
  }
}

/// Parameters for [`crate::store::ObservationStore::list_observations`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservationQuery {
  pub owner_id:         Option<Uuid>,
  pub subject_taxon_id: Option<Uuid>,
  pub host_taxon_id:    Option<Uuid>,
  pub limit:            Option<usize>,
  pub offset:           Option<usize>,
}
