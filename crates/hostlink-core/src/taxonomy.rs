//! Taxonomy catalog types and the best-effort free-text resolver.
//!
//! The catalog is canonical and read-only from the engine's point of view.
//! Resolution is a first-match lookup, not authoritative identification: a
//! miss leaves the observation's taxon id unresolved and is never fatal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::TaxonomyCatalog;

/// Which side of an observation a taxon, identification, or catalog row
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonKind {
  /// The observed organism (e.g. a caterpillar).
  Subject,
  /// The organism it was found on (e.g. a food plant).
  Host,
}

impl TaxonKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Subject => "subject",
      Self::Host => "host",
    }
  }
}

/// A canonical catalog row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
  pub taxon_id:        Uuid,
  pub kind:            TaxonKind,
  pub division:        String,
  pub family:          Option<String>,
  pub genus:           Option<String>,
  pub species:         Option<String>,
  pub scientific_name: Option<String>,
  pub common_name:     Option<String>,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`TaxonomyCatalog::add_taxon`]; used when importing a catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTaxon {
  pub kind:            TaxonKind,
  pub division:        String,
  pub family:          Option<String>,
  pub genus:           Option<String>,
  pub species:         Option<String>,
  pub scientific_name: Option<String>,
  pub common_name:     Option<String>,
}

impl NewTaxon {
  /// A species-level row with only the names filled in.
  pub fn species(
    kind: TaxonKind,
    scientific_name: impl Into<String>,
    common_name: Option<&str>,
  ) -> Self {
    let scientific_name = scientific_name.into();
    let genus = scientific_name.split_whitespace().next().map(str::to_owned);
    Self {
      kind,
      division: "Unknown".to_owned(),
      family: None,
      genus,
      species: None,
      scientific_name: Some(scientific_name),
      common_name: common_name.map(str::to_owned),
    }
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Maps free-text species labels to catalog ids.
pub struct TaxonomyResolver<'a, S> {
  catalog: &'a S,
}

impl<'a, S: TaxonomyCatalog> TaxonomyResolver<'a, S> {
  pub fn new(catalog: &'a S) -> Self { Self { catalog } }

  /// Resolve `text` against the catalog for `kind`.
  ///
  /// Returns `Ok(None)` for blank text or zero matches. Backend failures are
  /// returned as errors; callers on best-effort paths log and continue.
  pub async fn resolve(
    &self,
    text: &str,
    kind: TaxonKind,
  ) -> Result<Option<Uuid>, S::Error> {
    let needle = text.trim();
    if needle.is_empty() {
      return Ok(None);
    }

    let found = self.catalog.find_taxonomy(needle.to_owned(), kind).await?;
    match found {
      Some(id) => {
        tracing::debug!(text = needle, kind = kind.as_str(), taxon_id = %id, "taxonomy resolved");
      }
      None => {
        tracing::debug!(text = needle, kind = kind.as_str(), "taxonomy unresolved");
      }
    }
    Ok(found)
  }
}
