//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 UTC strings so that
//! lexical order is chronological. UUIDs are stored as hyphenated lowercase
//! strings.

use chrono::{DateTime, SecondsFormat, Utc};
use hostlink_core::{
  classify::Tier,
  identification::{Identification, IdentificationVote},
  observation::Observation,
  relationship::Relationship,
  taxonomy::{TaxonKind, TaxonomyEntry},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── TaxonKind ───────────────────────────────────────────────────────────────

pub fn encode_kind(k: TaxonKind) -> &'static str { k.as_str() }

pub fn decode_kind(s: &str) -> Result<TaxonKind> {
  match s {
    "subject" => Ok(TaxonKind::Subject),
    "host" => Ok(TaxonKind::Host),
    other => Err(Error::Decode(format!("unknown taxon kind: {other:?}"))),
  }
}

// ─── Tier ────────────────────────────────────────────────────────────────────

pub fn encode_tier(t: Tier) -> &'static str { t.as_str() }

pub fn decode_tier(s: &str) -> Result<Tier> {
  Tier::parse(s).ok_or_else(|| Error::Decode(format!("unknown tier: {s:?}")))
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// Wrap `text` in `%...%` for a `LIKE ... ESCAPE '\'` substring match,
/// escaping the wildcard characters it contains.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

/// Lower-case `text` for the folded search columns. SQLite's own `LIKE`
/// only folds ASCII, so both sides are folded here before comparing.
pub fn fold(text: &str) -> String { text.to_lowercase() }

/// Clamp a row count into SQLite's signed range; a negative `LIMIT` would
/// mean no limit at all.
pub fn sql_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const OBSERVATION_COLUMNS: &str = "o.observation_id, o.owner_id, o.subject_taxon_id, \
  o.host_taxon_id, o.subject_identification, o.host_identification, o.notes, \
  o.created_at, o.updated_at";

/// Raw strings read directly from an `observations` row.
pub struct RawObservation {
  pub observation_id:         String,
  pub owner_id:               String,
  pub subject_taxon_id:       Option<String>,
  pub host_taxon_id:          Option<String>,
  pub subject_identification: String,
  pub host_identification:    String,
  pub notes:                  Option<String>,
  pub created_at:             String,
  pub updated_at:             String,
}

impl RawObservation {
  /// Read a row selected with [`OBSERVATION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      observation_id:         row.get(0)?,
      owner_id:               row.get(1)?,
      subject_taxon_id:       row.get(2)?,
      host_taxon_id:          row.get(3)?,
      subject_identification: row.get(4)?,
      host_identification:    row.get(5)?,
      notes:                  row.get(6)?,
      created_at:             row.get(7)?,
      updated_at:             row.get(8)?,
    })
  }

  pub fn into_observation(self) -> Result<Observation> {
    Ok(Observation {
      observation_id:         decode_uuid(&self.observation_id)?,
      owner_id:               decode_uuid(&self.owner_id)?,
      subject_taxon_id:       decode_opt_uuid(self.subject_taxon_id)?,
      host_taxon_id:          decode_opt_uuid(self.host_taxon_id)?,
      subject_identification: self.subject_identification,
      host_identification:    self.host_identification,
      notes:                  self.notes,
      created_at:             decode_dt(&self.created_at)?,
      updated_at:             decode_dt(&self.updated_at)?,
    })
  }
}

pub const IDENTIFICATION_COLUMNS: &str = "identification_id, observation_id, author_id, \
  species_text, scientific_name, kind, is_verified, verified_at, verified_by, created_at";

/// Raw strings read directly from an `identifications` row.
pub struct RawIdentification {
  pub identification_id: String,
  pub observation_id:    String,
  pub author_id:         String,
  pub species_text:      String,
  pub scientific_name:   Option<String>,
  pub kind:              String,
  pub is_verified:       bool,
  pub verified_at:       Option<String>,
  pub verified_by:       Option<String>,
  pub created_at:        String,
}

impl RawIdentification {
  /// Read a row selected with [`IDENTIFICATION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identification_id: row.get(0)?,
      observation_id:    row.get(1)?,
      author_id:         row.get(2)?,
      species_text:      row.get(3)?,
      scientific_name:   row.get(4)?,
      kind:              row.get(5)?,
      is_verified:       row.get(6)?,
      verified_at:       row.get(7)?,
      verified_by:       row.get(8)?,
      created_at:        row.get(9)?,
    })
  }

  pub fn into_identification(self) -> Result<Identification> {
    Ok(Identification {
      identification_id: decode_uuid(&self.identification_id)?,
      observation_id:    decode_uuid(&self.observation_id)?,
      author_id:         decode_uuid(&self.author_id)?,
      species_text:      self.species_text,
      scientific_name:   self.scientific_name,
      kind:              decode_kind(&self.kind)?,
      is_verified:       self.is_verified,
      verified_at:       decode_opt_dt(self.verified_at)?,
      verified_by:       decode_opt_uuid(self.verified_by)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `identification_votes` row.
pub struct RawVote {
  pub identification_id: String,
  pub voter_id:          String,
  pub created_at:        String,
}

impl RawVote {
  pub fn into_vote(self) -> Result<IdentificationVote> {
    Ok(IdentificationVote {
      identification_id: decode_uuid(&self.identification_id)?,
      voter_id:          decode_uuid(&self.voter_id)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

pub const TAXON_COLUMNS: &str = "taxon_id, kind, division, family, genus, species, \
  scientific_name, common_name, created_at";

/// Raw strings read directly from a `taxonomy` row.
pub struct RawTaxon {
  pub taxon_id:        String,
  pub kind:            String,
  pub division:        String,
  pub family:          Option<String>,
  pub genus:           Option<String>,
  pub species:         Option<String>,
  pub scientific_name: Option<String>,
  pub common_name:     Option<String>,
  pub created_at:      String,
}

impl RawTaxon {
  /// Read a row selected with [`TAXON_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      taxon_id:        row.get(0)?,
      kind:            row.get(1)?,
      division:        row.get(2)?,
      family:          row.get(3)?,
      genus:           row.get(4)?,
      species:         row.get(5)?,
      scientific_name: row.get(6)?,
      common_name:     row.get(7)?,
      created_at:      row.get(8)?,
    })
  }

  pub fn into_taxon(self) -> Result<TaxonomyEntry> {
    Ok(TaxonomyEntry {
      taxon_id:        decode_uuid(&self.taxon_id)?,
      kind:            decode_kind(&self.kind)?,
      division:        self.division,
      family:          self.family,
      genus:           self.genus,
      species:         self.species,
      scientific_name: self.scientific_name,
      common_name:     self.common_name,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const RELATIONSHIP_COLUMNS: &str = "r.relationship_id, r.subject_taxon_id, r.host_taxon_id, \
  r.observation_count, r.verified_count, r.tier, r.created_at, r.updated_at";

/// Raw strings read directly from a `relationships` row.
#[derive(Debug, Clone)]
pub struct RawRelationship {
  pub relationship_id:   String,
  pub subject_taxon_id:  String,
  pub host_taxon_id:     String,
  pub observation_count: u32,
  pub verified_count:    u32,
  pub tier:              String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawRelationship {
  /// Read a row selected with [`RELATIONSHIP_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relationship_id:   row.get(0)?,
      subject_taxon_id:  row.get(1)?,
      host_taxon_id:     row.get(2)?,
      observation_count: row.get(3)?,
      verified_count:    row.get(4)?,
      tier:              row.get(5)?,
      created_at:        row.get(6)?,
      updated_at:        row.get(7)?,
    })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      relationship_id:   decode_uuid(&self.relationship_id)?,
      subject_taxon_id:  decode_uuid(&self.subject_taxon_id)?,
      host_taxon_id:     decode_uuid(&self.host_taxon_id)?,
      observation_count: self.observation_count,
      verified_count:    self.verified_count,
      tier:              decode_tier(&self.tier)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}
