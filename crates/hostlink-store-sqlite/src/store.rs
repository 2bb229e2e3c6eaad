//! [`SqliteStore`], the SQLite implementation of the Hostlink store traits.
//!
//! Observations, identifications, and votes live here; the catalog and the
//! relationship primitives are in `catalog.rs` and `relationships.rs`.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use hostlink_core::{
  identification::{Identification, IdentificationVote, NewIdentification},
  observation::{NewObservation, Observation, ObservationEdit, ObservationQuery},
  store::{Backend, IdentificationStore, ObservationStore, VoteStore},
  taxonomy::TaxonKind,
};

use crate::{
  Error, Result,
  encode::{
    IDENTIFICATION_COLUMNS, OBSERVATION_COLUMNS, RawIdentification, RawObservation, RawVote,
    encode_dt, encode_kind, encode_uuid, sql_count,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Hostlink store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_observation(&self, id: Uuid) -> Result<Option<Observation>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawObservation> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {OBSERVATION_COLUMNS} FROM observations o WHERE o.observation_id = ?1"),
            rusqlite::params![id_str],
            RawObservation::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawObservation::into_observation).transpose()
  }
}

/// Column pair written when a side's current identification changes.
fn side_columns(kind: TaxonKind) -> (&'static str, &'static str) {
  match kind {
    TaxonKind::Subject => ("subject_identification", "subject_taxon_id"),
    TaxonKind::Host => ("host_identification", "host_taxon_id"),
  }
}

impl Backend for SqliteStore {
  type Error = Error;
}

// ─── ObservationStore impl ───────────────────────────────────────────────────

impl ObservationStore for SqliteStore {
  async fn insert_observation(&self, input: NewObservation) -> Result<Observation> {
    let now = Utc::now();
    let observation = Observation {
      observation_id:         Uuid::new_v4(),
      owner_id:               input.owner_id,
      subject_taxon_id:       input.subject_taxon_id,
      host_taxon_id:          input.host_taxon_id,
      subject_identification: input.subject_identification,
      host_identification:    input.host_identification,
      notes:                  input.notes,
      created_at:             now,
      updated_at:             now,
    };

    let id_str      = encode_uuid(observation.observation_id);
    let owner_str   = encode_uuid(observation.owner_id);
    let subject_str = observation.subject_taxon_id.map(encode_uuid);
    let host_str    = observation.host_taxon_id.map(encode_uuid);
    let subject_txt = observation.subject_identification.clone();
    let host_txt    = observation.host_identification.clone();
    let notes       = observation.notes.clone();
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO observations (
             observation_id, owner_id, subject_taxon_id, host_taxon_id,
             subject_identification, host_identification, notes,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str,
            owner_str,
            subject_str,
            host_str,
            subject_txt,
            host_txt,
            notes,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(observation)
  }

  async fn get_observation(&self, id: Uuid) -> Result<Option<Observation>> {
    self.fetch_observation(id).await
  }

  async fn list_observations(&self, query: &ObservationQuery) -> Result<Vec<Observation>> {
    let owner_str   = query.owner_id.map(encode_uuid);
    let subject_str = query.subject_taxon_id.map(encode_uuid);
    let host_str    = query.host_taxon_id.map(encode_uuid);
    let limit_val   = sql_count(query.limit.unwrap_or(100));
    let offset_val  = sql_count(query.offset.unwrap_or(0));

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OBSERVATION_COLUMNS}
           FROM observations o
           WHERE (?1 IS NULL OR o.owner_id = ?1)
             AND (?2 IS NULL OR o.subject_taxon_id = ?2)
             AND (?3 IS NULL OR o.host_taxon_id = ?3)
           ORDER BY o.created_at DESC, o.rowid DESC
           LIMIT ?4 OFFSET ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner_str, subject_str, host_str, limit_val, offset_val],
            RawObservation::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }

  async fn update_observation(
    &self,
    id:   Uuid,
    edit: ObservationEdit,
  ) -> Result<Option<Observation>> {
    let id_str      = encode_uuid(id);
    let subject_str = edit.subject_taxon_id.map(encode_uuid);
    let host_str    = edit.host_taxon_id.map(encode_uuid);
    let at_str      = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE observations SET
             subject_taxon_id       = CASE WHEN ?4 IS NOT NULL THEN ?2
                                          ELSE COALESCE(?2, subject_taxon_id) END,
             host_taxon_id          = CASE WHEN ?5 IS NOT NULL THEN ?3
                                          ELSE COALESCE(?3, host_taxon_id) END,
             subject_identification = COALESCE(?4, subject_identification),
             host_identification    = COALESCE(?5, host_identification),
             notes                  = COALESCE(?6, notes),
             updated_at             = ?7
           WHERE observation_id = ?1",
          rusqlite::params![
            id_str,
            subject_str,
            host_str,
            edit.subject_identification,
            edit.host_identification,
            edit.notes,
            at_str,
          ],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !changed {
      return Ok(None);
    }
    self.fetch_observation(id).await
  }

  async fn update_current_identification(
    &self,
    id:       Uuid,
    kind:     TaxonKind,
    text:     String,
    taxon_id: Option<Uuid>,
  ) -> Result<bool> {
    let (text_col, taxon_col) = side_columns(kind);
    let sql = format!(
      "UPDATE observations
       SET {text_col} = ?2, {taxon_col} = COALESCE(?3, {taxon_col}), updated_at = ?4
       WHERE observation_id = ?1"
    );
    let id_str    = encode_uuid(id);
    let taxon_str = taxon_id.map(encode_uuid);
    let at_str    = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&sql, rusqlite::params![id_str, text, taxon_str, at_str])? > 0)
      })
      .await?;
    Ok(changed)
  }

  async fn delete_observation(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM observations WHERE observation_id = ?1",
          rusqlite::params![id_str],
        )? > 0)
      })
      .await?;
    Ok(deleted)
  }
}

// ─── IdentificationStore impl ────────────────────────────────────────────────

impl IdentificationStore for SqliteStore {
  async fn insert_identification(&self, input: NewIdentification) -> Result<Identification> {
    let identification = Identification {
      identification_id: Uuid::new_v4(),
      observation_id:    input.observation_id,
      author_id:         input.author_id,
      species_text:      input.species_text,
      scientific_name:   input.scientific_name,
      kind:              input.kind,
      is_verified:       false,
      verified_at:       None,
      verified_by:       None,
      created_at:        Utc::now(),
    };

    let id_str      = encode_uuid(identification.identification_id);
    let obs_str     = encode_uuid(identification.observation_id);
    let author_str  = encode_uuid(identification.author_id);
    let species     = identification.species_text.clone();
    let scientific  = identification.scientific_name.clone();
    let kind_str    = encode_kind(identification.kind);
    let at_str      = encode_dt(identification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identifications (
             identification_id, observation_id, author_id, species_text,
             scientific_name, kind, is_verified, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
          rusqlite::params![id_str, obs_str, author_str, species, scientific, kind_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(identification)
  }

  async fn get_identification(&self, id: Uuid) -> Result<Option<Identification>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentification> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {IDENTIFICATION_COLUMNS} FROM identifications WHERE identification_id = ?1"
            ),
            rusqlite::params![id_str],
            RawIdentification::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentification::into_identification).transpose()
  }

  async fn list_identifications(&self, observation_id: Uuid) -> Result<Vec<Identification>> {
    let obs_str = encode_uuid(observation_id);

    let raws: Vec<RawIdentification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {IDENTIFICATION_COLUMNS} FROM identifications
           WHERE observation_id = ?1
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![obs_str], RawIdentification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentification::into_identification).collect()
  }

  async fn set_verified(
    &self,
    id:          Uuid,
    verifier_id: Uuid,
    at:          DateTime<Utc>,
  ) -> Result<bool> {
    let id_str       = encode_uuid(id);
    let verifier_str = encode_uuid(verifier_id);
    let at_str       = encode_dt(at);

    let fired = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE identifications
           SET is_verified = 1, verified_at = ?2, verified_by = ?3
           WHERE identification_id = ?1 AND is_verified = 0",
          rusqlite::params![id_str, at_str, verifier_str],
        )?;
        Ok(n == 1)
      })
      .await?;
    Ok(fired)
  }

  async fn is_fully_verified(&self, observation_id: Uuid) -> Result<bool> {
    let obs_str = encode_uuid(observation_id);

    // A missing observation reads as not verified.
    let verified = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM observations o
             WHERE o.observation_id = ?1
               AND EXISTS (
                 SELECT 1 FROM identifications i
                 WHERE i.observation_id = o.observation_id
                   AND i.kind = 'subject'
                   AND i.is_verified = 1
                   AND i.species_text = o.subject_identification)
               AND EXISTS (
                 SELECT 1 FROM identifications i
                 WHERE i.observation_id = o.observation_id
                   AND i.kind = 'host'
                   AND i.is_verified = 1
                   AND i.species_text = o.host_identification)
           )",
          rusqlite::params![obs_str],
          |r| r.get::<_, bool>(0),
        )?)
      })
      .await?;
    Ok(verified)
  }
}

// ─── VoteStore impl ──────────────────────────────────────────────────────────

impl VoteStore for SqliteStore {
  async fn insert_vote(&self, identification_id: Uuid, voter_id: Uuid) -> Result<bool> {
    let ident_str = encode_uuid(identification_id);
    let voter_str = encode_uuid(voter_id);
    let at_str    = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO identification_votes (identification_id, voter_id, created_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (identification_id, voter_id) DO NOTHING",
          rusqlite::params![ident_str, voter_str, at_str],
        )?;
        Ok(n == 1)
      })
      .await?;
    Ok(inserted)
  }

  async fn count_votes(&self, identification_id: Uuid) -> Result<u32> {
    let ident_str = encode_uuid(identification_id);

    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM identification_votes WHERE identification_id = ?1",
          rusqlite::params![ident_str],
          |r| r.get::<_, u32>(0),
        )?)
      })
      .await?;
    Ok(count)
  }

  async fn list_votes(&self, identification_id: Uuid) -> Result<Vec<IdentificationVote>> {
    let ident_str = encode_uuid(identification_id);

    let raws: Vec<RawVote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT identification_id, voter_id, created_at
           FROM identification_votes
           WHERE identification_id = ?1
           ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![ident_str], |row| {
            Ok(RawVote {
              identification_id: row.get(0)?,
              voter_id:          row.get(1)?,
              created_at:        row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVote::into_vote).collect()
  }
}
