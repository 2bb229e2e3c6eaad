//! [`RelationshipStore`] for [`SqliteStore`].
//!
//! Every mutation runs inside one `IMMEDIATE` transaction, and counters are
//! adjusted with in-place SQL arithmetic. Rust code reads counters only to
//! derive the tier.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use hostlink_core::{
  classify::{Thresholds, classify},
  observation::{Observation, TaxonPair},
  relationship::{Relationship, RelationshipQuery, Unlinked},
  store::RelationshipStore,
};

use crate::{
  Result, SqliteStore,
  encode::{
    OBSERVATION_COLUMNS, RELATIONSHIP_COLUMNS, RawObservation, RawRelationship, encode_dt,
    encode_tier, encode_uuid, sql_count,
  },
};

// ─── Transaction helpers ─────────────────────────────────────────────────────

fn select_relationship(conn: &Connection, relationship_id: &str) -> rusqlite::Result<RawRelationship> {
  conn.query_row(
    &format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships r WHERE r.relationship_id = ?1"),
    rusqlite::params![relationship_id],
    RawRelationship::from_row,
  )
}

/// Recompute and store the tier of one row. Returns the row as it now stands.
fn reclassify(
  conn: &Connection,
  relationship_id: &str,
  thresholds: &Thresholds,
) -> rusqlite::Result<RawRelationship> {
  let mut raw = select_relationship(conn, relationship_id)?;
  let tier = encode_tier(classify(raw.verified_count, raw.observation_count, thresholds));
  if raw.tier != tier {
    conn.execute(
      "UPDATE relationships SET tier = ?2 WHERE relationship_id = ?1",
      rusqlite::params![relationship_id, tier],
    )?;
    raw.tier = tier.to_owned();
  }
  Ok(raw)
}

/// What [`release_link`] did.
enum Released {
  NotLinked,
  Updated(RawRelationship),
  Deleted(RawRelationship),
}

/// Drop the link of `observation_id` and take its contribution back out of
/// the relationship it pointed at.
///
/// `verified_delta = None` subtracts the contribution recorded on the link.
/// Both counters are floored at zero; the row is deleted once both are zero.
fn release_link(
  conn: &Connection,
  observation_id: &str,
  verified_delta: Option<u32>,
  thresholds: &Thresholds,
  now: &str,
) -> rusqlite::Result<Released> {
  let link: Option<(String, u32)> = conn
    .query_row(
      "SELECT relationship_id, verified_contribution
       FROM relationship_links WHERE observation_id = ?1",
      rusqlite::params![observation_id],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?;
  let Some((relationship_id, recorded)) = link else {
    return Ok(Released::NotLinked);
  };

  conn.execute(
    "DELETE FROM relationship_links WHERE observation_id = ?1",
    rusqlite::params![observation_id],
  )?;
  conn.execute(
    "UPDATE relationships SET
       observation_count = MAX(observation_count - 1, 0),
       verified_count    = MAX(verified_count - ?2, 0),
       updated_at        = ?3
     WHERE relationship_id = ?1",
    rusqlite::params![relationship_id, verified_delta.unwrap_or(recorded), now],
  )?;

  let raw = reclassify(conn, &relationship_id, thresholds)?;
  if raw.observation_count == 0 && raw.verified_count == 0 {
    conn.execute(
      "DELETE FROM relationships WHERE relationship_id = ?1",
      rusqlite::params![relationship_id],
    )?;
    tracing::debug!(%relationship_id, "relationship row emptied and removed");
    return Ok(Released::Deleted(raw));
  }
  Ok(Released::Updated(raw))
}

// ─── RelationshipStore impl ──────────────────────────────────────────────────

impl RelationshipStore for SqliteStore {
  async fn upsert_and_link(
    &self,
    pair:                  TaxonPair,
    observation_id:        Uuid,
    verified_contribution: u32,
    thresholds:            Thresholds,
  ) -> Result<Relationship> {
    let new_id_str  = encode_uuid(Uuid::new_v4());
    let subject_str = encode_uuid(pair.subject_taxon_id);
    let host_str    = encode_uuid(pair.host_taxon_id);
    let obs_str     = encode_uuid(observation_id);
    let empty_tier  = encode_tier(classify(0, 0, &thresholds));
    let now         = encode_dt(Utc::now());

    let raw: RawRelationship = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        release_link(&tx, &obs_str, None, &thresholds, &now)?;

        tx.execute(
          "INSERT INTO relationships (
             relationship_id, subject_taxon_id, host_taxon_id,
             observation_count, verified_count, tier, created_at, updated_at
           ) VALUES (?1, ?2, ?3, 0, 0, ?4, ?5, ?5)
           ON CONFLICT (subject_taxon_id, host_taxon_id) DO NOTHING",
          rusqlite::params![new_id_str, subject_str, host_str, empty_tier, now],
        )?;
        let relationship_id: String = tx.query_row(
          "SELECT relationship_id FROM relationships
           WHERE subject_taxon_id = ?1 AND host_taxon_id = ?2",
          rusqlite::params![subject_str, host_str],
          |r| r.get(0),
        )?;

        tx.execute(
          "UPDATE relationships SET
             observation_count = observation_count + 1,
             verified_count    = verified_count + ?2,
             updated_at        = ?3
           WHERE relationship_id = ?1",
          rusqlite::params![relationship_id, verified_contribution, now],
        )?;
        tx.execute(
          "INSERT INTO relationship_links (
             observation_id, relationship_id, verified_contribution, linked_at
           ) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![obs_str, relationship_id, verified_contribution, now],
        )?;

        let raw = reclassify(&tx, &relationship_id, &thresholds)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_relationship()
  }

  async fn remove_link_and_decrement(
    &self,
    observation_id: Uuid,
    verified_delta: u32,
    thresholds:     Thresholds,
  ) -> Result<Unlinked> {
    let obs_str = encode_uuid(observation_id);
    let now     = encode_dt(Utc::now());

    let released = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let released = release_link(&tx, &obs_str, Some(verified_delta), &thresholds, &now)?;
        tx.commit()?;
        Ok(released)
      })
      .await?;

    Ok(match released {
      Released::NotLinked => Unlinked::NotLinked,
      Released::Updated(raw) => Unlinked::Updated(raw.into_relationship()?),
      Released::Deleted(raw) => Unlinked::Deleted(raw.into_relationship()?),
    })
  }

  async fn reclassify_all(&self, thresholds: Thresholds) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let rows: Vec<(String, u32, u32, String)> = {
          let mut stmt = tx.prepare(
            "SELECT relationship_id, verified_count, observation_count, tier FROM relationships",
          )?;
          stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut changed = 0;
        for (relationship_id, verified, observed, stored) in rows {
          let tier = encode_tier(classify(verified, observed, &thresholds));
          if stored != tier {
            tx.execute(
              "UPDATE relationships SET tier = ?2 WHERE relationship_id = ?1",
              rusqlite::params![relationship_id, tier],
            )?;
            changed += 1;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed)
  }

  async fn get_relationship(&self, pair: TaxonPair) -> Result<Option<Relationship>> {
    let subject_str = encode_uuid(pair.subject_taxon_id);
    let host_str    = encode_uuid(pair.host_taxon_id);

    let raw: Option<RawRelationship> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {RELATIONSHIP_COLUMNS} FROM relationships r
               WHERE r.subject_taxon_id = ?1 AND r.host_taxon_id = ?2"
            ),
            rusqlite::params![subject_str, host_str],
            RawRelationship::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRelationship::into_relationship).transpose()
  }

  async fn get_relationship_by_id(&self, id: Uuid) -> Result<Option<Relationship>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRelationship> = self
      .conn
      .call(move |conn| Ok(select_relationship(conn, &id_str).optional()?))
      .await?;

    raw.map(RawRelationship::into_relationship).transpose()
  }

  async fn relationship_for_observation(&self, observation_id: Uuid) -> Result<Option<Relationship>> {
    let obs_str = encode_uuid(observation_id);

    let raw: Option<RawRelationship> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {RELATIONSHIP_COLUMNS}
               FROM relationship_links l
               JOIN relationships r ON r.relationship_id = l.relationship_id
               WHERE l.observation_id = ?1"
            ),
            rusqlite::params![obs_str],
            RawRelationship::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRelationship::into_relationship).transpose()
  }

  async fn list_relationships(&self, query: &RelationshipQuery) -> Result<Vec<Relationship>> {
    let subject_str = query.subject_taxon_id.map(encode_uuid);
    let host_str    = query.host_taxon_id.map(encode_uuid);
    let tier_str    = query.tier.map(encode_tier);
    let limit_val   = sql_count(query.limit.unwrap_or(100));
    let offset_val  = sql_count(query.offset.unwrap_or(0));

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RELATIONSHIP_COLUMNS}
           FROM relationships r
           WHERE (?1 IS NULL OR r.subject_taxon_id = ?1)
             AND (?2 IS NULL OR r.host_taxon_id = ?2)
             AND (?3 IS NULL OR r.tier = ?3)
           ORDER BY r.verified_count DESC, r.observation_count DESC, r.rowid
           LIMIT ?4 OFFSET ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![subject_str, host_str, tier_str, limit_val, offset_val],
            RawRelationship::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_relationship).collect()
  }

  async fn relationship_observations(&self, relationship_id: Uuid) -> Result<Vec<Observation>> {
    let id_str = encode_uuid(relationship_id);

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OBSERVATION_COLUMNS}
           FROM relationship_links l
           JOIN observations o ON o.observation_id = l.observation_id
           WHERE l.relationship_id = ?1
           ORDER BY o.created_at DESC, o.rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawObservation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }
}

