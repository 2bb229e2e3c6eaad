//! The identification vote ledger: one agreement per `(identification, voter)`.

use uuid::Uuid;

use crate::{
  Error, Result,
  store::{IdentificationStore, VoteStore},
};

pub struct VoteLedger<'a, S> {
  store: &'a S,
}

impl<'a, S> VoteLedger<'a, S>
where
  S: IdentificationStore + VoteStore,
{
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Record `voter_id`'s agreement with `identification_id`.
  ///
  /// Returns `Ok(true)` when a vote was written and `Ok(false)` when the
  /// voter had already agreed (an idempotent no-op). Fails with
  /// [`Error::IdentificationNotFound`] for an unknown identification.
  pub async fn cast_vote(&self, identification_id: Uuid, voter_id: Uuid) -> Result<bool> {
    let exists = self
      .store
      .get_identification(identification_id)
      .await
      .map_err(Error::store)?
      .is_some();
    if !exists {
      return Err(Error::IdentificationNotFound(identification_id));
    }

    let inserted = self
      .store
      .insert_vote(identification_id, voter_id)
      .await
      .map_err(Error::store)?;

    if inserted {
      tracing::debug!(%identification_id, %voter_id, "vote recorded");
    } else {
      tracing::debug!(%identification_id, %voter_id, "duplicate vote ignored");
    }
    Ok(inserted)
  }

  pub async fn count_votes(&self, identification_id: Uuid) -> Result<u32> {
    self
      .store
      .count_votes(identification_id)
      .await
      .map_err(Error::store)
  }
}
