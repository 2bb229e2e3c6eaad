//! The relationship aggregator.
//!
//! This is the only writer of relationship rows. Link, unlink, and move all
//! funnel through [`RelationshipAggregator::link_observation`] and
//! [`RelationshipAggregator::unlink_observation`], which delegate the counter
//! arithmetic to the store's atomic primitives.

use uuid::Uuid;

use crate::{
  Error, Result,
  classify::Thresholds,
  observation::TaxonPair,
  relationship::{Relationship, Unlinked},
  store::{IdentificationStore, RelationshipStore},
};

pub struct RelationshipAggregator<'a, S> {
  store:      &'a S,
  thresholds: Thresholds,
}

impl<'a, S> RelationshipAggregator<'a, S>
where
  S: RelationshipStore + IdentificationStore,
{
  pub fn new(store: &'a S, thresholds: Thresholds) -> Self { Self { store, thresholds } }

  /// How much an observation currently adds to `verified_count`: 1 when
  /// its current identification is verified on both sides, else 0.
  pub async fn verified_contribution(&self, observation_id: Uuid) -> Result<u32> {
    let verified = self
      .store
      .is_fully_verified(observation_id)
      .await
      .map_err(Error::store)?;
    Ok(u32::from(verified))
  }

  /// Attach `observation_id` to the relationship for `pair`, creating it on
  /// first use. Any link the observation already had is released in the same
  /// atomic step, so re-linking to the same pair converges instead of
  /// double-counting.
  pub async fn link_observation(
    &self,
    observation_id: Uuid,
    pair: TaxonPair,
  ) -> Result<Relationship> {
    let contribution = self.verified_contribution(observation_id).await?;
    let relationship = self
      .store
      .upsert_and_link(pair, observation_id, contribution, self.thresholds)
      .await
      .map_err(Error::store)?;

    tracing::info!(
      %observation_id,
      relationship_id = %relationship.relationship_id,
      observation_count = relationship.observation_count,
      verified_count = relationship.verified_count,
      tier = relationship.tier.as_str(),
      "observation linked"
    );
    Ok(relationship)
  }

  /// Release `observation_id` from whatever relationship it points at.
  ///
  /// `previous_verified_contribution` is what the observation added to
  /// `verified_count`, captured before the edit or delete that triggered the
  /// release.
  pub async fn unlink_observation(
    &self,
    observation_id: Uuid,
    previous_verified_contribution: u32,
  ) -> Result<Unlinked> {
    let outcome = self
      .store
      .remove_link_and_decrement(observation_id, previous_verified_contribution, self.thresholds)
      .await
      .map_err(Error::store)?;

    match &outcome {
      Unlinked::NotLinked => {
        tracing::debug!(%observation_id, "observation was not linked");
      }
      Unlinked::Updated(r) => {
        tracing::info!(
          %observation_id,
          relationship_id = %r.relationship_id,
          observation_count = r.observation_count,
          verified_count = r.verified_count,
          tier = r.tier.as_str(),
          "observation unlinked"
        );
      }
      Unlinked::Deleted(r) => {
        tracing::info!(
          %observation_id,
          relationship_id = %r.relationship_id,
          "observation unlinked; relationship emptied and deleted"
        );
      }
    }
    Ok(outcome)
  }

  /// Move an observation between pairs: unlink with the contribution
  /// captured before the edit, then link to `new_pair` (if both sides are
  /// still resolved) with its current contribution.
  ///
  /// Returns the relationship the observation ends up in.
  pub async fn move_observation(
    &self,
    observation_id: Uuid,
    old_pair: Option<TaxonPair>,
    new_pair: Option<TaxonPair>,
    verified_contribution_before: u32,
  ) -> Result<Option<Relationship>> {
    if old_pair.is_some() {
      self.unlink_observation(observation_id, verified_contribution_before).await?;
    }
    match new_pair {
      Some(pair) => Ok(Some(self.link_observation(observation_id, pair).await?)),
      None => Ok(None),
    }
  }

  /// Recompute every stored tier against the current thresholds.
  pub async fn reclassify_all(&self) -> Result<usize> {
    let changed = self
      .store
      .reclassify_all(self.thresholds)
      .await
      .map_err(Error::store)?;
    if changed > 0 {
      tracing::info!(changed, "relationship tiers reclassified");
    }
    Ok(changed)
  }
}
