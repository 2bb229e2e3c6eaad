//! The one-way `Unverified → Verified` transition for identifications, and
//! the best-effort propagation that follows it.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::RelationshipAggregator,
  classify::Thresholds,
  identification::Identification,
  ledger::VoteLedger,
  store::EngineStore,
  taxonomy::TaxonomyResolver,
};

/// What [`VerificationStateMachine::on_vote_cast`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Transition {
  /// Not enough votes yet.
  Pending { votes: u32, threshold: u32 },
  /// The threshold was already crossed by an earlier vote.
  AlreadyVerified,
  /// This call performed the transition.
  Verified,
}

impl Transition {
  pub fn fired(self) -> bool { matches!(self, Self::Verified) }
}

pub struct VerificationStateMachine<'a, S> {
  store:      &'a S,
  threshold:  u32,
  thresholds: Thresholds,
}

impl<'a, S: EngineStore> VerificationStateMachine<'a, S> {
  pub fn new(store: &'a S, threshold: u32, thresholds: Thresholds) -> Self {
    Self { store, threshold, thresholds }
  }

  /// Re-count votes for `identification_id` and verify it if the threshold
  /// is met. Safe to call after every inserted vote; the transition and its
  /// side effects happen at most once.
  ///
  /// Only the count and the verified flag can fail this call. Updating the
  /// observation, resolving taxonomy, and linking the relationship are
  /// best-effort: failures are logged and the transition still stands.
  pub async fn on_vote_cast(&self, identification_id: Uuid, voter_id: Uuid) -> Result<Transition> {
    let votes = VoteLedger::new(self.store).count_votes(identification_id).await?;
    if votes < self.threshold {
      tracing::debug!(%identification_id, votes, threshold = self.threshold, "below verification threshold");
      return Ok(Transition::Pending { votes, threshold: self.threshold });
    }

    let identification = self
      .store
      .get_identification(identification_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::IdentificationNotFound(identification_id))?;
    if identification.is_verified {
      return Ok(Transition::AlreadyVerified);
    }

    let fired = self
      .store
      .set_verified(identification_id, voter_id, Utc::now())
      .await
      .map_err(Error::store)?;
    if !fired {
      // Another voter crossed the threshold between our read and write.
      return Ok(Transition::AlreadyVerified);
    }

    tracing::info!(
      %identification_id,
      observation_id = %identification.observation_id,
      kind = identification.kind.as_str(),
      votes,
      "identification verified"
    );

    if let Err(e) = self.propagate(&identification).await {
      tracing::warn!(
        %identification_id,
        observation_id = %identification.observation_id,
        error = %e,
        "post-verification propagation failed"
      );
    }

    Ok(Transition::Verified)
  }

  /// Push a freshly verified identification into its observation and, when
  /// both sides are resolved, into the relationship aggregate.
  async fn propagate(&self, identification: &Identification) -> Result<()> {
    let observation_id = identification.observation_id;
    let kind = identification.kind;

    let taxon_id = match TaxonomyResolver::new(self.store)
      .resolve(&identification.species_text, kind)
      .await
    {
      Ok(found) => found,
      Err(e) => {
        tracing::warn!(%observation_id, error = %e, "taxonomy lookup failed; leaving taxon unresolved");
        None
      }
    };

    let updated = self
      .store
      .update_current_identification(
        observation_id,
        kind,
        identification.species_text.clone(),
        taxon_id,
      )
      .await
      .map_err(Error::store)?;
    if !updated {
      return Err(Error::ObservationNotFound(observation_id));
    }

    let observation = self
      .store
      .get_observation(observation_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ObservationNotFound(observation_id))?;

    if let Some(pair) = observation.pair() {
      RelationshipAggregator::new(self.store, self.thresholds)
        .link_observation(observation_id, pair)
        .await?;
    } else {
      tracing::debug!(%observation_id, "observation not fully resolved; relationship untouched");
    }
    Ok(())
  }
}
