//! [`Engine`], the facade the CRUD layer calls into.
//!
//! Each method is one short-lived unit of work. The engine holds no mutable
//! state of its own; everything shared lives in the store.

use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::RelationshipAggregator,
  classify::{Thresholds, Tier, classify},
  config::EngineConfig,
  identification::{Identification, NewIdentification, TalliedIdentification, VoteOutcome},
  ledger::VoteLedger,
  observation::{NewObservation, Observation, ObservationEdit, ObservationQuery, TaxonPair},
  relationship::{Relationship, RelationshipQuery, Unlinked},
  store::EngineStore,
  taxonomy::{TaxonKind, TaxonomyResolver},
  verification::VerificationStateMachine,
};

/// An observation with everything a detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ObservationDetail {
  pub observation:     Observation,
  pub identifications: Vec<TalliedIdentification>,
  pub relationship:    Option<Relationship>,
}

pub struct Engine<S> {
  store:      S,
  config:     EngineConfig,
  thresholds: Thresholds,
}

impl<S: EngineStore> Engine<S> {
  pub fn new(store: S, config: EngineConfig) -> Self {
    let thresholds = config.thresholds();
    Self { store, config, thresholds }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn thresholds(&self) -> Thresholds { self.thresholds }

  fn aggregator(&self) -> RelationshipAggregator<'_, S> {
    RelationshipAggregator::new(&self.store, self.thresholds)
  }

  fn verifier(&self) -> VerificationStateMachine<'_, S> {
    VerificationStateMachine::new(&self.store, self.config.verification_vote_threshold, self.thresholds)
  }

  // ── Votes and identifications ─────────────────────────────────────────────

  /// Record `voter_id`'s agreement and run the verification check.
  ///
  /// Only a missing identification or a failed vote insert is an error.
  /// Everything after the insert degrades to `verified_now: false` plus a
  /// warning.
  pub async fn cast_vote(&self, identification_id: Uuid, voter_id: Uuid) -> Result<VoteOutcome> {
    let inserted = VoteLedger::new(&self.store).cast_vote(identification_id, voter_id).await?;
    if !inserted {
      return Ok(VoteOutcome { inserted: false, verified_now: false });
    }

    let verified_now = match self.verifier().on_vote_cast(identification_id, voter_id).await {
      Ok(t) => t.fired(),
      Err(e) => {
        tracing::warn!(%identification_id, %voter_id, error = %e, "verification check failed after vote");
        false
      }
    };
    Ok(VoteOutcome { inserted: true, verified_now })
  }

  /// Propose `species_text` for one side of an observation. The author's own
  /// agreement is cast immediately through the ledger.
  pub async fn create_identification(
    &self,
    observation_id: Uuid,
    author_id: Uuid,
    kind: TaxonKind,
    species_text: &str,
    scientific_name: Option<String>,
  ) -> Result<Identification> {
    let species_text = species_text.trim();
    if species_text.is_empty() {
      return Err(Error::InvalidInput("species text must not be empty".into()));
    }
    self.require_observation(observation_id).await?;

    let identification = self
      .store
      .insert_identification(NewIdentification {
        observation_id,
        author_id,
        kind,
        species_text: species_text.to_owned(),
        scientific_name: scientific_name.filter(|s| !s.trim().is_empty()),
      })
      .await
      .map_err(Error::store)?;
    let identification_id = identification.identification_id;

    match self.cast_vote(identification_id, author_id).await {
      Ok(VoteOutcome { verified_now: true, .. }) => {
        // Re-read so the caller sees the verified flag.
        if let Ok(Some(fresh)) = self.store.get_identification(identification_id).await {
          return Ok(fresh);
        }
      }
      Ok(_) => {}
      Err(e) => {
        tracing::warn!(%identification_id, %author_id, error = %e, "author self-vote failed");
      }
    }
    Ok(identification)
  }

  pub async fn get_identification(&self, identification_id: Uuid) -> Result<TalliedIdentification> {
    let identification = self
      .store
      .get_identification(identification_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::IdentificationNotFound(identification_id))?;
    self.tally(identification).await
  }

  async fn tally(&self, identification: Identification) -> Result<TalliedIdentification> {
    let votes = self
      .store
      .list_votes(identification.identification_id)
      .await
      .map_err(Error::store)?;
    let vote_count = u32::try_from(votes.len()).unwrap_or(u32::MAX);
    Ok(TalliedIdentification { identification, vote_count, votes })
  }

  // ── Observation lifecycle ─────────────────────────────────────────────────

  /// Record a new observation. Free-text sides without an explicit taxon id
  /// are resolved best-effort, and each non-empty side gets the owner's
  /// self-identification.
  pub async fn create_observation(&self, mut input: NewObservation) -> Result<Observation> {
    input.subject_identification = input.subject_identification.trim().to_owned();
    input.host_identification = input.host_identification.trim().to_owned();
    self.require_taxon(input.subject_taxon_id, TaxonKind::Subject).await?;
    self.require_taxon(input.host_taxon_id, TaxonKind::Host).await?;
    if input.subject_taxon_id.is_none() {
      input.subject_taxon_id =
        self.resolve_best_effort(&input.subject_identification, TaxonKind::Subject).await;
    }
    if input.host_taxon_id.is_none() {
      input.host_taxon_id =
        self.resolve_best_effort(&input.host_identification, TaxonKind::Host).await;
    }

    let observation = self
      .store
      .insert_observation(input)
      .await
      .map_err(Error::store)?;
    let observation_id = observation.observation_id;
    tracing::info!(%observation_id, owner_id = %observation.owner_id, "observation created");

    for kind in [TaxonKind::Subject, TaxonKind::Host] {
      let text = observation.identification_text(kind);
      if !text.is_empty() {
        self
          .create_identification(observation_id, observation.owner_id, kind, text, None)
          .await?;
      }
    }

    let observation = self.require_observation(observation_id).await?;
    if let Some(pair) = observation.pair()
      && let Err(e) = self.aggregator().link_observation(observation_id, pair).await
    {
      tracing::warn!(%observation_id, error = %e, "linking new observation failed");
    }
    Ok(observation)
  }

  /// Apply an owner's edit. If the edit moves the observation to a different
  /// taxon pair, the relationship aggregate follows.
  pub async fn edit_observation(
    &self,
    observation_id: Uuid,
    editor_id: Uuid,
    mut edit: ObservationEdit,
  ) -> Result<Observation> {
    let before = self.require_owned(observation_id, editor_id).await?;
    if edit.is_empty() {
      return Ok(before);
    }

    self.require_taxon(edit.subject_taxon_id, TaxonKind::Subject).await?;
    self.require_taxon(edit.host_taxon_id, TaxonKind::Host).await?;

    // New text without an explicit id is re-resolved; a miss clears the id.
    if edit.subject_taxon_id.is_none()
      && let Some(text) = edit.subject_identification.as_deref()
    {
      edit.subject_taxon_id = self.resolve_best_effort(text, TaxonKind::Subject).await;
    }
    if edit.host_taxon_id.is_none()
      && let Some(text) = edit.host_identification.as_deref()
    {
      edit.host_taxon_id = self.resolve_best_effort(text, TaxonKind::Host).await;
    }

    let contribution_before = self.aggregator().verified_contribution(observation_id).await?;
    let after = self
      .store
      .update_observation(observation_id, edit)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ObservationNotFound(observation_id))?;

    if let Err(e) = self
      .on_observation_moved(observation_id, before.pair(), after.pair(), contribution_before)
      .await
    {
      tracing::warn!(%observation_id, error = %e, "relinking edited observation failed");
    }
    Ok(after)
  }

  /// Delete an owner's observation, releasing its relationship link first.
  pub async fn delete_observation(&self, observation_id: Uuid, requester_id: Uuid) -> Result<()> {
    self.require_owned(observation_id, requester_id).await?;

    match self.aggregator().verified_contribution(observation_id).await {
      Ok(contribution) => {
        if let Err(e) = self.on_observation_deleted(observation_id, contribution).await {
          tracing::warn!(%observation_id, error = %e, "unlinking deleted observation failed");
        }
      }
      Err(e) => {
        tracing::warn!(%observation_id, error = %e, "could not read verified contribution before delete");
      }
    }

    let deleted = self
      .store
      .delete_observation(observation_id)
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::ObservationNotFound(observation_id));
    }
    tracing::info!(%observation_id, "observation deleted");
    Ok(())
  }

  /// Re-point an observation whose taxon pair changed from `old_pair` to
  /// `new_pair`. `verified_contribution_before` must be captured before the
  /// change was applied.
  pub async fn on_observation_moved(
    &self,
    observation_id: Uuid,
    old_pair: Option<TaxonPair>,
    new_pair: Option<TaxonPair>,
    verified_contribution_before: u32,
  ) -> Result<Option<Relationship>> {
    if old_pair == new_pair {
      tracing::debug!(%observation_id, "taxon pair unchanged; relationship untouched");
      return Ok(None);
    }
    self
      .aggregator()
      .move_observation(observation_id, old_pair, new_pair, verified_contribution_before)
      .await
  }

  /// Release a deleted observation's contribution.
  pub async fn on_observation_deleted(
    &self,
    observation_id: Uuid,
    verified_contribution_at_delete: u32,
  ) -> Result<Unlinked> {
    self
      .aggregator()
      .unlink_observation(observation_id, verified_contribution_at_delete)
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn observation_detail(&self, observation_id: Uuid) -> Result<ObservationDetail> {
    let observation = self.require_observation(observation_id).await?;
    let identifications = self
      .store
      .list_identifications(observation_id)
      .await
      .map_err(Error::store)?;

    let mut tallied = Vec::with_capacity(identifications.len());
    for identification in identifications {
      tallied.push(self.tally(identification).await?);
    }

    let relationship = self
      .store
      .relationship_for_observation(observation_id)
      .await
      .map_err(Error::store)?;

    Ok(ObservationDetail { observation, identifications: tallied, relationship })
  }

  pub async fn list_observations(&self, query: &ObservationQuery) -> Result<Vec<Observation>> {
    self.store.list_observations(query).await.map_err(Error::store)
  }

  pub async fn get_relationship(&self, relationship_id: Uuid) -> Result<Relationship> {
    self
      .store
      .get_relationship_by_id(relationship_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RelationshipNotFound(relationship_id))
  }

  pub async fn find_relationship(&self, pair: TaxonPair) -> Result<Option<Relationship>> {
    self.store.get_relationship(pair).await.map_err(Error::store)
  }

  pub async fn list_relationships(&self, query: &RelationshipQuery) -> Result<Vec<Relationship>> {
    self.store.list_relationships(query).await.map_err(Error::store)
  }

  pub async fn relationship_observations(&self, relationship_id: Uuid) -> Result<Vec<Observation>> {
    self.get_relationship(relationship_id).await?;
    self
      .store
      .relationship_observations(relationship_id)
      .await
      .map_err(Error::store)
  }

  /// Classify counters with the configured thresholds.
  pub fn classify(&self, verified_count: u32, observation_count: u32) -> Tier {
    classify(verified_count, observation_count, &self.thresholds)
  }

  /// Bring stored tiers in line with the configured thresholds.
  pub async fn reclassify_all(&self) -> Result<usize> {
    self.aggregator().reclassify_all().await
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn require_observation(&self, observation_id: Uuid) -> Result<Observation> {
    self
      .store
      .get_observation(observation_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ObservationNotFound(observation_id))
  }

  async fn require_owned(&self, observation_id: Uuid, actor: Uuid) -> Result<Observation> {
    let observation = self.require_observation(observation_id).await?;
    if observation.owner_id != actor {
      return Err(Error::Forbidden { observation_id, actor });
    }
    Ok(observation)
  }

  /// An explicit taxon id must name a catalog entry of the matching kind.
  async fn require_taxon(&self, taxon_id: Option<Uuid>, kind: TaxonKind) -> Result<()> {
    let Some(taxon_id) = taxon_id else {
      return Ok(());
    };
    match self.store.get_taxon(taxon_id).await.map_err(Error::store)? {
      Some(entry) if entry.kind == kind => Ok(()),
      Some(_) => Err(Error::InvalidInput(format!("taxon {taxon_id} is not a {} taxon", kind.as_str()))),
      None => Err(Error::InvalidInput(format!("unknown taxon {taxon_id}"))),
    }
  }

  async fn resolve_best_effort(&self, text: &str, kind: TaxonKind) -> Option<Uuid> {
    match TaxonomyResolver::new(&self.store).resolve(text, kind).await {
      Ok(found) => found,
      Err(e) => {
        tracing::warn!(text, kind = kind.as_str(), error = %e, "taxonomy lookup failed");
        None
      }
    }
  }
}
