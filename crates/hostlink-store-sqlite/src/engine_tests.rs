//! End-to-end engine flows against an in-memory `SqliteStore`.

use std::sync::Arc;

use hostlink_core::{
  Engine, Error,
  classify::Tier,
  config::EngineConfig,
  observation::{NewObservation, ObservationEdit, TaxonPair},
  store::{IdentificationStore, RelationshipStore, TaxonomyCatalog},
  taxonomy::{NewTaxon, TaxonKind},
};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::SqliteStore;

struct Catalog {
  small_white: Uuid,
  cabbage:     Uuid,
  nasturtium:  Uuid,
}

async fn engine() -> (Engine<SqliteStore>, Catalog) {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");

  let mut ids = Vec::new();
  for row in [
    NewTaxon::species(TaxonKind::Subject, "Pieris rapae", Some("Small white")),
    NewTaxon::species(TaxonKind::Host, "Brassica oleracea", Some("Cabbage")),
    NewTaxon::species(TaxonKind::Host, "Tropaeolum majus", Some("Nasturtium")),
  ] {
    ids.push(store.add_taxon(row).await.unwrap().taxon_id);
  }
  let catalog = Catalog { small_white: ids[0], cabbage: ids[1], nasturtium: ids[2] };

  (Engine::new(store, EngineConfig::default()), catalog)
}

fn sighting(owner_id: Uuid, subject: &str, host: &str) -> NewObservation {
  NewObservation {
    owner_id,
    subject_identification: subject.into(),
    host_identification: host.into(),
    ..Default::default()
  }
}

/// The owner's self-identification for one side of an observation.
async fn own_identification(
  engine: &Engine<SqliteStore>,
  observation_id: Uuid,
  kind: TaxonKind,
) -> Uuid {
  engine
    .observation_detail(observation_id)
    .await
    .unwrap()
    .identifications
    .into_iter()
    .find(|t| t.identification.kind == kind)
    .expect("self-identification")
    .identification
    .identification_id
}

async fn vote_times(engine: &Engine<SqliteStore>, identification_id: Uuid, n: usize) {
  for _ in 0..n {
    engine.cast_vote(identification_id, Uuid::new_v4()).await.unwrap();
  }
}

/// Push both self-identifications of an observation past the threshold.
async fn verify_both_sides(engine: &Engine<SqliteStore>, observation_id: Uuid) {
  for kind in [TaxonKind::Subject, TaxonKind::Host] {
    let id = own_identification(engine, observation_id, kind).await;
    vote_times(engine, id, 2).await;
  }
}

// ─── Votes and verification ──────────────────────────────────────────────────

#[tokio::test]
async fn verification_fires_exactly_at_threshold() {
  let (engine, _) = engine().await;
  let owner = Uuid::new_v4();
  let obs = engine.create_observation(sighting(owner, "", "")).await.unwrap();

  // The author's own vote counts as the first.
  let ident = engine
    .create_identification(obs.observation_id, owner, TaxonKind::Subject, "Pieris rapae", None)
    .await
    .unwrap();
  assert!(!ident.is_verified);
  let id = ident.identification_id;

  let second = engine.cast_vote(id, Uuid::new_v4()).await.unwrap();
  assert!(second.inserted && !second.verified_now);
  assert!(!engine.get_identification(id).await.unwrap().identification.is_verified);

  let third = engine.cast_vote(id, Uuid::new_v4()).await.unwrap();
  assert!(third.inserted && third.verified_now);

  let fourth = engine.cast_vote(id, Uuid::new_v4()).await.unwrap();
  assert!(fourth.inserted && !fourth.verified_now);

  let tallied = engine.get_identification(id).await.unwrap();
  assert!(tallied.identification.is_verified);
  assert_eq!(tallied.vote_count, 4);
  assert!(tallied.identification.verified_by.is_some());
}

#[tokio::test]
async fn duplicate_vote_changes_nothing() {
  let (engine, _) = engine().await;
  let owner = Uuid::new_v4();
  let obs = engine.create_observation(sighting(owner, "Pieris rapae", "")).await.unwrap();
  let id = own_identification(&engine, obs.observation_id, TaxonKind::Subject).await;

  let again = engine.cast_vote(id, owner).await.unwrap();
  assert!(!again.inserted);
  assert!(!again.verified_now);
  assert_eq!(engine.get_identification(id).await.unwrap().vote_count, 1);
}

#[tokio::test]
async fn vote_on_unknown_identification_is_not_found() {
  let (engine, _) = engine().await;
  let missing = Uuid::new_v4();

  let err = engine.cast_vote(missing, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::IdentificationNotFound(id) if id == missing));
}

#[tokio::test]
async fn blank_identification_text_is_rejected() {
  let (engine, _) = engine().await;
  let owner = Uuid::new_v4();
  let obs = engine.create_observation(sighting(owner, "", "")).await.unwrap();

  let err = engine
    .create_identification(obs.observation_id, owner, TaxonKind::Host, "   ", None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn concurrent_votes_verify_once() {
  let (engine, _) = engine().await;
  let engine = Arc::new(engine);
  let owner = Uuid::new_v4();
  let obs = engine.create_observation(sighting(owner, "Pieris rapae", "")).await.unwrap();
  let id = own_identification(&engine, obs.observation_id, TaxonKind::Subject).await;

  let mut tasks = JoinSet::new();
  for _ in 0..10 {
    let engine = Arc::clone(&engine);
    tasks.spawn(async move { engine.cast_vote(id, Uuid::new_v4()).await.unwrap() });
  }

  let mut fired = 0;
  while let Some(outcome) = tasks.join_next().await {
    if outcome.unwrap().verified_now {
      fired += 1;
    }
  }
  assert_eq!(fired, 1);
  assert_eq!(engine.get_identification(id).await.unwrap().vote_count, 11);
}

// ─── Propagation into relationships ──────────────────────────────────────────

#[tokio::test]
async fn resolved_observation_links_on_create() {
  let (engine, catalog) = engine().await;
  let obs = engine
    .create_observation(sighting(Uuid::new_v4(), "small white", "cabbage"))
    .await
    .unwrap();

  assert_eq!(obs.subject_taxon_id, Some(catalog.small_white));
  assert_eq!(obs.host_taxon_id, Some(catalog.cabbage));

  let r = engine
    .find_relationship(TaxonPair::new(catalog.small_white, catalog.cabbage))
    .await
    .unwrap()
    .unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 0));
  assert_eq!(r.tier, Tier::HostPlant);
}

#[tokio::test]
async fn one_verified_side_does_not_count_as_verified() {
  let (engine, catalog) = engine().await;
  let obs = engine
    .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
    .await
    .unwrap();
  let id = own_identification(&engine, obs.observation_id, TaxonKind::Subject).await;

  vote_times(&engine, id, 2).await;

  let r = engine
    .find_relationship(TaxonPair::new(catalog.small_white, catalog.cabbage))
    .await
    .unwrap()
    .unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 0));
  assert_eq!(r.tier, Tier::HostPlant);
}

#[tokio::test]
async fn both_sides_verified_counts_once() {
  let (engine, catalog) = engine().await;
  let pair = TaxonPair::new(catalog.small_white, catalog.cabbage);
  let obs = engine
    .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
    .await
    .unwrap();

  verify_both_sides(&engine, obs.observation_id).await;

  let r = engine.find_relationship(pair).await.unwrap().unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 1));
  assert_eq!(r.tier, Tier::OccasionalHost);

  // A competing verified identification does not add to the count.
  let rival = engine
    .create_identification(obs.observation_id, Uuid::new_v4(), TaxonKind::Host, "Brassica oleracea", None)
    .await
    .unwrap();
  vote_times(&engine, rival.identification_id, 2).await;

  let r = engine.find_relationship(pair).await.unwrap().unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 1));
  assert!(r.verified_count <= r.observation_count);
}

#[tokio::test]
async fn two_fully_verified_observations_make_an_alternate_host() {
  let (engine, catalog) = engine().await;
  for _ in 0..2 {
    let obs = engine
      .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
      .await
      .unwrap();
    verify_both_sides(&engine, obs.observation_id).await;
  }

  let r = engine
    .find_relationship(TaxonPair::new(catalog.small_white, catalog.cabbage))
    .await
    .unwrap()
    .unwrap();
  assert_eq!((r.observation_count, r.verified_count), (2, 2));
  assert_eq!(r.tier, Tier::AlternateHost);
}

#[tokio::test]
async fn relinking_after_second_side_verifies_converges() {
  let (engine, catalog) = engine().await;
  let pair = TaxonPair::new(catalog.small_white, catalog.cabbage);
  let obs = engine
    .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
    .await
    .unwrap();
  let observation_id = obs.observation_id;

  let subject = own_identification(&engine, observation_id, TaxonKind::Subject).await;
  vote_times(&engine, subject, 2).await;
  let r = engine.find_relationship(pair).await.unwrap().unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 0));

  let host = own_identification(&engine, observation_id, TaxonKind::Host).await;
  vote_times(&engine, host, 2).await;
  let r = engine.find_relationship(pair).await.unwrap().unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 1));

  // An explicit relink through the store lands on the same counters.
  let relinked = engine
    .store()
    .upsert_and_link(pair, observation_id, 1, engine.thresholds())
    .await
    .unwrap();
  assert_eq!((relinked.observation_count, relinked.verified_count), (1, 1));
}

#[tokio::test]
async fn verification_resolves_taxon_and_completes_pair() {
  let (engine, catalog) = engine().await;
  let owner = Uuid::new_v4();
  let obs = engine
    .create_observation(sighting(owner, "mystery caterpillar", "cabbage"))
    .await
    .unwrap();
  assert!(obs.subject_taxon_id.is_none());
  assert!(engine.observation_detail(obs.observation_id).await.unwrap().relationship.is_none());

  let expert = Uuid::new_v4();
  let ident = engine
    .create_identification(obs.observation_id, expert, TaxonKind::Subject, "Pieris rapae", None)
    .await
    .unwrap();
  vote_times(&engine, ident.identification_id, 2).await;

  let detail = engine.observation_detail(obs.observation_id).await.unwrap();
  assert_eq!(detail.observation.subject_identification, "Pieris rapae");
  assert_eq!(detail.observation.subject_taxon_id, Some(catalog.small_white));

  // Only the subject side is verified, so the link counts but does not verify.
  let r = detail.relationship.expect("linked after verification");
  assert_eq!(r.pair(), TaxonPair::new(catalog.small_white, catalog.cabbage));
  assert_eq!((r.observation_count, r.verified_count), (1, 0));
}

#[tokio::test]
async fn unresolvable_verified_text_leaves_taxon_untouched() {
  let (engine, _) = engine().await;
  let owner = Uuid::new_v4();
  let obs = engine.create_observation(sighting(owner, "", "cabbage")).await.unwrap();

  let ident = engine
    .create_identification(obs.observation_id, owner, TaxonKind::Subject, "some white thing", None)
    .await
    .unwrap();
  vote_times(&engine, ident.identification_id, 2).await;

  let detail = engine.observation_detail(obs.observation_id).await.unwrap();
  assert!(
    detail
      .identifications
      .iter()
      .any(|t| t.identification.identification_id == ident.identification_id
        && t.identification.is_verified)
  );
  assert_eq!(detail.observation.subject_identification, "some white thing");
  assert!(detail.observation.subject_taxon_id.is_none());
  assert!(detail.relationship.is_none());
}

// ─── Edit and delete ─────────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_owner_may_edit_or_delete() {
  let (engine, _) = engine().await;
  let owner = Uuid::new_v4();
  let stranger = Uuid::new_v4();
  let obs = engine.create_observation(sighting(owner, "Pieris rapae", "cabbage")).await.unwrap();

  let edit = ObservationEdit { notes: Some("mine now".into()), ..Default::default() };
  let err = engine.edit_observation(obs.observation_id, stranger, edit).await.unwrap_err();
  assert!(matches!(err, Error::Forbidden { actor, .. } if actor == stranger));

  let err = engine.delete_observation(obs.observation_id, stranger).await.unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));

  let err = engine.delete_observation(Uuid::new_v4(), owner).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn editing_host_moves_contribution() {
  let (engine, catalog) = engine().await;
  let owner = Uuid::new_v4();
  let on_cabbage = TaxonPair::new(catalog.small_white, catalog.cabbage);
  let on_nasturtium = TaxonPair::new(catalog.small_white, catalog.nasturtium);

  let moved = engine.create_observation(sighting(owner, "Pieris rapae", "cabbage")).await.unwrap();
  engine
    .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
    .await
    .unwrap();
  verify_both_sides(&engine, moved.observation_id).await;

  let a = engine.find_relationship(on_cabbage).await.unwrap().unwrap();
  assert_eq!((a.observation_count, a.verified_count), (2, 1));

  // Re-pointing the host id keeps the verified text, so the contribution moves.
  let edit = ObservationEdit { host_taxon_id: Some(catalog.nasturtium), ..Default::default() };
  let after = engine.edit_observation(moved.observation_id, owner, edit).await.unwrap();
  assert_eq!(after.host_taxon_id, Some(catalog.nasturtium));

  let a = engine.find_relationship(on_cabbage).await.unwrap().unwrap();
  assert_eq!((a.observation_count, a.verified_count), (1, 0));
  let b = engine.find_relationship(on_nasturtium).await.unwrap().unwrap();
  assert_eq!((b.observation_count, b.verified_count), (1, 1));
  assert_eq!(b.tier, Tier::OccasionalHost);

  // New host text has no verified identification behind it.
  let edit = ObservationEdit {
    host_identification: Some("Brassica oleracea".into()),
    ..Default::default()
  };
  let after = engine.edit_observation(moved.observation_id, owner, edit).await.unwrap();
  assert_eq!(after.host_taxon_id, Some(catalog.cabbage));

  assert!(engine.find_relationship(on_nasturtium).await.unwrap().is_none());
  let a = engine.find_relationship(on_cabbage).await.unwrap().unwrap();
  assert_eq!((a.observation_count, a.verified_count), (2, 0));
}

#[tokio::test]
async fn unresolvable_edited_text_clears_taxon_and_unlinks() {
  let (engine, catalog) = engine().await;
  let owner = Uuid::new_v4();
  let pair = TaxonPair::new(catalog.small_white, catalog.cabbage);
  let obs = engine.create_observation(sighting(owner, "Pieris rapae", "cabbage")).await.unwrap();

  let edit = ObservationEdit { host_identification: Some("unknown crucifer".into()), ..Default::default() };
  let after = engine.edit_observation(obs.observation_id, owner, edit).await.unwrap();

  assert_eq!(after.host_identification, "unknown crucifer");
  assert!(after.host_taxon_id.is_none());
  assert_eq!(after.subject_taxon_id, Some(catalog.small_white));
  assert!(engine.find_relationship(pair).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_or_mismatched_taxon_ids_are_rejected() {
  let (engine, catalog) = engine().await;
  let owner = Uuid::new_v4();

  let input = NewObservation { subject_taxon_id: Some(Uuid::new_v4()), ..sighting(owner, "", "") };
  let err = engine.create_observation(input).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));

  let input = NewObservation { host_taxon_id: Some(catalog.small_white), ..sighting(owner, "", "") };
  let err = engine.create_observation(input).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));

  let obs = engine.create_observation(sighting(owner, "Pieris rapae", "cabbage")).await.unwrap();
  let edit = ObservationEdit { host_taxon_id: Some(Uuid::new_v4()), ..Default::default() };
  let err = engine.edit_observation(obs.observation_id, owner, edit).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));

  let unchanged = engine.observation_detail(obs.observation_id).await.unwrap().observation;
  assert_eq!(unchanged.host_taxon_id, Some(catalog.cabbage));
}

#[tokio::test]
async fn notes_only_edit_leaves_relationship_alone() {
  let (engine, catalog) = engine().await;
  let owner = Uuid::new_v4();
  let obs = engine.create_observation(sighting(owner, "Pieris rapae", "cabbage")).await.unwrap();

  let edit = ObservationEdit { notes: Some("third instar".into()), ..Default::default() };
  engine.edit_observation(obs.observation_id, owner, edit).await.unwrap();

  let r = engine
    .find_relationship(TaxonPair::new(catalog.small_white, catalog.cabbage))
    .await
    .unwrap()
    .unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 0));
}

#[tokio::test]
async fn deleting_last_observation_removes_relationship() {
  let (engine, catalog) = engine().await;
  let owner = Uuid::new_v4();
  let pair = TaxonPair::new(catalog.small_white, catalog.cabbage);
  let obs = engine.create_observation(sighting(owner, "Pieris rapae", "cabbage")).await.unwrap();
  let id = own_identification(&engine, obs.observation_id, TaxonKind::Subject).await;
  vote_times(&engine, id, 2).await;
  assert!(engine.find_relationship(pair).await.unwrap().is_some());

  engine.delete_observation(obs.observation_id, owner).await.unwrap();

  assert!(engine.find_relationship(pair).await.unwrap().is_none());
  assert!(engine.store().get_identification(id).await.unwrap().is_none());
}

#[tokio::test]
async fn move_to_same_pair_is_a_no_op() {
  let (engine, catalog) = engine().await;
  let pair = TaxonPair::new(catalog.small_white, catalog.cabbage);
  let obs = engine
    .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
    .await
    .unwrap();

  let moved = engine
    .on_observation_moved(obs.observation_id, Some(pair), Some(pair), 0)
    .await
    .unwrap();
  assert!(moved.is_none());

  let r = engine.find_relationship(pair).await.unwrap().unwrap();
  assert_eq!((r.observation_count, r.verified_count), (1, 0));
}

// ─── Reads and maintenance ───────────────────────────────────────────────────

#[tokio::test]
async fn reclassify_all_follows_new_config() {
  let (engine, catalog) = engine().await;
  let pair = TaxonPair::new(catalog.small_white, catalog.cabbage);
  let obs = engine
    .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
    .await
    .unwrap();
  verify_both_sides(&engine, obs.observation_id).await;
  assert_eq!(engine.find_relationship(pair).await.unwrap().unwrap().tier, Tier::OccasionalHost);

  let strict = EngineConfig {
    relationship_preferred_threshold: 1,
    relationship_alternate_threshold: 1,
    ..EngineConfig::default()
  };
  let engine = Engine::new(engine.store().clone(), strict);
  assert_eq!(engine.reclassify_all().await.unwrap(), 1);
  assert_eq!(engine.find_relationship(pair).await.unwrap().unwrap().tier, Tier::PreferredHost);
  assert_eq!(engine.classify(1, 1), Tier::PreferredHost);
}

#[tokio::test]
async fn relationship_reads() {
  let (engine, catalog) = engine().await;
  let obs = engine
    .create_observation(sighting(Uuid::new_v4(), "Pieris rapae", "cabbage"))
    .await
    .unwrap();

  let r = engine
    .find_relationship(TaxonPair::new(catalog.small_white, catalog.cabbage))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(engine.get_relationship(r.relationship_id).await.unwrap().pair(), r.pair());

  let linked = engine.relationship_observations(r.relationship_id).await.unwrap();
  assert_eq!(linked.len(), 1);
  assert_eq!(linked[0].observation_id, obs.observation_id);

  let missing = Uuid::new_v4();
  let err = engine.relationship_observations(missing).await.unwrap_err();
  assert!(matches!(err, Error::RelationshipNotFound(id) if id == missing));
}
