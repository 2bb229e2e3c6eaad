//! Engine configuration.
//!
//! Field names are the lower-cased environment keys, so an unprefixed
//! environment source (`VERIFICATION_VOTE_THRESHOLD=4`) deserialises
//! directly into this struct.

use serde::Deserialize;

use crate::classify::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Distinct votes needed before an identification is verified.
  pub verification_vote_threshold:        u32,
  pub relationship_preferred_threshold:   i64,
  pub relationship_alternate_threshold:   i64,
  pub relationship_occasional_threshold:  i64,
  pub relationship_observation_threshold: i64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      verification_vote_threshold:        3,
      relationship_preferred_threshold:   3,
      relationship_alternate_threshold:   2,
      relationship_occasional_threshold:  1,
      relationship_observation_threshold: 5,
    }
  }
}

impl EngineConfig {
  /// Classification thresholds, normalised.
  pub fn thresholds(&self) -> Thresholds {
    Thresholds::new(
      self.relationship_preferred_threshold,
      self.relationship_alternate_threshold,
      self.relationship_occasional_threshold,
      self.relationship_observation_threshold,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_keys_fall_back_to_defaults() {
    let cfg: EngineConfig =
      serde_json::from_str(r#"{"verification_vote_threshold": 5}"#).unwrap();
    assert_eq!(cfg.verification_vote_threshold, 5);
    assert_eq!(cfg.relationship_preferred_threshold, 3);
    assert_eq!(cfg.relationship_observation_threshold, 5);
    assert_eq!(cfg.thresholds(), Thresholds::default());
  }

  #[test]
  fn thresholds_are_normalised_on_load() {
    let cfg: EngineConfig = serde_json::from_str(
      r#"{"relationship_preferred_threshold": 1, "relationship_occasional_threshold": -3}"#,
    )
    .unwrap();
    let t = cfg.thresholds();
    assert_eq!(t.occasional(), 0);
    assert_eq!(t.alternate(), 2);
    assert_eq!(t.preferred(), 2);
  }

  #[test]
  fn unrelated_keys_are_ignored() {
    let cfg: EngineConfig =
      serde_json::from_str(r#"{"path": "/usr/bin", "home": "/root"}"#).unwrap();
    assert_eq!(cfg, EngineConfig::default());
  }
}
