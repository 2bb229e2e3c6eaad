//! Relationship tiers and the pure counter → tier classifier.

use serde::{Deserialize, Serialize};

/// Confidence tier of a subject/host relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  PreferredHost,
  AlternateHost,
  OccasionalHost,
  HostPlant,
}

impl Tier {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::PreferredHost => "preferred_host",
      Self::AlternateHost => "alternate_host",
      Self::OccasionalHost => "occasional_host",
      Self::HostPlant => "host_plant",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "preferred_host" => Some(Self::PreferredHost),
      "alternate_host" => Some(Self::AlternateHost),
      "occasional_host" => Some(Self::OccasionalHost),
      "host_plant" => Some(Self::HostPlant),
      _ => None,
    }
  }
}

/// Normalised classification thresholds.
///
/// Construction always goes through [`Thresholds::new`], which enforces
/// `0 <= occasional <= alternate <= preferred` whatever was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
  preferred:        i64,
  alternate:        i64,
  occasional:       i64,
  observation_only: i64,
}

impl Thresholds {
  pub fn new(preferred: i64, alternate: i64, occasional: i64, observation_only: i64) -> Self {
    let occasional = occasional.max(0);
    let alternate = alternate.max(occasional);
    let preferred = preferred.max(alternate);
    Self { preferred, alternate, occasional, observation_only }
  }

  pub fn preferred(&self) -> i64 { self.preferred }

  pub fn alternate(&self) -> i64 { self.alternate }

  pub fn occasional(&self) -> i64 { self.occasional }

  pub fn observation_only(&self) -> i64 { self.observation_only }
}

impl Default for Thresholds {
  fn default() -> Self { Self::new(3, 2, 1, 5) }
}

/// Map a relationship's counters to its tier.
///
/// The comparisons run in a fixed order; the first hit wins. Both trailing
/// branches yield [`Tier::HostPlant`].
pub fn classify(verified_count: u32, observation_count: u32, thresholds: &Thresholds) -> Tier {
  let v = i64::from(verified_count);
  let o = i64::from(observation_count);

  if v >= thresholds.preferred {
    Tier::PreferredHost
  } else if v >= thresholds.alternate {
    Tier::AlternateHost
  } else if v >= thresholds.occasional {
    Tier::OccasionalHost
  } else if o >= thresholds.observation_only {
    Tier::HostPlant
  } else {
    // Same outcome as the observation-only branch.
    Tier::HostPlant
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_documented_examples() {
    let t = Thresholds::default();
    assert_eq!(classify(3, 10, &t), Tier::PreferredHost);
    assert_eq!(classify(2, 0, &t), Tier::AlternateHost);
    assert_eq!(classify(1, 1, &t), Tier::OccasionalHost);
    assert_eq!(classify(0, 6, &t), Tier::HostPlant);
    assert_eq!(classify(0, 0, &t), Tier::HostPlant);
  }

  #[test]
  fn misconfigured_thresholds_are_normalised() {
    let t = Thresholds::new(1, 4, -2, 5);
    assert_eq!(t.occasional(), 0);
    assert_eq!(t.alternate(), 4);
    assert_eq!(t.preferred(), 4);
    assert_eq!(t.observation_only(), 5);
  }

  #[test]
  fn zero_occasional_threshold_catches_everything_below_alternate() {
    let t = Thresholds::new(3, 2, 0, 5);
    assert_eq!(classify(0, 0, &t), Tier::OccasionalHost);
    assert_eq!(classify(0, 100, &t), Tier::OccasionalHost);
  }

  #[test]
  fn first_matching_rule_wins_when_thresholds_collapse() {
    let t = Thresholds::new(2, 2, 2, 1);
    assert_eq!(classify(2, 0, &t), Tier::PreferredHost);
    assert_eq!(classify(1, 9, &t), Tier::HostPlant);
  }

  #[test]
  fn tier_text_roundtrips() {
    for tier in [
      Tier::PreferredHost,
      Tier::AlternateHost,
      Tier::OccasionalHost,
      Tier::HostPlant,
    ] {
      assert_eq!(Tier::parse(tier.as_str()), Some(tier));
    }
    assert_eq!(Tier::parse("parasitoid"), None);
  }
}
