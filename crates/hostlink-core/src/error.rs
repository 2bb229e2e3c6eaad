//! Error types for `hostlink-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("identification not found: {0}")]
  IdentificationNotFound(Uuid),

  #[error("observation not found: {0}")]
  ObservationNotFound(Uuid),

  #[error("relationship not found: {0}")]
  RelationshipNotFound(Uuid),

  #[error("user {actor} may not modify observation {observation_id}")]
  Forbidden { observation_id: Uuid, actor: Uuid },

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// `true` for the not-found family; the API layer maps these to 404.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::IdentificationNotFound(_)
        | Self::ObservationNotFound(_)
        | Self::RelationshipNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
