use cadence_core::types::{EventId, GeneratorId, OccurrenceId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("Generator not found: {0}")]
    GeneratorNotFound(GeneratorId),

    #[error("Occurrence not found: {0}")]
    OccurrenceNotFound(OccurrenceId),

    #[error(
        "Unique violation: generator {generator_id} already has an occurrence originally spanning {original_start} to {original_end}"
    )]
    UniqueViolation {
        generator_id: GeneratorId,
        original_start: DateTime<Utc>,
        original_end: DateTime<Utc>,
    },

    #[error("Occurrence has not been saved yet")]
    NotPersisted,

    #[error("Occurrence {0} belongs to a different generator")]
    OwnershipMismatch(OccurrenceId),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
