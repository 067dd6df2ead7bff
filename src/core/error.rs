use thiserror::Error;

use crate::core::types::{AttackId, NationId};
use crate::military::unit_type::UnitType;

/// Which shared resource a concurrency conflict was lost on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSource {
    /// Compare-and-swap on a nation's treasury or unit stock. Safe to retry.
    Stock,
    /// Completion claim on an attack order. Another resolution already won.
    Claim,
}

/// Coarse error categories surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InsufficientFunds,
    InsufficientUnits,
    NotFound,
    ConcurrencyConflict,
    Config,
    /// A background task panicked or was cancelled
    Internal,
}

#[derive(Error, Debug)]
pub enum FrontlineError {
    #[error("Invalid unit type: {0}")]
    InvalidUnitType(String),

    #[error("War not authorized: {attacker} has no justification for war against {defender}")]
    WarNotAuthorized { attacker: NationId, defender: NationId },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Insufficient {unit_type} units: requested {requested}, have {available}")]
    InsufficientUnits {
        unit_type: UnitType,
        requested: u32,
        available: u32,
    },

    #[error("Nation not found: {0}")]
    NationNotFound(NationId),

    #[error("Attack order not found: {0}")]
    AttackNotFound(AttackId),

    #[error("Concurrency conflict ({resource:?}): {message}")]
    ConcurrencyConflict {
        resource: ConflictSource,
        message: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl FrontlineError {
    pub fn claim_lost(id: AttackId) -> Self {
        Self::ConcurrencyConflict {
            resource: ConflictSource::Claim,
            message: format!("attack {} is no longer traveling", id),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUnitType(_) | Self::WarNotAuthorized { .. } | Self::Validation(_) => {
                ErrorKind::Validation
            }
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InsufficientUnits { .. } => ErrorKind::InsufficientUnits,
            Self::NationNotFound(_) | Self::AttackNotFound(_) => ErrorKind::NotFound,
            Self::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::Config(_) | Self::IoError(_) | Self::TomlError(_) => ErrorKind::Config,
            Self::TaskFailed(_) => ErrorKind::Internal,
        }
    }

    /// True when the caller may retry the same operation.
    ///
    /// A lost completion claim is never retryable: the order was already
    /// resolved by someone else.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict {
                resource: ConflictSource::Stock,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrontlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            FrontlineError::InvalidUnitType("cavalry".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            FrontlineError::WarNotAuthorized {
                attacker: NationId::new(),
                defender: NationId::new(),
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            FrontlineError::AttackNotFound(AttackId::new()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_lost_claim_is_not_retryable() {
        let err = FrontlineError::claim_lost(AttackId::new());
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
        assert!(!err.is_retryable());

        let stock = FrontlineError::ConcurrencyConflict {
            resource: ConflictSource::Stock,
            message: "treasury changed".into(),
        };
        assert!(stock.is_retryable());
    }

    #[test]
    fn test_display_insufficient_units() {
        let err = FrontlineError::InsufficientUnits {
            unit_type: UnitType::Tank,
            requested: 5,
            available: 2,
        };
        assert_eq!(err.to_string(), "Insufficient tank units: requested 5, have 2");
    }
}
