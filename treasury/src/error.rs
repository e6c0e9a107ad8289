//! Treasury error types

use dao_core::{Address, CoreError, PositionId, Selector};
use thiserror::Error;

/// Vault errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    #[error("Insufficient balance of {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: Address,
        requested: u128,
        available: u128,
    },

    #[error("Position {position} is not held by {account}")]
    NotPositionOwner {
        account: Address,
        position: PositionId,
    },

    #[error("Malformed call data: {0}")]
    MalformedCallData(String),

    #[error("Unknown selector {selector} on {destination}")]
    UnknownSelector {
        destination: Address,
        selector: Selector,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, TreasuryError>;

impl From<TreasuryError> for CoreError {
    fn from(error: TreasuryError) -> Self {
        match error {
            TreasuryError::InsufficientBalance { .. } => CoreError::TransferFailed(error.to_string()),
            TreasuryError::NotPositionOwner { .. } => {
                CoreError::PositionTransferFailed(error.to_string())
            }
            _ => CoreError::CallReverted(error.to_string()),
        }
    }
}
