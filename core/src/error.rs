//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Token transfer failed: {0}")]
    TransferFailed(String),

    #[error("Position transfer failed: {0}")]
    PositionTransferFailed(String),

    #[error("Call reverted: {0}")]
    CallReverted(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
