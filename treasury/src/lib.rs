//! Commons DAO Treasury
//!
//! Custody of the DAO's funds, of staked governance tokens and of staked
//! liquidity positions. The vault is the token custodian and execution
//! sandbox the governance engine is wired to:
//! - native transfers (empty call data)
//! - token transfers (`transfer(address,uint256)` call data)
//! - position custody for staking
//!
//! Every movement is recorded in the vault's audit trail.

pub mod calls;
pub mod error;
pub mod vault;

pub use calls::{decode_transfer, encode_transfer, token_transfer_call, TRANSFER_SIGNATURE};
pub use error::{Result, TreasuryError};
pub use vault::{TreasuryVault, VaultAsset, VaultTransaction};
