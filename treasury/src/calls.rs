//! Call data understood by the vault
//!
//! Only the ERC-20 style `transfer(address,uint256)` call is decoded:
//! 4-byte selector, the recipient left-padded to 32 bytes, the amount as a
//! 32-byte big-endian word.

use dao_core::{Address, Amount, OutboundCall, Selector};

use crate::error::{Result, TreasuryError};

pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";

const WORD: usize = 32;

pub fn transfer_selector() -> Selector {
    Selector::from_signature(TRANSFER_SIGNATURE)
}

pub fn encode_transfer(to: &Address, amount: Amount) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(transfer_selector().as_bytes());
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_bytes());
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&amount.to_be_bytes());
    data
}

/// Token transfer proposal payload: call `token` to send `amount` to `to`.
pub fn token_transfer_call(token: Address, to: &Address, amount: Amount) -> OutboundCall {
    OutboundCall::new(token, 0, encode_transfer(to, amount))
}

/// Decodes the arguments of a `transfer(address,uint256)` call.
pub fn decode_transfer(call_data: &[u8]) -> Result<(Address, Amount)> {
    if call_data.len() != 4 + 2 * WORD {
        return Err(TreasuryError::MalformedCallData(format!(
            "expected {} bytes, got {}",
            4 + 2 * WORD,
            call_data.len()
        )));
    }
    if call_data[..4] != transfer_selector().as_bytes()[..] {
        return Err(TreasuryError::MalformedCallData(
            "not a transfer call".to_string(),
        ));
    }
    let (to_word, amount_word) = call_data[4..].split_at(WORD);
    if to_word[..12].iter().any(|b| *b != 0) {
        return Err(TreasuryError::MalformedCallData(
            "dirty address padding".to_string(),
        ));
    }
    if amount_word[..16].iter().any(|b| *b != 0) {
        return Err(TreasuryError::MalformedCallData(
            "amount exceeds 128 bits".to_string(),
        ));
    }

    let mut to = [0u8; 20];
    to.copy_from_slice(&to_word[12..]);
    let mut amount = [0u8; 16];
    amount.copy_from_slice(&amount_word[16..]);
    Ok((Address::new(to), Amount::from_be_bytes(amount)))
}
