//! Primitive types shared by every DAO crate

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Seconds since the unix epoch, as reported by the ledger clock.
pub type Timestamp = u64;

/// Token and voting-power amounts.
pub type Amount = u128;

/// Identifier of a staked liquidity position.
pub type PositionId = u64;

/// 20-byte account or contract address, displayed as `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address made of one repeated byte, handy for fixtures.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|_| CoreError::InvalidAddress(s.to_string()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// 4-byte entry-point selector of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector([u8; 4]);

impl Selector {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Selector of a function signature such as `transfer(address,uint256)`:
    /// the first four bytes of its keccak-256 hash.
    pub fn from_signature(signature: &str) -> Self {
        let digest = Keccak256::digest(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Selector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|_| CoreError::InvalidSelector(s.to_string()))?;
        let bytes: [u8; 4] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidSelector(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Selector {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

/// Deferred outbound call: the payload of treasury and custom-module proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundCall {
    pub destination: Address,
    pub value: Amount,
    pub call_data: Vec<u8>,
}

impl OutboundCall {
    pub fn new(destination: Address, value: Amount, call_data: Vec<u8>) -> Self {
        Self {
            destination,
            value,
            call_data,
        }
    }

    /// Plain transfer of the native asset, no call data.
    pub fn native_transfer(destination: Address, value: Amount) -> Self {
        Self::new(destination, value, Vec::new())
    }

    /// Selector prefix of the call data, if any.
    pub fn selector(&self) -> Option<Selector> {
        let prefix: [u8; 4] = self.call_data.get(..4)?.try_into().ok()?;
        Some(Selector::new(prefix))
    }
}

/// A facet as published by an addresses provider: a logical name, the
/// implementation address and the entry points it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetSpec {
    pub name: String,
    pub address: Address,
    pub selectors: BTreeSet<Selector>,
}

impl FacetSpec {
    pub fn new(
        name: impl Into<String>,
        address: Address,
        selectors: impl IntoIterator<Item = Selector>,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            selectors: selectors.into_iter().collect(),
        }
    }

    /// Builds the selector set from function signatures.
    pub fn from_signatures(name: impl Into<String>, address: Address, signatures: &[&str]) -> Self {
        Self::new(
            name,
            address,
            signatures.iter().map(|sig| Selector::from_signature(sig)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let address = Address::repeat_byte(0xab);
        let text = address.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_address_rejects_bad_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_transfer_selector() {
        // well-known ERC-20 transfer selector
        let selector = Selector::from_signature("transfer(address,uint256)");
        assert_eq!(selector.to_string(), "0xa9059cbb");
    }

    #[test]
    fn test_address_serde_as_string() {
        let json = serde_json::to_string(&Address::repeat_byte(1)).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Address::repeat_byte(1));
    }

    #[test]
    fn test_call_selector() {
        let call = OutboundCall::new(Address::ZERO, 0, vec![0xa9, 0x05, 0x9c, 0xbb, 0x00]);
        assert_eq!(call.selector(), Some(Selector::new([0xa9, 0x05, 0x9c, 0xbb])));
        assert_eq!(OutboundCall::native_transfer(Address::ZERO, 5).selector(), None);
    }
}
