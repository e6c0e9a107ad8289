//! Treasury vault
//!
//! In-memory custody of native funds, fungible tokens and liquidity
//! positions, with a complete audit trail. The vault is what the DAO moves
//! staked tokens through and what executes treasury proposals. Every
//! operation checks before it moves anything, so a failed transfer or call
//! changes nothing.
//!
//! Handles are cheap to clone and share the same books.

use dao_core::{Address, Amount, ExecutionSandbox, OutboundCall, PositionId, TokenTransfer};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::calls;
use crate::error::{Result, TreasuryError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultAsset {
    Native,
    Token(Address),
    Position(PositionId),
}

/// One movement recorded by the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultTransaction {
    pub asset: VaultAsset,
    pub from: Option<Address>,
    pub to: Address,
    pub amount: Amount,
}

#[derive(Debug, Default)]
struct VaultBooks {
    native: BTreeMap<Address, Amount>,
    tokens: BTreeMap<Address, BTreeMap<Address, Amount>>,
    positions: BTreeMap<PositionId, Address>,
    history: Vec<VaultTransaction>,
}

impl VaultBooks {
    fn token_balance(&self, token: &Address, account: &Address) -> Amount {
        self.tokens
            .get(token)
            .and_then(|balances| balances.get(account))
            .copied()
            .unwrap_or(0)
    }

    fn native_balance(&self, account: &Address) -> Amount {
        self.native.get(account).copied().unwrap_or(0)
    }

    fn check(available: Amount, account: &Address, requested: Amount) -> Result<()> {
        if available < requested {
            return Err(TreasuryError::InsufficientBalance {
                account: *account,
                requested,
                available,
            });
        }
        Ok(())
    }

    fn move_token(&mut self, token: &Address, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        Self::check(self.token_balance(token, from), from, amount)?;
        let balances = self.tokens.entry(*token).or_default();
        *balances.entry(*from).or_default() -= amount;
        *balances.entry(*to).or_default() += amount;
        self.history.push(VaultTransaction {
            asset: VaultAsset::Token(*token),
            from: Some(*from),
            to: *to,
            amount,
        });
        Ok(())
    }

    fn move_native(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        Self::check(self.native_balance(from), from, amount)?;
        *self.native.entry(*from).or_default() -= amount;
        *self.native.entry(*to).or_default() += amount;
        self.history.push(VaultTransaction {
            asset: VaultAsset::Native,
            from: Some(*from),
            to: *to,
            amount,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreasuryVault {
    books: Arc<Mutex<VaultBooks>>,
}

impl TreasuryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits native funds to `account`.
    pub fn deposit_native(&self, account: &Address, amount: Amount) {
        let mut books = self.books.lock();
        *books.native.entry(*account).or_default() += amount;
        books.history.push(VaultTransaction {
            asset: VaultAsset::Native,
            from: None,
            to: *account,
            amount,
        });
    }

    /// Credits `amount` of `token` to `account`.
    pub fn mint(&self, token: &Address, account: &Address, amount: Amount) {
        let mut books = self.books.lock();
        *books
            .tokens
            .entry(*token)
            .or_default()
            .entry(*account)
            .or_default() += amount;
        books.history.push(VaultTransaction {
            asset: VaultAsset::Token(*token),
            from: None,
            to: *account,
            amount,
        });
    }

    /// Registers `position` as held by `owner`.
    pub fn mint_position(&self, position: PositionId, owner: &Address) {
        let mut books = self.books.lock();
        books.positions.insert(position, *owner);
        books.history.push(VaultTransaction {
            asset: VaultAsset::Position(position),
            from: None,
            to: *owner,
            amount: 1,
        });
    }

    pub fn native_balance(&self, account: &Address) -> Amount {
        self.books.lock().native_balance(account)
    }

    pub fn token_balance(&self, token: &Address, account: &Address) -> Amount {
        self.books.lock().token_balance(token, account)
    }

    pub fn position_owner(&self, position: PositionId) -> Option<Address> {
        self.books.lock().positions.get(&position).copied()
    }

    pub fn history(&self) -> Vec<VaultTransaction> {
        self.books.lock().history.clone()
    }

    pub fn export_history_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.history())
            .map_err(|e| TreasuryError::SerializationError(e.to_string()))
    }

    fn execute(&self, caller: &Address, call: &OutboundCall) -> Result<()> {
        let mut books = self.books.lock();
        if call.call_data.is_empty() {
            return books.move_native(caller, &call.destination, call.value);
        }

        match call.selector() {
            Some(selector) if selector == calls::transfer_selector() => {}
            Some(selector) => {
                return Err(TreasuryError::UnknownSelector {
                    destination: call.destination,
                    selector,
                })
            }
            None => {
                return Err(TreasuryError::MalformedCallData(
                    "call data shorter than a selector".to_string(),
                ))
            }
        }
        let (to, amount) = calls::decode_transfer(&call.call_data)?;
        // both legs are checked before either moves
        VaultBooks::check(books.native_balance(caller), caller, call.value)?;
        VaultBooks::check(books.token_balance(&call.destination, caller), caller, amount)?;
        if call.value > 0 {
            books.move_native(caller, &call.destination, call.value)?;
        }
        books.move_token(&call.destination, caller, &to, amount)
    }
}

impl TokenTransfer for TreasuryVault {
    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> dao_core::Result<()> {
        self.books.lock().move_token(token, from, to, amount)?;
        log::debug!("moved {} of {} from {} to {}", amount, token, from, to);
        Ok(())
    }

    fn transfer_position(
        &mut self,
        from: &Address,
        to: &Address,
        position: PositionId,
    ) -> dao_core::Result<()> {
        let mut books = self.books.lock();
        if books.positions.get(&position) != Some(from) {
            return Err(TreasuryError::NotPositionOwner {
                account: *from,
                position,
            }
            .into());
        }
        books.positions.insert(position, *to);
        books.history.push(VaultTransaction {
            asset: VaultAsset::Position(position),
            from: Some(*from),
            to: *to,
            amount: 1,
        });
        Ok(())
    }
}

impl ExecutionSandbox for TreasuryVault {
    fn call(&mut self, caller: &Address, call: &OutboundCall) -> dao_core::Result<()> {
        match self.execute(caller, call) {
            Ok(()) => {
                log::info!("💸 {} called {} with value {}", caller, call.destination, call.value);
                Ok(())
            }
            Err(e) => {
                log::warn!("call from {} to {} reverted: {}", caller, call.destination, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[test]
    fn test_token_transfer() {
        let mut vault = TreasuryVault::new();
        let token = addr(0x60);
        vault.mint(&token, &addr(1), 100);

        vault.transfer(&token, &addr(1), &addr(2), 40).unwrap();
        assert_eq!(vault.token_balance(&token, &addr(1)), 60);
        assert_eq!(vault.token_balance(&token, &addr(2)), 40);

        let result = vault.transfer(&token, &addr(1), &addr(2), 61);
        assert!(matches!(result, Err(dao_core::CoreError::TransferFailed(_))));
        assert_eq!(vault.token_balance(&token, &addr(1)), 60);
    }

    #[test]
    fn test_position_custody() {
        let mut vault = TreasuryVault::new();
        vault.mint_position(7, &addr(1));
        vault.transfer_position(&addr(1), &addr(0xda), 7).unwrap();
        assert_eq!(vault.position_owner(7), Some(addr(0xda)));
        assert!(matches!(
            vault.transfer_position(&addr(1), &addr(2), 7),
            Err(dao_core::CoreError::PositionTransferFailed(_))
        ));
    }

    #[test]
    fn test_calls() {
        let mut vault = TreasuryVault::new();
        let dao = addr(0xda);
        let token = addr(0x60);
        vault.deposit_native(&dao, 1_000);
        vault.mint(&token, &dao, 500);

        vault
            .call(&dao, &OutboundCall::native_transfer(addr(3), 250))
            .unwrap();
        assert_eq!(vault.native_balance(&addr(3)), 250);

        vault
            .call(&dao, &calls::token_transfer_call(token, &addr(4), 500))
            .unwrap();
        assert_eq!(vault.token_balance(&token, &addr(4)), 500);

        let unknown = OutboundCall::new(addr(5), 0, vec![1, 2, 3, 4]);
        assert!(matches!(
            vault.call(&dao, &unknown),
            Err(dao_core::CoreError::CallReverted(_))
        ));
    }

    #[test]
    fn test_failed_call_moves_nothing() {
        let mut vault = TreasuryVault::new();
        let dao = addr(0xda);
        let token = addr(0x60);
        vault.deposit_native(&dao, 10);
        vault.mint(&token, &dao, 5);
        let before = vault.history().len();

        // native leg is affordable, token leg is not
        let mut call = calls::token_transfer_call(token, &addr(4), 6);
        call.value = 10;
        assert!(vault.call(&dao, &call).is_err());
        assert_eq!(vault.native_balance(&dao), 10);
        assert_eq!(vault.history().len(), before);
    }
}
