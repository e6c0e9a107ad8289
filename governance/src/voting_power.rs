//! Voting power ledger
//!
//! Tracks stake-derived and delegated voting power per account. This is the
//! one piece of state shared by every module and decider; it is only ever
//! mutated through the methods below.
//!
//! Effective power of an account is `staked + positions + received` while it
//! does not delegate, and zero while it does. Delegation moves only the
//! delegator's own power and is one level deep, so the sum of effective
//! power always equals the total staked power.

use dao_core::{Address, Amount, PositionId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{GovernanceError, Result};
use crate::threshold;

/// Voting power record of one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub staked_balance: Amount,
    /// Power of each staked position, frozen at stake time.
    pub positions: BTreeMap<PositionId, Amount>,
    pub delegated_to: Option<Address>,
    /// Own power currently forwarded to `delegated_to`.
    pub delegated_amount: Amount,
    pub delegated_power_received: Amount,
    pub unstake_lock_until: Timestamp,
}

impl VoterRecord {
    pub fn nft_position_power(&self) -> Amount {
        self.positions.values().sum()
    }

    /// Power coming from this account's own stake.
    pub fn own_power(&self) -> Amount {
        self.staked_balance + self.nft_position_power()
    }

    pub fn effective_power(&self) -> Amount {
        if self.delegated_to.is_some() {
            0
        } else {
            self.own_power() + self.delegated_power_received
        }
    }

    fn is_empty(&self) -> bool {
        self == &VoterRecord::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPowerLedger {
    voters: BTreeMap<Address, VoterRecord>,
    total_amount_of_voting_power: Amount,
    max_amount_of_voting_power: Amount,
}

impl VotingPowerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voter(&self, account: &Address) -> Option<&VoterRecord> {
        self.voters.get(account)
    }

    pub fn voting_power(&self, account: &Address) -> Amount {
        self.voters
            .get(account)
            .map(VoterRecord::effective_power)
            .unwrap_or(0)
    }

    pub fn total_amount_of_voting_power(&self) -> Amount {
        self.total_amount_of_voting_power
    }

    pub fn max_amount_of_voting_power(&self) -> Amount {
        self.max_amount_of_voting_power
    }

    pub fn reference_power(&self) -> Amount {
        threshold::reference_power(
            self.total_amount_of_voting_power,
            self.max_amount_of_voting_power,
        )
    }

    /// Absolute voting power a basis-point numerator stands for right now.
    pub fn absolute_threshold(&self, numerator_bps: u64) -> Amount {
        threshold::absolute_threshold(numerator_bps, self.reference_power())
    }

    pub fn is_enough_voting_power(&self, account: &Address, numerator_bps: u64) -> bool {
        self.voting_power(account) >= self.absolute_threshold(numerator_bps)
    }

    pub fn staked_balance(&self, account: &Address) -> Amount {
        self.voters
            .get(account)
            .map(|v| v.staked_balance)
            .unwrap_or(0)
    }

    pub fn delegatee(&self, account: &Address) -> Option<Address> {
        self.voters.get(account).and_then(|v| v.delegated_to)
    }

    pub fn delegated_amount(&self, account: &Address) -> Amount {
        self.voters
            .get(account)
            .map(|v| v.delegated_amount)
            .unwrap_or(0)
    }

    pub fn is_position_staked_by(&self, account: &Address, position: PositionId) -> bool {
        self.voters
            .get(account)
            .is_some_and(|v| v.positions.contains_key(&position))
    }

    pub fn position_holder(&self, position: PositionId) -> Option<Address> {
        self.voters
            .iter()
            .find(|(_, v)| v.positions.contains_key(&position))
            .map(|(account, _)| *account)
    }

    /// Earliest time `account` may withdraw power.
    pub fn unstake_lock_until(&self, account: &Address) -> Timestamp {
        self.voters
            .get(account)
            .map(|v| v.unstake_lock_until)
            .unwrap_or(0)
    }

    /// Extends the unstake lock of `account` to at least `until`.
    pub fn lock_until(&mut self, account: &Address, until: Timestamp) {
        let voter = self.voters.entry(*account).or_default();
        voter.unstake_lock_until = voter.unstake_lock_until.max(until);
    }

    pub fn stake(&mut self, account: &Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount(
                "cannot stake zero".to_string(),
            ));
        }
        let voter = self.voters.entry(*account).or_default();
        voter.staked_balance += amount;
        self.add_power(account, amount);
        log::info!("💰 {} staked {} (total {})", account, amount, self.total_amount_of_voting_power);
        Ok(())
    }

    pub fn unstake(&mut self, account: &Address, amount: Amount, now: Timestamp) -> Result<()> {
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount(
                "cannot unstake zero".to_string(),
            ));
        }
        self.ensure_unlocked(account, now)?;
        let staked = self.staked_balance(account);
        if amount > staked {
            return Err(GovernanceError::InsufficientStaked {
                requested: amount,
                staked,
            });
        }
        if let Some(voter) = self.voters.get_mut(account) {
            voter.staked_balance -= amount;
        }
        self.remove_power(account, amount);
        log::info!("{} unstaked {} (total {})", account, amount, self.total_amount_of_voting_power);
        Ok(())
    }

    /// Records a staked position and its frozen power.
    pub fn stake_position(
        &mut self,
        account: &Address,
        position: PositionId,
        power: Amount,
    ) -> Result<()> {
        if self.position_holder(position).is_some() {
            return Err(GovernanceError::PositionAlreadyStaked(position));
        }
        self.voters
            .entry(*account)
            .or_default()
            .positions
            .insert(position, power);
        self.add_power(account, power);
        log::info!("{} staked position {} worth {}", account, position, power);
        Ok(())
    }

    /// Removes a staked position and returns the power it carried.
    pub fn unstake_position(
        &mut self,
        account: &Address,
        position: PositionId,
        now: Timestamp,
    ) -> Result<Amount> {
        if !self.is_position_staked_by(account, position) {
            return Err(GovernanceError::NotStakedByHolder {
                account: *account,
                position,
            });
        }
        self.ensure_unlocked(account, now)?;
        let power = self
            .voters
            .get_mut(account)
            .and_then(|v| v.positions.remove(&position))
            .unwrap_or(0);
        self.remove_power(account, power);
        log::info!("{} unstaked position {} worth {}", account, position, power);
        Ok(power)
    }

    pub fn delegate(&mut self, delegator: &Address, delegatee: &Address, now: Timestamp) -> Result<()> {
        if delegator == delegatee {
            return Err(GovernanceError::SelfDelegation(*delegator));
        }
        let record = self.voters.get(delegator).cloned().unwrap_or_default();
        if record.delegated_to.is_some() {
            return Err(GovernanceError::AlreadyDelegated(*delegator));
        }
        let chain = GovernanceError::DelegationChain {
            delegator: *delegator,
            delegatee: *delegatee,
        };
        // incoming delegators count even when they carry no power yet
        let has_delegators = self
            .voters
            .values()
            .any(|voter| voter.delegated_to == Some(*delegator));
        if has_delegators || self.delegatee(delegatee).is_some() {
            return Err(chain);
        }
        if now < record.unstake_lock_until {
            return Err(GovernanceError::Locked {
                account: *delegator,
                until: record.unstake_lock_until,
            });
        }

        let amount = record.own_power();
        let voter = self.voters.entry(*delegator).or_default();
        voter.delegated_to = Some(*delegatee);
        voter.delegated_amount = amount;
        self.voters.entry(*delegatee).or_default().delegated_power_received += amount;
        log::info!("🤝 {} delegated {} to {}", delegator, amount, delegatee);
        Ok(())
    }

    /// Reverses the delegation of `delegator`, returning the moved amount.
    pub fn undelegate(&mut self, delegator: &Address, now: Timestamp) -> Result<Amount> {
        let delegatee = self
            .delegatee(delegator)
            .ok_or(GovernanceError::NotDelegating(*delegator))?;
        let delegatee_lock = self.unstake_lock_until(&delegatee);
        if now < delegatee_lock {
            return Err(GovernanceError::Locked {
                account: delegatee,
                until: delegatee_lock,
            });
        }

        let amount = self.delegated_amount(delegator);
        if let Some(voter) = self.voters.get_mut(delegator) {
            voter.delegated_to = None;
            voter.delegated_amount = 0;
        }
        if let Some(receiver) = self.voters.get_mut(&delegatee) {
            receiver.delegated_power_received -= amount;
        }
        self.prune(&delegatee);
        self.prune(delegator);
        log::info!("{} took back {} from {}", delegator, amount, delegatee);
        Ok(amount)
    }

    /// Sum of effective power equals the total amount of voting power.
    pub fn is_conserved(&self) -> bool {
        let sum: Amount = self.voters.values().map(VoterRecord::effective_power).sum();
        sum == self.total_amount_of_voting_power
    }

    fn ensure_unlocked(&self, account: &Address, now: Timestamp) -> Result<()> {
        let mut until = self.unstake_lock_until(account);
        let mut holder = *account;
        // power forwarded to a delegatee may back the delegatee's votes
        if let Some(delegatee) = self.delegatee(account) {
            let delegatee_lock = self.unstake_lock_until(&delegatee);
            if delegatee_lock > until {
                until = delegatee_lock;
                holder = delegatee;
            }
        }
        if now < until {
            return Err(GovernanceError::Locked {
                account: holder,
                until,
            });
        }
        Ok(())
    }

    fn add_power(&mut self, account: &Address, amount: Amount) {
        self.total_amount_of_voting_power += amount;
        self.max_amount_of_voting_power = self
            .max_amount_of_voting_power
            .max(self.total_amount_of_voting_power);
        if let Some(delegatee) = self.forward_delegation(account, amount, true) {
            log::debug!("forwarded {} from {} to {}", amount, account, delegatee);
        }
    }

    fn remove_power(&mut self, account: &Address, amount: Amount) {
        self.total_amount_of_voting_power -= amount;
        self.forward_delegation(account, amount, false);
        self.prune(account);
    }

    /// Keeps an active delegation in step with the delegator's own power.
    fn forward_delegation(&mut self, account: &Address, amount: Amount, add: bool) -> Option<Address> {
        let delegatee = self.delegatee(account)?;
        if let Some(voter) = self.voters.get_mut(account) {
            if add {
                voter.delegated_amount += amount;
            } else {
                voter.delegated_amount -= amount;
            }
        }
        if let Some(receiver) = self.voters.get_mut(&delegatee) {
            if add {
                receiver.delegated_power_received += amount;
            } else {
                receiver.delegated_power_received -= amount;
            }
        }
        Some(delegatee)
    }

    fn prune(&mut self, account: &Address) {
        if self.voters.get(account).is_some_and(VoterRecord::is_empty) {
            self.voters.remove(account);
        }
    }
}
