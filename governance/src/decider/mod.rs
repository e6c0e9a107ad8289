//! Decision processes
//!
//! A module never branches on how its proposals are decided. It looks up
//! the `Decider` bound to its decision type and drives the proposal through
//! the same calls whichever variant answers them.

mod signers;
mod voting_power;

pub use signers::SignersDecider;
pub use voting_power::VotingPowerDecider;

use dao_core::{Address, Amount, SignerSet, Timestamp};
use std::collections::BTreeMap;

use crate::decision::{DecisionData, DecisionType, SignersDecisionData, VotingPowerDecisionData};
use crate::error::{GovernanceError, Result};
use crate::proposal::{ProposalRecord, ProposalTally, Settlement};
use crate::voting_power::VotingPowerLedger;

/// What a decider may read and touch while deciding.
pub struct DecisionContext<'a> {
    pub now: Timestamp,
    /// Mutated only to extend unstake locks of voters.
    pub ledger: &'a mut VotingPowerLedger,
    pub signers: &'a dyn SignerSet,
}

/// Voting deadline and execution time fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub voting_deadline: Timestamp,
    pub execution_timestamp: Timestamp,
}

pub trait Decider: Send + Sync {
    fn decision_type(&self) -> DecisionType;

    fn check_initiator_standing(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        account: &Address,
    ) -> bool;

    /// Error reported when `check_initiator_standing` refuses `account`.
    fn standing_error(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        account: &Address,
    ) -> GovernanceError;

    fn schedule(&self, data: &DecisionData, now: Timestamp) -> Schedule;

    fn empty_tally(&self) -> ProposalTally {
        ProposalTally::empty(self.decision_type())
    }

    /// Records the initiator's own approval right after creation.
    fn register_initial_decision(
        &self,
        ctx: &mut DecisionContext<'_>,
        proposal: &mut ProposalRecord,
        account: &Address,
    ) -> Result<Amount>;

    /// Records one decision and returns the weight it carried.
    fn decide(
        &self,
        ctx: &mut DecisionContext<'_>,
        proposal: &mut ProposalRecord,
        account: &Address,
        in_favor: bool,
    ) -> Result<Amount>;

    fn tally(&self, proposal: &ProposalRecord) -> (Amount, Amount) {
        proposal.tally.counts()
    }

    fn is_threshold_reached(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        proposal: &ProposalRecord,
    ) -> bool;

    fn settle(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        proposal: &ProposalRecord,
    ) -> Result<Settlement>;
}

/// Both built-in deciders keyed by the decision type they serve.
pub fn default_deciders() -> BTreeMap<DecisionType, Box<dyn Decider>> {
    let mut deciders: BTreeMap<DecisionType, Box<dyn Decider>> = BTreeMap::new();
    deciders.insert(DecisionType::VotingPower, Box::new(VotingPowerDecider));
    deciders.insert(DecisionType::Signers, Box::new(SignersDecider));
    deciders
}

fn not_configured(module: &str, decision_type: DecisionType) -> GovernanceError {
    GovernanceError::DecisionDataNotConfigured {
        module: module.to_string(),
        decision_type,
    }
}

fn voting_power_data(data: &DecisionData) -> Option<&VotingPowerDecisionData> {
    match data {
        DecisionData::VotingPower(data) => Some(data),
        DecisionData::Signers(_) => None,
    }
}

fn signers_data(data: &DecisionData) -> Option<&SignersDecisionData> {
    match data {
        DecisionData::Signers(data) => Some(data),
        DecisionData::VotingPower(_) => None,
    }
}

fn decision_not_started(proposal: &ProposalRecord) -> GovernanceError {
    GovernanceError::DecisionNotStarted {
        module: proposal.module.clone(),
        id: proposal.id,
    }
}
