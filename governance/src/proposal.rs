//! Proposal records
//!
//! A proposal carries the deferred action of its module, the schedule fixed
//! by the decider at creation, the tally and its lifecycle status:
//!
//! `Active -> {Accepted | Rejected}`, `Accepted -> {Executed | ExecutedWithRevert}`.
//!
//! Records are never deleted; settled ones just leave the active set.

use dao_core::{Address, Amount, OutboundCall, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::decision::DecisionType;
use crate::governance::GovernanceAction;
use crate::module_manager::ModuleManagerAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    Accepted,
    Rejected,
    Executed,
    ExecutedWithRevert,
}

impl ProposalStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, ProposalStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Rejected | ProposalStatus::Executed | ProposalStatus::ExecutedWithRevert
        )
    }
}

/// Deferred action of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    /// Outbound call made from the DAO (treasury and custom modules).
    Call(OutboundCall),
    Governance(GovernanceAction),
    ModuleManager(ModuleManagerAction),
}

impl ProposalAction {
    pub fn label(&self) -> String {
        match self {
            ProposalAction::Call(call) => format!("call {} value {}", call.destination, call.value),
            ProposalAction::Governance(action) => format!("governance {}", action.name()),
            ProposalAction::ModuleManager(action) => format!("module manager {}", action.name()),
        }
    }
}

/// Decider-specific tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalTally {
    VotingPower {
        votes_yes: Amount,
        votes_no: Amount,
        voters: BTreeSet<Address>,
    },
    Signers {
        decisions: BTreeMap<Address, bool>,
        /// Decision of the safe itself, which stands for a full quorum.
        safe_decision: Option<bool>,
    },
}

impl ProposalTally {
    pub fn empty(decision_type: DecisionType) -> Self {
        match decision_type {
            DecisionType::VotingPower => ProposalTally::VotingPower {
                votes_yes: 0,
                votes_no: 0,
                voters: BTreeSet::new(),
            },
            DecisionType::Signers => ProposalTally::Signers {
                decisions: BTreeMap::new(),
                safe_decision: None,
            },
        }
    }

    pub fn has_decided(&self, account: &Address) -> bool {
        match self {
            ProposalTally::VotingPower { voters, .. } => voters.contains(account),
            ProposalTally::Signers { decisions, .. } => decisions.contains_key(account),
        }
    }

    /// `(yes, no)` as vote weight for voting power, head count for signers.
    /// The safe's own decision counts as one head.
    pub fn counts(&self) -> (Amount, Amount) {
        match self {
            ProposalTally::VotingPower {
                votes_yes, votes_no, ..
            } => (*votes_yes, *votes_no),
            ProposalTally::Signers {
                decisions,
                safe_decision,
            } => decisions
                .values()
                .chain(safe_decision.iter())
                .fold((0, 0), |(yes, no), in_favor| {
                    if *in_favor {
                        (yes + 1, no)
                    } else {
                        (yes, no + 1)
                    }
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: u64,
    pub module: String,
    pub initiator: Address,
    pub action: ProposalAction,
    pub created_at: Timestamp,
    pub voting_deadline: Timestamp,
    pub execution_timestamp: Timestamp,
    pub decided_by: DecisionType,
    pub tally: ProposalTally,
    pub status: ProposalStatus,
    pub settled_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub revert_reason: Option<String>,
}

/// Result of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    Accepted,
    Rejected,
}

impl From<Settlement> for ProposalStatus {
    fn from(settlement: Settlement) -> Self {
        match settlement {
            Settlement::Accepted => ProposalStatus::Accepted,
            Settlement::Rejected => ProposalStatus::Rejected,
        }
    }
}

/// Result of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Executed,
    ExecutedWithRevert(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed)
    }
}
