//! DAO event log

use dao_core::{Address, Amount, PositionId};
use serde::{Deserialize, Serialize};

use crate::decision::DecisionType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaoEvent {
    ProposalCreated {
        module: String,
        id: u64,
        initiator: Address,
    },
    Voted {
        module: String,
        id: u64,
        voter: Address,
        in_favor: bool,
        power: Amount,
    },
    Decided {
        module: String,
        id: u64,
        signer: Address,
        in_favor: bool,
    },
    ProposalAccepted {
        module: String,
        id: u64,
    },
    ProposalRejected {
        module: String,
        id: u64,
    },
    ProposalExecutedSuccessfully {
        module: String,
        id: u64,
    },
    ProposalExecutedWithRevert {
        module: String,
        id: u64,
        reason: String,
    },
    Staked {
        account: Address,
        amount: Amount,
    },
    Unstaked {
        account: Address,
        amount: Amount,
    },
    PositionStaked {
        account: Address,
        position: PositionId,
        power: Amount,
    },
    PositionUnstaked {
        account: Address,
        position: PositionId,
        power: Amount,
    },
    Delegated {
        delegator: Address,
        delegatee: Address,
        amount: Amount,
    },
    Undelegated {
        delegator: Address,
        delegatee: Address,
        amount: Amount,
    },
    ModuleAdded {
        module: String,
        decision_type: DecisionType,
    },
    ModuleRemoved {
        module: String,
    },
    ModuleDeciderSwitched {
        module: String,
        decision_type: DecisionType,
    },
    DecisionDataChanged {
        module: String,
        decision_type: DecisionType,
    },
    FacetUpdated {
        facet: String,
        address: Address,
    },
    AddressesProviderChanged {
        provider: Address,
    },
}

impl DaoEvent {
    /// Module the event belongs to, for proposal and module events.
    pub fn module(&self) -> Option<&str> {
        match self {
            DaoEvent::ProposalCreated { module, .. }
            | DaoEvent::Voted { module, .. }
            | DaoEvent::Decided { module, .. }
            | DaoEvent::ProposalAccepted { module, .. }
            | DaoEvent::ProposalRejected { module, .. }
            | DaoEvent::ProposalExecutedSuccessfully { module, .. }
            | DaoEvent::ProposalExecutedWithRevert { module, .. }
            | DaoEvent::ModuleAdded { module, .. }
            | DaoEvent::ModuleRemoved { module }
            | DaoEvent::ModuleDeciderSwitched { module, .. }
            | DaoEvent::DecisionDataChanged { module, .. } => Some(module),
            _ => None,
        }
    }
}
