//! Governance error types

use dao_core::{Address, CoreError, PositionId, Selector, Timestamp};
use thiserror::Error;

use crate::decision::DecisionType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    // Standing
    #[error("Not enough voting power: {account} has {power}, required {required}")]
    NotEnoughVotingPower {
        account: Address,
        power: u128,
        required: u128,
    },

    #[error("Not a signer: {0}")]
    NotASigner(Address),

    // Proposal state
    #[error("Proposal {module}#{id} not found")]
    ProposalNotFound { module: String, id: u64 },

    #[error("Already decided: {account} on {module}#{id}")]
    AlreadyDecided {
        module: String,
        id: u64,
        account: Address,
    },

    #[error("Proposal {module}#{id} already executed")]
    AlreadyExecuted { module: String, id: u64 },

    #[error("Proposal {module}#{id} is not accepted")]
    NotAccepted { module: String, id: u64 },

    #[error("Proposal {module}#{id} already settled")]
    ProposalAlreadySettled { module: String, id: u64 },

    #[error("Voting closed for {module}#{id}")]
    VotingClosed { module: String, id: u64 },

    #[error("Decision not started for {module}#{id}")]
    DecisionNotStarted { module: String, id: u64 },

    #[error("Threshold not reached for {module}#{id}: {current} of {required}")]
    ThresholdNotReached {
        module: String,
        id: u64,
        current: u128,
        required: u128,
    },

    #[error("Voting period not ended for {module}#{id}: deadline {deadline}")]
    VotingNotEnded {
        module: String,
        id: u64,
        deadline: Timestamp,
    },

    #[error("Execution delay not elapsed for {module}#{id}: executable at {executable_at}")]
    ExecutionDelayNotElapsed {
        module: String,
        id: u64,
        executable_at: Timestamp,
    },

    #[error("Proposal {module}#{id} is not bound to the current decider")]
    ProposalNotExecutable { module: String, id: u64 },

    #[error("Proposal {module}#{id} was rejected")]
    ProposalRejected { module: String, id: u64 },

    // Voting power ledger
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Insufficient staked balance: requested {requested}, staked {staked}")]
    InsufficientStaked { requested: u128, staked: u128 },

    #[error("Voting power of {account} locked until {until}")]
    Locked { account: Address, until: Timestamp },

    #[error("Position {position} not staked by {account}")]
    NotStakedByHolder {
        account: Address,
        position: PositionId,
    },

    #[error("Position {0} already staked")]
    PositionAlreadyStaked(PositionId),

    #[error("Unsupported position {0}: holds no governance token")]
    UnsupportedPosition(PositionId),

    #[error("Position transfer failed: {0}")]
    PositionTransferFailed(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{0} already delegates its voting power")]
    AlreadyDelegated(Address),

    #[error("{0} is not delegating")]
    NotDelegating(Address),

    #[error("Cannot delegate to self: {0}")]
    SelfDelegation(Address),

    #[error("Delegation chain refused: {delegator} -> {delegatee}")]
    DelegationChain { delegator: Address, delegatee: Address },

    // Configuration
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module already exists: {0}")]
    ModuleAlreadyExists(String),

    #[error("Module name too long ({len} bytes): {name}")]
    ModuleNameTooLong { name: String, len: usize },

    #[error("Module {0} cannot be removed")]
    ProtectedModule(String),

    #[error("Action not supported by module {0}")]
    ActionNotSupported(String),

    #[error("Not a treasury proposal: destination is the DAO itself")]
    NotATreasuryProposal,

    #[error("No decider registered for {0:?}")]
    DeciderNotRegistered(DecisionType),

    #[error("Decision data {decision_type:?} not configured for module {module}")]
    DecisionDataNotConfigured {
        module: String,
        decision_type: DecisionType,
    },

    #[error("Invalid threshold: {0} basis points")]
    InvalidThreshold(u64),

    // Facets
    #[error("Facet {facet} not published by provider {provider}")]
    FacetNotInCatalog { provider: Address, facet: Address },

    #[error("Facet already installed: {0}")]
    FacetAlreadyInstalled(String),

    #[error("Facet not installed: {0}")]
    FacetNotInstalled(String),

    #[error("New facet {facet} drops {missing} selector(s) of the old one")]
    SelectorCoverageShrunk { facet: Address, missing: usize },

    #[error("Selector already registered: {0}")]
    SelectorAlreadyRegistered(Selector),

    #[error("State migration not found: {0}")]
    MigrationNotFound(String),

    #[error("State migration {name} failed: {reason}")]
    MigrationFailed { name: String, reason: String },

    // Ambient
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
