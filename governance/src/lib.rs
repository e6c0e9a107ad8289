//! Commons DAO Governance
//!
//! Decision-process engine of the DAO: the voting power ledger, threshold
//! math, pluggable deciders, per-module proposal registries and the module
//! engine that drives every proposal through
//! create -> decide -> accept/reject -> execute. Treasury transfers,
//! governance parameter changes and the DAO's own module table are all
//! changed through that same lifecycle.

pub mod dao;
pub mod decider;
pub mod decision;
pub mod engine;
pub mod error;
pub mod events;
pub mod facets;
pub mod governance;
pub mod module;
pub mod module_manager;
pub mod proposal;
pub mod registry;
pub mod settings;
pub mod threshold;
pub mod voting_power;

pub use dao::{Dao, DaoBuilder, DaoState};
pub use decider::{Decider, DecisionContext, Schedule, SignersDecider, VotingPowerDecider};
pub use decision::{
    DecisionData, DecisionType, ModuleDecisionData, SignersDecisionData, VotingPowerDecisionData,
};
pub use engine::ModuleEngine;
pub use error::{GovernanceError, Result};
pub use events::DaoEvent;
pub use facets::{FacetCut, FacetDirectory, InstalledFacet};
pub use governance::GovernanceAction;
pub use module::{ModuleKind, ModuleState};
pub use module_manager::{ActionEnv, Migrations, ModuleManagerAction};
pub use proposal::{
    ExecutionOutcome, ProposalAction, ProposalRecord, ProposalStatus, ProposalTally, Settlement,
};
pub use registry::ProposalRegistry;
pub use settings::{DaoSettings, ModuleSettings};
pub use voting_power::{VoterRecord, VotingPowerLedger};

/// Governance configuration constants
pub mod config {
    /// Module names of the standard DAO
    pub const TREASURY: &str = "treasury";
    pub const GOVERNANCE: &str = "governance";
    pub const MODULE_MANAGER: &str = "moduleManager";

    /// Module names are stored in 32-byte slots with a length byte
    pub const MAX_MODULE_NAME_LEN: usize = 31;

    /// Standard voting period (7 days)
    pub const DEFAULT_VOTING_PERIOD_SECS: u64 = 7 * 86_400;

    /// Standard execution delay (1 day)
    pub const DEFAULT_EXECUTION_DELAY_SECS: u64 = 86_400;

    /// Power needed to open a treasury proposal (0.5%)
    pub const TREASURY_THRESHOLD_FOR_INITIATOR: u64 = 50;

    /// Power needed to open a governance proposal (5%)
    pub const GOVERNANCE_THRESHOLD_FOR_INITIATOR: u64 = 500;

    /// Yes votes needed to accept a proposal (10%)
    pub const THRESHOLD_FOR_PROPOSAL: u64 = 1000;
}
