//! DAO modules
//!
//! A module is a named namespace of proposals bound to one decision type.
//! Its kind decides which proposal actions it accepts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::decision::{DecisionData, DecisionType, ModuleDecisionData};
use crate::error::{GovernanceError, Result};
use crate::proposal::ProposalAction;
use crate::registry::ProposalRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Outbound calls from the DAO's own funds.
    Treasury,
    /// Changes to decision data of modules.
    Governance,
    /// Self-modification of the module table and facets.
    ModuleManager,
    /// Dynamically added module executing outbound calls.
    Custom,
}

impl ModuleKind {
    pub fn accepts(&self, action: &ProposalAction) -> bool {
        matches!(
            (self, action),
            (ModuleKind::Treasury, ProposalAction::Call(_))
                | (ModuleKind::Custom, ProposalAction::Call(_))
                | (ModuleKind::Governance, ProposalAction::Governance(_))
                | (ModuleKind::ModuleManager, ProposalAction::ModuleManager(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    pub name: String,
    pub kind: ModuleKind,
    pub decision_type: DecisionType,
    pub decision_data: ModuleDecisionData,
    pub proposals: ProposalRegistry,
    /// Facets installed together with this module.
    pub facets: BTreeSet<String>,
}

impl ModuleState {
    pub fn new(
        name: impl Into<String>,
        kind: ModuleKind,
        decision_type: DecisionType,
        decision_data: ModuleDecisionData,
    ) -> Self {
        let name = name.into();
        Self {
            proposals: ProposalRegistry::new(name.clone()),
            name,
            kind,
            decision_type,
            decision_data,
            facets: BTreeSet::new(),
        }
    }

    /// Decision data of the currently bound decision type.
    pub fn active_decision_data(&self) -> Result<DecisionData> {
        self.decision_data.require(&self.name, self.decision_type)
    }

    pub fn ensure_accepts(&self, action: &ProposalAction) -> Result<()> {
        if self.kind.accepts(action) {
            Ok(())
        } else {
            Err(GovernanceError::ActionNotSupported(self.name.clone()))
        }
    }
}
