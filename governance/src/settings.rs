//! DAO settings
//!
//! The initial module table of a DAO, read from TOML:
//!
//! ```toml
//! name = "Commons"
//! address = "0xdadadadadadadadadadadadadadadadadadadada"
//! governance_token = "0x6060606060606060606060606060606060606060"
//! addresses_provider = "0x0000000000000000000000000000000000000000"
//!
//! [[modules]]
//! name = "treasury"
//! kind = "treasury"
//! decision_type = "voting_power"
//!
//! [modules.voting_power]
//! threshold_for_initiator = 50
//! threshold_for_proposal = 1000
//! seconds_proposal_voting_period = 604800
//! seconds_proposal_execution_delay_period = 86400
//! ```

use dao_core::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::config;
use crate::decision::{DecisionType, ModuleDecisionData, SignersDecisionData, VotingPowerDecisionData};
use crate::error::{GovernanceError, Result};
use crate::module::ModuleKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoSettings {
    pub name: String,
    pub address: Address,
    pub governance_token: Address,
    #[serde(default)]
    pub addresses_provider: Address,
    #[serde(default)]
    pub modules: Vec<ModuleSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSettings {
    pub name: String,
    pub kind: ModuleKind,
    pub decision_type: DecisionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_power: Option<VotingPowerDecisionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signers: Option<SignersDecisionData>,
}

impl ModuleSettings {
    pub fn decision_data(&self) -> ModuleDecisionData {
        ModuleDecisionData {
            voting_power: self.voting_power,
            signers: self.signers,
        }
    }

    fn voting_power_module(
        name: &str,
        kind: ModuleKind,
        threshold_for_initiator: u64,
        threshold_for_proposal: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            decision_type: DecisionType::VotingPower,
            voting_power: Some(VotingPowerDecisionData {
                threshold_for_initiator,
                threshold_for_proposal,
                seconds_proposal_voting_period: config::DEFAULT_VOTING_PERIOD_SECS,
                seconds_proposal_execution_delay_period: config::DEFAULT_EXECUTION_DELAY_SECS,
            }),
            signers: None,
        }
    }
}

impl Default for DaoSettings {
    fn default() -> Self {
        Self {
            name: "Commons DAO".to_string(),
            address: Address::repeat_byte(0xda),
            governance_token: Address::repeat_byte(0x60),
            addresses_provider: Address::ZERO,
            modules: vec![
                ModuleSettings::voting_power_module(
                    config::TREASURY,
                    ModuleKind::Treasury,
                    config::TREASURY_THRESHOLD_FOR_INITIATOR,
                    config::THRESHOLD_FOR_PROPOSAL,
                ),
                ModuleSettings::voting_power_module(
                    config::GOVERNANCE,
                    ModuleKind::Governance,
                    config::GOVERNANCE_THRESHOLD_FOR_INITIATOR,
                    config::THRESHOLD_FOR_PROPOSAL,
                ),
                ModuleSettings {
                    name: config::MODULE_MANAGER.to_string(),
                    kind: ModuleKind::ModuleManager,
                    decision_type: DecisionType::Signers,
                    voting_power: None,
                    signers: Some(SignersDecisionData {
                        seconds_proposal_execution_delay_period: 0,
                    }),
                },
            ],
        }
    }
}

impl DaoSettings {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: DaoSettings =
            toml::from_str(contents).map_err(|e| GovernanceError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GovernanceError::Settings(format!("{}: {}", path.display(), e)))?;
        log::debug!("loading DAO settings from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| GovernanceError::Settings(e.to_string()))
    }

    pub fn module(&self, name: &str) -> Option<&ModuleSettings> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        for module in &self.modules {
            if module.name.len() > config::MAX_MODULE_NAME_LEN {
                return Err(GovernanceError::ModuleNameTooLong {
                    name: module.name.clone(),
                    len: module.name.len(),
                });
            }
            if !names.insert(module.name.as_str()) {
                return Err(GovernanceError::ModuleAlreadyExists(module.name.clone()));
            }
            let data = module.decision_data();
            data.validate()?;
            data.require(&module.name, module.decision_type)?;
        }

        let managers: Vec<&ModuleSettings> = self
            .modules
            .iter()
            .filter(|m| m.kind == ModuleKind::ModuleManager)
            .collect();
        match managers.as_slice() {
            [manager] if manager.name == config::MODULE_MANAGER => Ok(()),
            _ => Err(GovernanceError::Settings(format!(
                "exactly one module_manager module named {} is required",
                config::MODULE_MANAGER
            ))),
        }
    }
}
