//! Decision types and per-module decision data

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GovernanceError, Result};
use crate::threshold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    VotingPower,
    Signers,
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionType::VotingPower => write!(f, "voting_power"),
            DecisionType::Signers => write!(f, "signers"),
        }
    }
}

/// Thresholds are basis points, periods are seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VotingPowerDecisionData {
    pub threshold_for_initiator: u64,
    pub threshold_for_proposal: u64,
    pub seconds_proposal_voting_period: u64,
    pub seconds_proposal_execution_delay_period: u64,
}

impl VotingPowerDecisionData {
    pub fn validate(&self) -> Result<()> {
        threshold::validate_numerator(self.threshold_for_initiator)?;
        threshold::validate_numerator(self.threshold_for_proposal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignersDecisionData {
    /// Stored for completeness. The signers decider schedules execution
    /// at creation time regardless of this value.
    pub seconds_proposal_execution_delay_period: u64,
}

/// Decision data of one decision type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionData {
    VotingPower(VotingPowerDecisionData),
    Signers(SignersDecisionData),
}

impl DecisionData {
    pub fn decision_type(&self) -> DecisionType {
        match self {
            DecisionData::VotingPower(_) => DecisionType::VotingPower,
            DecisionData::Signers(_) => DecisionType::Signers,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            DecisionData::VotingPower(data) => data.validate(),
            DecisionData::Signers(_) => Ok(()),
        }
    }
}

/// Decision data a module keeps for every decision type it may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleDecisionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_power: Option<VotingPowerDecisionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signers: Option<SignersDecisionData>,
}

impl ModuleDecisionData {
    pub fn get(&self, decision_type: DecisionType) -> Option<DecisionData> {
        match decision_type {
            DecisionType::VotingPower => self.voting_power.map(DecisionData::VotingPower),
            DecisionType::Signers => self.signers.map(DecisionData::Signers),
        }
    }

    pub fn is_configured(&self, decision_type: DecisionType) -> bool {
        self.get(decision_type).is_some()
    }

    pub fn set(&mut self, data: DecisionData) {
        match data {
            DecisionData::VotingPower(data) => self.voting_power = Some(data),
            DecisionData::Signers(data) => self.signers = Some(data),
        }
    }

    /// Data bound to `decision_type`, failing if it was never populated.
    pub fn require(&self, module: &str, decision_type: DecisionType) -> Result<DecisionData> {
        self.get(decision_type)
            .ok_or_else(|| GovernanceError::DecisionDataNotConfigured {
                module: module.to_string(),
                decision_type,
            })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(data) = &self.voting_power {
            data.validate()?;
        }
        Ok(())
    }
}
