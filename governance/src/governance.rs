//! Governance module actions
//!
//! Accepted governance proposals rewrite the decision data of a module.
//! New values only apply to proposals created afterwards: every proposal
//! keeps the schedule fixed at its creation.

use serde::{Deserialize, Serialize};

use crate::dao::DaoState;
use crate::decision::{DecisionData, DecisionType, ModuleDecisionData, VotingPowerDecisionData};
use crate::error::{GovernanceError, Result};
use crate::events::DaoEvent;
use crate::threshold;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceAction {
    ChangeDecisionData {
        module: String,
        data: DecisionData,
    },
    ChangeThresholdForInitiator {
        module: String,
        numerator: u64,
    },
    ChangeThresholdForProposal {
        module: String,
        numerator: u64,
    },
    ChangeSecondsProposalVotingPeriod {
        module: String,
        seconds: u64,
    },
    ChangeSecondsProposalExecutionDelayPeriodVotingPower {
        module: String,
        seconds: u64,
    },
    ChangeSecondsProposalExecutionDelayPeriodSigners {
        module: String,
        seconds: u64,
    },
}

impl GovernanceAction {
    pub fn name(&self) -> &'static str {
        match self {
            GovernanceAction::ChangeDecisionData { .. } => "changeDecisionData",
            GovernanceAction::ChangeThresholdForInitiator { .. } => "changeThresholdForInitiator",
            GovernanceAction::ChangeThresholdForProposal { .. } => "changeThresholdForProposal",
            GovernanceAction::ChangeSecondsProposalVotingPeriod { .. } => {
                "changeSecondsProposalVotingPeriod"
            }
            GovernanceAction::ChangeSecondsProposalExecutionDelayPeriodVotingPower { .. } => {
                "changeSecondsProposalExecutionDelayPeriodVP"
            }
            GovernanceAction::ChangeSecondsProposalExecutionDelayPeriodSigners { .. } => {
                "changeSecondsProposalExecutionDelayPeriodSigners"
            }
        }
    }

    /// Module whose decision data the action rewrites.
    pub fn target_module(&self) -> &str {
        match self {
            GovernanceAction::ChangeDecisionData { module, .. }
            | GovernanceAction::ChangeThresholdForInitiator { module, .. }
            | GovernanceAction::ChangeThresholdForProposal { module, .. }
            | GovernanceAction::ChangeSecondsProposalVotingPeriod { module, .. }
            | GovernanceAction::ChangeSecondsProposalExecutionDelayPeriodVotingPower { module, .. }
            | GovernanceAction::ChangeSecondsProposalExecutionDelayPeriodSigners { module, .. } => module,
        }
    }

    /// Checks that need no DAO state, run when the proposal is created.
    pub fn validate(&self) -> Result<()> {
        match self {
            GovernanceAction::ChangeDecisionData { data, .. } => data.validate(),
            GovernanceAction::ChangeThresholdForInitiator { numerator, .. }
            | GovernanceAction::ChangeThresholdForProposal { numerator, .. } => {
                threshold::validate_numerator(*numerator)
            }
            _ => Ok(()),
        }
    }

    pub fn apply(&self, state: &mut DaoState) -> Result<()> {
        self.validate()?;
        let module_name = self.target_module().to_string();
        let module = state.module_mut(&module_name)?;
        let data = &mut module.decision_data;

        let changed = match self {
            GovernanceAction::ChangeDecisionData { data: new_data, .. } => {
                data.set(*new_data);
                new_data.decision_type()
            }
            GovernanceAction::ChangeThresholdForInitiator { numerator, .. } => {
                voting_power_mut(data, &module_name)?.threshold_for_initiator = *numerator;
                DecisionType::VotingPower
            }
            GovernanceAction::ChangeThresholdForProposal { numerator, .. } => {
                voting_power_mut(data, &module_name)?.threshold_for_proposal = *numerator;
                DecisionType::VotingPower
            }
            GovernanceAction::ChangeSecondsProposalVotingPeriod { seconds, .. } => {
                voting_power_mut(data, &module_name)?.seconds_proposal_voting_period = *seconds;
                DecisionType::VotingPower
            }
            GovernanceAction::ChangeSecondsProposalExecutionDelayPeriodVotingPower { seconds, .. } => {
                voting_power_mut(data, &module_name)?.seconds_proposal_execution_delay_period =
                    *seconds;
                DecisionType::VotingPower
            }
            GovernanceAction::ChangeSecondsProposalExecutionDelayPeriodSigners { seconds, .. } => {
                let signers = data.signers.as_mut().ok_or_else(|| {
                    GovernanceError::DecisionDataNotConfigured {
                        module: module_name.clone(),
                        decision_type: DecisionType::Signers,
                    }
                })?;
                signers.seconds_proposal_execution_delay_period = *seconds;
                DecisionType::Signers
            }
        };

        log::info!("⚙️  {} applied to module {}", self.name(), module_name);
        state.events.push(DaoEvent::DecisionDataChanged {
            module: module_name,
            decision_type: changed,
        });
        Ok(())
    }
}

fn voting_power_mut<'a>(
    data: &'a mut ModuleDecisionData,
    module: &str,
) -> Result<&'a mut VotingPowerDecisionData> {
    data.voting_power
        .as_mut()
        .ok_or_else(|| GovernanceError::DecisionDataNotConfigured {
            module: module.to_string(),
            decision_type: DecisionType::VotingPower,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DaoSettings;

    fn state() -> DaoState {
        DaoState::from_settings(&DaoSettings::default()).unwrap()
    }

    #[test]
    fn test_change_threshold_for_proposal() {
        let mut state = state();
        let action = GovernanceAction::ChangeThresholdForProposal {
            module: "treasury".to_string(),
            numerator: 2500,
        };
        action.apply(&mut state).unwrap();

        let data = state.module("treasury").unwrap().decision_data;
        assert_eq!(data.voting_power.unwrap().threshold_for_proposal, 2500);
        assert!(matches!(
            state.events.last(),
            Some(DaoEvent::DecisionDataChanged { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_numerator() {
        let action = GovernanceAction::ChangeThresholdForInitiator {
            module: "treasury".to_string(),
            numerator: 20_000,
        };
        assert_eq!(action.validate(), Err(GovernanceError::InvalidThreshold(20_000)));
        assert_eq!(
            action.apply(&mut state()),
            Err(GovernanceError::InvalidThreshold(20_000))
        );
    }

    #[test]
    fn test_voting_power_change_needs_configured_data() {
        let mut state = state();
        // the module manager is bound to signers only
        let action = GovernanceAction::ChangeSecondsProposalVotingPeriod {
            module: "moduleManager".to_string(),
            seconds: 60,
        };
        assert!(matches!(
            action.apply(&mut state),
            Err(GovernanceError::DecisionDataNotConfigured { .. })
        ));

        let unknown = GovernanceAction::ChangeSecondsProposalVotingPeriod {
            module: "nope".to_string(),
            seconds: 60,
        };
        assert_eq!(
            unknown.apply(&mut state),
            Err(GovernanceError::ModuleNotFound("nope".to_string()))
        );
    }
}
