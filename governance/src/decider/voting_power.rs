//! Token-weighted voting
//!
//! Votes are weighted by the voter's effective power at vote time. Casting
//! a vote locks the voter's power until the voting deadline. A proposal can
//! only settle once the window is over; it is accepted when the yes votes
//! reach the proposal threshold and outweigh the no votes.

use dao_core::{Address, Amount, Timestamp};

use super::{decision_not_started, not_configured, voting_power_data, DecisionContext, Decider, Schedule};
use crate::decision::{DecisionData, DecisionType};
use crate::error::{GovernanceError, Result};
use crate::proposal::{ProposalRecord, ProposalTally, Settlement};

#[derive(Debug, Clone, Copy, Default)]
pub struct VotingPowerDecider;

impl VotingPowerDecider {
    fn cast(
        &self,
        ctx: &mut DecisionContext<'_>,
        proposal: &mut ProposalRecord,
        account: &Address,
        in_favor: bool,
        allow_zero: bool,
    ) -> Result<Amount> {
        let deadline = proposal.voting_deadline;
        if ctx.now >= deadline {
            return Err(GovernanceError::VotingClosed {
                module: proposal.module.clone(),
                id: proposal.id,
            });
        }
        let power = ctx.ledger.voting_power(account);
        let (module, id) = (proposal.module.clone(), proposal.id);
        let ProposalTally::VotingPower {
            votes_yes,
            votes_no,
            voters,
        } = &mut proposal.tally
        else {
            return Err(GovernanceError::DecisionNotStarted { module, id });
        };
        if voters.contains(account) {
            return Err(GovernanceError::AlreadyDecided {
                module,
                id,
                account: *account,
            });
        }
        if power == 0 && !allow_zero {
            return Err(GovernanceError::NotEnoughVotingPower {
                account: *account,
                power,
                required: 1,
            });
        }

        voters.insert(*account);
        if in_favor {
            *votes_yes += power;
        } else {
            *votes_no += power;
        }
        if power > 0 {
            ctx.ledger.lock_until(account, deadline);
        }
        Ok(power)
    }

    fn proposal_threshold(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        proposal: &ProposalRecord,
    ) -> Result<Amount> {
        let data = voting_power_data(data)
            .ok_or_else(|| not_configured(&proposal.module, DecisionType::VotingPower))?;
        Ok(ctx.ledger.absolute_threshold(data.threshold_for_proposal))
    }
}

impl Decider for VotingPowerDecider {
    fn decision_type(&self) -> DecisionType {
        DecisionType::VotingPower
    }

    fn check_initiator_standing(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        account: &Address,
    ) -> bool {
        voting_power_data(data).is_some_and(|data| {
            ctx.ledger
                .is_enough_voting_power(account, data.threshold_for_initiator)
        })
    }

    fn standing_error(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        account: &Address,
    ) -> GovernanceError {
        let required = voting_power_data(data)
            .map(|data| ctx.ledger.absolute_threshold(data.threshold_for_initiator))
            .unwrap_or(0);
        GovernanceError::NotEnoughVotingPower {
            account: *account,
            power: ctx.ledger.voting_power(account),
            required,
        }
    }

    fn schedule(&self, data: &DecisionData, now: Timestamp) -> Schedule {
        let (voting, delay) = voting_power_data(data)
            .map(|data| {
                (
                    data.seconds_proposal_voting_period,
                    data.seconds_proposal_execution_delay_period,
                )
            })
            .unwrap_or((0, 0));
        let voting_deadline = now.saturating_add(voting);
        Schedule {
            voting_deadline,
            execution_timestamp: voting_deadline.saturating_add(delay),
        }
    }

    fn register_initial_decision(
        &self,
        ctx: &mut DecisionContext<'_>,
        proposal: &mut ProposalRecord,
        account: &Address,
    ) -> Result<Amount> {
        self.cast(ctx, proposal, account, true, true)
    }

    fn decide(
        &self,
        ctx: &mut DecisionContext<'_>,
        proposal: &mut ProposalRecord,
        account: &Address,
        in_favor: bool,
    ) -> Result<Amount> {
        self.cast(ctx, proposal, account, in_favor, false)
    }

    fn is_threshold_reached(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        proposal: &ProposalRecord,
    ) -> bool {
        let (yes, _) = self.tally(proposal);
        self.proposal_threshold(ctx, data, proposal)
            .is_ok_and(|required| yes >= required)
    }

    fn settle(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        proposal: &ProposalRecord,
    ) -> Result<Settlement> {
        if !matches!(proposal.tally, ProposalTally::VotingPower { .. }) {
            return Err(decision_not_started(proposal));
        }
        if ctx.now < proposal.voting_deadline {
            return Err(GovernanceError::VotingNotEnded {
                module: proposal.module.clone(),
                id: proposal.id,
                deadline: proposal.voting_deadline,
            });
        }
        let required = self.proposal_threshold(ctx, data, proposal)?;
        let (yes, no) = self.tally(proposal);
        if yes >= required && yes > no {
            Ok(Settlement::Accepted)
        } else {
            Ok(Settlement::Rejected)
        }
    }
}
