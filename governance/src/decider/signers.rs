//! m-of-n signer quorum
//!
//! Owners of the signer set decide one at a time with weight 1. A decision
//! coming from the safe itself already carries the quorum gathered by its
//! owners. Settlement is not time-gated: it succeeds as soon as the quorum
//! is reached or can no longer be reached.

use dao_core::{Address, Amount, Timestamp};

use super::{decision_not_started, signers_data, DecisionContext, Decider, Schedule};
use crate::decision::{DecisionData, DecisionType};
use crate::error::{GovernanceError, Result};
use crate::proposal::{ProposalRecord, ProposalTally, Settlement};

#[derive(Debug, Clone, Copy, Default)]
pub struct SignersDecider;

impl SignersDecider {
    fn is_signer(ctx: &DecisionContext<'_>, account: &Address) -> bool {
        *account == ctx.signers.safe() || ctx.signers.is_owner(account)
    }

    /// Yes and no decisions of current owners.
    fn owner_counts(ctx: &DecisionContext<'_>, proposal: &ProposalRecord) -> (u64, u64) {
        let ProposalTally::Signers { decisions, .. } = &proposal.tally else {
            return (0, 0);
        };
        decisions
            .iter()
            .filter(|(signer, _)| ctx.signers.is_owner(signer))
            .fold((0, 0), |(yes, no), (_, in_favor)| {
                if *in_favor {
                    (yes + 1, no)
                } else {
                    (yes, no + 1)
                }
            })
    }
}

impl Decider for SignersDecider {
    fn decision_type(&self) -> DecisionType {
        DecisionType::Signers
    }

    fn check_initiator_standing(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        account: &Address,
    ) -> bool {
        signers_data(data).is_some() && Self::is_signer(ctx, account)
    }

    fn standing_error(
        &self,
        _ctx: &DecisionContext<'_>,
        _data: &DecisionData,
        account: &Address,
    ) -> GovernanceError {
        GovernanceError::NotASigner(*account)
    }

    fn schedule(&self, _data: &DecisionData, now: Timestamp) -> Schedule {
        // the configured execution delay is not applied to signer decisions
        Schedule {
            voting_deadline: now,
            execution_timestamp: now,
        }
    }

    fn register_initial_decision(
        &self,
        ctx: &mut DecisionContext<'_>,
        proposal: &mut ProposalRecord,
        account: &Address,
    ) -> Result<Amount> {
        self.decide(ctx, proposal, account, true)
    }

    fn decide(
        &self,
        ctx: &mut DecisionContext<'_>,
        proposal: &mut ProposalRecord,
        account: &Address,
        in_favor: bool,
    ) -> Result<Amount> {
        if !Self::is_signer(ctx, account) {
            return Err(GovernanceError::NotASigner(*account));
        }
        let (module, id) = (proposal.module.clone(), proposal.id);
        let is_safe = *account == ctx.signers.safe();
        let ProposalTally::Signers {
            decisions,
            safe_decision,
        } = &mut proposal.tally
        else {
            return Err(GovernanceError::DecisionNotStarted { module, id });
        };

        let already = if is_safe {
            safe_decision.is_some()
        } else {
            decisions.contains_key(account)
        };
        if already {
            return Err(GovernanceError::AlreadyDecided {
                module,
                id,
                account: *account,
            });
        }

        if is_safe {
            *safe_decision = Some(in_favor);
        } else {
            decisions.insert(*account, in_favor);
        }
        Ok(1)
    }

    fn is_threshold_reached(
        &self,
        ctx: &DecisionContext<'_>,
        _data: &DecisionData,
        proposal: &ProposalRecord,
    ) -> bool {
        if let ProposalTally::Signers {
            safe_decision: Some(true),
            ..
        } = proposal.tally
        {
            return true;
        }
        let (yes, _) = Self::owner_counts(ctx, proposal);
        yes >= ctx.signers.threshold()
    }

    fn settle(
        &self,
        ctx: &DecisionContext<'_>,
        data: &DecisionData,
        proposal: &ProposalRecord,
    ) -> Result<Settlement> {
        let ProposalTally::Signers { safe_decision, .. } = &proposal.tally else {
            return Err(decision_not_started(proposal));
        };
        match safe_decision {
            Some(true) => return Ok(Settlement::Accepted),
            Some(false) => return Ok(Settlement::Rejected),
            None => {}
        }

        let required = ctx.signers.threshold();
        let owners = ctx.signers.owners().len() as u64;
        let (yes, no) = Self::owner_counts(ctx, proposal);
        if self.is_threshold_reached(ctx, data, proposal) {
            Ok(Settlement::Accepted)
        } else if no > owners.saturating_sub(required) {
            Ok(Settlement::Rejected)
        } else {
            Err(GovernanceError::ThresholdNotReached {
                module: proposal.module.clone(),
                id: proposal.id,
                current: yes as Amount,
                required: required as Amount,
            })
        }
    }
}
