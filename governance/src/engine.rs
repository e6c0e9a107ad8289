//! Module engine
//!
//! Drives the proposal lifecycle of one module: create, decide, accept or
//! reject, execute. Standing checks, tallies and settlement are left to the
//! decider bound to the module; applying the action is left to the action
//! itself. Every entry point is atomic.

use dao_core::{Address, Amount, Timestamp};

use crate::dao::{Dao, DaoState};
use crate::decider::DecisionContext;
use crate::decision::{DecisionData, DecisionType};
use crate::error::{GovernanceError, Result};
use crate::events::DaoEvent;
use crate::module::ModuleKind;
use crate::module_manager::ActionEnv;
use crate::proposal::{ExecutionOutcome, ProposalAction, ProposalRecord, ProposalStatus, Settlement};

pub struct ModuleEngine<'a> {
    dao: &'a mut Dao,
    module: String,
}

impl<'a> ModuleEngine<'a> {
    pub(crate) fn new(dao: &'a mut Dao, module: &str) -> Self {
        Self {
            dao,
            module: module.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.module
    }

    /// Creates a proposal and registers the initiator's own decision.
    /// Returns the new proposal id.
    pub fn create_proposal(&mut self, initiator: &Address, action: ProposalAction) -> Result<u64> {
        let module = &self.module;
        self.dao
            .atomically(|dao| create_proposal(dao, module, initiator, action))
    }

    pub fn decide_on_proposal(&mut self, id: u64, account: &Address, in_favor: bool) -> Result<()> {
        let module = &self.module;
        self.dao
            .atomically(|dao| decide_on_proposal(dao, module, id, account, in_favor))
    }

    pub fn accept_or_reject_proposal(&mut self, id: u64) -> Result<Settlement> {
        let module = &self.module;
        self.dao
            .atomically(|dao| accept_or_reject_proposal(dao, module, id))
    }

    pub fn execute_proposal(&mut self, id: u64) -> Result<ExecutionOutcome> {
        let module = &self.module;
        self.dao.atomically(|dao| execute_proposal(dao, module, id))
    }

    /// Create, settle and execute in one step. Only settles when the
    /// caller's decision alone reaches the quorum, which is the case for the
    /// signer set's safe. Nothing is persisted if any step fails or the
    /// proposal is rejected.
    pub fn batched_execution(
        &mut self,
        caller: &Address,
        action: ProposalAction,
    ) -> Result<(u64, ExecutionOutcome)> {
        let module = &self.module;
        self.dao.atomically(|dao| {
            if dao.state.module(module)?.decision_type != DecisionType::Signers {
                return Err(GovernanceError::ActionNotSupported(module.clone()));
            }
            let id = create_proposal(dao, module, caller, action)?;
            match accept_or_reject_proposal(dao, module, id)? {
                Settlement::Accepted => {}
                Settlement::Rejected => {
                    return Err(GovernanceError::ProposalRejected {
                        module: module.clone(),
                        id,
                    })
                }
            }
            let outcome = execute_proposal(dao, module, id)?;
            Ok((id, outcome))
        })
    }

    pub fn proposal(&self, id: u64) -> Result<&ProposalRecord> {
        self.dao.proposal(&self.module, id)
    }

    pub fn proposals_count(&self) -> Result<u64> {
        self.dao.proposals_count(&self.module)
    }

    pub fn active_proposals(&self) -> Result<Vec<u64>> {
        self.dao.active_proposals(&self.module)
    }

    pub fn accepted_proposals(&self) -> Result<Vec<u64>> {
        self.dao.accepted_proposals(&self.module)
    }

    pub fn has_voted(&self, id: u64, account: &Address) -> Result<bool> {
        self.dao.has_voted(&self.module, id, account)
    }

    /// `(yes, no)` of a proposal as counted by the bound decider.
    pub fn tally(&self, id: u64) -> Result<(Amount, Amount)> {
        let decision_type = self.dao.state.module(&self.module)?.decision_type;
        let proposal = self.proposal(id)?;
        Ok(self.dao.decider(decision_type)?.tally(proposal))
    }

    pub fn is_threshold_reached(&mut self, id: u64) -> Result<bool> {
        let dao = &mut *self.dao;
        let now = dao.clock.now();
        let module = dao.state.module(&self.module)?;
        let data = module.active_decision_data()?;
        let record = module.proposals.get(id)?.clone();
        let decider = dao
            .deciders
            .get(&module.decision_type)
            .ok_or(GovernanceError::DeciderNotRegistered(module.decision_type))?;
        let ctx = DecisionContext {
            now,
            ledger: &mut dao.state.ledger,
            signers: dao.signers.as_ref(),
        };
        Ok(decider.is_threshold_reached(&ctx, &data, &record))
    }
}

/// Module binding resolved before a lifecycle step.
struct Binding {
    kind: ModuleKind,
    decision_type: DecisionType,
    data: DecisionData,
}

fn binding(state: &DaoState, module: &str) -> Result<Binding> {
    let module = state.module(module)?;
    Ok(Binding {
        kind: module.kind,
        decision_type: module.decision_type,
        data: module.active_decision_data()?,
    })
}

/// Unsettled proposal that is still bound to the module's current decider.
fn active_copy(
    state: &DaoState,
    module: &str,
    id: u64,
    decision_type: DecisionType,
) -> Result<ProposalRecord> {
    let record = state.module(module)?.proposals.get(id)?.clone();
    if record.status.is_settled() {
        log::debug!("{}#{} already settled as {:?}", module, id, record.status);
        return Err(GovernanceError::ProposalAlreadySettled {
            module: module.to_string(),
            id,
        });
    }
    if record.decided_by != decision_type {
        return Err(GovernanceError::ProposalNotExecutable {
            module: module.to_string(),
            id,
        });
    }
    Ok(record)
}

fn store(state: &mut DaoState, record: ProposalRecord) -> Result<()> {
    let module = record.module.clone();
    let id = record.id;
    *state.module_mut(&module)?.proposals.get_mut(id)? = record;
    Ok(())
}

fn decision_event(
    decision_type: DecisionType,
    record: &ProposalRecord,
    account: &Address,
    in_favor: bool,
    weight: Amount,
) -> DaoEvent {
    match decision_type {
        DecisionType::VotingPower => DaoEvent::Voted {
            module: record.module.clone(),
            id: record.id,
            voter: *account,
            in_favor,
            power: weight,
        },
        DecisionType::Signers => DaoEvent::Decided {
            module: record.module.clone(),
            id: record.id,
            signer: *account,
            in_favor,
        },
    }
}

fn check_action(dao: &Dao, module: &str, kind: ModuleKind, action: &ProposalAction) -> Result<()> {
    let state = &dao.state;
    state.module(module)?.ensure_accepts(action)?;
    match action {
        ProposalAction::Call(call) => {
            if kind == ModuleKind::Treasury && call.destination == state.address {
                return Err(GovernanceError::NotATreasuryProposal);
            }
            Ok(())
        }
        ProposalAction::Governance(action) => action.validate(),
        ProposalAction::ModuleManager(action) => action.precheck(state, dao.migrations()),
    }
}

fn create_proposal(
    dao: &mut Dao,
    module: &str,
    initiator: &Address,
    action: ProposalAction,
) -> Result<u64> {
    let now = dao.clock.now();
    let binding = binding(&dao.state, module)?;
    check_action(dao, module, binding.kind, &action)?;
    let next_id = dao.state.module(module)?.proposals.next_id();

    let decider = dao
        .deciders
        .get(&binding.decision_type)
        .ok_or(GovernanceError::DeciderNotRegistered(binding.decision_type))?;
    let mut ctx = DecisionContext {
        now,
        ledger: &mut dao.state.ledger,
        signers: dao.signers.as_ref(),
    };
    if !decider.check_initiator_standing(&ctx, &binding.data, initiator) {
        let error = decider.standing_error(&ctx, &binding.data, initiator);
        log::debug!("{} refused as initiator in {}: {}", initiator, module, error);
        return Err(error);
    }

    let schedule = decider.schedule(&binding.data, now);
    let label = action.label();
    let mut record = ProposalRecord {
        id: next_id,
        module: module.to_string(),
        initiator: *initiator,
        action,
        created_at: now,
        voting_deadline: schedule.voting_deadline,
        execution_timestamp: schedule.execution_timestamp,
        decided_by: binding.decision_type,
        tally: decider.empty_tally(),
        status: ProposalStatus::Active,
        settled_at: None,
        executed_at: None,
        revert_reason: None,
    };
    let weight = decider.register_initial_decision(&mut ctx, &mut record, initiator)?;
    let decided = decision_event(binding.decision_type, &record, initiator, true, weight);

    let id = dao.state.module_mut(module)?.proposals.create(record);
    log::info!("📝 proposal {}#{} created by {}: {}", module, id, initiator, label);
    dao.state.events.push(DaoEvent::ProposalCreated {
        module: module.to_string(),
        id,
        initiator: *initiator,
    });
    dao.state.events.push(decided);
    Ok(id)
}

fn decide_on_proposal(
    dao: &mut Dao,
    module: &str,
    id: u64,
    account: &Address,
    in_favor: bool,
) -> Result<()> {
    let now = dao.clock.now();
    let decision_type = dao.state.module(module)?.decision_type;
    let mut record = active_copy(&dao.state, module, id, decision_type)?;

    let decider = dao
        .deciders
        .get(&decision_type)
        .ok_or(GovernanceError::DeciderNotRegistered(decision_type))?;
    let mut ctx = DecisionContext {
        now,
        ledger: &mut dao.state.ledger,
        signers: dao.signers.as_ref(),
    };
    let weight = decider.decide(&mut ctx, &mut record, account, in_favor)?;

    let event = decision_event(decision_type, &record, account, in_favor, weight);
    store(&mut dao.state, record)?;
    log::info!(
        "🗳️  {} decided {} on {}#{} with weight {}",
        account,
        if in_favor { "yes" } else { "no" },
        module,
        id,
        weight
    );
    dao.state.events.push(event);
    Ok(())
}

fn accept_or_reject_proposal(dao: &mut Dao, module: &str, id: u64) -> Result<Settlement> {
    let now = dao.clock.now();
    let binding = binding(&dao.state, module)?;
    let mut record = active_copy(&dao.state, module, id, binding.decision_type)?;

    let decider = dao
        .deciders
        .get(&binding.decision_type)
        .ok_or(GovernanceError::DeciderNotRegistered(binding.decision_type))?;
    let ctx = DecisionContext {
        now,
        ledger: &mut dao.state.ledger,
        signers: dao.signers.as_ref(),
    };
    let settlement = decider.settle(&ctx, &binding.data, &record)?;

    record.status = settlement.into();
    record.settled_at = Some(now);
    store(&mut dao.state, record)?;
    let registry = &mut dao.state.module_mut(module)?.proposals;
    let event = match settlement {
        Settlement::Accepted => {
            registry.mark_accepted(id);
            DaoEvent::ProposalAccepted {
                module: module.to_string(),
                id,
            }
        }
        Settlement::Rejected => {
            registry.remove_from_active(id);
            DaoEvent::ProposalRejected {
                module: module.to_string(),
                id,
            }
        }
    };
    log::info!("⚖️  proposal {}#{} settled: {:?}", module, id, settlement);
    dao.state.events.push(event);
    Ok(settlement)
}

fn execute_proposal(dao: &mut Dao, module: &str, id: u64) -> Result<ExecutionOutcome> {
    let now = dao.clock.now();
    let mut record = dao.state.module(module)?.proposals.get(id)?.clone();
    check_executable(dao, &record, now)?;

    let outcome = match apply_action(dao, &record.action) {
        Ok(()) => ExecutionOutcome::Executed,
        Err(e) => ExecutionOutcome::ExecutedWithRevert(e.to_string()),
    };

    record.executed_at = Some(now);
    let event = match &outcome {
        ExecutionOutcome::Executed => {
            record.status = ProposalStatus::Executed;
            log::info!("✅ proposal {}#{} executed", module, id);
            DaoEvent::ProposalExecutedSuccessfully {
                module: module.to_string(),
                id,
            }
        }
        ExecutionOutcome::ExecutedWithRevert(reason) => {
            record.status = ProposalStatus::ExecutedWithRevert;
            record.revert_reason = Some(reason.clone());
            log::warn!("⚠️  proposal {}#{} executed with revert: {}", module, id, reason);
            DaoEvent::ProposalExecutedWithRevert {
                module: module.to_string(),
                id,
                reason: reason.clone(),
            }
        }
    };
    store(&mut dao.state, record)?;
    dao.state
        .module_mut(module)?
        .proposals
        .remove_from_accepted(id);
    dao.state.events.push(event);
    Ok(outcome)
}

fn check_executable(dao: &Dao, record: &ProposalRecord, now: Timestamp) -> Result<()> {
    let module = record.module.clone();
    let id = record.id;
    if now < record.execution_timestamp {
        return Err(GovernanceError::ExecutionDelayNotElapsed {
            module,
            id,
            executable_at: record.execution_timestamp,
        });
    }
    match record.status {
        ProposalStatus::Accepted => {}
        ProposalStatus::Executed | ProposalStatus::ExecutedWithRevert => {
            return Err(GovernanceError::AlreadyExecuted { module, id })
        }
        ProposalStatus::Active | ProposalStatus::Rejected => {
            return Err(GovernanceError::NotAccepted { module, id })
        }
    }
    if dao.state.module(&module)?.decision_type != record.decided_by {
        return Err(GovernanceError::ProposalNotExecutable { module, id });
    }
    Ok(())
}

/// Applies a proposal action. State-changing actions run on a scratch copy
/// that only replaces the live state when they succeed.
fn apply_action(dao: &mut Dao, action: &ProposalAction) -> Result<()> {
    match action {
        ProposalAction::Call(call) => {
            let caller = dao.state.address;
            dao.sandbox.call(&caller, call)?;
            Ok(())
        }
        ProposalAction::Governance(action) => {
            let mut scratch = dao.state.clone();
            action.apply(&mut scratch)?;
            dao.state = scratch;
            Ok(())
        }
        ProposalAction::ModuleManager(action) => {
            let mut scratch = dao.state.clone();
            let env = ActionEnv {
                catalog: dao.catalog.as_ref(),
                migrations: dao.migrations(),
            };
            action.apply(&mut scratch, &env)?;
            log::info!("🛠️  module manager applied {}", action.name());
            dao.state = scratch;
            Ok(())
        }
    }
}
