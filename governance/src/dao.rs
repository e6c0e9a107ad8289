//! The DAO aggregate
//!
//! `DaoState` is everything the DAO persists: its modules with their
//! proposal registries and decision data, the voting power ledger, the
//! facet directory and the event log. `Dao` owns that state together with
//! the external collaborators (clock, token custody, position valuation,
//! signer set, execution sandbox, facet catalog) and exposes every entry
//! point. Each entry point runs atomically: on error the state is restored
//! to what it was before the call.

use dao_core::{
    Address, Amount, Clock, ExecutionSandbox, FacetCatalog, InMemoryFacetCatalog, PositionBook,
    PositionId, PositionValuation, Selector, SharedSignerSet, SignerSet, SystemClock, Timestamp,
    TokenTransfer,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config;
use crate::decider::{default_deciders, Decider};
use crate::decision::{DecisionType, ModuleDecisionData};
use crate::engine::ModuleEngine;
use crate::error::{GovernanceError, Result};
use crate::events::DaoEvent;
use crate::facets::FacetDirectory;
use crate::module::ModuleState;
use crate::module_manager::Migrations;
use crate::proposal::ProposalRecord;
use crate::registry::ProposalRegistry;
use crate::settings::DaoSettings;
use crate::voting_power::VotingPowerLedger;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoState {
    pub name: String,
    pub address: Address,
    pub governance_token: Address,
    pub addresses_provider: Address,
    pub modules: BTreeMap<String, ModuleState>,
    /// Registries of removed modules, resumed if the name is added again.
    pub archived: BTreeMap<String, ProposalRegistry>,
    pub ledger: VotingPowerLedger,
    pub facets: FacetDirectory,
    pub events: Vec<DaoEvent>,
}

impl DaoState {
    pub fn from_settings(settings: &DaoSettings) -> Result<Self> {
        settings.validate()?;
        let modules = settings
            .modules
            .iter()
            .map(|m| {
                let module = ModuleState::new(&m.name, m.kind, m.decision_type, m.decision_data());
                (m.name.clone(), module)
            })
            .collect();
        Ok(Self {
            name: settings.name.clone(),
            address: settings.address,
            governance_token: settings.governance_token,
            addresses_provider: settings.addresses_provider,
            modules,
            archived: BTreeMap::new(),
            ledger: VotingPowerLedger::new(),
            facets: FacetDirectory::new(),
            events: Vec::new(),
        })
    }

    pub fn module(&self, name: &str) -> Result<&ModuleState> {
        self.modules
            .get(name)
            .ok_or_else(|| GovernanceError::ModuleNotFound(name.to_string()))
    }

    pub fn module_mut(&mut self, name: &str) -> Result<&mut ModuleState> {
        self.modules
            .get_mut(name)
            .ok_or_else(|| GovernanceError::ModuleNotFound(name.to_string()))
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }
}

pub struct Dao {
    pub(crate) state: DaoState,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) tokens: Box<dyn TokenTransfer>,
    pub(crate) positions: Box<dyn PositionValuation>,
    pub(crate) signers: Box<dyn SignerSet>,
    pub(crate) sandbox: Box<dyn ExecutionSandbox>,
    pub(crate) catalog: Box<dyn FacetCatalog>,
    pub(crate) migrations: Migrations,
    pub(crate) deciders: BTreeMap<DecisionType, Box<dyn Decider>>,
}

/// Assembles a `Dao` from settings and its collaborators.
pub struct DaoBuilder {
    settings: DaoSettings,
    clock: Box<dyn Clock>,
    tokens: Option<Box<dyn TokenTransfer>>,
    positions: Box<dyn PositionValuation>,
    signers: Box<dyn SignerSet>,
    sandbox: Option<Box<dyn ExecutionSandbox>>,
    catalog: Box<dyn FacetCatalog>,
    migrations: Migrations,
    deciders: BTreeMap<DecisionType, Box<dyn Decider>>,
}

impl DaoBuilder {
    pub fn new(settings: DaoSettings) -> Self {
        Self {
            settings,
            clock: Box::new(SystemClock),
            tokens: None,
            positions: Box::new(PositionBook::new()),
            signers: Box::new(SharedSignerSet::default()),
            sandbox: None,
            catalog: Box::new(InMemoryFacetCatalog::new()),
            migrations: Migrations::new(),
            deciders: default_deciders(),
        }
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn tokens(mut self, tokens: impl TokenTransfer + 'static) -> Self {
        self.tokens = Some(Box::new(tokens));
        self
    }

    pub fn positions(mut self, positions: impl PositionValuation + 'static) -> Self {
        self.positions = Box::new(positions);
        self
    }

    pub fn signers(mut self, signers: impl SignerSet + 'static) -> Self {
        self.signers = Box::new(signers);
        self
    }

    pub fn sandbox(mut self, sandbox: impl ExecutionSandbox + 'static) -> Self {
        self.sandbox = Some(Box::new(sandbox));
        self
    }

    pub fn catalog(mut self, catalog: impl FacetCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn migration<F>(mut self, name: impl Into<String>, migration: F) -> Self
    where
        F: Fn(&mut DaoState) -> Result<()> + Send + Sync + 'static,
    {
        self.migrations.register(name, migration);
        self
    }

    /// Binds `decider` to the decision type it reports, replacing the
    /// built-in one.
    pub fn decider(mut self, decider: Box<dyn Decider>) -> Self {
        self.deciders.insert(decider.decision_type(), decider);
        self
    }

    pub fn build(self) -> Result<Dao> {
        let state = DaoState::from_settings(&self.settings)?;
        let tokens = self
            .tokens
            .ok_or_else(|| GovernanceError::Settings("no token custodian configured".to_string()))?;
        let sandbox = self
            .sandbox
            .ok_or_else(|| GovernanceError::Settings("no execution sandbox configured".to_string()))?;
        for module in state.modules.values() {
            if !self.deciders.contains_key(&module.decision_type) {
                return Err(GovernanceError::DeciderNotRegistered(module.decision_type));
            }
        }
        log::info!(
            "🏛️  DAO {} at {} with modules {:?}",
            state.name,
            state.address,
            state.module_names()
        );
        Ok(Dao {
            state,
            clock: self.clock,
            tokens,
            positions: self.positions,
            signers: self.signers,
            sandbox,
            catalog: self.catalog,
            migrations: self.migrations,
            deciders: self.deciders,
        })
    }
}

impl Dao {
    pub fn builder(settings: DaoSettings) -> DaoBuilder {
        DaoBuilder::new(settings)
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn state(&self) -> &DaoState {
        &self.state
    }

    pub fn address(&self) -> Address {
        self.state.address
    }

    /// Runs `f` and restores the state if it fails.
    pub fn atomically<T>(&mut self, f: impl FnOnce(&mut Dao) -> Result<T>) -> Result<T> {
        let checkpoint = self.state.clone();
        let result = f(self);
        if let Err(e) = &result {
            log::debug!("reverting state: {}", e);
            self.state = checkpoint;
        }
        result
    }

    /// Proposal entry points of module `name`.
    pub fn module(&mut self, name: &str) -> Result<ModuleEngine<'_>> {
        self.state.module(name)?;
        Ok(ModuleEngine::new(self, name))
    }

    pub fn treasury(&mut self) -> Result<ModuleEngine<'_>> {
        self.module(config::TREASURY)
    }

    pub fn governance(&mut self) -> Result<ModuleEngine<'_>> {
        self.module(config::GOVERNANCE)
    }

    pub fn module_manager(&mut self) -> Result<ModuleEngine<'_>> {
        self.module(config::MODULE_MANAGER)
    }

    pub(crate) fn decider(&self, decision_type: DecisionType) -> Result<&dyn Decider> {
        self.deciders
            .get(&decision_type)
            .map(|d| d.as_ref())
            .ok_or(GovernanceError::DeciderNotRegistered(decision_type))
    }

    pub(crate) fn migrations(&self) -> &Migrations {
        &self.migrations
    }

    /// Registers a state migration after construction.
    pub fn register_migration<F>(&mut self, name: impl Into<String>, migration: F)
    where
        F: Fn(&mut DaoState) -> Result<()> + Send + Sync + 'static,
    {
        self.migrations.register(name, migration);
    }

    // Staking

    pub fn stake(&mut self, account: &Address, amount: Amount) -> Result<()> {
        self.atomically(|dao| {
            dao.state.ledger.stake(account, amount)?;
            let token = dao.state.governance_token;
            let vault = dao.state.address;
            dao.tokens
                .transfer(&token, account, &vault, amount)
                .map_err(|e| GovernanceError::InsufficientBalance(e.to_string()))?;
            dao.state.events.push(DaoEvent::Staked {
                account: *account,
                amount,
            });
            Ok(())
        })
    }

    pub fn unstake(&mut self, account: &Address, amount: Amount) -> Result<()> {
        self.atomically(|dao| {
            let now = dao.now();
            dao.state.ledger.unstake(account, amount, now)?;
            let token = dao.state.governance_token;
            let vault = dao.state.address;
            dao.tokens.transfer(&token, &vault, account, amount)?;
            dao.state.events.push(DaoEvent::Unstaked {
                account: *account,
                amount,
            });
            Ok(())
        })
    }

    /// Stakes a liquidity position. Positions holding none of the
    /// governance token are refused.
    pub fn stake_nft_position(&mut self, account: &Address, position: PositionId) -> Result<()> {
        self.atomically(|dao| {
            let value = dao
                .positions
                .value_of(position)
                .filter(|value| value.governance_token_amount > 0)
                .ok_or(GovernanceError::UnsupportedPosition(position))?;
            dao.state
                .ledger
                .stake_position(account, position, value.voting_power)?;
            let vault = dao.state.address;
            dao.tokens
                .transfer_position(account, &vault, position)
                .map_err(|e| GovernanceError::PositionTransferFailed(e.to_string()))?;
            dao.state.events.push(DaoEvent::PositionStaked {
                account: *account,
                position,
                power: value.voting_power,
            });
            Ok(())
        })
    }

    pub fn unstake_nft_position(&mut self, account: &Address, position: PositionId) -> Result<()> {
        self.atomically(|dao| {
            let now = dao.now();
            let power = dao.state.ledger.unstake_position(account, position, now)?;
            let vault = dao.state.address;
            dao.tokens
                .transfer_position(&vault, account, position)
                .map_err(|e| GovernanceError::PositionTransferFailed(e.to_string()))?;
            dao.state.events.push(DaoEvent::PositionUnstaked {
                account: *account,
                position,
                power,
            });
            Ok(())
        })
    }

    pub fn delegate(&mut self, delegator: &Address, delegatee: &Address) -> Result<()> {
        self.atomically(|dao| {
            let now = dao.now();
            dao.state.ledger.delegate(delegator, delegatee, now)?;
            let amount = dao.state.ledger.delegated_amount(delegator);
            dao.state.events.push(DaoEvent::Delegated {
                delegator: *delegator,
                delegatee: *delegatee,
                amount,
            });
            Ok(())
        })
    }

    pub fn undelegate(&mut self, delegator: &Address) -> Result<()> {
        self.atomically(|dao| {
            let now = dao.now();
            let delegatee = dao
                .state
                .ledger
                .delegatee(delegator)
                .ok_or(GovernanceError::NotDelegating(*delegator))?;
            let amount = dao.state.ledger.undelegate(delegator, now)?;
            dao.state.events.push(DaoEvent::Undelegated {
                delegator: *delegator,
                delegatee,
                amount,
            });
            Ok(())
        })
    }

    // Voting power queries

    pub fn ledger(&self) -> &VotingPowerLedger {
        &self.state.ledger
    }

    pub fn voting_power(&self, account: &Address) -> Amount {
        self.state.ledger.voting_power(account)
    }

    pub fn total_amount_of_voting_power(&self) -> Amount {
        self.state.ledger.total_amount_of_voting_power()
    }

    pub fn max_amount_of_voting_power(&self) -> Amount {
        self.state.ledger.max_amount_of_voting_power()
    }

    pub fn staked_balance(&self, account: &Address) -> Amount {
        self.state.ledger.staked_balance(account)
    }

    pub fn delegatee(&self, account: &Address) -> Option<Address> {
        self.state.ledger.delegatee(account)
    }

    pub fn delegated_amount(&self, account: &Address) -> Amount {
        self.state.ledger.delegated_amount(account)
    }

    pub fn timestamp_to_unstake(&self, account: &Address) -> Timestamp {
        self.state.ledger.unstake_lock_until(account)
    }

    // Module and proposal queries

    pub fn module_names(&self) -> Vec<String> {
        self.state.module_names()
    }

    pub fn module_decision_type(&self, module: &str) -> Result<DecisionType> {
        Ok(self.state.module(module)?.decision_type)
    }

    pub fn module_decision_data(&self, module: &str) -> Result<ModuleDecisionData> {
        Ok(self.state.module(module)?.decision_data)
    }

    pub fn proposal(&self, module: &str, id: u64) -> Result<&ProposalRecord> {
        self.state.module(module)?.proposals.get(id)
    }

    pub fn proposals_count(&self, module: &str) -> Result<u64> {
        Ok(self.state.module(module)?.proposals.count())
    }

    /// Active proposals the module's current decider can act on.
    pub fn active_proposals(&self, module: &str) -> Result<Vec<u64>> {
        let module = self.state.module(module)?;
        Ok(module.proposals.list_active(module.decision_type))
    }

    pub fn accepted_proposals(&self, module: &str) -> Result<Vec<u64>> {
        let module = self.state.module(module)?;
        Ok(module.proposals.list_accepted(module.decision_type))
    }

    pub fn has_voted(&self, module: &str, id: u64, account: &Address) -> Result<bool> {
        Ok(self.proposal(module, id)?.tally.has_decided(account))
    }

    // Facets

    pub fn addresses_provider(&self) -> Address {
        self.state.addresses_provider
    }

    pub fn facet_address(&self, selector: &Selector) -> Option<Address> {
        self.state.facets.facet_address(selector)
    }

    pub fn facet_selectors(&self, facet: &Address) -> BTreeSet<Selector> {
        self.state.facets.facet_selectors(facet)
    }

    // Events and snapshots

    pub fn events(&self) -> &[DaoEvent] {
        &self.state.events
    }

    pub fn take_events(&mut self) -> Vec<DaoEvent> {
        std::mem::take(&mut self.state.events)
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.state.to_json()?;
        std::fs::write(path.as_ref(), json).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        log::info!("💾 DAO state saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn restore_snapshot(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        let state = DaoState::from_json(&json)?;
        for module in state.modules.values() {
            self.decider(module.decision_type)?;
        }
        self.state = state;
        log::info!("DAO state restored from {}", path.as_ref().display());
        Ok(())
    }
}

impl std::fmt::Debug for Dao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("state", &self.state)
            .field("migrations", &self.migrations)
            .field("deciders", &self.deciders.keys().collect::<Vec<_>>())
            .finish()
    }
}
