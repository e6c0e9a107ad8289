//! Per-module proposal registry
//!
//! Ids start at 1 and grow monotonically within a module. Records stay in
//! `proposals` forever; `active` and `accepted` are the queryable sets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::decision::DecisionType;
use crate::error::{GovernanceError, Result};
use crate::proposal::ProposalRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRegistry {
    module: String,
    counter: u64,
    proposals: BTreeMap<u64, ProposalRecord>,
    active: BTreeSet<u64>,
    accepted: BTreeSet<u64>,
}

impl ProposalRegistry {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Id the next created proposal receives.
    pub fn next_id(&self) -> u64 {
        self.counter + 1
    }

    /// Stores `record` under the next id and marks it active.
    pub fn create(&mut self, mut record: ProposalRecord) -> u64 {
        self.counter += 1;
        let id = self.counter;
        record.id = id;
        record.module = self.module.clone();
        self.proposals.insert(id, record);
        self.active.insert(id);
        id
    }

    pub fn get(&self, id: u64) -> Result<&ProposalRecord> {
        self.proposals.get(&id).ok_or_else(|| self.not_found(id))
    }

    pub fn get_mut(&mut self, id: u64) -> Result<&mut ProposalRecord> {
        let error = self.not_found(id);
        self.proposals.get_mut(&id).ok_or(error)
    }

    pub fn remove_from_active(&mut self, id: u64) {
        self.active.remove(&id);
    }

    pub fn mark_accepted(&mut self, id: u64) {
        self.active.remove(&id);
        self.accepted.insert(id);
    }

    pub fn remove_from_accepted(&mut self, id: u64) {
        self.accepted.remove(&id);
    }

    /// Active ids created under `decided_by`. Proposals of an earlier
    /// decider stay hidden until the module switches back to it.
    pub fn list_active(&self, decided_by: DecisionType) -> Vec<u64> {
        self.bound_to(&self.active, decided_by)
    }

    pub fn list_accepted(&self, decided_by: DecisionType) -> Vec<u64> {
        self.bound_to(&self.accepted, decided_by)
    }

    fn bound_to(&self, ids: &BTreeSet<u64>, decided_by: DecisionType) -> Vec<u64> {
        ids.iter()
            .copied()
            .filter(|id| {
                self.proposals
                    .get(id)
                    .is_some_and(|record| record.decided_by == decided_by)
            })
            .collect()
    }

    /// Number of proposals ever created in this module.
    pub fn count(&self) -> u64 {
        self.counter
    }

    fn not_found(&self, id: u64) -> GovernanceError {
        GovernanceError::ProposalNotFound {
            module: self.module.clone(),
            id,
        }
    }
}
