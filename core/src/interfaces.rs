//! External collaborators of the decision engine
//!
//! The engine never moves tokens, prices positions, verifies multisig
//! signatures or performs outbound calls itself. It reaches those through
//! the traits below. The in-memory implementations are shared handles:
//! clones see the same data, so a caller can keep a handle after giving one
//! to the DAO.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Address, Amount, FacetSpec, OutboundCall, PositionId};

/// Custody of the governance token and of liquidity-position NFTs.
pub trait TokenTransfer {
    fn transfer(&mut self, token: &Address, from: &Address, to: &Address, amount: Amount)
        -> Result<()>;

    fn transfer_position(&mut self, from: &Address, to: &Address, position: PositionId)
        -> Result<()>;
}

/// Valuation of a liquidity position at stake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionValue {
    /// Governance tokens held by the position.
    pub governance_token_amount: Amount,
    /// Paired-asset tokens held by the position.
    pub paired_token_amount: Amount,
    /// Voting power the position is worth.
    pub voting_power: Amount,
}

pub trait PositionValuation {
    fn value_of(&self, position: PositionId) -> Option<PositionValue>;
}

/// Multisig signer set (Gnosis-style safe).
pub trait SignerSet {
    /// Address of the safe itself. A call coming from the safe has already
    /// gathered its owners' quorum off-ledger.
    fn safe(&self) -> Address;

    fn owners(&self) -> BTreeSet<Address>;

    /// m in m-of-n.
    fn threshold(&self) -> u64;

    fn is_owner(&self, account: &Address) -> bool {
        self.owners().contains(account)
    }
}

/// Outbound calls made when a proposal executes. A failed call must leave
/// no effect behind.
pub trait ExecutionSandbox {
    fn call(&mut self, caller: &Address, call: &OutboundCall) -> Result<()>;
}

/// Addresses-provider lookup: which facets a provider publishes.
pub trait FacetCatalog {
    fn facet(&self, provider: &Address, facet_address: &Address) -> Option<FacetSpec>;
}

/// Shared table of position valuations.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: Arc<RwLock<BTreeMap<PositionId, PositionValue>>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, position: PositionId, value: PositionValue) {
        self.positions.write().insert(position, value);
    }

    pub fn remove(&self, position: PositionId) {
        self.positions.write().remove(&position);
    }
}

impl PositionValuation for PositionBook {
    fn value_of(&self, position: PositionId) -> Option<PositionValue> {
        self.positions.read().get(&position).copied()
    }
}

#[derive(Debug, Clone, Default)]
struct SignerSetInner {
    safe: Address,
    owners: BTreeSet<Address>,
    threshold: u64,
}

/// Shared signer set whose owners and threshold can be changed at runtime.
#[derive(Debug, Clone, Default)]
pub struct SharedSignerSet {
    inner: Arc<RwLock<SignerSetInner>>,
}

impl SharedSignerSet {
    pub fn new(safe: Address, owners: impl IntoIterator<Item = Address>, threshold: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SignerSetInner {
                safe,
                owners: owners.into_iter().collect(),
                threshold,
            })),
        }
    }

    pub fn set_owners(&self, owners: impl IntoIterator<Item = Address>) {
        self.inner.write().owners = owners.into_iter().collect();
    }

    pub fn set_threshold(&self, threshold: u64) {
        self.inner.write().threshold = threshold;
    }
}

impl SignerSet for SharedSignerSet {
    fn safe(&self) -> Address {
        self.inner.read().safe
    }

    fn owners(&self) -> BTreeSet<Address> {
        self.inner.read().owners.clone()
    }

    fn threshold(&self) -> u64 {
        self.inner.read().threshold
    }

    fn is_owner(&self, account: &Address) -> bool {
        self.inner.read().owners.contains(account)
    }
}

/// Shared facet catalog keyed by provider address.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFacetCatalog {
    providers: Arc<RwLock<BTreeMap<Address, BTreeMap<Address, FacetSpec>>>>,
}

impl InMemoryFacetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `facet` under `provider`.
    pub fn publish(&self, provider: Address, facet: FacetSpec) {
        self.providers
            .write()
            .entry(provider)
            .or_default()
            .insert(facet.address, facet);
    }
}

impl FacetCatalog for InMemoryFacetCatalog {
    fn facet(&self, provider: &Address, facet_address: &Address) -> Option<FacetSpec> {
        self.providers
            .read()
            .get(provider)
            .and_then(|facets| facets.get(facet_address))
            .cloned()
    }
}
