//! Commons DAO Core Library
//!
//! Primitive types, the ledger clock and the external collaborators the
//! decision engine talks to: token custody, position valuation, the signer
//! set, the execution sandbox and the facet catalog.

pub mod clock;
pub mod error;
pub mod interfaces;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
pub use interfaces::{
    ExecutionSandbox, FacetCatalog, InMemoryFacetCatalog, PositionBook, PositionValuation,
    PositionValue, SharedSignerSet, SignerSet, TokenTransfer,
};
pub use types::{Address, Amount, FacetSpec, OutboundCall, PositionId, Selector, Timestamp};
