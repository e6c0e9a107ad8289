#![allow(dead_code)]

use dao_core::{
    Address, Amount, InMemoryFacetCatalog, ManualClock, PositionBook, SharedSignerSet,
};
use dao_governance::{Dao, DaoSettings};
use dao_treasury::TreasuryVault;

pub const START: u64 = 1_700_000_000;
pub const WEEK: u64 = 7 * 86_400;
pub const DAY: u64 = 86_400;

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn safe() -> Address {
    addr(0xee)
}

pub fn owner(n: u8) -> Address {
    addr(0xa0 + n)
}

pub struct Harness {
    pub dao: Dao,
    pub clock: ManualClock,
    pub vault: TreasuryVault,
    pub signers: SharedSignerSet,
    pub positions: PositionBook,
    pub catalog: InMemoryFacetCatalog,
}

impl Harness {
    /// Default DAO with a 3-of-5 signer set and the clock at `START`.
    pub fn new() -> Self {
        Self::with_settings(DaoSettings::default())
    }

    pub fn with_settings(settings: DaoSettings) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let clock = ManualClock::new(START);
        let vault = TreasuryVault::new();
        let signers = SharedSignerSet::new(safe(), (1..=5).map(owner), 3);
        let positions = PositionBook::new();
        let catalog = InMemoryFacetCatalog::new();

        let dao = Dao::builder(settings)
            .clock(clock.clone())
            .tokens(vault.clone())
            .sandbox(vault.clone())
            .signers(signers.clone())
            .positions(positions.clone())
            .catalog(catalog.clone())
            .build()
            .unwrap();

        Self {
            dao,
            clock,
            vault,
            signers,
            positions,
            catalog,
        }
    }

    pub fn governance_token(&self) -> Address {
        self.dao.state().governance_token
    }

    /// Mints governance tokens to `account` and stakes them.
    pub fn fund_and_stake(&mut self, account: &Address, amount: Amount) {
        let token = self.governance_token();
        self.vault.mint(&token, account, amount);
        self.dao.stake(account, amount).unwrap();
    }
}
