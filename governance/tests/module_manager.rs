//! Signer-decided proposals and self-modification of the DAO

mod common;

use common::*;
use dao_core::{Address, FacetSpec, OutboundCall, Selector};
use dao_governance::{
    DaoEvent, DecisionData, DecisionType, ExecutionOutcome, FacetCut, GovernanceError,
    ModuleDecisionData, ModuleKind, ModuleManagerAction, ProposalAction, ProposalStatus,
    Settlement, SignersDecisionData,
};

const GRANT: &str = "grant(address,uint256)";
const REVOKE: &str = "revoke(address)";
const PAUSE: &str = "pause()";

fn manage(action: ModuleManagerAction) -> ProposalAction {
    ProposalAction::ModuleManager(action)
}

fn signers_data() -> ModuleDecisionData {
    ModuleDecisionData {
        voting_power: None,
        signers: Some(SignersDecisionData::default()),
    }
}

fn add_grants(facets: Vec<Address>) -> ProposalAction {
    add_named("grants", facets)
}

fn add_named(name: &str, facets: Vec<Address>) -> ProposalAction {
    manage(ModuleManagerAction::AddModule {
        name: name.to_string(),
        kind: ModuleKind::Custom,
        decision_type: DecisionType::Signers,
        decision_data: signers_data(),
        facets,
        migration: None,
    })
}

fn grants_facet(address: u8, signatures: &[&str]) -> FacetSpec {
    FacetSpec::from_signatures("GrantsFacet", addr(address), signatures)
}

#[test]
fn test_three_of_five_signers() {
    let mut h = Harness::new();
    let provider = addr(0x77);
    let change = manage(ModuleManagerAction::ChangeAddressesProvider { provider });

    let mut manager = h.dao.module_manager().unwrap();
    let id = manager.create_proposal(&owner(1), change).unwrap();
    assert_eq!(
        manager.accept_or_reject_proposal(id),
        Err(GovernanceError::ThresholdNotReached {
            module: "moduleManager".to_string(),
            id,
            current: 1,
            required: 3,
        })
    );

    manager.decide_on_proposal(id, &owner(2), true).unwrap();
    assert!(!manager.is_threshold_reached(id).unwrap());
    manager.decide_on_proposal(id, &owner(3), true).unwrap();
    assert!(manager.is_threshold_reached(id).unwrap());
    assert_eq!(manager.tally(id).unwrap(), (3, 0));

    // no voting period and no delay for signer decisions
    assert_eq!(manager.accept_or_reject_proposal(id).unwrap(), Settlement::Accepted);
    assert_eq!(manager.execute_proposal(id).unwrap(), ExecutionOutcome::Executed);
    assert_eq!(h.dao.addresses_provider(), provider);

    let decided = h
        .dao
        .events()
        .iter()
        .filter(|e| matches!(e, DaoEvent::Decided { .. }))
        .count();
    assert_eq!(decided, 3);
    assert!(h
        .dao
        .events()
        .contains(&DaoEvent::AddressesProviderChanged { provider }));
}

#[test]
fn test_signers_reject_once_quorum_is_out_of_reach() {
    let mut h = Harness::new();
    let change = manage(ModuleManagerAction::ChangeAddressesProvider { provider: addr(0x77) });

    let mut manager = h.dao.module_manager().unwrap();
    let id = manager.create_proposal(&owner(1), change).unwrap();
    manager.decide_on_proposal(id, &owner(2), false).unwrap();
    manager.decide_on_proposal(id, &owner(3), false).unwrap();
    assert!(matches!(
        manager.accept_or_reject_proposal(id),
        Err(GovernanceError::ThresholdNotReached { .. })
    ));

    manager.decide_on_proposal(id, &owner(4), false).unwrap();
    assert_eq!(manager.accept_or_reject_proposal(id).unwrap(), Settlement::Rejected);
    assert_eq!(manager.proposal(id).unwrap().status, ProposalStatus::Rejected);
    assert_eq!(h.dao.addresses_provider(), Address::ZERO);
}

#[test]
fn test_only_signers_take_part() {
    let mut h = Harness::new();
    let change = manage(ModuleManagerAction::ChangeAddressesProvider { provider: addr(0x77) });

    let mut manager = h.dao.module_manager().unwrap();
    assert_eq!(
        manager.create_proposal(&addr(1), change.clone()),
        Err(GovernanceError::NotASigner(addr(1)))
    );
    assert_eq!(manager.proposals_count().unwrap(), 0);

    let id = manager.create_proposal(&owner(1), change).unwrap();
    assert_eq!(
        manager.decide_on_proposal(id, &addr(1), true),
        Err(GovernanceError::NotASigner(addr(1)))
    );
    assert!(matches!(
        manager.decide_on_proposal(id, &owner(1), true),
        Err(GovernanceError::AlreadyDecided { .. })
    ));

    // removed owners no longer count
    manager.decide_on_proposal(id, &owner(2), true).unwrap();
    manager.decide_on_proposal(id, &owner(3), true).unwrap();
    h.signers.set_owners([owner(1), owner(2), owner(4), owner(5)]);
    let mut manager = h.dao.module_manager().unwrap();
    assert!(!manager.is_threshold_reached(id).unwrap());
    assert!(matches!(
        manager.accept_or_reject_proposal(id),
        Err(GovernanceError::ThresholdNotReached { current: 2, .. })
    ));
}

#[test]
fn test_safe_batched_execution() {
    let mut h = Harness::new();

    let mut manager = h.dao.module_manager().unwrap();
    let (id, outcome) = manager.batched_execution(&safe(), add_grants(vec![])).unwrap();
    assert_eq!(id, 1);
    assert_eq!(outcome, ExecutionOutcome::Executed);
    assert_eq!(manager.proposal(id).unwrap().status, ProposalStatus::Executed);
    // the safe's decision shows up as one yes
    assert_eq!(manager.tally(id).unwrap(), (1, 0));
    assert!(h.dao.module_names().contains(&"grants".to_string()));
    assert_eq!(
        h.dao.module_decision_type("grants").unwrap(),
        DecisionType::Signers
    );
    assert!(h.dao.events().contains(&DaoEvent::ModuleAdded {
        module: "grants".to_string(),
        decision_type: DecisionType::Signers,
    }));

    // a single owner cannot settle alone: nothing is kept
    let mut manager = h.dao.module_manager().unwrap();
    assert!(matches!(
        manager.batched_execution(&owner(1), add_named("audits", vec![])),
        Err(GovernanceError::ThresholdNotReached { .. })
    ));
    assert_eq!(manager.proposals_count().unwrap(), 1);
    assert!(!h.dao.module_names().contains(&"audits".to_string()));

    let payout = ProposalAction::Call(OutboundCall::native_transfer(addr(9), 1));
    assert_eq!(
        h.dao.treasury().unwrap().batched_execution(&safe(), payout),
        Err(GovernanceError::ActionNotSupported("treasury".to_string()))
    );
}

#[test]
fn test_module_name_limit() {
    let mut h = Harness::new();
    let exact = "a".repeat(31);
    let long = "a".repeat(32);

    let mut manager = h.dao.module_manager().unwrap();
    let (_, outcome) = manager
        .batched_execution(&safe(), add_named(&long, vec![]))
        .unwrap();
    assert!(matches!(outcome, ExecutionOutcome::ExecutedWithRevert(_)));
    let (_, outcome) = manager
        .batched_execution(&safe(), add_named(&exact, vec![]))
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Executed);

    assert!(h.dao.module_names().contains(&exact));
    assert!(!h.dao.module_names().contains(&long));
}

#[test]
fn test_module_manager_is_protected() {
    let mut h = Harness::new();
    let remove = manage(ModuleManagerAction::RemoveModule {
        name: "moduleManager".to_string(),
    });
    let (id, outcome) = h
        .dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), remove)
        .unwrap();
    assert!(matches!(outcome, ExecutionOutcome::ExecutedWithRevert(_)));
    assert_eq!(
        h.dao.proposal("moduleManager", id).unwrap().status,
        ProposalStatus::ExecutedWithRevert
    );
    assert!(h.dao.module_names().contains(&"moduleManager".to_string()));
}

#[test]
fn test_removed_module_resumes_proposal_ids() {
    let mut h = Harness::new();
    let dao_address = h.dao.address();
    h.vault.deposit_native(&dao_address, 100);
    let payout = || ProposalAction::Call(OutboundCall::native_transfer(addr(9), 10));

    h.dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), add_grants(vec![]))
        .unwrap();
    let (first, outcome) = h
        .dao
        .module("grants")
        .unwrap()
        .batched_execution(&safe(), payout())
        .unwrap();
    assert_eq!(first, 1);
    assert!(outcome.is_success());

    let remove = manage(ModuleManagerAction::RemoveModule {
        name: "grants".to_string(),
    });
    h.dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), remove)
        .unwrap();
    assert!(matches!(
        h.dao.module("grants"),
        Err(GovernanceError::ModuleNotFound(_))
    ));

    h.dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), add_grants(vec![]))
        .unwrap();
    let (second, _) = h
        .dao
        .module("grants")
        .unwrap()
        .batched_execution(&safe(), payout())
        .unwrap();
    assert_eq!(second, 2);
    assert_eq!(h.vault.native_balance(&addr(9)), 20);
}

#[test]
fn test_decider_switch_strands_old_proposals() {
    let mut h = Harness::new();
    let dao_address = h.dao.address();
    h.vault.deposit_native(&dao_address, 100);
    h.fund_and_stake(&addr(1), 1_000);

    let payout = ProposalAction::Call(OutboundCall::native_transfer(addr(9), 10));
    let id = h
        .dao
        .treasury()
        .unwrap()
        .create_proposal(&addr(1), payout.clone())
        .unwrap();
    h.clock.advance(WEEK);
    assert_eq!(
        h.dao.treasury().unwrap().accept_or_reject_proposal(id).unwrap(),
        Settlement::Accepted
    );
    let pending = h
        .dao
        .treasury()
        .unwrap()
        .create_proposal(&addr(1), payout.clone())
        .unwrap();

    // the governance module has no signers data to fall back on
    let unconfigured = manage(ModuleManagerAction::SwitchModuleDecider {
        module: "governance".to_string(),
        decision_type: DecisionType::Signers,
        decision_data: None,
    });
    assert!(matches!(
        h.dao
            .module_manager()
            .unwrap()
            .batched_execution(&safe(), unconfigured),
        Err(GovernanceError::DecisionDataNotConfigured { .. })
    ));

    let switch = manage(ModuleManagerAction::SwitchModuleDecider {
        module: "treasury".to_string(),
        decision_type: DecisionType::Signers,
        decision_data: Some(DecisionData::Signers(SignersDecisionData::default())),
    });
    let (_, outcome) = h
        .dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), switch)
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Executed);
    assert_eq!(
        h.dao.module_decision_type("treasury").unwrap(),
        DecisionType::Signers
    );
    // the voting power data is kept alongside
    assert!(h
        .dao
        .module_decision_data("treasury")
        .unwrap()
        .voting_power
        .is_some());

    // proposals of the old decider drop out of the queryable sets
    assert!(h.dao.active_proposals("treasury").unwrap().is_empty());
    assert!(h.dao.accepted_proposals("treasury").unwrap().is_empty());

    h.clock.advance(DAY);
    assert!(matches!(
        h.dao.treasury().unwrap().execute_proposal(id),
        Err(GovernanceError::ProposalNotExecutable { .. })
    ));
    assert_eq!(
        h.dao
            .treasury()
            .unwrap()
            .decide_on_proposal(pending, &owner(1), true),
        Err(GovernanceError::ProposalNotExecutable {
            module: "treasury".to_string(),
            id: pending,
        })
    );
    assert!(matches!(
        h.dao.treasury().unwrap().accept_or_reject_proposal(pending),
        Err(GovernanceError::ProposalNotExecutable { .. })
    ));
    assert_eq!(
        h.dao.proposal("treasury", pending).unwrap().status,
        ProposalStatus::Active
    );

    let (second, outcome) = h
        .dao
        .treasury()
        .unwrap()
        .batched_execution(&safe(), payout)
        .unwrap();
    assert_eq!(second, 3);
    assert!(outcome.is_success());
    assert_eq!(h.vault.native_balance(&addr(9)), 10);
}

#[test]
fn test_facet_upgrade_keeps_selector_coverage() {
    let mut h = Harness::new();
    let provider = Address::ZERO;
    h.catalog.publish(provider, grants_facet(0xf1, &[GRANT, REVOKE]));
    h.catalog.publish(provider, grants_facet(0xf2, &[GRANT, REVOKE, PAUSE]));
    h.catalog.publish(provider, grants_facet(0xf3, &[GRANT]));
    let grant = Selector::from_signature(GRANT);

    let mut manager = h.dao.module_manager().unwrap();
    manager
        .batched_execution(&safe(), add_grants(vec![addr(0xf1)]))
        .unwrap();
    assert_eq!(h.dao.facet_address(&grant), Some(addr(0xf1)));
    assert_eq!(h.dao.facet_selectors(&addr(0xf1)).len(), 2);

    let upgrade = |facet: u8| {
        manage(ModuleManagerAction::UpdateFacet {
            facet_address: addr(facet),
        })
    };
    let mut manager = h.dao.module_manager().unwrap();
    let (_, outcome) = manager.batched_execution(&safe(), upgrade(0xf2)).unwrap();
    assert_eq!(outcome, ExecutionOutcome::Executed);
    assert_eq!(h.dao.facet_address(&grant), Some(addr(0xf2)));
    assert_eq!(
        h.dao.facet_address(&Selector::from_signature(PAUSE)),
        Some(addr(0xf2))
    );
    assert!(h.dao.facet_selectors(&addr(0xf1)).is_empty());

    // dropping a selector is refused
    let mut manager = h.dao.module_manager().unwrap();
    let (_, outcome) = manager.batched_execution(&safe(), upgrade(0xf3)).unwrap();
    assert!(matches!(outcome, ExecutionOutcome::ExecutedWithRevert(_)));
    let (_, outcome) = manager.batched_execution(&safe(), upgrade(0x99)).unwrap();
    assert!(matches!(outcome, ExecutionOutcome::ExecutedWithRevert(_)));
    assert_eq!(h.dao.facet_address(&grant), Some(addr(0xf2)));
}

#[test]
fn test_facets_come_from_the_current_provider() {
    let mut h = Harness::new();
    let provider = addr(0x77);
    h.catalog.publish(provider, grants_facet(0xf1, &[GRANT]));

    let mut manager = h.dao.module_manager().unwrap();
    let (_, outcome) = manager
        .batched_execution(&safe(), add_grants(vec![addr(0xf1)]))
        .unwrap();
    assert!(matches!(outcome, ExecutionOutcome::ExecutedWithRevert(_)));
    assert!(!h.dao.module_names().contains(&"grants".to_string()));

    let mut manager = h.dao.module_manager().unwrap();
    manager
        .batched_execution(
            &safe(),
            manage(ModuleManagerAction::ChangeAddressesProvider { provider }),
        )
        .unwrap();
    let (_, outcome) = manager
        .batched_execution(&safe(), add_grants(vec![addr(0xf1)]))
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Executed);
    assert_eq!(
        h.dao.facet_address(&Selector::from_signature(GRANT)),
        Some(addr(0xf1))
    );
}

#[test]
fn test_upgrade_with_state_migration() {
    let mut h = Harness::new();
    h.catalog
        .publish(Address::ZERO, grants_facet(0xf1, &[GRANT]));
    h.catalog
        .publish(Address::ZERO, grants_facet(0xf2, &[GRANT, PAUSE]));
    h.dao.register_migration("rename", |state| {
        state.name = "Commons DAO v2".to_string();
        Ok(())
    });
    h.dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), add_grants(vec![addr(0xf1)]))
        .unwrap();

    h.dao.register_migration("dropLegacy", |state| {
        state.module_mut("legacy")?.facets.clear();
        Ok(())
    });

    // an unregistered migration never becomes a proposal
    let missing = manage(ModuleManagerAction::UpdateFacetAndState {
        facet_address: addr(0xf2),
        migration: "missing".to_string(),
    });
    assert_eq!(
        h.dao
            .module_manager()
            .unwrap()
            .batched_execution(&safe(), missing),
        Err(GovernanceError::MigrationNotFound("missing".to_string()))
    );
    assert_eq!(h.dao.module_manager().unwrap().proposals_count().unwrap(), 1);

    let broken = manage(ModuleManagerAction::UpdateFacetAndState {
        facet_address: addr(0xf2),
        migration: "dropLegacy".to_string(),
    });
    let (_, outcome) = h
        .dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), broken)
        .unwrap();
    assert!(matches!(outcome, ExecutionOutcome::ExecutedWithRevert(_)));
    // the facet replacement was rolled back with the failed migration
    assert_eq!(
        h.dao.facet_address(&Selector::from_signature(GRANT)),
        Some(addr(0xf1))
    );

    let upgrade = manage(ModuleManagerAction::UpdateFacetAndState {
        facet_address: addr(0xf2),
        migration: "rename".to_string(),
    });
    let (_, outcome) = h
        .dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), upgrade)
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Executed);
    assert_eq!(h.dao.state().name, "Commons DAO v2");
    assert_eq!(
        h.dao.facet_address(&Selector::from_signature(GRANT)),
        Some(addr(0xf2))
    );
}

#[test]
fn test_diamond_cut_is_all_or_nothing() {
    let mut h = Harness::new();
    let audit = FacetSpec::from_signatures("AuditFacet", addr(0xa9), &["audit()"]);

    let cut = manage(ModuleManagerAction::DiamondCut {
        cuts: vec![
            FacetCut::Add(audit.clone()),
            FacetCut::Remove {
                name: "NoSuchFacet".to_string(),
            },
        ],
        migration: None,
    });
    let (_, outcome) = h
        .dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), cut)
        .unwrap();
    assert!(matches!(outcome, ExecutionOutcome::ExecutedWithRevert(_)));
    assert_eq!(h.dao.facet_address(&Selector::from_signature("audit()")), None);

    let cut = manage(ModuleManagerAction::DiamondCut {
        cuts: vec![FacetCut::Add(audit)],
        migration: None,
    });
    let (_, outcome) = h
        .dao
        .module_manager()
        .unwrap()
        .batched_execution(&safe(), cut)
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Executed);
    assert_eq!(
        h.dao.facet_address(&Selector::from_signature("audit()")),
        Some(addr(0xa9))
    );
}
