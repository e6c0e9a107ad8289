//! Module manager actions
//!
//! Self-modification of the DAO: the module table, decider bindings, the
//! facet directory and the addresses provider. These actions go through the
//! same proposal lifecycle as any treasury transfer; they are only applied
//! when an accepted module-manager proposal executes.

use dao_core::{Address, FacetCatalog, FacetSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config;
use crate::dao::DaoState;
use crate::decision::{DecisionData, DecisionType, ModuleDecisionData};
use crate::error::{GovernanceError, Result};
use crate::events::DaoEvent;
use crate::facets::FacetCut;
use crate::module::{ModuleKind, ModuleState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleManagerAction {
    AddModule {
        name: String,
        kind: ModuleKind,
        decision_type: DecisionType,
        decision_data: ModuleDecisionData,
        /// Facet addresses published by the current addresses provider.
        facets: Vec<Address>,
        migration: Option<String>,
    },
    RemoveModule {
        name: String,
    },
    SwitchModuleDecider {
        module: String,
        decision_type: DecisionType,
        /// Populates the new binding in the same step.
        decision_data: Option<DecisionData>,
    },
    UpdateFacet {
        facet_address: Address,
    },
    UpdateFacetAndState {
        facet_address: Address,
        migration: String,
    },
    ChangeAddressesProvider {
        provider: Address,
    },
    DiamondCut {
        cuts: Vec<FacetCut>,
        migration: Option<String>,
    },
}

pub type StateMigration = Box<dyn Fn(&mut DaoState) -> Result<()> + Send + Sync>;

/// Named state migrations an upgrade may run.
#[derive(Default)]
pub struct Migrations {
    migrations: BTreeMap<String, StateMigration>,
}

impl Migrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, migration: F)
    where
        F: Fn(&mut DaoState) -> Result<()> + Send + Sync + 'static,
    {
        self.migrations.insert(name.into(), Box::new(migration));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.migrations.contains_key(name)
    }

    pub fn run(&self, name: &str, state: &mut DaoState) -> Result<()> {
        let migration = self
            .migrations
            .get(name)
            .ok_or_else(|| GovernanceError::MigrationNotFound(name.to_string()))?;
        migration(state).map_err(|e| GovernanceError::MigrationFailed {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        log::info!("state migration {} applied", name);
        Ok(())
    }
}

impl std::fmt::Debug for Migrations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.migrations.keys()).finish()
    }
}

/// Collaborators an action needs besides the DAO state.
pub struct ActionEnv<'a> {
    pub catalog: &'a dyn FacetCatalog,
    pub migrations: &'a Migrations,
}

impl ModuleManagerAction {
    pub fn name(&self) -> &'static str {
        match self {
            ModuleManagerAction::AddModule { .. } => "addModule",
            ModuleManagerAction::RemoveModule { .. } => "removeModule",
            ModuleManagerAction::SwitchModuleDecider { .. } => "switchModuleDecider",
            ModuleManagerAction::UpdateFacet { .. } => "updateFacet",
            ModuleManagerAction::UpdateFacetAndState { .. } => "updateFacetAndState",
            ModuleManagerAction::ChangeAddressesProvider { .. } => "changeAddressesProvider",
            ModuleManagerAction::DiamondCut { .. } => "diamondCut",
        }
    }

    /// Checks run when the proposal is created. A decider switch that
    /// would bind a module to unconfigured decision data, or an upgrade
    /// naming an unregistered migration, is refused here already.
    pub fn precheck(&self, state: &DaoState, migrations: &Migrations) -> Result<()> {
        if let Some(name) = self.migration() {
            if !migrations.contains(name) {
                return Err(GovernanceError::MigrationNotFound(name.to_string()));
            }
        }
        match self {
            ModuleManagerAction::AddModule { decision_data, .. } => decision_data.validate(),
            ModuleManagerAction::SwitchModuleDecider {
                module,
                decision_type,
                decision_data,
            } => {
                let target = state.module(module)?;
                check_switch(target, *decision_type, decision_data.as_ref()).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    fn migration(&self) -> Option<&str> {
        match self {
            ModuleManagerAction::AddModule { migration, .. }
            | ModuleManagerAction::DiamondCut { migration, .. } => migration.as_deref(),
            ModuleManagerAction::UpdateFacetAndState { migration, .. } => Some(migration),
            _ => None,
        }
    }

    pub fn apply(&self, state: &mut DaoState, env: &ActionEnv<'_>) -> Result<()> {
        match self {
            ModuleManagerAction::AddModule {
                name,
                kind,
                decision_type,
                decision_data,
                facets,
                migration,
            } => {
                add_module(state, env, name, *kind, *decision_type, *decision_data, facets)?;
                if let Some(migration) = migration {
                    env.migrations.run(migration, state)?;
                }
            }
            ModuleManagerAction::RemoveModule { name } => remove_module(state, name)?,
            ModuleManagerAction::SwitchModuleDecider {
                module,
                decision_type,
                decision_data,
            } => {
                let data = check_switch(state.module(module)?, *decision_type, decision_data.as_ref())?;
                let target = state.module_mut(module)?;
                target.decision_data.set(data);
                target.decision_type = *decision_type;
                log::info!("🔀 module {} now decided by {}", module, decision_type);
                if decision_data.is_some() {
                    state.events.push(DaoEvent::DecisionDataChanged {
                        module: module.clone(),
                        decision_type: *decision_type,
                    });
                }
                state.events.push(DaoEvent::ModuleDeciderSwitched {
                    module: module.clone(),
                    decision_type: *decision_type,
                });
            }
            ModuleManagerAction::UpdateFacet { facet_address } => {
                update_facet(state, env, facet_address)?;
            }
            ModuleManagerAction::UpdateFacetAndState {
                facet_address,
                migration,
            } => {
                update_facet(state, env, facet_address)?;
                env.migrations.run(migration, state)?;
            }
            ModuleManagerAction::ChangeAddressesProvider { provider } => {
                state.addresses_provider = *provider;
                log::info!("addresses provider changed to {}", provider);
                state
                    .events
                    .push(DaoEvent::AddressesProviderChanged { provider: *provider });
            }
            ModuleManagerAction::DiamondCut { cuts, migration } => {
                for cut in cuts {
                    state.facets.apply_cut(cut)?;
                    if let FacetCut::Add(facet) | FacetCut::Replace(facet) = cut {
                        state.events.push(DaoEvent::FacetUpdated {
                            facet: facet.name.clone(),
                            address: facet.address,
                        });
                    }
                }
                log::info!("diamond cut of {} facet(s) applied", cuts.len());
                if let Some(migration) = migration {
                    env.migrations.run(migration, state)?;
                }
            }
        }
        Ok(())
    }
}

/// Resolves the decision data a switch to `decision_type` binds.
fn check_switch(
    module: &ModuleState,
    decision_type: DecisionType,
    supplied: Option<&DecisionData>,
) -> Result<DecisionData> {
    let data = match supplied {
        Some(data) if data.decision_type() == decision_type => {
            data.validate()?;
            Some(*data)
        }
        Some(_) => None,
        None => module.decision_data.get(decision_type),
    };
    data.ok_or_else(|| GovernanceError::DecisionDataNotConfigured {
        module: module.name.clone(),
        decision_type,
    })
}

fn lookup_facet(state: &DaoState, env: &ActionEnv<'_>, address: &Address) -> Result<FacetSpec> {
    env.catalog
        .facet(&state.addresses_provider, address)
        .ok_or(GovernanceError::FacetNotInCatalog {
            provider: state.addresses_provider,
            facet: *address,
        })
}

fn add_module(
    state: &mut DaoState,
    env: &ActionEnv<'_>,
    name: &str,
    kind: ModuleKind,
    decision_type: DecisionType,
    decision_data: ModuleDecisionData,
    facets: &[Address],
) -> Result<()> {
    if name.len() > config::MAX_MODULE_NAME_LEN {
        return Err(GovernanceError::ModuleNameTooLong {
            name: name.to_string(),
            len: name.len(),
        });
    }
    if state.modules.contains_key(name) {
        return Err(GovernanceError::ModuleAlreadyExists(name.to_string()));
    }
    decision_data.validate()?;
    decision_data.require(name, decision_type)?;

    let mut module = ModuleState::new(name, kind, decision_type, decision_data);
    for address in facets {
        let facet = lookup_facet(state, env, address)?;
        state.facets.add_facet(&facet)?;
        module.facets.insert(facet.name.clone());
        state.events.push(DaoEvent::FacetUpdated {
            facet: facet.name,
            address: facet.address,
        });
    }
    if let Some(registry) = state.archived.remove(name) {
        log::debug!("module {} resumes at proposal {}", name, registry.next_id());
        module.proposals = registry;
    }

    state.modules.insert(name.to_string(), module);
    log::info!("➕ module {} added ({})", name, decision_type);
    state.events.push(DaoEvent::ModuleAdded {
        module: name.to_string(),
        decision_type,
    });
    Ok(())
}

fn remove_module(state: &mut DaoState, name: &str) -> Result<()> {
    if name == config::MODULE_MANAGER {
        return Err(GovernanceError::ProtectedModule(name.to_string()));
    }
    let module = state
        .modules
        .remove(name)
        .ok_or_else(|| GovernanceError::ModuleNotFound(name.to_string()))?;
    for facet in &module.facets {
        if state.facets.facet(facet).is_some() {
            state.facets.remove_facet(facet)?;
        }
    }
    state.archived.insert(name.to_string(), module.proposals);
    log::info!("➖ module {} removed", name);
    state.events.push(DaoEvent::ModuleRemoved {
        module: name.to_string(),
    });
    Ok(())
}

fn update_facet(state: &mut DaoState, env: &ActionEnv<'_>, address: &Address) -> Result<()> {
    let facet = lookup_facet(state, env, address)?;
    let previous = state.facets.replace_facet(&facet)?;
    log::info!("🔧 facet {} upgraded: {} -> {}", facet.name, previous, facet.address);
    state.events.push(DaoEvent::FacetUpdated {
        facet: facet.name,
        address: facet.address,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::SignersDecisionData;
    use crate::settings::DaoSettings;
    use dao_core::InMemoryFacetCatalog;

    fn state() -> DaoState {
        DaoState::from_settings(&DaoSettings::default()).unwrap()
    }

    fn signers_only() -> ModuleDecisionData {
        ModuleDecisionData {
            voting_power: None,
            signers: Some(SignersDecisionData::default()),
        }
    }

    fn add(name: &str, facets: Vec<Address>) -> ModuleManagerAction {
        ModuleManagerAction::AddModule {
            name: name.to_string(),
            kind: ModuleKind::Custom,
            decision_type: DecisionType::Signers,
            decision_data: signers_only(),
            facets,
            migration: None,
        }
    }

    #[test]
    fn test_add_and_remove_module_archives_registry() {
        let catalog = InMemoryFacetCatalog::new();
        let migrations = Migrations::new();
        let env = ActionEnv {
            catalog: &catalog,
            migrations: &migrations,
        };
        let mut state = state();

        add("grants", vec![]).apply(&mut state, &env).unwrap();
        assert_eq!(
            add("grants", vec![]).apply(&mut state, &env),
            Err(GovernanceError::ModuleAlreadyExists("grants".to_string()))
        );

        ModuleManagerAction::RemoveModule {
            name: "grants".to_string(),
        }
        .apply(&mut state, &env)
        .unwrap();
        assert!(state.module("grants").is_err());
        assert!(state.archived.contains_key("grants"));

        add("grants", vec![]).apply(&mut state, &env).unwrap();
        assert!(!state.archived.contains_key("grants"));
    }

    #[test]
    fn test_module_name_limit() {
        let catalog = InMemoryFacetCatalog::new();
        let migrations = Migrations::new();
        let env = ActionEnv {
            catalog: &catalog,
            migrations: &migrations,
        };
        let mut state = state();

        let exact = "a".repeat(config::MAX_MODULE_NAME_LEN);
        add(&exact, vec![]).apply(&mut state, &env).unwrap();

        let long = "a".repeat(config::MAX_MODULE_NAME_LEN + 1);
        assert_eq!(
            add(&long, vec![]).apply(&mut state, &env),
            Err(GovernanceError::ModuleNameTooLong { name: long, len: 32 })
        );
    }

    #[test]
    fn test_module_manager_is_protected() {
        let catalog = InMemoryFacetCatalog::new();
        let migrations = Migrations::new();
        let env = ActionEnv {
            catalog: &catalog,
            migrations: &migrations,
        };
        let action = ModuleManagerAction::RemoveModule {
            name: config::MODULE_MANAGER.to_string(),
        };
        assert_eq!(
            action.apply(&mut state(), &env),
            Err(GovernanceError::ProtectedModule(config::MODULE_MANAGER.to_string()))
        );
    }

    #[test]
    fn test_switch_to_unconfigured_decider_fails_fast() {
        let state = state();
        let migrations = Migrations::new();
        let action = ModuleManagerAction::SwitchModuleDecider {
            module: config::TREASURY.to_string(),
            decision_type: DecisionType::Signers,
            decision_data: None,
        };
        assert_eq!(
            action.precheck(&state, &migrations),
            Err(GovernanceError::DecisionDataNotConfigured {
                module: config::TREASURY.to_string(),
                decision_type: DecisionType::Signers,
            })
        );

        let populated = ModuleManagerAction::SwitchModuleDecider {
            module: config::TREASURY.to_string(),
            decision_type: DecisionType::Signers,
            decision_data: Some(DecisionData::Signers(SignersDecisionData::default())),
        };
        assert!(populated.precheck(&state, &migrations).is_ok());
    }

    #[test]
    fn test_add_module_with_facets_and_migration() {
        let catalog = InMemoryFacetCatalog::new();
        let provider = Address::repeat_byte(0x50);
        let facet = FacetSpec::from_signatures("grantsViewer", Address::repeat_byte(0x51), &["grant(uint256)"]);
        catalog.publish(provider, facet.clone());

        let mut migrations = Migrations::new();
        migrations.register("seedGrants", |state: &mut DaoState| {
            state.module_mut("grants")?.facets.insert("seeded".to_string());
            Ok(())
        });
        let env = ActionEnv {
            catalog: &catalog,
            migrations: &migrations,
        };
        let mut state = state();
        state.addresses_provider = provider;

        let action = ModuleManagerAction::AddModule {
            name: "grants".to_string(),
            kind: ModuleKind::Custom,
            decision_type: DecisionType::Signers,
            decision_data: signers_only(),
            facets: vec![facet.address],
            migration: Some("seedGrants".to_string()),
        };
        action.apply(&mut state, &env).unwrap();

        let module = state.module("grants").unwrap();
        assert!(module.facets.contains("grantsViewer"));
        assert!(module.facets.contains("seeded"));
        assert_eq!(
            state.facets.facet_address(&dao_core::Selector::from_signature("grant(uint256)")),
            Some(facet.address)
        );
    }

    #[test]
    fn test_update_facet_unknown_to_provider() {
        let catalog = InMemoryFacetCatalog::new();
        let migrations = Migrations::new();
        let env = ActionEnv {
            catalog: &catalog,
            migrations: &migrations,
        };
        let action = ModuleManagerAction::UpdateFacet {
            facet_address: Address::repeat_byte(0x77),
        };
        assert!(matches!(
            action.apply(&mut state(), &env),
            Err(GovernanceError::FacetNotInCatalog { .. })
        ));
    }

    #[test]
    fn test_missing_migration() {
        let catalog = InMemoryFacetCatalog::new();
        let migrations = Migrations::new();
        let env = ActionEnv {
            catalog: &catalog,
            migrations: &migrations,
        };
        let action = ModuleManagerAction::DiamondCut {
            cuts: vec![],
            migration: Some("nope".to_string()),
        };
        assert_eq!(
            action.apply(&mut state(), &env),
            Err(GovernanceError::MigrationNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_unregistered_migration_refused_before_proposal() {
        let state = state();
        let mut migrations = Migrations::new();
        migrations.register("seedGrants", |_: &mut DaoState| Ok(()));

        let upgrade = |name: &str| ModuleManagerAction::UpdateFacetAndState {
            facet_address: Address::repeat_byte(0x51),
            migration: name.to_string(),
        };
        assert_eq!(
            upgrade("nope").precheck(&state, &migrations),
            Err(GovernanceError::MigrationNotFound("nope".to_string()))
        );
        assert!(upgrade("seedGrants").precheck(&state, &migrations).is_ok());

        let mut add_module = add("grants", vec![]);
        if let ModuleManagerAction::AddModule { migration, .. } = &mut add_module {
            *migration = Some("nope".to_string());
        }
        assert_eq!(
            add_module.precheck(&state, &migrations),
            Err(GovernanceError::MigrationNotFound("nope".to_string()))
        );
    }
}
