//! Facet and selector directory
//!
//! Maps installed facets (by logical name) to their implementation address
//! and entry points, and every entry point back to its facet. A facet can
//! only be replaced by one that serves at least all of its old selectors.

use dao_core::{Address, FacetSpec, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GovernanceError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledFacet {
    pub address: Address,
    pub selectors: BTreeSet<Selector>,
}

/// One raw diamond cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetCut {
    Add(FacetSpec),
    Replace(FacetSpec),
    Remove { name: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDirectory {
    facets: BTreeMap<String, InstalledFacet>,
    selector_index: BTreeMap<Selector, String>,
}

impl FacetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_facet(&mut self, facet: &FacetSpec) -> Result<()> {
        if self.facets.contains_key(&facet.name) {
            return Err(GovernanceError::FacetAlreadyInstalled(facet.name.clone()));
        }
        self.ensure_free(&facet.selectors, &facet.name)?;
        for selector in &facet.selectors {
            self.selector_index.insert(*selector, facet.name.clone());
        }
        self.facets.insert(
            facet.name.clone(),
            InstalledFacet {
                address: facet.address,
                selectors: facet.selectors.clone(),
            },
        );
        log::debug!("installed facet {} at {}", facet.name, facet.address);
        Ok(())
    }

    /// Points the facet named `facet.name` at a new implementation.
    pub fn replace_facet(&mut self, facet: &FacetSpec) -> Result<Address> {
        let old = self
            .facets
            .get(&facet.name)
            .ok_or_else(|| GovernanceError::FacetNotInstalled(facet.name.clone()))?;
        let missing = old.selectors.difference(&facet.selectors).count();
        if missing > 0 {
            return Err(GovernanceError::SelectorCoverageShrunk {
                facet: facet.address,
                missing,
            });
        }
        let added: BTreeSet<Selector> = facet
            .selectors
            .difference(&old.selectors)
            .copied()
            .collect();
        let previous = old.address;
        self.ensure_free(&added, &facet.name)?;

        for selector in &added {
            self.selector_index.insert(*selector, facet.name.clone());
        }
        self.facets.insert(
            facet.name.clone(),
            InstalledFacet {
                address: facet.address,
                selectors: facet.selectors.clone(),
            },
        );
        log::debug!("replaced facet {}: {} -> {}", facet.name, previous, facet.address);
        Ok(previous)
    }

    pub fn remove_facet(&mut self, name: &str) -> Result<InstalledFacet> {
        let removed = self
            .facets
            .remove(name)
            .ok_or_else(|| GovernanceError::FacetNotInstalled(name.to_string()))?;
        for selector in &removed.selectors {
            self.selector_index.remove(selector);
        }
        Ok(removed)
    }

    pub fn apply_cut(&mut self, cut: &FacetCut) -> Result<()> {
        match cut {
            FacetCut::Add(facet) => self.add_facet(facet),
            FacetCut::Replace(facet) => self.replace_facet(facet).map(|_| ()),
            FacetCut::Remove { name } => self.remove_facet(name).map(|_| ()),
        }
    }

    pub fn facet(&self, name: &str) -> Option<&InstalledFacet> {
        self.facets.get(name)
    }

    pub fn facet_names(&self) -> Vec<String> {
        self.facets.keys().cloned().collect()
    }

    pub fn facet_address(&self, selector: &Selector) -> Option<Address> {
        self.selector_index
            .get(selector)
            .and_then(|name| self.facets.get(name))
            .map(|facet| facet.address)
    }

    /// Selectors served by the facet installed at `address`.
    pub fn facet_selectors(&self, address: &Address) -> BTreeSet<Selector> {
        self.facets
            .values()
            .filter(|facet| facet.address == *address)
            .flat_map(|facet| facet.selectors.iter().copied())
            .collect()
    }

    fn ensure_free(&self, selectors: &BTreeSet<Selector>, owner: &str) -> Result<()> {
        for selector in selectors {
            if let Some(name) = self.selector_index.get(selector) {
                if name != owner {
                    return Err(GovernanceError::SelectorAlreadyRegistered(*selector));
                }
            }
        }
        Ok(())
    }
}
