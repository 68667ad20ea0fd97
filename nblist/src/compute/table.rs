use std::sync::Arc;

use crate::{BondList, BondingInfo, Error, NoBonding, System};
use crate::NeighborListManager;
use super::{PairPotential, OneBodyPotential};

/// An explicit bond between two atoms, interacting through `potential`
/// regardless of their distance
#[derive(Clone)]
pub struct Bond {
    pub first: usize,
    pub second: usize,
    pub potential: Arc<dyn PairPotential>,
}

/// The `PotentialTable` stores which potential acts between which atoms:
/// pair potentials for every pair of atomic types, one-body potentials for
/// every type, and explicit bonds between specific atoms.
///
/// Bonded atoms (and atoms excluded with [`PotentialTable::add_exclusion`])
/// do not interact through the pair potentials.
#[derive(Clone)]
pub struct PotentialTable {
    n_types: usize,
    /// `n_types x n_types` symmetric table, `None` for non-interacting pairs
    pairs: Vec<Option<Arc<dyn PairPotential>>>,
    one_body: Vec<Option<Arc<dyn OneBodyPotential>>>,
    bonds: Vec<Bond>,
    excluded: BondList,
}

impl std::fmt::Debug for PotentialTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PotentialTable")
            .field("n_types", &self.n_types)
            .field("max_range", &self.max_range())
            .field("bonds", &self.bonds.len())
            .finish_non_exhaustive()
    }
}

impl PotentialTable {
    /// Create an empty table for systems with atomic types in `0..n_types`
    pub fn new(n_types: usize) -> PotentialTable {
        PotentialTable {
            n_types,
            pairs: vec![None; n_types * n_types],
            one_body: vec![None; n_types],
            bonds: Vec::new(),
            excluded: BondList::new(),
        }
    }

    /// Number of atomic types in this table
    pub fn n_types(&self) -> usize {
        self.n_types
    }

    /// Use `potential` between atoms of types `a` and `b`
    pub fn set_pair(&mut self, a: usize, b: usize, potential: Arc<dyn PairPotential>) -> Result<(), Error> {
        self.check_type(a)?;
        self.check_type(b)?;

        let range = potential.range();
        if !range.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "pair potentials must have a finite range, got {} for types {} and {}",
                range, a, b
            )));
        }

        self.pairs[a * self.n_types + b] = Some(Arc::clone(&potential));
        self.pairs[b * self.n_types + a] = Some(potential);
        return Ok(());
    }

    /// Use `potential` on all atoms of type `atom_type`
    pub fn set_one_body(&mut self, atom_type: usize, potential: Arc<dyn OneBodyPotential>) -> Result<(), Error> {
        self.check_type(atom_type)?;
        self.one_body[atom_type] = Some(potential);
        return Ok(());
    }

    /// Add a bond between atoms `first` and `second`. The pair potentials
    /// are no longer used between these two atoms.
    pub fn add_bond(&mut self, first: usize, second: usize, potential: Arc<dyn PairPotential>) -> Result<(), Error> {
        self.add_exclusion(first, second)?;
        self.bonds.push(Bond { first, second, potential });
        return Ok(());
    }

    /// Remove the pair interactions between atoms `first` and `second`
    pub fn add_exclusion(&mut self, first: usize, second: usize) -> Result<(), Error> {
        if first == second {
            return Err(Error::InvalidParameter(format!(
                "can not bond atom {} with itself", first
            )));
        }
        self.excluded.add(first, second);
        return Ok(());
    }

    /// Get the pair potential between types `a` and `b`, if any
    #[inline]
    pub fn pair(&self, a: usize, b: usize) -> Option<&dyn PairPotential> {
        self.pairs[a * self.n_types + b].as_deref()
    }

    /// Get the one-body potential acting on type `atom_type`, if any
    #[inline]
    pub fn one_body(&self, atom_type: usize) -> Option<&dyn OneBodyPotential> {
        self.one_body[atom_type].as_deref()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Largest range of all pair potentials, zero if there are none
    pub fn max_range(&self) -> f64 {
        self.pairs.iter()
            .flatten()
            .fold(0.0, |max, potential| f64::max(max, potential.range()))
    }

    /// Get the pairs of atoms that should not interact through pair
    /// potentials, to be used by the cells and neighbor lists
    pub fn bonding(&self) -> Arc<dyn BondingInfo> {
        if self.excluded.is_empty() {
            return Arc::new(NoBonding);
        }
        return Arc::new(self.excluded.clone());
    }

    /// Set the range of every pair of types in the neighbor `lists` to the
    /// range of the corresponding potential
    pub(crate) fn configure(&self, lists: &mut NeighborListManager) -> Result<(), Error> {
        lists.set_bonding(self.bonding());
        lists.set_potential_range(0.0)?;
        for a in 0..self.n_types {
            for b in a..self.n_types {
                let range = self.pair(a, b).map_or(0.0, |potential| potential.range());
                lists.set_pair_range(a, b, range)?;
            }
        }
        return Ok(());
    }

    /// Check that this table can be used with the `system`
    pub(crate) fn check_system(&self, system: &dyn System) -> Result<(), Error> {
        if let Some(&max) = system.types().iter().max() {
            if max >= self.n_types {
                return Err(Error::InvalidParameter(format!(
                    "the system contains atoms of type {}, but the potential table only knows about {} types",
                    max, self.n_types
                )));
            }
        }

        for bond in &self.bonds {
            if bond.first >= system.size() || bond.second >= system.size() {
                return Err(Error::InvalidParameter(format!(
                    "bond between atoms {} and {} is out of bounds for a system with {} atoms",
                    bond.first, bond.second, system.size()
                )));
            }
        }

        return Ok(());
    }

    fn check_type(&self, atom_type: usize) -> Result<(), Error> {
        if atom_type >= self.n_types {
            return Err(Error::InvalidParameter(format!(
                "atom type {} is out of bounds for a potential table with {} types",
                atom_type, self.n_types
            )));
        }
        return Ok(());
    }
}
