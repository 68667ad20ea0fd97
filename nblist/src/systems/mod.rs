use std::collections::BTreeSet;

use crate::Vector3D;

mod cell;
pub use self::cell::{UnitCell, CellShape};

mod simple_system;
pub use self::simple_system::SimpleSystem;

#[cfg(test)]
pub(crate) mod test_utils;

/// A `System` deals with the storage of atoms and related information. This is
/// the simulation box as seen by the neighbor machinery, which only ever reads
/// from it.
pub trait System: Send + Sync {
    /// Get the unit cell for this system
    fn cell(&self) -> UnitCell;

    /// Get the number of atoms in this system
    fn size(&self) -> usize;

    /// Get the atomic types for all atoms in this system. The returned value
    /// must be a slice of length `self.size()`, where each different atomic
    /// type is identified with a small integer, starting at 0. The types are
    /// used to select interactions and to bucket neighbor lists.
    fn types(&self) -> &[usize];

    /// Get the positions for all atoms in this system. The returned value must
    /// be a slice of length `self.size()` containing the Cartesian coordinates
    /// of all atoms in the system.
    fn positions(&self) -> &[Vector3D];
}

/// A [`System`] where atoms can be moved by the neighbor machinery, to bring
/// them back inside the unit cell
pub trait SystemMut: System {
    /// Get mutable access to the positions of all atoms
    fn positions_mut(&mut self) -> &mut [Vector3D];

    /// Move every atom to its central image inside the unit cell
    fn wrap_positions(&mut self) {
        let cell = self.cell();
        for position in self.positions_mut() {
            cell.wrap_vector(position);
        }
    }
}

/// Exclusion relation between atoms. Pairs for which `skip_pair` returns
/// `true` are never reported as non-bonded neighbors, whatever their distance
/// (and for all their periodic images).
pub trait BondingInfo: Send + Sync {
    /// Should the pair between atoms `i` and `j` be skipped? This must be
    /// symmetric in `i` and `j`.
    fn skip_pair(&self, i: usize, j: usize) -> bool;
}

/// No exclusion at all, every pair is a potential neighbor
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBonding;

impl BondingInfo for NoBonding {
    fn skip_pair(&self, _: usize, _: usize) -> bool {
        false
    }
}

/// Explicit list of bonded pairs, excluded from non-bonded neighbors
#[derive(Debug, Clone, Default)]
pub struct BondList {
    bonds: BTreeSet<(usize, usize)>,
}

impl BondList {
    /// Create an empty bond list
    pub fn new() -> BondList {
        BondList::default()
    }

    /// Mark `i` and `j` as bonded. The order of the atoms does not matter.
    pub fn add(&mut self, i: usize, j: usize) {
        self.bonds.insert(sorted_pair(i, j));
    }

    /// Are atoms `i` and `j` bonded?
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.bonds.contains(&sorted_pair(i, j))
    }

    /// Number of bonds in this list
    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    /// Is this list empty?
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Iterate over all bonds, with the smallest index first
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.bonds.iter().copied()
    }
}

impl BondingInfo for BondList {
    fn skip_pair(&self, i: usize, j: usize) -> bool {
        self.contains(i, j)
    }
}

fn sorted_pair(i: usize, j: usize) -> (usize, usize) {
    if i < j { (i, j) } else { (j, i) }
}
