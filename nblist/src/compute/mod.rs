//! Evaluation of energy, forces and virial on top of the cells and neighbor
//! lists.
//!
//! The [`PotentialTable`] describes which potentials act between atoms. The
//! [`PotentialMaster`] uses it together with either a
//! [`NeighborListManager`](crate::NeighborListManager) or a bare
//! [`CellManager`](crate::CellManager), and the [`ThreadedPotentialMaster`]
//! splits the atoms between a fixed pool of worker threads.

use crate::{Error, Matrix3, System, UnitCell, Vector3D};
use crate::{NeighborEntry, NeighborIterator};
use crate::lists::AtomLists;

mod potentials;
pub use self::potentials::{PairPotential, OneBodyPotential};
pub use self::potentials::{LennardJones, Harmonic, UniformField};

mod table;
pub use self::table::{PotentialTable, Bond};

mod master;
pub use self::master::PotentialMaster;

mod threaded;
pub use self::threaded::ThreadedPotentialMaster;

/// Which terms should be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// All terms in the system, counting every pair once
    All,
    /// All terms involving the given atom
    Atom(usize),
}

/// Result of a computation
#[derive(Debug, Clone, PartialEq)]
pub struct Computed {
    /// total energy
    pub energy: f64,
    /// virial, i.e. the sum of `r dU/dr` over all pairs
    pub virial: f64,
    /// force acting on every atom. This is empty if forces were not
    /// requested.
    pub forces: Vec<Vector3D>,
}

impl Computed {
    pub(crate) fn new(n_atoms: usize, with_forces: bool) -> Computed {
        Computed {
            energy: 0.0,
            virial: 0.0,
            forces: if with_forces { vec![Vector3D::zero(); n_atoms] } else { Vec::new() },
        }
    }

    /// Add a pair term between `first` and `second`, where `vector` goes
    /// from `first` to `second`. This does not check the range.
    #[inline]
    fn add_pair(&mut self, potential: &dyn PairPotential, first: usize, second: usize, vector: Vector3D, r2: f64) {
        self.energy += potential.energy(r2);
        let du = potential.du(r2);
        self.virial += du;

        if !self.forces.is_empty() {
            let force = du / r2 * vector;
            self.forces[first] += force;
            self.forces[second] -= force;
        }
    }

    /// Add the pair term between `first` and `second` if they are closer than
    /// the potential range
    #[inline]
    fn add_pair_in_range(&mut self, potential: &dyn PairPotential, first: usize, second: usize, vector: Vector3D) {
        let r2 = vector.norm2();
        let range = potential.range();
        if r2 < range * range {
            self.add_pair(potential, first, second, vector, r2);
        }
    }

    fn add_one_body(&mut self, potential: &dyn OneBodyPotential, atom: usize, position: Vector3D) {
        self.energy += potential.energy(position);
        if !self.forces.is_empty() {
            self.forces[atom] -= potential.gradient(position);
        }
    }

    /// Add the contribution of another computation to this one
    pub(crate) fn merge(&mut self, other: &Computed) {
        self.energy += other.energy;
        self.virial += other.virial;
        debug_assert_eq!(self.forces.len(), other.forces.len());
        for (force, other) in self.forces.iter_mut().zip(&other.forces) {
            *force += other;
        }
    }
}

/// Positions, types and cell of the system for one computation
pub(crate) struct Frame<'a> {
    positions: &'a [Vector3D],
    types: &'a [usize],
    cell: UnitCell,
    matrix: Matrix3,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(positions: &'a [Vector3D], types: &'a [usize], cell: UnitCell) -> Frame<'a> {
        Frame { positions, types, cell, matrix: cell.matrix() }
    }

    pub(crate) fn from_system(system: &'a dyn System) -> Frame<'a> {
        Frame::new(system.positions(), system.types(), system.cell())
    }

    pub(crate) fn size(&self) -> usize {
        self.positions.len()
    }

    /// Nearest image vector from `first` to `second`
    fn bond_vector(&self, first: usize, second: usize) -> Vector3D {
        let mut vector = self.positions[second] - self.positions[first];
        self.cell.vector_image(&mut vector);
        return vector;
    }
}

fn one_body_term(table: &PotentialTable, frame: &Frame, atom: usize, output: &mut Computed) {
    if let Some(potential) = table.one_body(frame.types[atom]) {
        output.add_one_body(potential, atom, frame.positions[atom]);
    }
}

/// Add the pairs between `atom` and the neighbors in `lists`
fn listed_pairs_terms(table: &PotentialTable, frame: &Frame, atom: usize, lists: &[Vec<NeighborEntry>], output: &mut Computed) {
    let atom_type = frame.types[atom];
    for (neighbor_type, list) in lists.iter().enumerate() {
        let potential = match table.pair(atom_type, neighbor_type) {
            Some(potential) => potential,
            None => continue,
        };

        for entry in list {
            let vector = entry.vector(frame.positions, atom, &frame.matrix);
            output.add_pair_in_range(potential, atom, entry.index, vector);
        }
    }
}

fn bond_term(frame: &Frame, bond: &Bond, output: &mut Computed) {
    let vector = frame.bond_vector(bond.first, bond.second);
    output.add_pair(&*bond.potential, bond.first, bond.second, vector, vector.norm2());
}

/// Compute all terms owned by the atoms in `start..start + up_lists.len()`:
/// their one-body terms, pairs from their up lists, and the bonds where they
/// are the first atom. Running this on disjoint ranges covering all atoms
/// visits every term exactly once.
pub(crate) fn compute_owned_terms(
    table: &PotentialTable,
    frame: &Frame,
    up_lists: &[AtomLists],
    start: usize,
    output: &mut Computed,
) {
    for (offset, lists) in up_lists.iter().enumerate() {
        let atom = start + offset;
        one_body_term(table, frame, atom, output);
        listed_pairs_terms(table, frame, atom, lists, output);
    }

    let end = start + up_lists.len();
    for bond in table.bonds() {
        if bond.first >= start && bond.first < end {
            bond_term(frame, bond, output);
        }
    }
}

/// Compute the terms involving `atom` using its up and down lists
pub(crate) fn compute_atom_terms(
    table: &PotentialTable,
    frame: &Frame,
    up: &[Vec<NeighborEntry>],
    down: &[Vec<NeighborEntry>],
    atom: usize,
    output: &mut Computed,
) {
    one_body_term(table, frame, atom, output);
    listed_pairs_terms(table, frame, atom, up, output);
    listed_pairs_terms(table, frame, atom, down, output);
    bonds_of_atom(table, frame, atom, output);
}

fn bonds_of_atom(table: &PotentialTable, frame: &Frame, atom: usize, output: &mut Computed) {
    for bond in table.bonds() {
        if bond.first == atom || bond.second == atom {
            bond_term(frame, bond, output);
        }
    }
}

/// Compute the terms of `target` by scanning cells with `iterator`
pub(crate) fn compute_with_iterator(
    table: &PotentialTable,
    frame: &Frame,
    iterator: &NeighborIterator,
    target: Target,
    output: &mut Computed,
) -> Result<(), Error> {
    match target {
        Target::All => {
            for atom in 0..frame.size() {
                one_body_term(table, frame, atom, output);
            }
            for bond in table.bonds() {
                bond_term(frame, bond, output);
            }
            iterator.iter_all_pairs(|first, second, vector| {
                if let Some(potential) = table.pair(frame.types[first], frame.types[second]) {
                    output.add_pair_in_range(potential, first, second, vector);
                }
            });
        }
        Target::Atom(atom) => {
            one_body_term(table, frame, atom, output);
            bonds_of_atom(table, frame, atom, output);
            let atom_type = frame.types[atom];
            iterator.iter_all_neighbors(atom, |neighbor, vector| {
                if let Some(potential) = table.pair(atom_type, frame.types[neighbor]) {
                    output.add_pair_in_range(potential, atom, neighbor, vector);
                }
            })?;
        }
    }

    return Ok(());
}
