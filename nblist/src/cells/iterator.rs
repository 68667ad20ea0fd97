use ndarray::Array3;

use crate::{BondingInfo, Error, Matrix3, Vector3D};
use super::{CellLattice, CellShift};

/// A neighbor found by the [`NeighborIterator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// index of the neighboring atom
    pub index: usize,
    /// vector from the central atom to this image of the neighbor. This is
    /// `position[index] - position[center] + shift.cartesian(cell)`.
    pub vector: Vector3D,
    /// periodic image of the neighbor
    pub shift: CellShift,
    /// is this an up neighbor of the central atom? Each pair of atoms is up
    /// from exactly one of the two atoms.
    pub up: bool,
}

/// Enumerate neighbors by scanning the cells around an atom.
///
/// The iterator does not cache anything, neighbors are derived from the
/// current cell assignment and positions on every call. Neighbors are visited
/// in cell-scan order, not sorted by distance. Bonded pairs and self pairs
/// are never visited, but the other periodic images of the atom itself are
/// when the range is larger than the cell.
pub struct NeighborIterator<'a> {
    lattice: &'a CellLattice,
    occupants: &'a Array3<Vec<usize>>,
    atom_cells: &'a [[usize; 3]],
    atom_shifts: &'a [CellShift],
    bonding: &'a dyn BondingInfo,
    positions: &'a [Vector3D],
    matrix: Matrix3,
    range2: f64,
}

impl<'a> NeighborIterator<'a> {
    pub(super) fn new(
        lattice: &'a CellLattice,
        occupants: &'a Array3<Vec<usize>>,
        atom_cells: &'a [[usize; 3]],
        atom_shifts: &'a [CellShift],
        bonding: &'a dyn BondingInfo,
        positions: &'a [Vector3D],
    ) -> NeighborIterator<'a> {
        debug_assert_eq!(atom_cells.len(), positions.len());
        let range = lattice.range();
        NeighborIterator {
            lattice,
            occupants,
            atom_cells,
            atom_shifts,
            bonding,
            positions,
            matrix: lattice.unit_cell().matrix(),
            range2: if range > 0.0 { range * range } else { 0.0 },
        }
    }

    /// Get the range of this iterator
    pub fn range(&self) -> f64 {
        self.lattice.range()
    }

    /// Get the number of atoms this iterator knows about
    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Call `function` for every neighbor of `atom` closer than the range,
    /// with all the information about the neighbor.
    pub fn for_each_neighbor(&self, atom: usize, function: impl FnMut(Neighbor)) -> Result<(), Error> {
        self.check_atom(atom)?;
        self.visit(atom, function);
        return Ok(());
    }

    /// Call `function(neighbor, vector)` for all neighbors of `atom`, where
    /// `vector` goes from `atom` to `neighbor`.
    pub fn iter_all_neighbors(&self, atom: usize, mut function: impl FnMut(usize, Vector3D)) -> Result<(), Error> {
        self.for_each_neighbor(atom, |neighbor| function(neighbor.index, neighbor.vector))
    }

    /// Call `function(neighbor, vector)` for the up neighbors of `atom` only
    pub fn iter_up_neighbors(&self, atom: usize, mut function: impl FnMut(usize, Vector3D)) -> Result<(), Error> {
        self.for_each_neighbor(atom, |neighbor| {
            if neighbor.up {
                function(neighbor.index, neighbor.vector);
            }
        })
    }

    /// Call `function(neighbor, vector)` for the down neighbors of `atom` only
    pub fn iter_down_neighbors(&self, atom: usize, mut function: impl FnMut(usize, Vector3D)) -> Result<(), Error> {
        self.for_each_neighbor(atom, |neighbor| {
            if !neighbor.up {
                function(neighbor.index, neighbor.vector);
            }
        })
    }

    /// Call `function(first, second, vector)` once for every pair of
    /// neighbors in the system. The same two atoms can appear in more than
    /// one pair if multiple periodic images are in range.
    pub fn iter_all_pairs(&self, mut function: impl FnMut(usize, usize, Vector3D)) {
        for atom in 0..self.positions.len() {
            self.visit(atom, |neighbor| {
                if neighbor.up {
                    function(atom, neighbor.index, neighbor.vector);
                }
            });
        }
    }

    fn check_atom(&self, atom: usize) -> Result<(), Error> {
        if atom >= self.positions.len() {
            return Err(Error::InvalidParameter(format!(
                "atom index {} is out of bounds for a system with {} atoms",
                atom, self.positions.len()
            )));
        }
        return Ok(());
    }

    fn visit(&self, atom: usize, mut function: impl FnMut(Neighbor)) {
        let cell = self.atom_cells[atom];
        let atom_shift = self.atom_shifts[atom];
        let position = self.positions[atom];

        for offset in self.lattice.stencil() {
            let (neighbor_cell, cell_shift) = match self.lattice.neighbor_cell(cell, offset.delta) {
                Some(neighbor) => neighbor,
                None => continue,
            };
            let same_cell = offset.delta == [0, 0, 0];

            for &other in &self.occupants[neighbor_cell] {
                if same_cell && other == atom {
                    continue;
                }

                let shift = cell_shift + atom_shift - self.atom_shifts[other];
                let vector = self.positions[other] - position + shift.cartesian(&self.matrix);
                if vector.norm2() >= self.range2 {
                    continue;
                }

                if self.bonding.skip_pair(atom, other) {
                    continue;
                }

                function(Neighbor {
                    index: other,
                    vector: vector,
                    shift: shift,
                    up: if same_cell { other > atom } else { offset.up },
                });
            }
        }
    }
}
