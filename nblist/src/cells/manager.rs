use std::sync::Arc;

use log::debug;
use ndarray::Array3;

use crate::{BondingInfo, Error, System};
use super::{CellLattice, CellShift, NeighborIterator};

/// The `CellManager` sorts the atoms of a system inside the cells of a
/// [`CellLattice`], and keeps this assignment up to date.
///
/// The lattice is (re)built whenever the unit cell, the range or the cell
/// range change, and atoms are re-assigned on every call to
/// [`CellManager::assign_cell_all`].
pub struct CellManager {
    cell_range: usize,
    range: f64,
    bonding: Arc<dyn BondingInfo>,
    lattice: Option<CellLattice>,
    /// atoms in each cell
    occupants: Array3<Vec<usize>>,
    /// cell containing each atom
    atom_cells: Vec<[usize; 3]>,
    /// shift from each atom to its image in the unit cell
    atom_shifts: Vec<CellShift>,
}

impl std::fmt::Debug for CellManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellManager")
            .field("cell_range", &self.cell_range)
            .field("range", &self.range)
            .field("lattice", &self.lattice)
            .field("n_atoms", &self.atom_cells.len())
            .finish_non_exhaustive()
    }
}

impl CellManager {
    /// Create a new cell manager searching `cell_range` shells of cells
    /// around each atom, and excluding pairs according to `bonding`. The
    /// range starts at zero, use [`CellManager::set_range`] to change it.
    pub fn new(cell_range: usize, bonding: Arc<dyn BondingInfo>) -> Result<CellManager, Error> {
        check_cell_range(cell_range)?;

        Ok(CellManager {
            cell_range: cell_range,
            range: 0.0,
            bonding: bonding,
            lattice: None,
            occupants: Array3::from_elem([1, 1, 1], Vec::new()),
            atom_cells: Vec::new(),
            atom_shifts: Vec::new(),
        })
    }

    /// Get the current cell range
    pub fn cell_range(&self) -> usize {
        self.cell_range
    }

    /// Set the number of cell shells to search around each atom. Larger
    /// values give smaller cells. This invalidates the current assignment.
    pub fn set_cell_range(&mut self, cell_range: usize) -> Result<(), Error> {
        check_cell_range(cell_range)?;
        self.cell_range = cell_range;
        self.invalidate();
        return Ok(());
    }

    /// Get the current range
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Set the range under which atoms are neighbors. A range of zero or less
    /// means that no atoms are neighbors. This invalidates the current
    /// assignment.
    pub fn set_range(&mut self, range: f64) -> Result<(), Error> {
        if range.is_nan() || range == f64::INFINITY {
            return Err(Error::InvalidParameter(format!(
                "neighbor range must be a finite number, got {}", range
            )));
        }
        self.range = range;
        self.invalidate();
        return Ok(());
    }

    /// Get the exclusion relation used by this manager
    pub fn bonding(&self) -> &dyn BondingInfo {
        &*self.bonding
    }

    /// Change the exclusion relation used by this manager
    pub fn set_bonding(&mut self, bonding: Arc<dyn BondingInfo>) {
        self.bonding = bonding;
    }

    /// Get the current cell lattice, if any
    pub fn lattice(&self) -> Option<&CellLattice> {
        self.lattice.as_ref()
    }

    /// Get the cell containing the given `atom`, if it was assigned
    pub fn cell_of(&self, atom: usize) -> Option<[usize; 3]> {
        self.atom_cells.get(atom).copied()
    }

    /// Get the atoms inside the given `cell`
    pub fn occupants(&self, cell: [usize; 3]) -> &[usize] {
        match self.occupants.get(cell) {
            Some(atoms) => atoms,
            None => &[],
        }
    }

    /// Number of atoms assigned to cells
    pub fn n_assigned(&self) -> usize {
        self.atom_cells.len()
    }

    /// Is the current assignment usable for the `system`, i.e. was it done for
    /// the same unit cell and number of atoms?
    pub fn is_assigned(&self, system: &dyn System) -> bool {
        match self.lattice {
            Some(ref lattice) => {
                lattice.matches(&system.cell(), self.range, self.cell_range)
                    && self.atom_cells.len() == system.size()
            }
            None => false,
        }
    }

    /// Rebuild the cell lattice from the current geometry of the `system`,
    /// and assign all atoms to their cell.
    pub fn init(&mut self, system: &dyn System) -> Result<(), Error> {
        self.lattice = Some(CellLattice::new(
            system.cell(), self.range, self.cell_range, system.positions()
        )?);
        return self.assign_atoms(system);
    }

    /// Assign all atoms of the `system` to their cell. The cell lattice is
    /// rebuilt first if the geometry of the system no longer matches it. This
    /// is always safe to call after the positions or the cell changed.
    #[time_graph::instrument(name = "CellManager::assign_cell_all")]
    pub fn assign_cell_all(&mut self, system: &dyn System) -> Result<(), Error> {
        let up_to_date = match self.lattice {
            Some(ref lattice) => {
                lattice.matches(&system.cell(), self.range, self.cell_range)
                    && system.positions().iter().all(|&position| lattice.contains(position))
            }
            None => false,
        };

        if up_to_date {
            return self.assign_atoms(system);
        } else {
            return self.init(system);
        }
    }

    /// Update the cell of a single `atom`, after it moved. This can also be
    /// used to assign an atom that was just added at the end of the system.
    pub fn update_atom(&mut self, system: &dyn System, atom: usize) -> Result<(), Error> {
        if atom >= system.size() || atom > self.atom_cells.len() {
            return Err(Error::InvalidParameter(format!(
                "can not update atom {}: the system contains {} atoms and {} are assigned to cells",
                atom, system.size(), self.atom_cells.len()
            )));
        }

        let lattice = match self.lattice {
            Some(ref lattice) if lattice.matches(&system.cell(), self.range, self.cell_range) => lattice,
            _ => {
                return Err(Error::Uninitialized(
                    "cells do not match the current system, call init or assign_cell_all first".into()
                ));
            }
        };

        let position = system.positions()[atom];
        if !lattice.contains(position) {
            // outside of the cells of an infinite unit cell
            return self.init(system);
        }

        let (cell, shift) = lattice.locate(position)?;
        if atom == self.atom_cells.len() {
            self.atom_cells.push(cell);
            self.atom_shifts.push(shift);
        } else {
            let previous = self.atom_cells[atom];
            let atoms = &mut self.occupants[previous];
            if let Some(i) = atoms.iter().position(|&other| other == atom) {
                atoms.swap_remove(i);
            }

            self.atom_cells[atom] = cell;
            self.atom_shifts[atom] = shift;
        }
        self.occupants[cell].push(atom);

        return Ok(());
    }

    /// Remove `atom` from the cells. The last assigned atom takes its index,
    /// matching a `swap_remove` of the atom in the system.
    pub fn remove_atom(&mut self, atom: usize) -> Result<(), Error> {
        if self.lattice.is_none() {
            return Err(Error::Uninitialized(
                "atoms are not assigned to cells, call init or assign_cell_all first".into()
            ));
        }

        if atom >= self.atom_cells.len() {
            return Err(Error::InvalidParameter(format!(
                "can not remove atom {}: only {} atoms are assigned to cells",
                atom, self.atom_cells.len()
            )));
        }

        let atoms = &mut self.occupants[self.atom_cells[atom]];
        if let Some(i) = atoms.iter().position(|&other| other == atom) {
            atoms.swap_remove(i);
        }

        let last = self.atom_cells.len() - 1;
        if atom != last {
            let last_cell = self.atom_cells[last];
            for other in &mut self.occupants[last_cell] {
                if *other == last {
                    *other = atom;
                }
            }
        }

        self.atom_cells.swap_remove(atom);
        self.atom_shifts.swap_remove(atom);
        return Ok(());
    }

    /// Create a [`NeighborIterator`] using the current assignment and the
    /// positions of the `system`.
    ///
    /// This fails if the atoms were never assigned, or if the assignment does
    /// not correspond to the current unit cell or number of atoms of the
    /// system.
    pub fn make_neighbor_iterator<'a>(&'a self, system: &'a dyn System) -> Result<NeighborIterator<'a>, Error> {
        let lattice = self.lattice.as_ref().ok_or_else(|| Error::Uninitialized(
            "atoms are not assigned to cells, call init or assign_cell_all first".into()
        ))?;

        if *lattice.unit_cell() != system.cell() {
            return Err(Error::Uninitialized(
                "the unit cell changed since the last cell assignment".into()
            ));
        }

        if self.atom_cells.len() != system.size() {
            return Err(Error::Uninitialized(format!(
                "the system contains {} atoms, but {} are assigned to cells",
                system.size(), self.atom_cells.len()
            )));
        }

        return Ok(NeighborIterator::new(
            lattice,
            &self.occupants,
            &self.atom_cells,
            &self.atom_shifts,
            &*self.bonding,
            system.positions(),
        ));
    }

    fn invalidate(&mut self) {
        self.lattice = None;
        self.atom_cells.clear();
        self.atom_shifts.clear();
    }

    fn assign_atoms(&mut self, system: &dyn System) -> Result<(), Error> {
        let lattice = self.lattice.as_ref().ok_or_else(|| Error::Uninitialized(
            "the cell lattice is not initialized".into()
        ))?;

        let mut occupants = Array3::from_elem(lattice.n_cells(), Vec::new());
        let mut atom_cells = Vec::with_capacity(system.size());
        let mut atom_shifts = Vec::with_capacity(system.size());

        for (atom, &position) in system.positions().iter().enumerate() {
            let (cell, shift) = lattice.locate(position)?;
            occupants[cell].push(atom);
            atom_cells.push(cell);
            atom_shifts.push(shift);
        }

        debug!("assigned {} atoms to {} cells", atom_cells.len(), occupants.len());

        self.occupants = occupants;
        self.atom_cells = atom_cells;
        self.atom_shifts = atom_shifts;
        return Ok(());
    }
}

fn check_cell_range(cell_range: usize) -> Result<(), Error> {
    if cell_range < 1 {
        return Err(Error::InvalidParameter(format!(
            "cell range must be at least 1, got {}", cell_range
        )));
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{NoBonding, SimpleSystem, UnitCell, Vector3D};
    use super::*;

    fn manager(range: f64) -> CellManager {
        let mut cells = CellManager::new(1, Arc::new(NoBonding)).unwrap();
        cells.set_range(range).unwrap();
        return cells;
    }

    #[test]
    fn invalid_parameters() {
        assert!(CellManager::new(0, Arc::new(NoBonding)).is_err());

        let mut cells = manager(2.0);
        assert!(cells.set_cell_range(0).is_err());
        assert!(cells.set_range(f64::NAN).is_err());
        assert!(cells.set_range(-1.0).is_ok());
    }

    #[test]
    fn assignment_partitions_atoms() {
        let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
        system.add_atom(0, Vector3D::new(1.0, 1.0, 1.0));
        system.add_atom(0, Vector3D::new(9.0, 1.0, 1.0));
        system.add_atom(0, Vector3D::new(-1.0, 1.0, 1.0));
        system.add_atom(0, Vector3D::new(5.0, 5.0, 5.0));

        let mut cells = manager(2.5);
        cells.assign_cell_all(&system).unwrap();
        assert!(cells.is_assigned(&system));
        assert_eq!(cells.n_assigned(), 4);

        let mut all = Vec::new();
        for cell in ndarray::indices([4, 4, 4]) {
            let cell = [cell.0, cell.1, cell.2];
            for &atom in cells.occupants(cell) {
                assert_eq!(cells.cell_of(atom), Some(cell));
                all.push(atom);
            }
        }
        all.sort_unstable();
        assert_eq!(all, [0, 1, 2, 3]);

        // the image of atom 2 is in the same cell as atom 1
        assert_eq!(cells.cell_of(1), cells.cell_of(2));
        assert_eq!(cells.cell_of(3), Some([2, 2, 2]));

        // assigning again gives the same result
        cells.assign_cell_all(&system).unwrap();
        assert_eq!(cells.occupants([3, 0, 0]).len(), 2);
    }

    #[test]
    fn update_atom() {
        let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
        system.add_atom(0, Vector3D::new(1.0, 1.0, 1.0));
        system.add_atom(0, Vector3D::new(9.0, 1.0, 1.0));

        let mut cells = manager(2.5);
        assert!(matches!(cells.update_atom(&system, 0), Err(Error::Uninitialized(_))));

        cells.init(&system).unwrap();
        system.positions_mut()[0] = Vector3D::new(6.0, 1.0, 1.0);
        cells.update_atom(&system, 0).unwrap();
        assert_eq!(cells.cell_of(0), Some([2, 0, 0]));
        assert!(cells.occupants([0, 0, 0]).is_empty());

        // new atoms can be appended
        system.add_atom(0, Vector3D::new(1.0, 9.0, 1.0));
        cells.update_atom(&system, 2).unwrap();
        assert_eq!(cells.cell_of(2), Some([0, 3, 0]));
        assert!(cells.is_assigned(&system));

        // but not with holes
        system.add_atom(0, Vector3D::new(1.0, 9.0, 1.0));
        system.add_atom(0, Vector3D::new(1.0, 9.0, 1.0));
        assert!(cells.update_atom(&system, 4).is_err());
    }

    #[test]
    fn remove_atom() {
        let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
        system.add_atom(0, Vector3D::new(1.0, 1.0, 1.0));
        system.add_atom(0, Vector3D::new(9.0, 1.0, 1.0));
        system.add_atom(0, Vector3D::new(1.5, 1.0, 1.0));

        let mut cells = manager(2.5);
        assert!(matches!(cells.remove_atom(0), Err(Error::Uninitialized(_))));
        cells.init(&system).unwrap();

        system.remove_atom(0).unwrap();
        cells.remove_atom(0).unwrap();
        assert!(cells.is_assigned(&system));

        // the last atom is now atom 0
        assert_eq!(cells.cell_of(0), Some([0, 0, 0]));
        assert_eq!(cells.occupants([0, 0, 0]), &[0]);
        assert_eq!(cells.occupants([3, 0, 0]), &[1]);

        system.remove_atom(1).unwrap();
        cells.remove_atom(1).unwrap();
        assert_eq!(cells.n_assigned(), 1);
        assert!(cells.occupants([3, 0, 0]).is_empty());

        assert!(matches!(cells.remove_atom(1), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn geometry_changes() {
        let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
        system.add_atom(0, Vector3D::new(1.0, 1.0, 1.0));
        system.add_atom(0, Vector3D::new(2.0, 1.0, 1.0));

        let mut cells = manager(2.5);
        assert!(matches!(cells.make_neighbor_iterator(&system), Err(Error::Uninitialized(_))));

        cells.init(&system).unwrap();
        assert!(cells.make_neighbor_iterator(&system).is_ok());

        system.inflate(2.0).unwrap();
        assert!(!cells.is_assigned(&system));
        assert!(matches!(cells.make_neighbor_iterator(&system), Err(Error::Uninitialized(_))));

        // assign_cell_all rebuilds the lattice for the new cell
        cells.assign_cell_all(&system).unwrap();
        assert_eq!(cells.lattice().unwrap().n_cells(), [8, 8, 8]);
        assert!(cells.make_neighbor_iterator(&system).is_ok());

        system.add_atom(0, Vector3D::new(2.0, 1.0, 1.0));
        assert!(matches!(cells.make_neighbor_iterator(&system), Err(Error::Uninitialized(_))));

        cells.set_range(3.0).unwrap();
        assert!(cells.lattice().is_none());
    }

    #[test]
    fn infinite_cell_growth() {
        let mut system = SimpleSystem::new(UnitCell::infinite());
        system.add_atom(0, Vector3D::new(0.0, 0.0, 0.0));
        system.add_atom(0, Vector3D::new(3.0, 0.0, 0.0));

        let mut cells = manager(1.0);
        cells.init(&system).unwrap();
        assert_eq!(cells.lattice().unwrap().n_cells(), [4, 1, 1]);

        // moving outside of the current cells rebuilds the lattice
        system.positions_mut()[1] = Vector3D::new(20.0, 0.0, 0.0);
        cells.update_atom(&system, 1).unwrap();
        assert_eq!(cells.lattice().unwrap().n_cells(), [21, 1, 1]);

        system.positions_mut()[1] = Vector3D::new(-20.0, 0.0, 0.0);
        cells.assign_cell_all(&system).unwrap();
        assert_eq!(cells.lattice().unwrap().n_cells(), [21, 1, 1]);
        assert_eq!(cells.cell_of(1), Some([0, 0, 0]));
        assert_eq!(cells.cell_of(0), Some([20, 0, 0]));
    }

    #[test]
    fn non_finite_positions() {
        let mut system = SimpleSystem::new(UnitCell::cubic(10.0));
        system.add_atom(0, Vector3D::new(f64::NAN, 1.0, 1.0));

        let mut cells = manager(2.5);
        assert!(matches!(cells.assign_cell_all(&system), Err(Error::InvalidParameter(_))));
    }
}
