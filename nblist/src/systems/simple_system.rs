use crate::Error;

use super::{UnitCell, System, SystemMut, Vector3D};

/// A simple implementation of `System` to use when no other is available
#[derive(Clone, Debug)]
pub struct SimpleSystem {
    cell: UnitCell,
    types: Vec<usize>,
    positions: Vec<Vector3D>,
}

impl SimpleSystem {
    /// Create a new empty system with the given unit cell
    pub fn new(cell: UnitCell) -> SimpleSystem {
        SimpleSystem {
            cell: cell,
            types: Vec::new(),
            positions: Vec::new(),
        }
    }

    /// Add an atom with the given atomic type and position to this system
    pub fn add_atom(&mut self, atomic_type: usize, position: Vector3D) {
        self.types.push(atomic_type);
        self.positions.push(position);
    }

    /// Remove the atom at index `atom`, replacing it by the last atom in the
    /// system (like `Vec::swap_remove`)
    pub fn remove_atom(&mut self, atom: usize) -> Result<(), Error> {
        if atom >= self.types.len() {
            return Err(Error::InvalidParameter(format!(
                "can not remove atom {} from a system with {} atoms",
                atom, self.types.len()
            )));
        }

        self.types.swap_remove(atom);
        self.positions.swap_remove(atom);
        return Ok(());
    }

    /// Get mutable access to the positions, to move atoms around
    pub fn positions_mut(&mut self) -> &mut [Vector3D] {
        &mut self.positions
    }

    /// Replace the unit cell of this system, without touching the positions
    pub fn set_cell(&mut self, cell: UnitCell) {
        self.cell = cell;
    }

    /// Number of different atomic types, i.e. one more than the largest type
    pub fn n_types(&self) -> usize {
        self.types.iter().max().map_or(0, |&max| max + 1)
    }

    /// Uniformly scale the cell and all positions by `scale`. This changes the
    /// volume of the system by `scale^3`.
    pub fn inflate(&mut self, scale: f64) -> Result<(), Error> {
        self.cell = self.cell.scaled(scale)?;
        for position in &mut self.positions {
            *position *= scale;
        }
        return Ok(());
    }

    /// Move every atom to its central image inside the unit cell
    pub fn wrap_positions(&mut self) {
        SystemMut::wrap_positions(self);
    }
}

impl System for SimpleSystem {
    fn size(&self) -> usize {
        self.types.len()
    }

    fn positions(&self) -> &[Vector3D] {
        &self.positions
    }

    fn types(&self) -> &[usize] {
        &self.types
    }

    fn cell(&self) -> UnitCell {
        self.cell
    }
}

impl SystemMut for SimpleSystem {
    fn positions_mut(&mut self) -> &mut [Vector3D] {
        &mut self.positions
    }
}

impl From<&dyn System> for SimpleSystem {
    fn from(system: &dyn System) -> SimpleSystem {
        let mut new = SimpleSystem::new(system.cell());
        for (&atomic_type, &position) in system.types().iter().zip(system.positions()) {
            new.add_atom(atomic_type, position);
        }
        return new;
    }
}
