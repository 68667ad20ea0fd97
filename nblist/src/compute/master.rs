use log::debug;

use crate::{CellManager, Direction, Error, NeighborListManager, NeighborSettings, System};
use super::{Computed, Frame, PotentialTable, Target};
use super::{compute_atom_terms, compute_owned_terms, compute_with_iterator};

enum Neighbors {
    /// cached neighbor lists, rebuilt lazily
    Lists(NeighborListManager),
    /// cells only, reassigned on every computation
    Cells(CellManager),
}

/// The `PotentialMaster` computes energies, forces and virial for a
/// [`PotentialTable`], finding interacting pairs with either cached neighbor
/// lists or a direct scan of the cells.
///
/// Cached lists are the better choice for molecular dynamics, where all atoms
/// move a little between computations. Scanning cells is better for Monte
/// Carlo, where a single atom moves by a lot.
pub struct PotentialMaster {
    table: PotentialTable,
    neighbors: Neighbors,
}

impl std::fmt::Debug for PotentialMaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.neighbors {
            Neighbors::Lists(_) => "lists",
            Neighbors::Cells(_) => "cells",
        };
        f.debug_struct("PotentialMaster")
            .field("table", &self.table)
            .field("mode", &mode)
            .finish()
    }
}

impl PotentialMaster {
    /// Create a master using neighbor lists built with the given `settings`.
    /// Lists are always built in both directions, to be able to compute
    /// terms for a single atom.
    pub fn new(table: PotentialTable, mut settings: NeighborSettings) -> Result<PotentialMaster, Error> {
        if settings.direction != Direction::Both {
            debug!("potential master needs both up and down neighbor lists, ignoring direction setting");
            settings.direction = Direction::Both;
        }

        let mut lists = NeighborListManager::new(settings, table.bonding())?;
        table.configure(&mut lists)?;

        return Ok(PotentialMaster {
            table: table,
            neighbors: Neighbors::Lists(lists),
        });
    }

    /// Create a master scanning cells of `cell_range` shells on every
    /// computation, without neighbor lists
    pub fn with_cells(table: PotentialTable, cell_range: usize) -> Result<PotentialMaster, Error> {
        let mut cells = CellManager::new(cell_range, table.bonding())?;
        cells.set_range(table.max_range())?;

        return Ok(PotentialMaster {
            table: table,
            neighbors: Neighbors::Cells(cells),
        });
    }

    pub fn table(&self) -> &PotentialTable {
        &self.table
    }

    /// Get the neighbor lists, if this master uses them
    pub fn neighbor_lists(&self) -> Option<&NeighborListManager> {
        match &self.neighbors {
            Neighbors::Lists(lists) => Some(lists),
            Neighbors::Cells(_) => None,
        }
    }

    /// Get mutable access to the neighbor lists, e.g. to notify them of
    /// integrator steps or added atoms
    pub fn neighbor_lists_mut(&mut self) -> Option<&mut NeighborListManager> {
        match &mut self.neighbors {
            Neighbors::Lists(lists) => Some(lists),
            Neighbors::Cells(_) => None,
        }
    }

    /// Get the cell manager used to find neighbors
    pub fn cell_manager(&self) -> &CellManager {
        match &self.neighbors {
            Neighbors::Lists(lists) => lists.cell_manager(),
            Neighbors::Cells(cells) => cells,
        }
    }

    /// Compute the energy, virial and (if `with_forces` is true) forces of
    /// the `target` terms in the `system`.
    ///
    /// With neighbor lists, the lists are rebuilt first if atoms moved too
    /// much since the last build. Without, all atoms are assigned to cells
    /// again.
    #[time_graph::instrument(name = "PotentialMaster::compute")]
    pub fn compute(&mut self, system: &dyn System, target: Target, with_forces: bool) -> Result<Computed, Error> {
        self.table.check_system(system)?;
        if let Target::Atom(atom) = target {
            if atom >= system.size() {
                return Err(Error::InvalidParameter(format!(
                    "atom index {} is out of bounds for a system with {} atoms",
                    atom, system.size()
                )));
            }
        }

        let frame = Frame::from_system(system);
        let mut output = Computed::new(system.size(), with_forces);

        match &mut self.neighbors {
            Neighbors::Lists(lists) => {
                lists.update_neighbors_if_needed(system)?;
                match target {
                    Target::All => {
                        compute_owned_terms(&self.table, &frame, lists.up_lists()?, 0, &mut output);
                    }
                    Target::Atom(atom) => {
                        let up = lists.up_list(atom)?;
                        let down = lists.down_list(atom)?;
                        compute_atom_terms(&self.table, &frame, up, down, atom, &mut output);
                    }
                }
            }
            Neighbors::Cells(cells) => {
                cells.assign_cell_all(system)?;
                let iterator = cells.make_neighbor_iterator(system)?;
                compute_with_iterator(&self.table, &frame, &iterator, target, &mut output)?;
            }
        }

        return Ok(output);
    }

    /// Compute only the energy of the `target` terms
    pub fn energy(&mut self, system: &dyn System, target: Target) -> Result<f64, Error> {
        let computed = self.compute(system, target, false)?;
        return Ok(computed.energy);
    }
}
