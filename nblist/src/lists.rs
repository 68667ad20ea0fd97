use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use rayon::prelude::*;

use crate::{BondingInfo, Error, Matrix3, System, SystemMut, UnitCell, Vector3D};
use crate::{NeighborSettings, Direction};
use crate::cells::{CellManager, CellShift, NeighborIterator};

/// A neighbor stored in the cached neighbor lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborEntry {
    /// index of the neighboring atom
    pub index: usize,
    /// periodic image of the neighbor, relative to the positions of the atoms
    pub shift: CellShift,
}

impl NeighborEntry {
    /// Get the vector from `center` to this image of the neighbor
    #[inline]
    pub fn vector(&self, positions: &[Vector3D], center: usize, matrix: &Matrix3) -> Vector3D {
        positions[self.index] - positions[center] + self.shift.cartesian(matrix)
    }
}

/// Lists of neighbors of a single atom, bucketed by the type of the neighbor
pub(crate) type AtomLists = Vec<Vec<NeighborEntry>>;

/// Description of a change of the neighbor lists, given to the listeners
/// registered with [`NeighborListManager::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborsUpdated<'a> {
    /// why the lists changed
    pub reason: &'a str,
    /// was this a full rebuild, or an incremental update after adding or
    /// removing atoms?
    pub rebuilt: bool,
    /// number of atoms in the lists
    pub n_atoms: usize,
    /// number of pairs in the lists, counting each pair once
    pub n_pairs: usize,
}

type Listener = Box<dyn FnMut(&NeighborsUpdated<'_>) + Send>;

/// The `NeighborListManager` maintains cached (Verlet) neighbor lists.
///
/// The lists contain all neighbors closer than the potential range plus a
/// skin at the time they were built, and stay valid until atoms moved by
/// more than the skin. The manager tracks displacements since the last build,
/// and only rebuilds the lists when needed.
pub struct NeighborListManager {
    settings: NeighborSettings,
    cells: CellManager,
    potential_range: f64,
    pair_ranges: BTreeMap<(usize, usize), f64>,
    n_types: usize,
    /// up neighbors of each atom
    up: Vec<AtomLists>,
    /// down neighbors of each atom, empty when only building up lists
    down: Vec<AtomLists>,
    /// are the lists usable?
    built: bool,
    /// unit cell used for the last build
    built_cell: Option<UnitCell>,
    /// positions at the time of the last build
    reference_positions: Vec<Vector3D>,
    steps: usize,
    rebuilds: usize,
    unsafe_rebuilds: usize,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for NeighborListManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborListManager")
            .field("settings", &self.settings)
            .field("potential_range", &self.potential_range)
            .field("pair_ranges", &self.pair_ranges)
            .field("built", &self.built)
            .field("rebuilds", &self.rebuilds)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl NeighborListManager {
    /// Create a new manager with the given `settings`, skipping pairs
    /// according to `bonding`. The potential range starts at zero.
    pub fn new(settings: NeighborSettings, bonding: Arc<dyn BondingInfo>) -> Result<NeighborListManager, Error> {
        settings.validate()?;
        let cells = CellManager::new(settings.cell_range, bonding)?;

        Ok(NeighborListManager {
            settings: settings,
            cells: cells,
            potential_range: 0.0,
            pair_ranges: BTreeMap::new(),
            n_types: 0,
            up: Vec::new(),
            down: Vec::new(),
            built: false,
            built_cell: None,
            reference_positions: Vec::new(),
            steps: 0,
            rebuilds: 0,
            unsafe_rebuilds: 0,
            listeners: Vec::new(),
        })
    }

    /// Get the current settings
    pub fn settings(&self) -> &NeighborSettings {
        &self.settings
    }

    /// Get the cell manager used to build the lists
    pub fn cell_manager(&self) -> &CellManager {
        &self.cells
    }

    /// Get the uniform potential range
    pub fn potential_range(&self) -> f64 {
        self.potential_range
    }

    /// Set the same potential range for all pairs of types. This removes
    /// all ranges set with [`NeighborListManager::set_pair_range`], and
    /// invalidates the lists.
    pub fn set_potential_range(&mut self, range: f64) -> Result<(), Error> {
        check_range(range)?;
        self.potential_range = range;
        self.pair_ranges.clear();
        self.invalidate();
        return Ok(());
    }

    /// Set the potential range for pairs between atoms of types `a` and
    /// `b`. A range of zero means that these atoms never interact. This
    /// invalidates the lists.
    pub fn set_pair_range(&mut self, a: usize, b: usize, range: f64) -> Result<(), Error> {
        check_range(range)?;
        let key = if a < b { (a, b) } else { (b, a) };
        self.pair_ranges.insert(key, range);
        self.invalidate();
        return Ok(());
    }

    /// Get the potential range for pairs between atoms of types `a` and `b`
    pub fn pair_range(&self, a: usize, b: usize) -> f64 {
        let key = if a < b { (a, b) } else { (b, a) };
        return self.pair_ranges.get(&key).copied().unwrap_or(self.potential_range);
    }

    /// Get the largest potential range for any pair of types
    pub fn max_potential_range(&self) -> f64 {
        self.pair_ranges.values().fold(self.potential_range, |max, &range| f64::max(max, range))
    }

    /// Get the current skin
    pub fn skin(&self) -> f64 {
        self.settings.skin
    }

    /// Set the skin added to the potential range. This invalidates the lists.
    pub fn set_skin(&mut self, skin: f64) -> Result<(), Error> {
        let mut settings = self.settings.clone();
        settings.skin = skin;
        settings.validate()?;
        self.settings = settings;
        self.invalidate();
        return Ok(());
    }

    /// Get the range used to build the lists: the largest potential range
    /// plus the skin
    pub fn neighbor_range(&self) -> f64 {
        let max = self.max_potential_range();
        if max > 0.0 {
            max + self.settings.skin
        } else {
            0.0
        }
    }

    /// Set the range used to build the lists, by changing the skin. The new
    /// range must be larger than the potential range.
    pub fn set_neighbor_range(&mut self, range: f64) -> Result<(), Error> {
        let max = self.max_potential_range();
        if !(range > max) || !range.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "neighbor range ({}) must be larger than the potential range ({})",
                range, max
            )));
        }
        return self.set_skin(range - max);
    }

    /// Set the number of cell shells to search. This invalidates the lists.
    pub fn set_cell_range(&mut self, cell_range: usize) -> Result<(), Error> {
        self.cells.set_cell_range(cell_range)?;
        self.settings.cell_range = cell_range;
        self.invalidate();
        return Ok(());
    }

    /// Change the exclusion relation. This invalidates the lists.
    pub fn set_bonding(&mut self, bonding: Arc<dyn BondingInfo>) {
        self.cells.set_bonding(bonding);
        self.invalidate();
    }

    /// Are the lists built and usable?
    pub fn is_initialized(&self) -> bool {
        self.built
    }

    /// Number of times the lists were rebuilt
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Number of rebuilds that happened after some atoms already moved by
    /// more than the skin. Neighbors could have been missed before these
    /// rebuilds.
    pub fn unsafe_rebuilds(&self) -> usize {
        self.unsafe_rebuilds
    }

    /// Number of different atomic types in the lists
    pub fn n_types(&self) -> usize {
        self.n_types
    }

    /// Register a `listener` called every time the lists change, after
    /// rebuilds and incremental updates
    pub fn add_listener(&mut self, listener: impl FnMut(&NeighborsUpdated<'_>) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Build the lists from scratch for the `system`
    pub fn init(&mut self, system: &dyn System) -> Result<(), Error> {
        self.rebuild(system, "initialization")
    }

    /// Reassign all atoms to cells and rebuild the lists
    pub fn reset(&mut self, system: &dyn System) -> Result<(), Error> {
        self.rebuild(system, "reset")
    }

    /// Rebuild the lists if they are no longer valid for the `system`: if
    /// they were never built, if the unit cell or number of atoms changed, or
    /// if atoms moved too much since the last build. Returns whether the
    /// lists were rebuilt.
    pub fn update_neighbors_if_needed(&mut self, system: &dyn System) -> Result<bool, Error> {
        match self.rebuild_reason(system) {
            Some(reason) => {
                self.rebuild(system, reason)?;
                return Ok(true);
            }
            None => return Ok(false),
        }
    }

    /// Notify the manager that the integrator finished a step. The lists are
    /// checked (and rebuilt if needed) every `update_interval` steps. When
    /// the `apply_pbc` setting is set, atoms are moved back inside the unit
    /// cell before rebuilding.
    pub fn integrator_step_finished<S: SystemMut>(&mut self, system: &mut S) -> Result<bool, Error> {
        self.steps += 1;
        if self.steps % self.settings.update_interval != 0 {
            return Ok(false);
        }

        match self.rebuild_reason(&*system) {
            Some(reason) => {
                if self.settings.apply_pbc {
                    system.wrap_positions();
                }
                self.rebuild(&*system, reason)?;
                return Ok(true);
            }
            None => return Ok(false),
        }
    }

    /// Notify the manager that the integrator was (re)initialized, this
    /// rebuilds the lists after moving atoms inside the unit cell if
    /// `apply_pbc` is set.
    pub fn integrator_initialized<S: SystemMut>(&mut self, system: &mut S) -> Result<(), Error> {
        self.steps = 0;
        if self.settings.apply_pbc {
            system.wrap_positions();
        }
        return self.reset(&*system);
    }

    /// Check if the lists need to be rebuilt for the `system`, and why.
    /// This also counts and reports unsafe rebuilds.
    fn rebuild_reason(&mut self, system: &dyn System) -> Option<&'static str> {
        if !self.built {
            return Some("lists are not initialized");
        }

        if self.built_cell != Some(system.cell()) {
            return Some("the unit cell changed");
        }

        if self.reference_positions.len() != system.size() {
            return Some("the number of atoms changed");
        }

        let (first, second) = largest_displacements(&self.reference_positions, system.positions());
        let displacement = first + second;
        if displacement > 2.0 * self.settings.safety_factor * self.settings.skin {
            if displacement > self.settings.skin {
                self.unsafe_rebuilds += 1;
                if !self.settings.quiet && is_power_of_ten(self.unsafe_rebuilds) {
                    warn!(
                        "atoms moved by {} and {} before the neighbor lists were rebuilt, \
                        some neighbors might have been missed ({} unsafe rebuilds so far). \
                        Consider using a larger skin or a smaller update interval",
                        first, second, self.unsafe_rebuilds
                    );
                }
            }
            return Some("atoms moved");
        }

        trace!("no need to rebuild neighbor lists, largest displacements are {} and {}", first, second);
        return None;
    }

    /// Add atoms appended to the `system` since the last build to the lists,
    /// without rebuilding them. This falls back to a full rebuild if the
    /// lists can not be updated incrementally.
    pub fn add_atoms_notify(&mut self, system: &dyn System) -> Result<(), Error> {
        let n_old = self.reference_positions.len();
        let n_new = system.size();
        let types = system.types();

        let incremental = self.built
            && self.built_cell == Some(system.cell())
            && n_new >= n_old
            && types[n_old..].iter().all(|&t| t < self.n_types);

        if !incremental {
            return self.rebuild(system, "atoms added");
        }

        if n_new == n_old {
            return Ok(());
        }

        for atom in n_old..n_new {
            self.cells.update_atom(system, atom)?;
        }

        let both = self.settings.direction == Direction::Both;
        let n_types = self.n_types;
        let cutoffs = self.list_cutoffs(n_types);
        let iterator = self.cells.make_neighbor_iterator(system)?;

        // entries to add to the lists of already existing atoms
        let mut reverse = Vec::new();
        for atom in n_old..n_new {
            let mut up = vec![Vec::new(); n_types];
            let mut down = if both { vec![Vec::new(); n_types] } else { Vec::new() };

            iterator.for_each_neighbor(atom, |neighbor| {
                let neighbor_type = types[neighbor.index];
                if neighbor.vector.norm2() >= cutoffs[types[atom] * n_types + neighbor_type] {
                    return;
                }

                let entry = NeighborEntry { index: neighbor.index, shift: neighbor.shift };
                if neighbor.up {
                    up[neighbor_type].push(entry);
                } else if both {
                    down[neighbor_type].push(entry);
                }

                // pairs between new atoms are added from both sides already
                if neighbor.index < n_old {
                    let opposite = NeighborEntry { index: atom, shift: -neighbor.shift };
                    reverse.push((neighbor.index, opposite, !neighbor.up));
                }
            })?;

            self.up.push(up);
            self.down.push(down);
            self.reference_positions.push(system.positions()[atom]);
        }

        for (atom, entry, is_up) in reverse {
            let entry_type = types[entry.index];
            if is_up {
                self.up[atom][entry_type].push(entry);
            } else if both {
                self.down[atom][entry_type].push(entry);
            }
        }

        debug!("added {} atoms to the neighbor lists", n_new - n_old);
        self.notify("atoms added", false);
        return Ok(());
    }

    /// Remove `atom` from the lists, after it was removed from the `system`.
    /// The system must have replaced the removed atom by its last atom (as
    /// `Vec::swap_remove` and [`SimpleSystem::remove_atom`] do), and the
    /// lists are updated accordingly without a rebuild. The caller is
    /// responsible for updating the indices in the bonding information.
    ///
    /// [`SimpleSystem::remove_atom`]: crate::SimpleSystem::remove_atom
    pub fn remove_atom_notify(&mut self, system: &dyn System, atom: usize) -> Result<(), Error> {
        if !self.built {
            return self.rebuild(system, "atom removed");
        }

        let n_old = self.reference_positions.len();
        if atom >= n_old {
            return Err(Error::InvalidParameter(format!(
                "can not remove atom {} from neighbor lists of {} atoms",
                atom, n_old
            )));
        }

        let incremental = self.built_cell == Some(system.cell())
            && system.size() + 1 == n_old
            && self.cells.n_assigned() == n_old;

        if !incremental {
            return self.rebuild(system, "atom removed");
        }

        let last = n_old - 1;
        let both = self.settings.direction == Direction::Both;

        // atoms with `atom` or `last` in their lists. Down lists give all
        // of them when building both directions, otherwise all lists need
        // to be checked.
        let mut affected = Vec::new();
        if both {
            for center in [atom, last] {
                affected.push(center);
                let up = self.up[center].iter().flatten();
                let down = self.down[center].iter().flatten();
                affected.extend(up.chain(down).map(|entry| entry.index));
            }
            affected.sort_unstable();
            affected.dedup();
        } else {
            affected.extend(0..n_old);
        }

        for &other in &affected {
            if other == atom {
                continue;
            }
            for list in self.up[other].iter_mut().chain(self.down[other].iter_mut()) {
                list.retain(|entry| entry.index != atom);
                for entry in list.iter_mut() {
                    if entry.index == last {
                        entry.index = atom;
                    }
                }
            }
        }

        self.up.swap_remove(atom);
        self.down.swap_remove(atom);
        self.reference_positions.swap_remove(atom);
        self.cells.remove_atom(atom)?;

        debug!("removed atom {} from the neighbor lists", atom);
        self.notify("atom removed", false);
        return Ok(());
    }

    /// Get the up neighbors of `atom`, bucketed by neighbor type
    pub fn up_list(&self, atom: usize) -> Result<&[Vec<NeighborEntry>], Error> {
        self.check_atom(atom)?;
        return Ok(&self.up[atom]);
    }

    /// Get the down neighbors of `atom`, bucketed by neighbor type. This
    /// fails if the manager only builds up lists.
    pub fn down_list(&self, atom: usize) -> Result<&[Vec<NeighborEntry>], Error> {
        if self.settings.direction == Direction::Up {
            return Err(Error::InvalidParameter(
                "down lists are not available when only building up lists".into()
            ));
        }
        self.check_atom(atom)?;
        return Ok(&self.down[atom]);
    }

    /// Get the up lists of all atoms
    pub(crate) fn up_lists(&self) -> Result<&[AtomLists], Error> {
        if !self.built {
            return Err(uninitialized());
        }
        return Ok(&self.up);
    }

    /// Total number of pairs in the lists, counting each pair once
    pub fn n_pairs(&self) -> usize {
        self.up.iter().flatten().map(|list| list.len()).sum()
    }

    /// Create a [`NeighborIterator`] over the current cell assignment, with
    /// the range used for the lists
    pub fn make_neighbor_iterator<'a>(&'a self, system: &'a dyn System) -> Result<NeighborIterator<'a>, Error> {
        self.cells.make_neighbor_iterator(system)
    }

    fn check_atom(&self, atom: usize) -> Result<(), Error> {
        if !self.built {
            return Err(uninitialized());
        }

        if atom >= self.up.len() {
            return Err(Error::InvalidParameter(format!(
                "atom index {} is out of bounds for neighbor lists of {} atoms",
                atom, self.up.len()
            )));
        }
        return Ok(());
    }

    fn invalidate(&mut self) {
        self.built = false;
    }

    /// Squared list range for each pair of types, zero for pairs that never
    /// interact
    fn list_cutoffs(&self, n_types: usize) -> Vec<f64> {
        let mut cutoffs = vec![0.0; n_types * n_types];
        for a in 0..n_types {
            for b in 0..n_types {
                let range = self.pair_range(a, b);
                if range > 0.0 {
                    let cutoff = range + self.settings.skin;
                    cutoffs[a * n_types + b] = cutoff * cutoff;
                }
            }
        }
        return cutoffs;
    }

    #[time_graph::instrument(name = "NeighborListManager::rebuild")]
    #[allow(clippy::float_cmp)]
    fn rebuild(&mut self, system: &dyn System, reason: &str) -> Result<(), Error> {
        let range = self.neighbor_range();
        if self.cells.range() != range {
            self.cells.set_range(range)?;
        }
        self.cells.assign_cell_all(system)?;

        let types = system.types();
        let n_types = types.iter().max().map_or(0, |&max| max + 1);
        let cutoffs = self.list_cutoffs(n_types);
        let both = self.settings.direction == Direction::Both;

        let iterator = self.cells.make_neighbor_iterator(system)?;
        let lists = (0..system.size()).into_par_iter()
            .map(|atom| atom_lists(&iterator, types, &cutoffs, n_types, both, atom))
            .collect::<Result<Vec<_>, Error>>()?;

        let (up, down): (Vec<_>, Vec<_>) = lists.into_iter().unzip();
        self.up = up;
        self.down = down;
        self.n_types = n_types;
        self.reference_positions = system.positions().to_vec();
        self.built_cell = Some(system.cell());
        self.built = true;
        self.rebuilds += 1;

        debug!(
            "rebuilt neighbor lists ({}): {} pairs for {} atoms within {}",
            reason, self.n_pairs(), system.size(), range
        );
        self.notify(reason, true);

        return Ok(());
    }

    fn notify(&mut self, reason: &str, rebuilt: bool) {
        if self.listeners.is_empty() {
            return;
        }

        let update = NeighborsUpdated {
            reason: reason,
            rebuilt: rebuilt,
            n_atoms: self.up.len(),
            n_pairs: self.n_pairs(),
        };
        for listener in &mut self.listeners {
            listener(&update);
        }
    }
}

/// Build the up and down lists of a single atom
fn atom_lists(
    iterator: &NeighborIterator,
    types: &[usize],
    cutoffs: &[f64],
    n_types: usize,
    both: bool,
    atom: usize,
) -> Result<(AtomLists, AtomLists), Error> {
    let mut up = vec![Vec::new(); n_types];
    let mut down = if both { vec![Vec::new(); n_types] } else { Vec::new() };

    iterator.for_each_neighbor(atom, |neighbor| {
        if !neighbor.up && !both {
            return;
        }

        let neighbor_type = types[neighbor.index];
        let distance2 = neighbor.vector.norm2();
        if distance2 >= cutoffs[types[atom] * n_types + neighbor_type] {
            return;
        }

        let entry = NeighborEntry {
            index: neighbor.index,
            shift: neighbor.shift,
        };

        if neighbor.up {
            if distance2 < 1e-3 {
                warn!(
                    "atoms {} and {} are very close to one another ({} A)",
                    atom, neighbor.index, distance2.sqrt()
                );
            }
            up[neighbor_type].push(entry);
        } else {
            down[neighbor_type].push(entry);
        }
    })?;

    return Ok((up, down));
}

/// Get the two largest displacements between `reference` and `positions`
fn largest_displacements(reference: &[Vector3D], positions: &[Vector3D]) -> (f64, f64) {
    let mut first = 0.0;
    let mut second = 0.0;
    for (old, new) in reference.iter().zip(positions) {
        let displacement2 = (new - old).norm2();
        if displacement2 > first {
            second = first;
            first = displacement2;
        } else if displacement2 > second {
            second = displacement2;
        }
    }
    return (f64::sqrt(first), f64::sqrt(second));
}

fn is_power_of_ten(mut value: usize) -> bool {
    while value >= 10 && value % 10 == 0 {
        value /= 10;
    }
    return value == 1;
}

fn check_range(range: f64) -> Result<(), Error> {
    if !range.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "potential range must be a finite number, got {}", range
        )));
    }
    return Ok(());
}

fn uninitialized() -> Error {
    Error::Uninitialized("neighbor lists are not initialized, call init or reset first".into())
}
