//! Cell lists: the simulation cell is split in smaller cells, atoms are sorted
//! in these cells, and neighbors are searched only in nearby cells.
//!
//! [`CellLattice`] holds the geometry of the cells, [`CellManager`] the
//! assignment of atoms to cells, and [`NeighborIterator`] enumerates
//! neighbors from the current assignment without any caching.

mod lattice;
pub use self::lattice::{CellLattice, CellShift, StencilOffset};

mod manager;
pub use self::manager::CellManager;

mod iterator;
pub use self::iterator::{NeighborIterator, Neighbor};
