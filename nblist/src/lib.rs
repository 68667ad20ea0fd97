#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Spatial neighbor tracking for particle simulations: cell lattices over
//! periodic (possibly slanted) boxes, a cell-scan neighbor iterator, cached
//! Verlet neighbor lists with a skin, and potential dispatch on top of them.

pub mod types;
pub use types::*;

mod errors;
pub use self::errors::Error;

pub mod systems;
pub use systems::{System, SystemMut, SimpleSystem, UnitCell, CellShape};
pub use systems::{BondingInfo, NoBonding, BondList};

mod settings;
pub use settings::{NeighborSettings, Direction};

pub mod cells;
pub use cells::{CellManager, CellShift, NeighborIterator};

mod lists;
pub use lists::{NeighborListManager, NeighborEntry, NeighborsUpdated};

pub mod compute;
pub use compute::{PotentialMaster, ThreadedPotentialMaster, PotentialTable, Target, Computed};
