use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use nblist::{NeighborSettings, PotentialMaster, PotentialTable, SimpleSystem, System, Target, UnitCell, Vector3D};
use nblist::compute::LennardJones;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n_steps = std::env::args().nth(1).map_or(Ok(100), |arg| arg.parse())?;

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    let energy = time_graph::spanned!("Full simulation", {
        run_random_walk(n_steps)?
    });
    println!("final energy: {}", energy);

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Move all atoms of a Lennard-Jones liquid randomly for `n_steps`, computing
/// energy and forces at every step.
fn run_random_walk(n_steps: usize) -> Result<f64, Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(0);
    let cell = UnitCell::cubic(15.0);
    let mut system = SimpleSystem::new(cell);
    for _ in 0..2700 {
        let fractional = Vector3D::new(rng.gen(), rng.gen(), rng.gen());
        system.add_atom(0, cell.cartesian(fractional));
    }

    let mut table = PotentialTable::new(1);
    table.set_pair(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5)?))?;
    let mut master = PotentialMaster::new(table, NeighborSettings::new(0.3))?;

    let mut energy = 0.0;
    for _ in 0..n_steps {
        for position in system.positions_mut() {
            *position += 0.01 * Vector3D::new(rng.gen(), rng.gen(), rng.gen());
        }
        energy = master.compute(&system, Target::All, true)?.energy;
    }

    if let Some(lists) = master.neighbor_lists() {
        println!("{} atoms, {} rebuilds of the neighbor lists", system.size(), lists.rebuild_count());
    }

    Ok(energy)
}
