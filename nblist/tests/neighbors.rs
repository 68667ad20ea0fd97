//! Cell scans and neighbor lists against a brute-force enumeration of all
//! periodic images, for cubic, slanted and non-periodic boxes, including
//! ranges larger than the box.

use std::sync::Arc;

use nblist::{CellManager, Direction, NeighborListManager, NeighborSettings, NoBonding, System, UnitCell};

mod data;

fn cell_manager(system: &dyn System, range: f64, cell_range: usize) -> CellManager {
    let mut cells = CellManager::new(cell_range, Arc::new(NoBonding)).unwrap();
    cells.set_range(range).unwrap();
    cells.init(system).unwrap();
    return cells;
}

#[test]
fn structures() {
    for (name, system) in data::load_structures("structures.json") {
        for &range in &[0.9, 1.7, 3.2] {
            for cell_range in 1..=3 {
                let cells = cell_manager(&system, range, cell_range);
                let iterator = cells.make_neighbor_iterator(&system).unwrap();

                assert_eq!(
                    data::iterator_neighbors(&iterator),
                    data::brute_force(&system, range),
                    "{}, range = {}, cell range = {}", name, range, cell_range
                );
            }
        }
    }
}

#[test]
fn random_slanted_boxes() {
    for seed in 0..6 {
        let cell = data::random_shear(seed, 7.0);
        let system = data::random_system(seed, cell, 40, 2);

        // the largest ranges need more than one image of the box
        for &range in &[1.3, 2.9, 4.6, 8.1] {
            for cell_range in 1..=3 {
                let cells = cell_manager(&system, range, cell_range);
                let iterator = cells.make_neighbor_iterator(&system).unwrap();

                assert_eq!(
                    data::iterator_neighbors(&iterator),
                    data::brute_force(&system, range),
                    "seed = {}, range = {}, cell range = {}", seed, range, cell_range
                );
            }
        }
    }
}

#[test]
fn lattice_sums() {
    // a single atom only sees its own images
    let mut system = nblist::SimpleSystem::new(UnitCell::triclinic(2.0, 2.5, 3.0, 80.0, 100.0, 70.0));
    system.add_atom(0, nblist::Vector3D::new(0.3, 0.2, 0.1));

    let cells = cell_manager(&system, 6.5, 2);
    assert!(cells.lattice().unwrap().is_lattice_sum());

    let iterator = cells.make_neighbor_iterator(&system).unwrap();
    let neighbors = data::iterator_neighbors(&iterator);
    assert_eq!(neighbors, data::brute_force(&system, 6.5));
    assert!(neighbors.len() > 50);

    // images come in pairs of opposite shifts
    for &(_, _, shift) in &neighbors {
        let opposite = [-shift[0], -shift[1], -shift[2]];
        assert!(neighbors.binary_search(&(0, 0, opposite)).is_ok());
    }
}

#[test]
fn neighbor_lists() {
    let skin = 0.3;
    for (seed, cell) in [UnitCell::cubic(8.0), data::random_shear(3, 8.0), data::random_shear(4, 6.0)].iter().enumerate() {
        let system = data::random_system(seed as u64, *cell, 60, 3);

        let mut lists = NeighborListManager::new(NeighborSettings::new(skin), Arc::new(NoBonding)).unwrap();
        lists.set_potential_range(2.5).unwrap();
        lists.init(&system).unwrap();

        let mut found = Vec::new();
        for atom in 0..system.size() {
            let up = lists.up_list(atom).unwrap().iter().flatten();
            let down = lists.down_list(atom).unwrap().iter().flatten();
            for entry in up.chain(down) {
                found.push((atom, entry.index, entry.shift.into()));
            }
        }
        found.sort_unstable();

        assert_eq!(found, data::brute_force(&system, 2.5 + skin), "cell {:?}", cell);
    }
}

#[test]
fn up_lists_visit_pairs_once() {
    let cell = data::random_shear(11, 5.0);
    let system = data::random_system(11, cell, 30, 1);

    let mut settings = NeighborSettings::new(0.2);
    settings.direction = Direction::Up;
    let mut lists = NeighborListManager::new(settings, Arc::new(NoBonding)).unwrap();
    lists.set_potential_range(3.0).unwrap();
    lists.init(&system).unwrap();

    let mut up = Vec::new();
    for atom in 0..system.size() {
        for entry in lists.up_list(atom).unwrap().iter().flatten() {
            up.push((atom, entry.index, <[i32; 3]>::from(entry.shift)));
        }
    }
    up.sort_unstable();

    let expected = data::brute_force(&system, 3.2);
    assert_eq!(2 * up.len(), expected.len());
    assert_eq!(lists.n_pairs(), up.len());

    for &(i, j, shift) in &expected {
        let opposite = (j, i, [-shift[0], -shift[1], -shift[2]]);
        let direct = up.binary_search(&(i, j, shift)).is_ok();
        let reverse = up.binary_search(&opposite).is_ok();
        assert!(direct != reverse, "pair {:?} must be in exactly one up list", (i, j, shift));
    }
}
