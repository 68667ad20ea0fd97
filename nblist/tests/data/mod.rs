#![allow(dead_code)]

use serde_json::Value;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use nblist::{CellShift, Matrix3, NeighborIterator, SimpleSystem, System, UnitCell, Vector3D};

/// Load all the structures in `tests/data/<path>`, together with their name
pub fn load_structures(path: &str) -> Vec<(String, SimpleSystem)> {
    let json = std::fs::read_to_string(format!("tests/data/{}", path))
        .expect("failed to read input file");

    let data: Value = serde_json::from_str(&json).expect("failed to parse JSON");

    let mut structures = Vec::new();
    for structure in data.as_array().expect("structures must be an array") {
        let name = structure["name"].as_str().expect("name must be a string");
        let mut system = SimpleSystem::new(read_cell(&structure["cell"]));

        let types = structure["types"].as_array().expect("types must be an array");
        let positions = structure["positions"].as_array().expect("positions must be an array");
        for (atom_type, position) in types.iter().zip(positions) {
            let atom_type = atom_type.as_u64().expect("types must be integers") as usize;
            let position = position.as_array().expect("position must be an array");
            let position = Vector3D::new(
                position[0].as_f64().unwrap(),
                position[1].as_f64().unwrap(),
                position[2].as_f64().unwrap(),
            );

            system.add_atom(atom_type, position);
        }

        structures.push((name.to_owned(), system));
    }

    return structures;
}

fn read_cell(cell: &Value) -> UnitCell {
    let cell = cell.as_array().expect("cell must be an array");
    let matrix = Matrix3::new([
        [cell[0].as_f64().unwrap(), cell[1].as_f64().unwrap(), cell[2].as_f64().unwrap()],
        [cell[3].as_f64().unwrap(), cell[4].as_f64().unwrap(), cell[5].as_f64().unwrap()],
        [cell[6].as_f64().unwrap(), cell[7].as_f64().unwrap(), cell[8].as_f64().unwrap()],
    ]);

    if matrix == Matrix3::zero() {
        UnitCell::infinite()
    } else {
        UnitCell::from(matrix)
    }
}

/// Slanted box with side `length` along each axis, and random shear
/// between -length/2 and length/2
pub fn random_shear(seed: u64, length: f64) -> UnitCell {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shear = || length * (rng.gen::<f64>() - 0.5);

    UnitCell::from(Matrix3::new([
        [length, 0.0, 0.0],
        [shear(), length, 0.0],
        [shear(), shear(), length],
    ]))
}

/// `n_atoms` atoms uniformly distributed in the `cell`, with types cycling
/// in `0..n_types`
pub fn random_system(seed: u64, cell: UnitCell, n_atoms: usize, n_types: usize) -> SimpleSystem {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut system = SimpleSystem::new(cell);
    for i in 0..n_atoms {
        let fractional = Vector3D::new(rng.gen(), rng.gen(), rng.gen());
        system.add_atom(i % n_types, cell.cartesian(fractional));
    }
    return system;
}

/// Move all atoms by a random displacement between `-max` and `max` along
/// each axis
pub fn random_displacements(rng: &mut StdRng, system: &mut SimpleSystem, max: f64) {
    for position in system.positions_mut() {
        *position += Vector3D::new(
            max * (2.0 * rng.gen::<f64>() - 1.0),
            max * (2.0 * rng.gen::<f64>() - 1.0),
            max * (2.0 * rng.gen::<f64>() - 1.0),
        );
    }
}

/// All `(i, j, shift)` such that `positions[j] + shift` is closer than
/// `range` to `positions[i]`, found by checking every periodic image.
pub fn brute_force(system: &dyn System, range: f64) -> Vec<(usize, usize, [i32; 3])> {
    let cell = system.cell();
    let matrix = cell.matrix();
    let positions = system.positions();

    let mut n_images = [0; 3];
    if !cell.is_infinite() {
        let distances = cell.distances_between_faces();
        for xyz in 0..3 {
            n_images[xyz] = f64::ceil(range / distances[xyz]) as i32 + 1;
        }
    }

    let mut pairs = Vec::new();
    for i in 0..positions.len() {
        for j in 0..positions.len() {
            let delta = positions[j] - positions[i];
            let mut center = [0; 3];
            if !cell.is_infinite() {
                let fractional = cell.fractional(delta);
                for xyz in 0..3 {
                    center[xyz] = -f64::round(fractional[xyz]) as i32;
                }
            }

            for a in (center[0] - n_images[0])..=(center[0] + n_images[0]) {
                for b in (center[1] - n_images[1])..=(center[1] + n_images[1]) {
                    for c in (center[2] - n_images[2])..=(center[2] + n_images[2]) {
                        if i == j && a == 0 && b == 0 && c == 0 {
                            continue;
                        }

                        let vector = delta + CellShift::from([a, b, c]).cartesian(&matrix);
                        if vector.norm2() < range * range {
                            pairs.push((i, j, [a, b, c]));
                        }
                    }
                }
            }
        }
    }

    pairs.sort_unstable();
    return pairs;
}

/// Shortest periodic image of `vector` in the `cell`, checking all shifts
/// up to 4 cells away from the rounded fractional coordinates
pub fn shortest_image(cell: &UnitCell, vector: Vector3D) -> Vector3D {
    let matrix = cell.matrix();
    let fractional = cell.fractional(vector);
    let center = [
        -f64::round(fractional[0]) as i32,
        -f64::round(fractional[1]) as i32,
        -f64::round(fractional[2]) as i32,
    ];

    let mut shortest = vector;
    for a in (center[0] - 4)..=(center[0] + 4) {
        for b in (center[1] - 4)..=(center[1] + 4) {
            for c in (center[2] - 4)..=(center[2] + 4) {
                let image = vector + CellShift::from([a, b, c]).cartesian(&matrix);
                if image.norm2() < shortest.norm2() {
                    shortest = image;
                }
            }
        }
    }
    return shortest;
}

/// All neighbors found by the `iterator`, in the same format as
/// [`brute_force`]
pub fn iterator_neighbors(iterator: &NeighborIterator) -> Vec<(usize, usize, [i32; 3])> {
    let mut pairs = Vec::new();
    for atom in 0..iterator.size() {
        iterator.for_each_neighbor(atom, |neighbor| {
            pairs.push((atom, neighbor.index, neighbor.shift.into()));
        }).expect("atom is in bounds");
    }
    pairs.sort_unstable();
    return pairs;
}

/// Check that all pairs in `expected` are also in `actual`
pub fn assert_contains(actual: &[(usize, usize, [i32; 3])], expected: &[(usize, usize, [i32; 3])], context: &str) {
    for pair in expected {
        assert!(actual.binary_search(pair).is_ok(), "missing pair {:?} ({})", pair, context);
    }
}
