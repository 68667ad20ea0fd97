use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::{System, Vector3D};
use super::{UnitCell, SimpleSystem};

/// Create a system with `n_atoms` atoms placed uniformly at random inside the
/// `cell` (or inside a cube of side 10 for infinite cells), with types
/// cycling through `0..n_types`.
pub fn random_system(seed: u64, cell: UnitCell, n_atoms: usize, n_types: usize) -> SimpleSystem {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut system = SimpleSystem::new(cell);
    for i in 0..n_atoms {
        let fractional = Vector3D::new(rng.gen(), rng.gen(), rng.gen());
        let position = if cell.is_infinite() {
            10.0 * fractional
        } else {
            cell.cartesian(fractional)
        };
        system.add_atom(i % n_types, position);
    }
    return system;
}

/// Face-centered cubic crystal with `n` conventional cells of side `a` in
/// each direction
pub fn fcc_crystal(n: usize, a: f64) -> SimpleSystem {
    let mut system = SimpleSystem::new(UnitCell::cubic(n as f64 * a));
    let basis = [
        Vector3D::new(0.0, 0.0, 0.0),
        Vector3D::new(0.5, 0.5, 0.0),
        Vector3D::new(0.5, 0.0, 0.5),
        Vector3D::new(0.0, 0.5, 0.5),
    ];
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let origin = Vector3D::new(i as f64, j as f64, k as f64);
                for site in &basis {
                    system.add_atom(0, a * (origin + site));
                }
            }
        }
    }
    return system;
}

/// Find all neighbors by checking every periodic image of every pair. This
/// returns `(i, j, shift)` for all ordered pairs closer than `range`, sorted.
pub fn brute_force_neighbors(system: &dyn System, range: f64) -> Vec<(usize, usize, [i32; 3])> {
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

    let mut neighbors = Vec::new();
    for i in 0..positions.len() {
        for j in 0..positions.len() {
            let delta = positions[j] - positions[i];
            let center = if cell.is_infinite() {
                [0, 0, 0]
            } else {
                let fractional = cell.fractional(delta);
                [
                    -f64::round(fractional[0]) as i32,
                    -f64::round(fractional[1]) as i32,
                    -f64::round(fractional[2]) as i32,
                ]
            };

            for sx in (center[0] - n_images[0])..=(center[0] + n_images[0]) {
                for sy in (center[1] - n_images[1])..=(center[1] + n_images[1]) {
                    for sz in (center[2] - n_images[2])..=(center[2] + n_images[2]) {
                        if i == j && sx == 0 && sy == 0 && sz == 0 {
                            continue;
                        }
                        let shift = crate::CellShift::from([sx, sy, sz]);
                        let vector = delta + shift.cartesian(&matrix);
                        if vector.norm2() < range * range {
                            neighbors.push((i, j, [sx, sy, sz]));
                        }
                    }
                }
            }
        }
    }

    neighbors.sort_unstable();
    return neighbors;
}
