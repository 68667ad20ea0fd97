//! Energy and forces from the potential masters, compared with each other
//! and with finite differences of the energy.

use std::sync::Arc;

use approx::assert_relative_eq;

use nblist::{Matrix3, NeighborSettings, PotentialMaster, PotentialTable, SimpleSystem, System, Target, ThreadedPotentialMaster, UnitCell, Vector3D};
use nblist::compute::PairPotential;
use nblist::compute::{Harmonic, LennardJones, UniformField};

mod data;

fn table() -> PotentialTable {
    let mut table = PotentialTable::new(2);
    table.set_pair(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5).unwrap())).unwrap();
    table.set_pair(0, 1, Arc::new(LennardJones::new(1.1, 0.6, 2.7).unwrap())).unwrap();
    table.set_pair(1, 1, Arc::new(LennardJones::new(1.2, 0.3, 3.0).unwrap())).unwrap();
    table.set_one_body(1, Arc::new(UniformField { force: Vector3D::new(0.1, -0.2, 0.3) })).unwrap();
    table.add_bond(0, 1, Arc::new(Harmonic { k: 20.0, r0: 1.2 })).unwrap();
    table.add_bond(5, 2, Arc::new(Harmonic { k: 10.0, r0: 1.0 })).unwrap();
    return table;
}

/// A dilute fluid where atoms are not too close to one another
fn fluid(seed: u64, cell: UnitCell) -> SimpleSystem {
    fill_with_fluid(seed, SimpleSystem::new(cell))
}

/// Add atoms to the `system` at random positions, keeping them at least 0.9
/// away from all other atoms
fn fill_with_fluid(seed: u64, mut system: SimpleSystem) -> SimpleSystem {
    let cell = system.cell();
    let candidates = data::random_system(seed, cell, 400, 2);
    for (&atom_type, &position) in candidates.types().iter().zip(candidates.positions()) {
        let too_close = system.positions().iter().any(|&other| cell.distance(position, other) < 0.9);
        if !too_close {
            system.add_atom(atom_type, position);
        }
    }
    return system;
}

#[test]
fn masters_agree() {
    for (seed, cell) in [UnitCell::cubic(9.0), data::random_shear(8, 9.0)].iter().enumerate() {
        let system = fluid(seed as u64, *cell);
        assert!(system.size() > 100);

        let mut lists = PotentialMaster::new(table(), NeighborSettings::new(0.3)).unwrap();
        let mut cells = PotentialMaster::with_cells(table(), 2).unwrap();

        let mut settings = NeighborSettings::new(0.3);
        settings.threads = 4;
        let mut threaded = ThreadedPotentialMaster::new(table(), settings).unwrap();

        let expected = cells.compute(&system, Target::All, true).unwrap();
        for computed in [
            lists.compute(&system, Target::All, true).unwrap(),
            threaded.compute(&system, true).unwrap(),
        ] {
            assert_relative_eq!(computed.energy, expected.energy, max_relative = 1e-10);
            assert_relative_eq!(computed.virial, expected.virial, max_relative = 1e-10);
            for (a, b) in computed.forces.iter().zip(&expected.forces) {
                assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
            }
        }
    }
}

#[test]
fn forces_are_energy_derivatives() {
    let mut system = fluid(12, data::random_shear(12, 8.0));
    let mut master = PotentialMaster::new(table(), NeighborSettings::new(0.5)).unwrap();

    let computed = master.compute(&system, Target::All, true).unwrap();
    let delta = 1e-6;
    for atom in [0, 1, 2, 5, 17, 42] {
        for xyz in 0..3 {
            system.positions_mut()[atom][xyz] += delta;
            let plus = master.energy(&system, Target::All).unwrap();
            system.positions_mut()[atom][xyz] -= 2.0 * delta;
            let minus = master.energy(&system, Target::All).unwrap();
            system.positions_mut()[atom][xyz] += delta;

            let finite_difference = -(plus - minus) / (2.0 * delta);
            assert_relative_eq!(computed.forces[atom][xyz], finite_difference, epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    // moving by 1e-6 never needs a rebuild
    assert_eq!(master.neighbor_lists().unwrap().rebuild_count(), 1);
}

#[test]
fn single_atom_energies() {
    let system = fluid(21, UnitCell::cubic(8.0));
    let mut lists = PotentialMaster::new(table(), NeighborSettings::new(0.3)).unwrap();
    let mut cells = PotentialMaster::with_cells(table(), 1).unwrap();

    for atom in 0..system.size() {
        let from_lists = lists.compute(&system, Target::Atom(atom), true).unwrap();
        let from_cells = cells.compute(&system, Target::Atom(atom), true).unwrap();
        assert_relative_eq!(from_lists.energy, from_cells.energy, epsilon = 1e-12, max_relative = 1e-10);
        assert_relative_eq!(from_lists.forces[atom], from_cells.forces[atom], epsilon = 1e-9, max_relative = 1e-9);
    }
}

/// Same pair potentials as `table`, with `bonds` either added as bonds or
/// only as exclusions
fn bonded_table(bonds: &[(usize, usize, Harmonic)], with_bonds: bool) -> PotentialTable {
    let mut table = PotentialTable::new(2);
    table.set_pair(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5).unwrap())).unwrap();
    table.set_pair(0, 1, Arc::new(LennardJones::new(1.1, 0.6, 2.7).unwrap())).unwrap();
    table.set_pair(1, 1, Arc::new(LennardJones::new(1.2, 0.3, 3.0).unwrap())).unwrap();
    for &(first, second, spring) in bonds {
        if with_bonds {
            table.add_bond(first, second, Arc::new(spring)).unwrap();
        } else {
            table.add_exclusion(first, second).unwrap();
        }
    }
    return table;
}

#[test]
fn bonds_across_slanted_boundaries() {
    let strongly_sheared = UnitCell::from(Matrix3::new([
        [7.0, 0.0, 0.0],
        [3.5, 7.0, 0.0],
        [0.0, 0.0, 7.0],
    ]));

    for (seed, cell) in [strongly_sheared, data::random_shear(5, 7.0)].iter().enumerate() {
        // the nearest image of the first two atoms is across the boundary
        // along `a`, even if their fractional coordinates differ by less
        // than 0.5 in the strongly sheared cell
        let mut system = SimpleSystem::new(*cell);
        system.add_atom(0, Vector3D::new(0.1, 0.1, 3.5));
        system.add_atom(0, Vector3D::new(4.825, 3.25, 3.5));
        let system = fill_with_fluid(30 + seed as u64, system);
        assert!(system.size() > 40);

        let mut bonds = vec![(0, 1, Harmonic { k: 1.0, r0: 0.0 })];
        for i in 2..14 {
            bonds.push((i, i + 20, Harmonic { k: 5.0, r0: 1.0 }));
        }

        // bond energy and forces, using the shortest image found by
        // checking all shifts
        let positions = system.positions();
        let mut bond_energy = 0.0;
        let mut bond_forces = vec![Vector3D::zero(); system.size()];
        for &(first, second, spring) in &bonds {
            let vector = data::shortest_image(cell, positions[second] - positions[first]);
            let r = vector.norm();
            bond_energy += spring.energy(r * r);

            let force = spring.k * (r - spring.r0) / r * vector;
            bond_forces[first] += force;
            bond_forces[second] -= force;
        }

        if seed == 0 {
            assert_relative_eq!(bonds[0].2.energy(cell.distance2(positions[0], positions[1])), 7.549, max_relative = 1e-3);
        }

        let mut without_bonds = PotentialMaster::with_cells(bonded_table(&bonds, false), 2).unwrap();
        let reference = without_bonds.compute(&system, Target::All, true).unwrap();

        let mut lists = PotentialMaster::new(bonded_table(&bonds, true), NeighborSettings::new(0.3)).unwrap();
        let mut cells = PotentialMaster::with_cells(bonded_table(&bonds, true), 2).unwrap();
        let mut settings = NeighborSettings::new(0.3);
        settings.threads = 3;
        let mut threaded = ThreadedPotentialMaster::new(bonded_table(&bonds, true), settings).unwrap();

        for computed in [
            lists.compute(&system, Target::All, true).unwrap(),
            cells.compute(&system, Target::All, true).unwrap(),
            threaded.compute(&system, true).unwrap(),
        ] {
            assert_relative_eq!(computed.energy, reference.energy + bond_energy, epsilon = 1e-9, max_relative = 1e-10);
            for atom in 0..system.size() {
                let expected = reference.forces[atom] + bond_forces[atom];
                assert_relative_eq!(computed.forces[atom], expected, epsilon = 1e-8, max_relative = 1e-9);
            }
        }

        // all terms involving the first atom, including the bond
        let single = lists.compute(&system, Target::Atom(0), true).unwrap();
        let single_reference = without_bonds.compute(&system, Target::Atom(0), true).unwrap();
        let r2 = data::shortest_image(cell, positions[1] - positions[0]).norm2();
        assert_relative_eq!(single.energy, single_reference.energy + bonds[0].2.energy(r2), epsilon = 1e-9, max_relative = 1e-10);
    }
}
