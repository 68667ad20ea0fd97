use log::{debug, warn};

use crate::{Error, Matrix3, Vector3D, UnitCell, CellShape};

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a large unit cell and a small range
const MAX_NUMBER_OF_CELLS: f64 = 1e5;

/// A cell shift represents the displacement along cell axis between the actual
/// position of an atom and a periodic image of this atom.
///
/// The cell shift can be used to reconstruct the vector between two points,
/// wrapped inside the unit cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CellShift([i32; 3]);

impl std::ops::Add<CellShift> for CellShift {
    type Output = CellShift;

    fn add(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] += rhs[0];
        self.0[1] += rhs[1];
        self.0[2] += rhs[2];
        return self;
    }
}

impl std::ops::Sub<CellShift> for CellShift {
    type Output = CellShift;

    fn sub(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] -= rhs[0];
        self.0[1] -= rhs[1];
        self.0[2] -= rhs[2];
        return self;
    }
}

impl std::ops::Neg for CellShift {
    type Output = CellShift;

    fn neg(self) -> Self::Output {
        CellShift([-self[0], -self[1], -self[2]])
    }
}

impl std::ops::Index<usize> for CellShift {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<[i32; 3]> for CellShift {
    fn from(shift: [i32; 3]) -> CellShift {
        CellShift(shift)
    }
}

impl From<CellShift> for [i32; 3] {
    fn from(shift: CellShift) -> [i32; 3] {
        shift.0
    }
}

impl CellShift {
    /// Get a shift of zero, i.e. no periodic image
    pub fn zero() -> CellShift {
        CellShift([0, 0, 0])
    }

    /// Is this shift zero in all directions?
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    /// Compute the shift vector in cartesian coordinates, using the given cell
    /// matrix (stored in row major order).
    pub fn cartesian(&self, cell: &Matrix3) -> Vector3D {
        let x = cell[0][0] * self[0] as f64 + cell[1][0] * self[1] as f64 + cell[2][0] * self[2] as f64;
        let y = cell[0][1] * self[0] as f64 + cell[1][1] * self[1] as f64 + cell[2][1] * self[2] as f64;
        let z = cell[0][2] * self[0] as f64 + cell[1][2] * self[1] as f64 + cell[2][2] * self[2] as f64;
        Vector3D::new(x, y, z)
    }
}

/// One entry in the search stencil: the offset (in number of cells) from a
/// cell to one of the cells to search for neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilOffset {
    /// offset along the three lattice directions. This can be larger than the
    /// number of cells in a direction, in which case the neighboring cell is a
    /// periodic image (lattice sum).
    pub delta: [i32; 3],
    /// Is this offset in the "up" half-space? Atoms found through an up offset
    /// are up neighbors, atoms found through the opposite offset are down
    /// neighbors. The zero offset is neither, and pairs in the same cell are
    /// ordered by atom index.
    pub up: bool,
}

/// Geometry of the cell decomposition of a `UnitCell` for a given range: the
/// number of cells along each lattice vector, and the stencil of neighboring
/// cells to search.
#[derive(Debug, Clone)]
pub struct CellLattice {
    unit_cell: UnitCell,
    range: f64,
    cell_range: usize,
    n_cells: [usize; 3],
    n_search: [i32; 3],
    stencil: Vec<StencilOffset>,
    /// Origin and extent of the region covered by the cells, only used for
    /// infinite unit cells
    bounds: Option<(Vector3D, Vector3D)>,
}

impl CellLattice {
    /// Create the cell lattice for the given unit cell, `range` and
    /// `cell_range`. The positions are only used to find the region to cover
    /// with cells for infinite unit cells.
    pub fn new(unit_cell: UnitCell, range: f64, cell_range: usize, positions: &[Vector3D]) -> Result<CellLattice, Error> {
        if cell_range < 1 {
            return Err(Error::InvalidParameter(format!(
                "cell range must be at least 1, got {}", cell_range
            )));
        }

        if range.is_nan() || range == f64::INFINITY {
            return Err(Error::InvalidParameter(format!(
                "neighbor range must be a finite number, got {}", range
            )));
        }

        let bounds = if unit_cell.is_infinite() {
            Some(bounding_box(positions, range)?)
        } else {
            None
        };

        // width of the full region covered by the cells in each direction
        let widths = match bounds {
            Some((_, extent)) => extent,
            None => unit_cell.distances_between_faces(),
        };

        if range <= 0.0 {
            // no neighbors at all, a single cell with nothing to search
            debug!("neighbor range is {}, no neighbors will be found", range);
            return Ok(CellLattice {
                unit_cell,
                range,
                cell_range,
                n_cells: [1, 1, 1],
                n_search: [0, 0, 0],
                stencil: Vec::new(),
                bounds,
            });
        }

        // cells are at least range / cell_range wide
        let cell_size = range / cell_range as f64;
        let mut n_cells = [0.0; 3];
        for xyz in 0..3 {
            n_cells[xyz] = f64::max(f64::floor(widths[xyz] / cell_size), 1.0);
        }

        // limit memory consumption by ensuring we have less than `MAX_N_CELLS`
        // cells to look though
        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        if n_cells_total > MAX_NUMBER_OF_CELLS {
            // set the total number of cells close to MAX_N_CELLS, while keeping
            // roughly the ratio of cells in each direction
            let ratio_x_y = n_cells[0] / n_cells[1];
            let ratio_y_z = n_cells[1] / n_cells[2];

            n_cells[2] = f64::max(f64::trunc(f64::cbrt(MAX_NUMBER_OF_CELLS / (ratio_x_y * ratio_y_z * ratio_y_z))), 1.0);
            n_cells[1] = f64::max(f64::trunc(ratio_y_z * n_cells[2]), 1.0);
            n_cells[0] = f64::max(f64::trunc(ratio_x_y * n_cells[1]), 1.0);

            warn!(
                "too many cells for range {} ({} requested), using {}x{}x{} cells",
                range, n_cells_total, n_cells[0], n_cells[1], n_cells[2]
            );
        }

        // number of cells to search in each direction to make sure all
        // possible pairs below the range are accounted for.
        let mut n_search = [0; 3];
        for xyz in 0..3 {
            n_search[xyz] = f64::ceil(range * n_cells[xyz] / widths[xyz]) as i32;

            if bounds.is_some() {
                // no periodic images to look for
                n_search[xyz] = i32::min(n_search[xyz], n_cells[xyz] as i32 - 1);
            }
        }

        let n_cells = [n_cells[0] as usize, n_cells[1] as usize, n_cells[2] as usize];
        let cell_widths = Vector3D::new(
            widths[0] / n_cells[0] as f64,
            widths[1] / n_cells[1] as f64,
            widths[2] / n_cells[2] as f64,
        );

        let axis_aligned = unit_cell.shape() != CellShape::Triclinic;
        let stencil = build_stencil(n_search, cell_widths, range, axis_aligned);

        let lattice = CellLattice {
            unit_cell,
            range,
            cell_range,
            n_cells,
            n_search,
            stencil,
            bounds,
        };

        debug!(
            "built {}x{}x{} cells for range {}, searching {:?} cells around each cell ({} offsets){}",
            n_cells[0], n_cells[1], n_cells[2], range, n_search, lattice.stencil.len(),
            if lattice.is_lattice_sum() { ", including periodic images (lattice sum)" } else { "" }
        );

        return Ok(lattice);
    }

    /// Get the unit cell this lattice was built for
    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    /// Get the range this lattice was built for
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Get the cell range this lattice was built for
    pub fn cell_range(&self) -> usize {
        self.cell_range
    }

    /// Get the number of cells along each lattice vector
    pub fn n_cells(&self) -> [usize; 3] {
        self.n_cells
    }

    /// Get the number of cell shells searched along each lattice vector
    pub fn n_search(&self) -> [i32; 3] {
        self.n_search
    }

    /// Get the search stencil, including the zero offset
    pub fn stencil(&self) -> &[StencilOffset] {
        &self.stencil
    }

    /// Does the range extend past half of the cell in some direction? In this
    /// case, some atoms have more than one periodic image in range of each
    /// other.
    pub fn is_lattice_sum(&self) -> bool {
        if self.unit_cell.is_infinite() || self.range <= 0.0 {
            return false;
        }

        let widths = self.unit_cell.distances_between_faces();
        return (0..3).any(|xyz| self.range > 0.5 * widths[xyz]);
    }

    /// Check if this lattice can be used for the given unit cell, range and
    /// cell range
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, unit_cell: &UnitCell, range: f64, cell_range: usize) -> bool {
        self.unit_cell == *unit_cell && self.range == range && self.cell_range == cell_range
    }

    /// Is the `position` inside the region covered by this lattice? This is
    /// always true for periodic cells.
    pub fn contains(&self, position: Vector3D) -> bool {
        match self.bounds {
            None => true,
            Some((origin, extent)) => {
                let relative = position - origin;
                (0..3).all(|xyz| relative[xyz] >= 0.0 && relative[xyz] <= extent[xyz])
            }
        }
    }

    /// Find the cell containing `position`, and the shift from the actual
    /// position to the image of the atom inside the unit cell.
    pub fn locate(&self, position: Vector3D) -> Result<([usize; 3], CellShift), Error> {
        if !position.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "atom position is not finite: {:?}", position
            )));
        }

        let n_cells = self.n_cells;
        match self.bounds {
            None => {
                let fractional = self.unit_cell.fractional(position);
                // find the subcell in which this atom 'should go'
                let cell_index = [
                    f64::floor(fractional[0] * n_cells[0] as f64) as i32,
                    f64::floor(fractional[1] * n_cells[1] as f64) as i32,
                    f64::floor(fractional[2] * n_cells[2] as f64) as i32,
                ];

                // deal with pbc by wrapping the atom inside if it was outside
                // of the cell
                let (shift, cell_index) = divmod_vec(cell_index, n_cells);
                return Ok((cell_index, CellShift(shift)));
            }
            Some((origin, extent)) => {
                let relative = position - origin;
                let mut cell_index = [0; 3];
                for xyz in 0..3 {
                    if n_cells[xyz] > 1 {
                        let index = f64::floor(relative[xyz] / extent[xyz] * n_cells[xyz] as f64);
                        cell_index[xyz] = f64::clamp(index, 0.0, (n_cells[xyz] - 1) as f64) as usize;
                    }
                }
                return Ok((cell_index, CellShift::zero()));
            }
        }
    }

    /// Get the cell at `delta` from `cell`, and the number of periodic
    /// images crossed to get there. This returns `None` if the neighboring
    /// cell does not exist (outside of an infinite unit cell).
    pub fn neighbor_cell(&self, cell: [usize; 3], delta: [i32; 3]) -> Option<([usize; 3], CellShift)> {
        let target = [
            cell[0] as i32 + delta[0],
            cell[1] as i32 + delta[1],
            cell[2] as i32 + delta[2],
        ];

        if self.bounds.is_some() {
            for xyz in 0..3 {
                if target[xyz] < 0 || target[xyz] >= self.n_cells[xyz] as i32 {
                    return None;
                }
            }
            return Some(([target[0] as usize, target[1] as usize, target[2] as usize], CellShift::zero()));
        }

        let (shift, neighbor) = divmod_vec(target, self.n_cells);
        return Some((neighbor, CellShift(shift)));
    }
}

/// Is this offset lexicographically positive (first non-zero component is
/// positive)?
fn is_up(delta: [i32; 3]) -> bool {
    for value in delta {
        if value != 0 {
            return value > 0;
        }
    }
    return false;
}

/// Build the list of cell offsets that can contain atoms closer than `range`.
///
/// Two atoms in cells separated by `delta` are at least `(|delta| - 1) *
/// width` apart along the normal to the faces of the cells. For
/// axis-aligned cells these distances are orthogonal and can be combined.
fn build_stencil(n_search: [i32; 3], cell_widths: Vector3D, range: f64, axis_aligned: bool) -> Vec<StencilOffset> {
    let range2 = range * range;
    let gap = |delta: i32, xyz: usize| {
        f64::max(delta.abs() as f64 - 1.0, 0.0) * cell_widths[xyz]
    };

    let mut stencil = Vec::new();
    for delta_x in -n_search[0]..=n_search[0] {
        for delta_y in -n_search[1]..=n_search[1] {
            for delta_z in -n_search[2]..=n_search[2] {
                let gaps = [gap(delta_x, 0), gap(delta_y, 1), gap(delta_z, 2)];
                let too_far = if axis_aligned {
                    gaps[0] * gaps[0] + gaps[1] * gaps[1] + gaps[2] * gaps[2] >= range2
                } else {
                    gaps.iter().any(|&gap| gap >= range)
                };

                if too_far {
                    continue;
                }

                let delta = [delta_x, delta_y, delta_z];
                stencil.push(StencilOffset {
                    delta: delta,
                    up: is_up(delta),
                });
            }
        }
    }

    return stencil;
}

/// Get the region covered by the cells for an infinite unit cell: the
/// bounding box of all positions, padded by half the range on all sides.
fn bounding_box(positions: &[Vector3D], range: f64) -> Result<(Vector3D, Vector3D), Error> {
    let mut min = Vector3D::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut max = Vector3D::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);

    for position in positions {
        if !position.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "atom position is not finite: {:?}", position
            )));
        }

        for xyz in 0..3 {
            min[xyz] = f64::min(min[xyz], position[xyz]);
            max[xyz] = f64::max(max[xyz], position[xyz]);
        }
    }

    if positions.is_empty() {
        min = Vector3D::zero();
        max = Vector3D::zero();
    }

    let padding = if range > 0.0 { 0.5 * range } else { 0.5 };
    let padding = Vector3D::new(padding, padding, padding);
    let origin = min - padding;
    let extent = max - min + 2.0 * padding;
    return Ok((origin, extent));
}

/// Function to compute both quotient and remainder of the division of a by b.
/// This function follows Python convention, making sure the remainder have the
/// same sign as `b`.
fn divmod(a: i32, b: usize) -> (i32, usize) {
    debug_assert!(b < (i32::MAX as usize));
    let b = b as i32;
    let mut quotient = a / b;
    let mut remainder = a % b;
    if remainder < 0 {
        remainder += b;
        quotient -= 1;
    }
    return (quotient, remainder as usize);
}

/// Apply the [`divmod`] function to three components at the time
fn divmod_vec(a: [i32; 3], b: [usize; 3]) -> ([i32; 3], [usize; 3]) {
    let (qx, rx) = divmod(a[0], b[0]);
    let (qy, ry) = divmod(a[1], b[1]);
    let (qz, rz) = divmod(a[2], b[2]);
    return ([qx, qy, qz], [rx, ry, rz]);
}
