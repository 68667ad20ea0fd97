//! The `UnitCell` type represents the enclosing box of a simulated system, with
//! some type of periodic condition.
use crate::{Error, Matrix3, Vector3D};

/// The shape of a cell determine how we will be able to compute the periodic
/// boundaries condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellShape {
    /// Infinite unit cell, with no boundaries
    Infinite,
    /// Orthorhombic unit cell, with cuboid shape
    Orthorhombic,
    /// Triclinic unit cell, with arbitrary parallelepiped shape. This is the
    /// shape of deformable (slanted) simulation boxes.
    Triclinic,
}

/// An `UnitCell` defines the system physical boundaries.
///
/// The cell matrix is stored in row major order: each row of the matrix is one
/// of the lattice vectors `a`, `b` and `c`. The shape of the cell can be any of
/// the [`CellShape`], and will influence how periodic boundary conditions are
/// applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    /// Unit cell matrix
    matrix: Matrix3,
    /// Transpose of the unit cell matrix, cached from matrix
    transpose: Matrix3,
    /// Inverse of the transpose of the unit cell matrix, cached from matrix
    inverse: Matrix3,
    /// Unit cell shape
    shape: CellShape,
}

impl From<Matrix3> for UnitCell {
    fn from(matrix: Matrix3) -> UnitCell {
        match UnitCell::new(matrix) {
            Ok(cell) => cell,
            Err(e) => panic!("{}", e),
        }
    }
}

impl UnitCell {
    /// Create a new periodic unit cell from the given matrix, containing the
    /// lattice vectors as rows.
    ///
    /// Degenerate matrices (zero or negative volume, non-finite entries) are
    /// rejected, since no cell lattice can be built from them.
    pub fn new(matrix: Matrix3) -> Result<UnitCell, Error> {
        if !matrix.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "unit cell matrix contains non-finite values: {:?}", matrix
            )));
        }

        if matrix.determinant() <= 1e-6 {
            return Err(Error::InvalidParameter(format!(
                "unit cell matrix is not invertible or left-handed (determinant = {})",
                matrix.determinant()
            )));
        }

        let is_close_0 = |value| f64::abs(value) < 1e-6;
        let is_diagonal = |matrix: Matrix3| {
            is_close_0(matrix[0][1]) && is_close_0(matrix[0][2]) &&
            is_close_0(matrix[1][0]) && is_close_0(matrix[1][2]) &&
            is_close_0(matrix[2][0]) && is_close_0(matrix[2][1])
        };

        let shape = if is_diagonal(matrix) {
            CellShape::Orthorhombic
        } else {
            CellShape::Triclinic
        };

        return Ok(UnitCell {
            matrix: matrix,
            transpose: matrix.transposed(),
            inverse: matrix.transposed().inverse(),
            shape: shape
        });
    }

    /// Create an infinite unit cell, without periodic boundary conditions
    pub fn infinite() -> UnitCell {
        UnitCell {
            matrix: Matrix3::zero(),
            transpose: Matrix3::zero(),
            inverse: Matrix3::zero(),
            shape: CellShape::Infinite,
        }
    }

    /// Create an orthorhombic unit cell, with side lengths `a, b, c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> UnitCell {
        assert!(a > 0.0 && b > 0.0 && c > 0.0, "Cell lengths must be positive");
        let matrix = Matrix3::new([
            [a, 0.0, 0.0],
            [0.0, b, 0.0],
            [0.0, 0.0, c]
        ]);
        UnitCell {
            matrix: matrix,
            transpose: matrix,
            inverse: matrix.inverse(),
            shape: CellShape::Orthorhombic,
        }
    }

    /// Create a cubic unit cell, with side lengths `length, length, length`.
    pub fn cubic(length: f64) -> UnitCell {
        UnitCell::orthorhombic(length, length, length)
    }

    /// Create a triclinic unit cell, with side lengths `a, b, c` and angles
    /// `alpha, beta, gamma` in degrees.
    pub fn triclinic(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> UnitCell {
        assert!(a > 0.0 && b > 0.0 && c > 0.0, "Cell lengths must be positive");
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let b_x = b * cos_gamma;
        let b_y = b * sin_gamma;

        let c_x = c * cos_beta;
        let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c_z = f64::sqrt(c * c - c_y * c_y - c_x * c_x);

        return UnitCell::from(Matrix3::new([
            [a,   0.0, 0.0],
            [b_x, b_y, 0.0],
            [c_x, c_y, c_z],
        ]));
    }

    /// Get the cell shape
    pub fn shape(&self) -> CellShape {
        self.shape
    }

    /// Check if this unit cell is infinite, *i.e.* if it does not have
    /// periodic boundary conditions.
    pub fn is_infinite(&self) -> bool {
        self.shape() == CellShape::Infinite
    }

    /// Get the matricial representation of the unit cell
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// Get the three lattice vectors of this cell
    pub fn vectors(&self) -> [Vector3D; 3] {
        [self.matrix[0].into(), self.matrix[1].into(), self.matrix[2].into()]
    }

    /// Get the distances between faces of the unit cell. These are the
    /// widths of the cell along each lattice direction, and the relevant
    /// lengths when deciding how many periodic images to consider.
    pub fn distances_between_faces(&self) -> Vector3D {
        if self.shape == CellShape::Infinite {
            return Vector3D::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        }

        let [a, b, c] = self.vectors();
        // Plans normal vectors
        let na = (b ^ c).normalized();
        let nb = (c ^ a).normalized();
        let nc = (a ^ b).normalized();

        Vector3D::new(f64::abs(na * a), f64::abs(nb * b), f64::abs(nc * c))
    }

    /// Get the volume of the cell
    pub fn volume(&self) -> f64 {
        match self.shape {
            CellShape::Infinite => 0.0,
            CellShape::Orthorhombic => self.matrix[0][0] * self.matrix[1][1] * self.matrix[2][2],
            CellShape::Triclinic => self.matrix.determinant(),
        }
    }

    /// Get a copy of this cell, with all lattice vectors multiplied by
    /// `factor`.
    pub fn scaled(&self, factor: f64) -> Result<UnitCell, Error> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "cell scaling factor must be positive, got {}", factor
            )));
        }

        if self.is_infinite() {
            return Ok(*self);
        }

        let mut cell = UnitCell::new(self.matrix * factor)?;
        // keep the shape, a scaled orthorhombic cell stays orthorhombic
        cell.shape = self.shape;
        return Ok(cell);
    }
}

/// Geometric operations using periodic boundary conditions
impl UnitCell {
    /// Wrap a vector in the unit cell, obeying the periodic boundary conditions.
    /// For a cubic cell of side length `L`, this produce a vector with all
    /// components in `[0, L)`. This gives the central image of a position.
    pub fn wrap_vector(&self, vector: &mut Vector3D) {
        match self.shape {
            CellShape::Infinite => (),
            CellShape::Orthorhombic => {
                for i in 0..3 {
                    let length = self.matrix[i][i];
                    vector[i] -= f64::floor(vector[i] / length) * length;
                }
            }
            CellShape::Triclinic => {
                let mut fractional = self.fractional(*vector);
                fractional[0] -= f64::floor(fractional[0]);
                fractional[1] -= f64::floor(fractional[1]);
                fractional[2] -= f64::floor(fractional[2]);
                *vector = self.cartesian(fractional);
            }
        }
    }

    /// Find the image of a vector in the unit cell, obeying the periodic
    /// boundary conditions. For a cubic cell of side length `L`, this produce a
    /// vector with all components in `[-L/2, L/2)`. This gives the nearest
    /// image of a displacement vector.
    pub fn vector_image(&self, vector: &mut Vector3D) {
        match self.shape {
            CellShape::Infinite => (),
            CellShape::Orthorhombic => {
                for i in 0..3 {
                    let length = self.matrix[i][i];
                    vector[i] -= f64::round(vector[i] / length) * length;
                }
            }
            CellShape::Triclinic => {
                let mut fractional = self.fractional(*vector);
                fractional[0] -= f64::round(fractional[0]);
                fractional[1] -= f64::round(fractional[1]);
                fractional[2] -= f64::round(fractional[2]);
                *vector = self.cartesian(fractional);

                // in strongly slanted cells, rounding the fractional
                // coordinates does not always give the shortest vector
                let n_images = self.images_shorter_than(vector.norm());
                if n_images != [0, 0, 0] {
                    *vector = self.shortest_image(fractional, n_images);
                }
            }
        }
    }

    /// Get the number of images to check along each lattice vector to find
    /// all vectors shorter than `length`. A vector with fractional
    /// coordinates `f` has a norm larger than `|f_i| / |b_i|`, where `b_i`
    /// are the reciprocal lattice vectors.
    fn images_shorter_than(&self, length: f64) -> [i32; 3] {
        let mut n_images = [0; 3];
        for i in 0..3 {
            let reciprocal = Vector3D::from(self.inverse[i]);
            n_images[i] = f64::floor(length * reciprocal.norm() + 0.5) as i32;
        }
        return n_images;
    }

    /// Search the `n_images` around the `fractional` vector for the shortest
    /// periodic image
    fn shortest_image(&self, fractional: Vector3D, n_images: [i32; 3]) -> Vector3D {
        let mut shortest = self.cartesian(fractional);
        let mut shortest_norm2 = shortest.norm2();
        for a in -n_images[0]..=n_images[0] {
            for b in -n_images[1]..=n_images[1] {
                for c in -n_images[2]..=n_images[2] {
                    let shift = Vector3D::new(a as f64, b as f64, c as f64);
                    let candidate = self.cartesian(fractional + shift);
                    let norm2 = candidate.norm2();
                    if norm2 < shortest_norm2 {
                        shortest = candidate;
                        shortest_norm2 = norm2;
                    }
                }
            }
        }
        return shortest;
    }

    /// Get the fractional representation of the `vector` in this cell
    pub fn fractional(&self, vector: Vector3D) -> Vector3D {
        // this needs to use the inverse of the transpose of the matrix, since
        // we only have code to multiply a vector by a matrix on the left
        return self.inverse * vector;
    }

    /// Get the Cartesian representation of the `fractional` vector in this
    /// cell
    pub fn cartesian(&self, fractional: Vector3D) -> Vector3D {
        return self.transpose * fractional;
    }

    /// Periodic boundary conditions squared distance between the point `u` and
    /// the point `v`
    pub fn distance2(&self, u: Vector3D, v: Vector3D) -> f64 {
        let mut d = v - u;
        self.vector_image(&mut d);
        return d.norm2();
    }

    /// Periodic boundary conditions distance between the point `u` and
    /// the point `v`
    pub fn distance(&self, u: Vector3D, v: Vector3D) -> f64 {
        return f64::sqrt(self.distance2(u, v));
    }
}
