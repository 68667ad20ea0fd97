use crate::{Error, Vector3D};

/// A pair potential, depending only on the distance between two atoms.
///
/// Functions take the squared distance `r2` to avoid computing square roots
/// when possible.
pub trait PairPotential: Send + Sync {
    /// Distance beyond which this potential is zero. This is used to build
    /// the neighbor lists, and can be infinite for potentials that are only
    /// used between bonded atoms.
    fn range(&self) -> f64;

    /// Energy at squared distance `r2`
    fn energy(&self, r2: f64) -> f64;

    /// Virial function `r dU/dr` at squared distance `r2`
    fn du(&self, r2: f64) -> f64;
}

/// A potential acting on single atoms, e.g. an external field
pub trait OneBodyPotential: Send + Sync {
    /// Energy of an atom at `position`
    fn energy(&self, position: Vector3D) -> f64;

    /// Gradient of the energy with respect to the `position`
    fn gradient(&self, position: Vector3D) -> Vector3D;
}

/// Truncated Lennard-Jones potential: `U(r) = 4 ε ((σ/r)^12 - (σ/r)^6)` for
/// `r < cutoff`, and zero after.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LennardJones {
    /// distance at which the potential is zero
    pub sigma: f64,
    /// depth of the potential well
    pub epsilon: f64,
    /// distance after which the potential is truncated
    pub cutoff: f64,
}

impl LennardJones {
    pub fn new(sigma: f64, epsilon: f64, cutoff: f64) -> Result<LennardJones, Error> {
        let potential = LennardJones { sigma, epsilon, cutoff };
        potential.validate()?;
        return Ok(potential);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive sigma for Lennard-Jones potential, got {}", self.sigma
            )));
        }

        if !self.epsilon.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "expected finite epsilon for Lennard-Jones potential, got {}", self.epsilon
            )));
        }

        if !(self.cutoff > 0.0 && self.cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive cutoff for Lennard-Jones potential, got {}", self.cutoff
            )));
        }

        return Ok(());
    }
}

impl PairPotential for LennardJones {
    fn range(&self) -> f64 {
        self.cutoff
    }

    #[inline]
    fn energy(&self, r2: f64) -> f64 {
        let s2 = self.sigma * self.sigma / r2;
        let s6 = s2 * s2 * s2;
        return 4.0 * self.epsilon * (s6 * s6 - s6);
    }

    #[inline]
    fn du(&self, r2: f64) -> f64 {
        let s2 = self.sigma * self.sigma / r2;
        let s6 = s2 * s2 * s2;
        return -24.0 * self.epsilon * (2.0 * s6 * s6 - s6);
    }
}

/// Harmonic spring `U(r) = k / 2 (r - r0)^2`, typically used for bonds
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Harmonic {
    /// spring constant
    pub k: f64,
    /// equilibrium distance
    pub r0: f64,
}

impl PairPotential for Harmonic {
    fn range(&self) -> f64 {
        f64::INFINITY
    }

    fn energy(&self, r2: f64) -> f64 {
        let dr = r2.sqrt() - self.r0;
        return 0.5 * self.k * dr * dr;
    }

    fn du(&self, r2: f64) -> f64 {
        let r = r2.sqrt();
        return self.k * r * (r - self.r0);
    }
}

/// Constant external force `F` acting on atoms, `U(x) = -F.x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField {
    pub force: Vector3D,
}

impl OneBodyPotential for UniformField {
    fn energy(&self, position: Vector3D) -> f64 {
        -(self.force * position)
    }

    fn gradient(&self, _: Vector3D) -> Vector3D {
        -self.force
    }
}
