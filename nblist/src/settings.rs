use crate::Error;

/// Which neighbor lists should be built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Only build up lists, enough to visit every pair once
    Up,
    /// Build both up and down lists, giving all neighbors of every atom
    #[default]
    Both,
}

/// Parameters for the neighbor list machinery
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NeighborSettings {
    /// Number of cell shells to search around each atom. Larger values use
    /// smaller cells.
    #[serde(default = "default_cell_range")]
    pub cell_range: usize,
    /// Extra distance added to the potential range when building the lists
    pub skin: f64,
    /// Which lists to build
    #[serde(default)]
    pub direction: Direction,
    /// Lists are rebuilt when the two largest displacements since the last
    /// build add up to more than `2 * safety_factor * skin`
    #[serde(default = "default_safety_factor")]
    pub safety_factor: f64,
    /// Check for the need to rebuild every `update_interval` integrator steps
    #[serde(default = "default_update_interval")]
    pub update_interval: usize,
    /// Do not warn about unsafe rebuilds
    #[serde(default)]
    pub quiet: bool,
    /// Move all atoms back to their central image in the unit cell before
    /// rebuilding the lists from the integrator notifications
    #[serde(default = "default_apply_pbc")]
    pub apply_pbc: bool,
    /// Number of worker threads for the threaded dispatcher
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_cell_range() -> usize { 2 }
fn default_safety_factor() -> f64 { 0.4 }
fn default_update_interval() -> usize { 1 }
fn default_threads() -> usize { 1 }
fn default_apply_pbc() -> bool { true }

impl NeighborSettings {
    /// Create settings with the given `skin`, and default values for
    /// everything else
    pub fn new(skin: f64) -> NeighborSettings {
        NeighborSettings {
            cell_range: default_cell_range(),
            skin: skin,
            direction: Direction::default(),
            safety_factor: default_safety_factor(),
            update_interval: default_update_interval(),
            quiet: false,
            apply_pbc: default_apply_pbc(),
            threads: default_threads(),
        }
    }

    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> Result<NeighborSettings, Error> {
        let settings = serde_json::from_str::<NeighborSettings>(json)?;
        settings.validate()?;
        return Ok(settings);
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.cell_range < 1 {
            return Err(Error::InvalidParameter(format!(
                "cell range must be at least 1, got {}", self.cell_range
            )));
        }

        if !(self.skin > 0.0 && self.skin.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected a positive skin, got {}", self.skin
            )));
        }

        if !(self.safety_factor > 0.0 && self.safety_factor <= 0.5) {
            return Err(Error::InvalidParameter(format!(
                "safety factor must be between 0 and 0.5, got {}", self.safety_factor
            )));
        }

        if self.update_interval < 1 {
            return Err(Error::InvalidParameter(
                "update interval must be at least 1".into()
            ));
        }

        if self.threads < 1 {
            return Err(Error::InvalidParameter(
                "the number of threads must be at least 1".into()
            ));
        }

        return Ok(());
    }
}
