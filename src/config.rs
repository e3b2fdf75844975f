use json::JsonValue;

use crate::{
    datatypes::Material,
    error::{AnnulusError, Result},
    mesher::MAX_NODES,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub radius_min: f64,
    pub radius_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshConfig {
    /// Number of angular divisions on the inner boundary
    pub resolution: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryLoads {
    pub pressure_inner: f64,
    pub pressure_outer: f64,
}

/// Full description of one Lamé run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub geometry: Geometry,
    pub mesh: MeshConfig,
    pub material: Material,
    pub bcs: BoundaryLoads,
}

impl Config {
    /// The fixed configuration driven by the binary
    pub fn reference() -> Config {
        Config {
            geometry: Geometry {
                radius_min: 1.0,
                radius_max: 2.0,
            },
            mesh: MeshConfig { resolution: 10 },
            material: Material::new(2e11, 0.25),
            bcs: BoundaryLoads {
                pressure_inner: 1.0,
                pressure_outer: 2.0,
            },
        }
    }

    /// Reads and parses a json configuration file
    ///
    /// # Arguments
    /// * `input_file` - The path to the input file
    pub fn load(input_file: &str) -> Result<Config> {
        let file_string = match std::fs::read_to_string(input_file) {
            Ok(f) => f,
            Err(err) => {
                return Err(AnnulusError::Input(format!(
                    "Unable to open input file {input_file}: {err}"
                )))
            }
        };

        Config::parse(&file_string)
    }

    pub fn parse(contents: &str) -> Result<Config> {
        let input_json = match json::parse(contents) {
            Ok(f) => f,
            Err(err) => {
                return Err(AnnulusError::Input(format!(
                    "Error in input file json: {err}"
                )))
            }
        };

        Config::from_json(&input_json)
    }

    /// Parses a configuration from a JsonValue object. Every key is required.
    ///
    /// # Arguments
    /// * `input_json` - The configuration as a JsonValue object
    pub fn from_json(input_json: &JsonValue) -> Result<Config> {
        let radius_min = require_f64(input_json, "geometry", "radius_min")?;
        let radius_max = require_f64(input_json, "geometry", "radius_max")?;

        let resolution = require_f64(input_json, "mesh", "resolution")?;
        if resolution.fract() != 0.0 || !(1.0..=MAX_NODES as f64).contains(&resolution) {
            return Err(AnnulusError::Input(format!(
                "mesh.resolution must be an integer between 1 and {MAX_NODES}, got {resolution}"
            )));
        }

        let youngs_modulus = require_f64(input_json, "material", "E")?;
        let poisson_ratio = require_f64(input_json, "material", "Nu")?;

        let pressure_inner = require_f64(input_json, "bcs", "pressure_inner")?;
        let pressure_outer = require_f64(input_json, "bcs", "pressure_outer")?;

        let config = Config {
            geometry: Geometry {
                radius_min,
                radius_max,
            },
            mesh: MeshConfig {
                resolution: resolution as usize,
            },
            material: Material::new(youngs_modulus, poisson_ratio),
            bcs: BoundaryLoads {
                pressure_inner,
                pressure_outer,
            },
        };
        config.validate()?;

        Ok(config)
    }

    /// Checks the values that every stage downstream relies on
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;

        if self.mesh.resolution == 0 || self.mesh.resolution > MAX_NODES {
            return Err(AnnulusError::Input(format!(
                "mesh.resolution must be between 1 and {MAX_NODES}, got {}",
                self.mesh.resolution
            )));
        }

        self.material.validate()?;

        for (name, value) in [
            ("pressure_inner", self.bcs.pressure_inner),
            ("pressure_outer", self.bcs.pressure_outer),
        ] {
            if !value.is_finite() {
                return Err(AnnulusError::Input(format!(
                    "bcs.{name} must be finite, got {value}"
                )));
            }
        }

        Ok(())
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<()> {
        if !self.radius_min.is_finite() || self.radius_min <= 0.0 {
            return Err(AnnulusError::Input(format!(
                "geometry.radius_min must be positive, got {}",
                self.radius_min
            )));
        }
        if !self.radius_max.is_finite() || self.radius_min >= self.radius_max {
            return Err(AnnulusError::Input(format!(
                "geometry.radius_min ({}) must be less than geometry.radius_max ({})",
                self.radius_min, self.radius_max
            )));
        }

        Ok(())
    }
}

fn require_f64(input_json: &JsonValue, section: &str, key: &str) -> Result<f64> {
    if !input_json.has_key(section) {
        return Err(AnnulusError::Input(format!(
            "Input json missing {section} section"
        )));
    }
    if !input_json[section].has_key(key) {
        return Err(AnnulusError::Input(format!(
            "Input json missing {key} field in {section} section"
        )));
    }

    match input_json[section][key].as_f64() {
        Some(v) => Ok(v),
        None => Err(AnnulusError::Input(format!(
            "Non-numeric value for {section}.{key}"
        ))),
    }
}
