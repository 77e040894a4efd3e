//! Engine parameters.

use serde::{Deserialize, Serialize};
use volley_math::Vec3;

use crate::error::PhysicsError;

/// Standard gravity pointing down the Y axis.
pub fn earth_gravity() -> Vec3 {
    Vec3::new(0.0, -9.81, 0.0)
}

/// Iteration counts and tolerances of the constraint solvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Equal sub-steps each call to `Scene::step` is split into.
    pub substeps: usize,
    /// Joint velocity iterations per sub-step.
    pub velocity_iterations: usize,
    /// Joint position iterations per sub-step.
    pub position_iterations: usize,
    /// Contact velocity iterations per sub-step.
    pub contact_iterations: usize,
    /// Penetration depth left uncorrected (m).
    pub penetration_slop: f64,
    /// Fraction of the excess depth removed per sub-step.
    pub penetration_correction: f64,
    /// Approach speeds below this do not bounce (m/s).
    pub restitution_threshold: f64,
    /// Anchor separation below which the final joint projection is skipped (m).
    pub joint_slop: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            substeps: 1,
            velocity_iterations: 8,
            position_iterations: 8,
            contact_iterations: 8,
            penetration_slop: 0.005,
            penetration_correction: 0.8,
            restitution_threshold: 0.5,
            joint_slop: 1e-6,
        }
    }
}

impl SolverConfig {
    /// Fewer iterations, for interactive use.
    pub fn realtime() -> Self {
        Self {
            velocity_iterations: 4,
            position_iterations: 4,
            contact_iterations: 4,
            ..Self::default()
        }
    }

    /// Sub-stepped solve with more iterations.
    pub fn high_accuracy() -> Self {
        Self {
            substeps: 4,
            velocity_iterations: 16,
            position_iterations: 16,
            contact_iterations: 16,
            penetration_slop: 0.001,
            ..Self::default()
        }
    }

    /// Check ranges; iteration counts of zero are allowed.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.substeps == 0 {
            return Err(PhysicsError::Config("substeps must be at least 1".into()));
        }
        let checks = [
            ("penetration_slop", self.penetration_slop),
            ("restitution_threshold", self.restitution_threshold),
            ("joint_slop", self.joint_slop),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::Config(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.penetration_correction) {
            return Err(PhysicsError::Config(format!(
                "penetration_correction must be in [0, 1], got {}",
                self.penetration_correction
            )));
        }
        Ok(())
    }
}

/// Scene-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Gravity acceleration (m/s²).
    pub gravity: Vec3,
    /// Solver parameters.
    pub solver: SolverConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            gravity: earth_gravity(),
            solver: SolverConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    ///
    /// ```
    /// use volley_physics::SceneConfig;
    ///
    /// let config = SceneConfig::from_toml_str(
    ///     r#"
    ///     gravity = [0.0, -1.62, 0.0]
    ///
    ///     [solver]
    ///     substeps = 2
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.solver.substeps, 2);
    /// assert_eq!(config.solver.contact_iterations, 8);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, PhysicsError> {
        let config: SceneConfig =
            toml::from_str(s).map_err(|e| PhysicsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, PhysicsError> {
        toml::to_string(self).map_err(|e| PhysicsError::Config(e.to_string()))
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !volley_math::is_finite_vec(&self.gravity) {
            return Err(PhysicsError::NonFinite { what: "gravity" });
        }
        self.solver.validate()
    }
}
