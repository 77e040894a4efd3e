//! Surface and mass properties of a shape.

use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// Physical material attached to a shape at creation.
///
/// A material is a plain `Copy` value: every shape keeps its own snapshot,
/// so changing a material after it was handed to a shape never affects that
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    mass: f64,
    friction: f64,
    restitution: f64,
}

impl Material {
    /// Default mass (kg).
    pub const DEFAULT_MASS: f64 = 1.0;
    /// Default friction coefficient.
    pub const DEFAULT_FRICTION: f64 = 0.5;
    /// Default restitution coefficient.
    pub const DEFAULT_RESTITUTION: f64 = 0.5;

    /// Material with the given mass and default friction/restitution.
    ///
    /// Negative or non-finite masses are clamped to zero (immovable); use
    /// [`Material::try_new`] to reject them instead.
    pub fn new(mass: f64) -> Self {
        Self {
            mass: if mass.is_finite() { mass.max(0.0) } else { 0.0 },
            ..Self::default()
        }
    }

    /// Immovable material (mass 0).
    pub fn fixed() -> Self {
        Self::new(0.0)
    }

    /// Validating constructor.
    pub fn try_new(mass: f64, friction: f64, restitution: f64) -> Result<Self, PhysicsError> {
        let checks = [
            ("mass", mass),
            ("friction", friction),
            ("restitution", restitution),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::InvalidMaterial(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(Self {
            mass,
            friction,
            restitution,
        })
    }

    /// Set the friction coefficient (negative values clamp to 0).
    #[must_use]
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = if friction.is_finite() { friction.max(0.0) } else { 0.0 };
        self
    }

    /// Set the restitution coefficient.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = if restitution.is_finite() { restitution.max(0.0) } else { 0.0 };
        self
    }

    /// Mass in kg. Zero means immovable.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Coulomb friction coefficient.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Coefficient of restitution.
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// True for immovable bodies.
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    /// `1 / mass`, or 0 for immovable bodies.
    pub fn inverse_mass(&self) -> f64 {
        if self.is_static() {
            0.0
        } else {
            1.0 / self.mass
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            mass: Self::DEFAULT_MASS,
            friction: Self::DEFAULT_FRICTION,
            restitution: Self::DEFAULT_RESTITUTION,
        }
    }
}

/// Restitution used for a contact between two materials: the larger one.
pub fn combine_restitution(a: &Material, b: &Material) -> f64 {
    a.restitution.max(b.restitution)
}

/// Friction used for a contact between two materials: the geometric mean.
pub fn combine_friction(a: &Material, b: &Material) -> f64 {
    (a.friction * b.friction).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let m = Material::default();
        assert_eq!(m.mass(), 1.0);
        assert_eq!(m.friction(), 0.5);
        assert_eq!(m.restitution(), 0.5);
        assert!(!m.is_static());
    }

    #[test]
    fn test_fixed_has_no_inverse_mass() {
        let m = Material::fixed();
        assert!(m.is_static());
        assert_eq!(m.inverse_mass(), 0.0);
    }

    #[test]
    fn test_try_new_rejects_negative() {
        assert!(Material::try_new(-1.0, 0.5, 0.5).is_err());
        assert!(Material::try_new(1.0, f64::NAN, 0.5).is_err());
        assert!(Material::try_new(1.0, 0.5, -0.1).is_err());
        assert!(Material::try_new(2.0, 0.3, 0.9).is_ok());
    }

    #[test]
    fn test_snapshot_semantics() {
        let base = Material::new(2.0);
        let bouncy = base.with_restitution(0.9);
        assert_eq!(base.restitution(), Material::DEFAULT_RESTITUTION);
        assert_eq!(bouncy.restitution(), 0.9);
    }

    #[test]
    fn test_combination_rules() {
        let ball = Material::new(1.0).with_restitution(0.8).with_friction(0.4);
        let ground = Material::fixed().with_restitution(0.5).with_friction(0.9);
        assert_eq!(combine_restitution(&ball, &ground), 0.8);
        assert!((combine_friction(&ball, &ground) - 0.6).abs() < 1e-12);
    }
}
