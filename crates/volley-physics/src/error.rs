//! Error types for physics setup.

use thiserror::Error;

use crate::composite::{JointId, PartId};

/// Errors raised while building or configuring a scene.
///
/// Every variant is reported synchronously by the call that introduces the
/// problem; `Scene::step` itself never fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A part id does not exist in the composite object.
    #[error("Part {id} not found (composite has {count} parts)")]
    InvalidPart {
        /// Requested part id.
        id: PartId,
        /// Number of parts in the composite.
        count: usize,
    },

    /// A joint id does not exist in the composite object.
    #[error("Joint {0} not found")]
    InvalidJoint(JointId),

    /// A joint was requested between a part and itself.
    #[error("Joint endpoints must be distinct parts (both are {0})")]
    SamePart(PartId),

    /// A joint axis has zero length or is not finite.
    #[error("Joint axis is degenerate (zero length or non-finite)")]
    DegenerateAxis,

    /// A value that must be finite was NaN or infinite.
    #[error("Non-finite value for {what}")]
    NonFinite {
        /// Name of the rejected quantity.
        what: &'static str,
    },

    /// Shape parameters are invalid.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Material parameters are invalid.
    #[error("Invalid material: {0}")]
    InvalidMaterial(String),

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Reject a vector with NaN or infinite components.
pub(crate) fn ensure_finite(v: &volley_math::Vec3, what: &'static str) -> Result<(), PhysicsError> {
    if volley_math::is_finite_vec(v) {
        Ok(())
    } else {
        Err(PhysicsError::NonFinite { what })
    }
}

/// Reject a NaN or infinite scalar.
pub(crate) fn ensure_finite_scalar(x: f64, what: &'static str) -> Result<(), PhysicsError> {
    if x.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::NonFinite { what })
    }
}
