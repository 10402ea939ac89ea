//! Rigid + uniform-scale transforms for posing bones.

use nalgebra::{Point3, UnitQuaternion, Vector3};

/// A rotation, uniform scale, and translation, applied as
/// `v ↦ rot · (scale · v) + trans`.
///
/// # Example
///
/// ```
/// use rig_mesh::{Point3, Transform, UnitQuaternion, Vector3};
///
/// let t = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0));
/// let p = t.transform_point(&Point3::origin());
/// assert_eq!(p, Point3::new(1.0, 0.0, 0.0));
///
/// // identity composed with identity is identity
/// let id = Transform::identity();
/// let p2 = (id * id).transform_point(&p);
/// assert_eq!(p2, p);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    /// Rotation component.
    pub rot: UnitQuaternion<f64>,
    /// Uniform scale component.
    pub scale: f64,
    /// Translation component.
    pub trans: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            rot: UnitQuaternion::identity(),
            scale: 1.0,
            trans: Vector3::zeros(),
        }
    }

    /// A pure rotation.
    #[must_use]
    pub fn from_rotation(rot: UnitQuaternion<f64>) -> Self {
        Self {
            rot,
            scale: 1.0,
            trans: Vector3::zeros(),
        }
    }

    /// A pure uniform scale.
    #[must_use]
    pub fn from_scale(scale: f64) -> Self {
        Self {
            rot: UnitQuaternion::identity(),
            scale,
            trans: Vector3::zeros(),
        }
    }

    /// A pure translation.
    #[must_use]
    pub fn from_translation(trans: Vector3<f64>) -> Self {
        Self {
            rot: UnitQuaternion::identity(),
            scale: 1.0,
            trans,
        }
    }

    /// Apply the transform to a point.
    #[inline]
    #[must_use]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rot * (p.coords * self.scale) + self.trans)
    }

    /// Apply only the rotation and scale, dropping the translation.
    #[inline]
    #[must_use]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rot * (v * self.scale)
    }

    /// The inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rot.inverse();
        let inv_scale = 1.0 / self.scale;
        Self {
            rot: inv_rot,
            scale: inv_scale,
            trans: inv_rot * (-self.trans) * inv_scale,
        }
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;

    /// Composition: `(a * b)(v) = a(b(v))`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            rot: self.rot * rhs.rot,
            scale: self.scale * rhs.scale,
            trans: self.trans + self.rot * (rhs.trans * self.scale),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn composition_matches_sequential_application() {
        let a = Transform {
            rot: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7),
            scale: 2.0,
            trans: Vector3::new(0.5, -1.0, 3.0),
        };
        let b = Transform {
            rot: UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.3),
            scale: 0.5,
            trans: Vector3::new(-2.0, 0.25, 1.0),
        };
        let p = Point3::new(1.0, 2.0, 3.0);

        let composed = (a * b).transform_point(&p);
        let sequential = a.transform_point(&b.transform_point(&p));
        assert_relative_eq!((composed - sequential).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn inverse_round_trips() {
        let t = Transform {
            rot: UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.1),
            scale: 3.0,
            trans: Vector3::new(1.0, 2.0, -0.5),
        };
        let p = Point3::new(-0.3, 0.9, 2.2);
        let back = t.inverse().transform_point(&t.transform_point(&p));
        assert_relative_eq!((back - p).norm(), 0.0, epsilon = 1e-12);
    }
}
