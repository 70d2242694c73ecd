//! Engine-to-file coordinate convention conversion.
//!
//! The source engine is left-handed Z-up; the emitted files use the
//! mirrored convention. Every position/normal/tangent gets its Y
//! negated, UVs get V negated, quaternions get Y and W negated and
//! Euler rotations get the yaw negated. Each helper is applied exactly
//! once at the point a value is written, never cumulatively.

use glam::{Quat, Vec2, Vec3};

/// Mirror a 3D vector across the XZ plane.
pub fn export_vector(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.y, v.z)
}

/// Flip the V component of a texture coordinate.
pub fn export_uv(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, -uv.y)
}

/// Mirror a rotation quaternion (negated Y and scalar part).
pub fn export_quat(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, -q.y, q.z, -q.w)
}

/// Euler rotation in degrees, engine order (pitch, yaw, roll).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Mirror an Euler rotation (negated yaw).
pub fn export_rotator(r: Rotator) -> Rotator {
    Rotator {
        pitch: r.pitch,
        yaw: -r.yaw,
        roll: r.roll,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_flip_is_involution() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(export_vector(v), Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(export_vector(export_vector(v)), v);
    }

    #[test]
    fn test_uv_flip() {
        assert_eq!(export_uv(Vec2::new(0.25, 0.75)), Vec2::new(0.25, -0.75));
    }

    #[test]
    fn test_quat_flip() {
        let q = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        let e = export_quat(q);
        assert_eq!((e.x, e.y, e.z, e.w), (0.1, -0.2, 0.3, -0.9));
    }

    #[test]
    fn test_rotator_flip() {
        let r = export_rotator(Rotator::new(10.0, 45.0, -5.0));
        assert_eq!(r, Rotator::new(10.0, -45.0, -5.0));
    }
}
