/// Orbit rotation state and model matrix composition
use nalgebra::{Matrix4, Vector3};

use crate::projection::Framing;

/// Pitch stays just short of the poles so the view never flips.
const PITCH_LIMIT: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// Orbit rotation applied to the displayed model (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub yaw: f32,
    pub pitch: f32,
}

impl Orbit {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        let mut orbit = Self { yaw: 0.0, pitch: 0.0 };
        orbit.rotate(yaw, pitch);
        orbit
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dyaw: f32, dpitch: f32) {
        self.yaw = (self.yaw + dyaw) % std::f32::consts::TAU;
        self.pitch = (self.pitch + dpitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        let pitch = Matrix4::new_rotation(Vector3::x() * self.pitch);
        let yaw = Matrix4::new_rotation(Vector3::y() * self.yaw);
        pitch * yaw
    }
}

impl Default for Orbit {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Model matrix for the displayed mesh: orbit, then framing offset and scale.
pub fn model_matrix(orbit: &Orbit, framing: &Framing) -> Matrix4<f32> {
    orbit.rotation_matrix()
        * Matrix4::new_translation(&framing.offset)
        * Matrix4::new_scaling(framing.scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_orbit_state() {
        let mut orbit = Orbit::default();
        orbit.rotate(0.1, 0.2);
        assert!((orbit.yaw - 0.1).abs() < 1e-6);
        assert!((orbit.pitch - 0.2).abs() < 1e-6);

        orbit.rotate(0.0, 10.0);
        assert!((orbit.pitch - PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn test_identity_rotation() {
        let matrix = Orbit::default().rotation_matrix();
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_model_matrix_centers_mesh() {
        let framing = Framing {
            offset: Vector3::new(-1.0, -2.0, -3.0),
            scale: 0.5,
        };
        let model = model_matrix(&Orbit::default(), &framing);
        let p = model.transform_point(&Point3::new(2.0, 4.0, 6.0));
        assert!((p - Point3::origin()).norm() < 1e-6);
    }
}
