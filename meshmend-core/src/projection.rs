/// Camera, projection and fit-to-view framing
use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::BoundingBox;
use crate::transform::{model_matrix, Orbit};

/// Margin applied to the bounding diagonal when framing raw payloads.
pub const FRAMING_MARGIN: f32 = 1.2;
/// The camera never sits closer than this after framing.
pub const MIN_VIEW_DISTANCE: f32 = 1.0;
/// Largest displayed extent of a packaged scene after scale-to-fit.
pub const DEFAULT_TARGET_SIZE: f32 = 2.0;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: std::f32::consts::FRAC_PI_3, // 60 degrees
            aspect: aspect_ratio(width, height),
            near: 0.01,
            far: 10_000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Distance from the camera to its target.
    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Place the camera on the +Z axis of its target at `distance`.
    pub fn look_from(&mut self, distance: f32) {
        self.target = Point3::origin();
        self.position = self.target + Vector3::z() * distance;
    }

    /// Move along the view direction, keeping at least `min` from the target.
    pub fn dolly(&mut self, factor: f32, min: f32) {
        let offset = self.position - self.target;
        let distance = (offset.norm() * factor).max(min);
        self.position = self.target + offset.normalize() * distance;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = self.distance();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Project a model-space point to screen space.
    ///
    /// Returns `(x, y, depth)` with depth in normalized device units, or `None`
    /// when the point is behind the camera or outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.projection_matrix() * self.view_matrix() * model_matrix;
        project_with(&mvp, point, width, height)
    }
}

/// Project through a precomputed model-view-projection matrix.
pub fn project_with(
    mvp: &Matrix4<f32>,
    point: &Point3<f32>,
    width: u32,
    height: u32,
) -> Option<(f32, f32, f32)> {
    let clip = mvp * point.to_homogeneous();
    if clip.w <= 1e-6 {
        return None;
    }

    let ndc = clip.xyz() / clip.w;
    if ndc.z < -1.0 || ndc.z > 1.0 {
        return None;
    }

    let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
    let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;
    Some((screen_x, screen_y, ndc.z))
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 500)
    }
}

/// Displayed placement of the mesh. Never written back into the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub offset: Vector3<f32>,
    pub scale: f32,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            offset: Vector3::zeros(),
            scale: 1.0,
        }
    }
}

/// How a freshly loaded mesh is fitted into view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FramingMode {
    /// Center the mesh and back off by a margin of its diagonal.
    Fit,
    /// Center the mesh and scale its largest extent to the target size.
    TargetSize(f32),
}

impl FramingMode {
    /// Compute the displayed placement and viewpoint distance for `bounds`.
    ///
    /// Depends only on the bounds, so repeated framing never drifts.
    pub fn frame(self, bounds: &BoundingBox) -> (Framing, f32) {
        let center = bounds.center().coords;
        match self {
            FramingMode::Fit => {
                let distance = (bounds.diagonal() * FRAMING_MARGIN).max(MIN_VIEW_DISTANCE);
                (
                    Framing {
                        offset: -center,
                        scale: 1.0,
                    },
                    distance,
                )
            }
            FramingMode::TargetSize(target) => {
                let extent = bounds.max_extent();
                let scale = if extent > f32::EPSILON && extent.is_finite() {
                    target / extent
                } else {
                    1.0
                };
                let distance = (target * FRAMING_MARGIN).max(MIN_VIEW_DISTANCE);
                (
                    Framing {
                        offset: -center * scale,
                        scale,
                    },
                    distance,
                )
            }
        }
    }
}

/// Everything about how the mesh is shown, none of it stored in the mesh.
#[derive(Debug, Clone)]
pub struct View {
    pub camera: Camera,
    pub framing: Framing,
    pub orbit: Orbit,
    pub mode: FramingMode,
}

impl View {
    pub fn new(width: u32, height: u32, mode: FramingMode) -> Self {
        Self {
            camera: Camera::new(width, height),
            framing: Framing::default(),
            orbit: Orbit::default(),
            mode,
        }
    }

    /// Center the mesh and move the camera back far enough to see it.
    /// Returns the new viewpoint distance.
    pub fn frame(&mut self, bounds: &BoundingBox) -> f32 {
        let (framing, distance) = self.mode.frame(bounds);
        self.framing = framing;
        self.camera.look_from(distance);
        distance
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        model_matrix(&self.orbit, &self.framing)
    }

    /// Combined model-view-projection matrix for the current state.
    pub fn mvp(&self) -> Matrix4<f32> {
        self.camera.projection_matrix() * self.camera.view_matrix() * self.model_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min: [f32; 3], max: [f32; 3]) -> BoundingBox {
        BoundingBox {
            min: Point3::from(min),
            max: Point3::from(max),
        }
    }

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert!((camera.distance() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_project_origin_to_center() {
        let camera = Camera::new(800, 600);
        let (x, y, depth) = camera
            .project_to_screen(&Point3::origin(), &Matrix4::identity(), 800, 600)
            .unwrap();
        assert!((x - 400.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);
        assert!(depth > -1.0 && depth < 1.0);
    }

    #[test]
    fn test_point_behind_camera_is_clipped() {
        let camera = Camera::new(800, 600);
        let behind = Point3::new(0.0, 0.0, 10.0);
        assert!(camera
            .project_to_screen(&behind, &Matrix4::identity(), 800, 600)
            .is_none());
    }

    #[test]
    fn test_fit_framing() {
        let b = bounds([0.0, 0.0, 0.0], [2.0, 2.0, 1.0]);
        let (framing, distance) = FramingMode::Fit.frame(&b);
        assert_eq!(framing.offset, Vector3::new(-1.0, -1.0, -0.5));
        assert!((distance - 3.0 * 1.2).abs() < 1e-5);

        // Tiny meshes still keep the camera one unit away.
        let tiny = bounds([0.0; 3], [0.1, 0.1, 0.1]);
        assert_eq!(FramingMode::Fit.frame(&tiny).1, 1.0);
    }

    #[test]
    fn test_target_size_framing() {
        let b = bounds([10.0, 0.0, 0.0], [30.0, 5.0, 5.0]);
        let (framing, distance) = FramingMode::TargetSize(2.0).frame(&b);
        assert!((framing.scale - 0.1).abs() < 1e-6);
        assert!((framing.offset.x + 2.0).abs() < 1e-5);
        assert!((distance - 2.4).abs() < 1e-6);
    }

    #[test]
    fn test_view_frame_is_idempotent() {
        let b = bounds([1.0, 1.0, 1.0], [3.0, 3.0, 3.0]);
        let mut view = View::new(800, 600, FramingMode::Fit);
        let first = view.frame(&b);
        let framing = view.framing;
        assert_eq!(view.frame(&b), first);
        assert_eq!(view.framing, framing);
        assert!((view.camera.distance() - first).abs() < 1e-6);
    }

    #[test]
    fn test_dolly_clamps() {
        let mut camera = Camera::default();
        camera.look_from(2.0);
        camera.dolly(0.01, 0.05);
        assert!((camera.distance() - 0.05).abs() < 1e-6);
    }
}
