/// Renderable geometry assembled from validated buffers
use nalgebra::{Point3, Vector3};

use crate::error::IngestError;
use crate::index::IndexBuffer;
use crate::normals::compute_vertex_normals;
use crate::payload::Attribute;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    /// Face normal from the winding order; zero for degenerate faces.
    pub fn face_normal(&self) -> Vector3<f32> {
        let [a, b, c] = self.vertices.map(|v| v.position);
        (b - a)
            .cross(&(c - a))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// Axis-aligned bounding box of a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Bounds of a flat `xyz` buffer, or `None` when it holds no vertex.
    pub fn from_positions(positions: &[f32]) -> Option<Self> {
        let mut chunks = positions.chunks_exact(3);
        let first = chunks.next()?;
        let start = Point3::new(first[0], first[1], first[2]);
        let (min, max) = chunks.fold((start, start), |(min, max), p| {
            let p = Point3::new(p[0], p[1], p[2]);
            (min.inf(&p), max.sup(&p))
        });
        Some(Self { min, max })
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }

    pub fn max_extent(&self) -> f32 {
        self.size().max()
    }
}

/// A built mesh: positions, indices, optional normals and UVs.
///
/// Positions and indices only change through the repair operations; the
/// cached bounding box is dropped whenever positions move.
#[derive(Debug, Clone)]
pub struct Geometry {
    positions: Vec<f32>,
    indices: IndexBuffer,
    normals: Option<Vec<f32>>,
    uvs: Option<Vec<f32>>,
    bounds: Option<BoundingBox>,
}

impl Geometry {
    /// Assemble a geometry from validated buffers.
    ///
    /// Fails when positions are missing or shorter than one vertex, or when any
    /// buffer breaks its stride.
    pub fn build(
        positions: Option<Vec<f32>>,
        indices: IndexBuffer,
        normals: Option<Vec<f32>>,
        uvs: Option<Vec<f32>>,
    ) -> Result<Self, IngestError> {
        let positions = match positions {
            Some(p) if p.len() >= 3 => p,
            other => {
                return Err(IngestError::MissingPositions {
                    found: other.map(|p| p.len()),
                })
            }
        };
        check_stride(Attribute::Position, positions.len())?;
        check_finite(Attribute::Position, &positions)?;
        check_stride(Attribute::Index, indices.len())?;

        if let Some(normals) = &normals {
            if normals.len() != positions.len() {
                return Err(IngestError::AttributeMismatch {
                    attribute: Attribute::Normal,
                    expected: positions.len(),
                    actual: normals.len(),
                });
            }
        }
        if let Some(uvs) = &uvs {
            check_stride(Attribute::Uv, uvs.len())?;
            check_finite(Attribute::Uv, uvs)?;
        }

        let mut geometry = Self {
            positions,
            indices,
            normals,
            uvs,
            bounds: None,
        };
        geometry.compute_bounding_box();
        Ok(geometry)
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn indices(&self) -> &IndexBuffer {
        &self.indices
    }

    pub fn normals(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[f32]> {
        self.uvs.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.triangle_count()
    }

    /// Replace the normals with ones derived from the current faces.
    pub fn recompute_normals(&mut self) {
        self.normals = Some(compute_vertex_normals(&self.positions, &self.indices));
    }

    /// Recompute and cache the bounding box.
    pub fn compute_bounding_box(&mut self) -> Option<BoundingBox> {
        self.bounds = BoundingBox::from_positions(&self.positions);
        self.bounds
    }

    /// The cached bounding box, `None` while stale.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Rewrite every vertex position. Leaves the bounding box stale.
    pub(crate) fn map_positions(&mut self, f: impl Fn([f32; 3]) -> [f32; 3]) {
        for p in self.positions.chunks_exact_mut(3) {
            let [x, y, z] = f([p[0], p[1], p[2]]);
            p[0] = x;
            p[1] = y;
            p[2] = z;
        }
        self.bounds = None;
    }

    pub(crate) fn indices_mut(&mut self) -> &mut IndexBuffer {
        &mut self.indices
    }

    fn vertex(&self, i: usize) -> Vertex {
        let p = &self.positions[i * 3..i * 3 + 3];
        let normal = self
            .normals
            .as_deref()
            .map(|n| Vector3::new(n[i * 3], n[i * 3 + 1], n[i * 3 + 2]))
            .unwrap_or_else(Vector3::zeros);
        Vertex {
            position: Point3::new(p[0], p[1], p[2]),
            normal,
        }
    }

    /// Triangles whose corners all exist in the vertex buffer.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        let count = self.vertex_count();
        self.indices.triangles().filter_map(move |corners| {
            if corners.iter().any(|&i| i as usize >= count) {
                return None;
            }
            Some(Triangle {
                vertices: corners.map(|i| self.vertex(i as usize)),
            })
        })
    }
}

fn check_stride(attribute: Attribute, len: usize) -> Result<(), IngestError> {
    let stride = attribute.stride();
    if len % stride != 0 {
        return Err(IngestError::MalformedStream {
            attribute,
            len,
            stride,
        });
    }
    Ok(())
}

fn check_finite(attribute: Attribute, values: &[f32]) -> Result<(), IngestError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(position) => Err(IngestError::NonFinite {
            attribute,
            position,
            value: f64::from(values[position]),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<f32> {
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    }

    #[test]
    fn test_build_requires_positions() {
        let indices = IndexBuffer::from_values(vec![]);
        assert!(matches!(
            Geometry::build(None, indices.clone(), None, None),
            Err(IngestError::MissingPositions { found: None })
        ));
        assert!(matches!(
            Geometry::build(Some(vec![1.0, 2.0]), indices, None, None),
            Err(IngestError::MissingPositions { found: Some(2) })
        ));
    }

    #[test]
    fn test_build_checks_strides() {
        let indices = IndexBuffer::from_values(vec![0, 1, 2]);
        let err = Geometry::build(Some(triangle()), indices.clone(), None, Some(vec![0.0; 5]))
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::MalformedStream {
                attribute: Attribute::Uv,
                ..
            }
        ));

        let err = Geometry::build(Some(triangle()), indices, Some(vec![0.0; 3]), None).unwrap_err();
        assert!(matches!(err, IngestError::AttributeMismatch { .. }));
    }

    #[test]
    fn test_build_rejects_non_finite_coordinates() {
        let indices = IndexBuffer::from_values(vec![0, 1, 2]);
        let mut positions = triangle();
        positions[4] = f32::NAN;
        let err = Geometry::build(Some(positions), indices.clone(), None, None).unwrap_err();
        assert!(matches!(
            err,
            IngestError::NonFinite {
                attribute: Attribute::Position,
                position: 4,
                ..
            }
        ));

        let uvs = vec![0.0, 0.0, 1.0, f32::INFINITY, 0.0, 1.0];
        let err = Geometry::build(Some(triangle()), indices, None, Some(uvs)).unwrap_err();
        assert!(matches!(
            err,
            IngestError::NonFinite {
                attribute: Attribute::Uv,
                position: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_bounding_box() {
        let indices = IndexBuffer::from_values(vec![0, 1, 2]);
        let geometry = Geometry::build(Some(triangle()), indices, None, None).unwrap();
        let bounds = geometry.bounding_box().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(bounds.center(), Point3::new(0.5, 0.5, 0.0));
        assert!((bounds.diagonal() - 2.0_f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_map_positions_marks_bounds_stale() {
        let indices = IndexBuffer::from_values(vec![0, 1, 2]);
        let mut geometry = Geometry::build(Some(triangle()), indices, None, None).unwrap();
        geometry.map_positions(|[x, y, z]| [x + 1.0, y, z]);
        assert!(geometry.bounding_box().is_none());
        let bounds = geometry.compute_bounding_box().unwrap();
        assert_eq!(bounds.min.x, 1.0);
    }

    #[test]
    fn test_triangles_skip_out_of_range() {
        let indices = IndexBuffer::from_values(vec![1, 2, 3]);
        let mut geometry = Geometry::build(Some(triangle()), indices, None, None).unwrap();
        assert_eq!(geometry.triangles().count(), 0);
        geometry.indices_mut().rebase_to_zero().unwrap();
        geometry.recompute_normals();
        let tri = geometry.triangles().next().unwrap();
        assert!((tri.face_normal().z - 1.0).abs() < 1e-6);
        assert!((tri.vertices[0].normal.z - 1.0).abs() < 1e-6);
    }
}
