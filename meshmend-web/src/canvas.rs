/// Canvas2D renderer: depth-sorted, flat-shaded triangles
use nalgebra::{Matrix3, Vector3};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use meshmend_core::projection::project_with;
use meshmend_core::{Geometry, View};

const BACKGROUND: &str = "#1e1e24";
const AMBIENT: f32 = 0.12;

/// A triangle ready to paint: screen corners, depth and shade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub corners: [(f32, f32); 3],
    pub depth: f32,
    pub shade: f32,
}

/// Project and shade every drawable triangle, farthest first.
///
/// Shading uses the mean of the vertex normals so broken normals show up on
/// screen exactly as the data says.
pub fn faces(geometry: &Geometry, view: &View, width: u32, height: u32) -> Vec<Face> {
    let mvp = view.mvp();
    let rotation: Matrix3<f32> = view.orbit.rotation_matrix().fixed_view::<3, 3>(0, 0).into_owned();

    let mut faces: Vec<Face> = geometry
        .triangles()
        .filter_map(|triangle| {
            let mut corners = [(0.0, 0.0); 3];
            let mut depth = 0.0;
            for (slot, vertex) in corners.iter_mut().zip(&triangle.vertices) {
                let (x, y, z) = project_with(&mvp, &vertex.position, width, height)?;
                *slot = (x, y);
                depth += z / 3.0;
            }

            let normal: Vector3<f32> = triangle.vertices.iter().map(|v| v.normal).sum();
            let normal = if normal.norm_squared() > f32::EPSILON {
                normal
            } else {
                triangle.face_normal()
            };
            let lit = (rotation * normal)
                .try_normalize(f32::EPSILON)
                .map_or(0.0, |n| n.z.max(0.0));

            Some(Face {
                corners,
                depth,
                shade: lit * (1.0 - AMBIENT) + AMBIENT,
            })
        })
        .collect();

    faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    faces
}

pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasRenderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, context })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    pub fn render(&self, geometry: &Geometry, view: &View) {
        let (width, height) = self.size();
        let ctx = &self.context;
        ctx.set_fill_style_str(BACKGROUND);
        ctx.fill_rect(0.0, 0.0, f64::from(width), f64::from(height));

        for face in faces(geometry, view, width, height) {
            let level = (face.shade.clamp(0.0, 1.0) * 255.0) as u8;
            let color = format!("rgb({level}, {level}, {})", level.saturating_add(20));
            ctx.set_fill_style_str(&color);
            ctx.set_stroke_style_str(&color);

            let [a, b, c] = face.corners;
            ctx.begin_path();
            ctx.move_to(f64::from(a.0), f64::from(a.1));
            ctx.line_to(f64::from(b.0), f64::from(b.1));
            ctx.line_to(f64::from(c.0), f64::from(c.1));
            ctx.close_path();
            ctx.fill();
            // Hairline stroke hides seams between neighbours.
            ctx.stroke();
        }
    }
}
