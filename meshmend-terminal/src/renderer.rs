/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshmend_core::projection::project_with;
use meshmend_core::{Geometry, Triangle, View};
use nalgebra::{Matrix3, Vector3};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Light leaking onto faces turned away from the viewer.
const AMBIENT: f32 = 0.08;

/// ASCII renderer that shades triangles by their vertex normals
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Rasterize every triangle of `geometry` as seen through `view`.
    pub fn render(&mut self, geometry: &Geometry, view: &View) {
        let mvp = view.mvp();
        let rotation = view.orbit.rotation_matrix().fixed_view::<3, 3>(0, 0).into_owned();
        for triangle in geometry.triangles() {
            self.render_triangle(&triangle, &mvp, &rotation);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        mvp: &nalgebra::Matrix4<f32>,
        rotation: &Matrix3<f32>,
    ) {
        let mut screen = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen.iter_mut().zip(&triangle.vertices) {
            match project_with(mvp, &vertex.position, self.width as u32, self.height as u32) {
                Some(p) => *slot = p,
                None => return, // Triangle is clipped
            }
        }

        // Degenerate vertex normals fall back to the face normal.
        let face = triangle.face_normal();
        let light = Vector3::z();
        let brightness = triangle.vertices.map(|v| {
            let n = if v.normal.norm_squared() > f32::EPSILON {
                v.normal
            } else {
                face
            };
            let n = (rotation * n).try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
            n.dot(&light).max(0.0) * (1.0 - AMBIENT) + AMBIENT
        });

        self.rasterize_triangle(&screen, &brightness);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], brightness: &[f32; 3]) {
        let [v0, v1, v2] = *coords;

        // Bounding box, clipped to the screen
        let min_x = v0.0.min(v1.0).min(v2.0).floor().max(0.0) as i32;
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = v0.1.min(v1.1).min(v2.1).floor().max(0.0) as i32;
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), p)
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    let shade = w0 * brightness[0] + w1 * brightness[1] + w2 * brightness[2];
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = shade_char(shade);
                }
            }
        }
    }

    /// Current frame as plain text, one line per row.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.char_buffer
            .chunks(self.width.max(1))
            .map(|row| row.iter().collect())
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (y, row) in self.char_buffer.chunks(self.width.max(1)).enumerate() {
            for &c in row {
                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    _ => Color::Cyan,
                };
                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn shade_char(shade: f32) -> char {
    let last = LUMINOSITY_RAMP.len() - 1;
    let index = (shade.clamp(0.0, 1.0) * last as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(last)]
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);
    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    Some((w0, w1, 1.0 - w0 - w1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmend_core::Session;

    fn quad(extra: &str) -> Session {
        let json = format!(
            r#"{{"positions": [-1,-1,0, 1,-1,0, 1,1,0, -1,1,0], "indices": [0,1,2, 0,2,3]{extra}}}"#
        );
        Session::load(json.as_bytes(), None, 40, 40).unwrap()
    }

    fn covered(renderer: &AsciiRenderer) -> usize {
        renderer.lines().flat_map(|l| l.chars().collect::<Vec<_>>()).filter(|&c| c != ' ').count()
    }

    #[test]
    fn test_barycentric_center() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (1.0, 1.0)).unwrap();
        assert!((w0 - 1.0 / 3.0).abs() < 1e-5);
        assert!((w1 - 1.0 / 3.0).abs() < 1e-5);
        assert!((w2 - 1.0 / 3.0).abs() < 1e-5);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_facing_quad_is_bright() {
        let session = quad("");
        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render(session.geometry(), session.view());
        assert!(covered(&renderer) > 50);
        let center = renderer.lines().nth(10).unwrap();
        assert_eq!(center.chars().nth(20), Some('@'));
    }

    #[test]
    fn test_inverted_normals_render_dark() {
        let session = quad(r#", "normals": [0,0,-1, 0,0,-1, 0,0,-1, 0,0,-1]"#);
        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render(session.geometry(), session.view());
        let center = renderer.lines().nth(10).unwrap();
        let c = center.chars().nth(20).unwrap();
        assert!(LUMINOSITY_RAMP[..2].contains(&c), "expected a dark shade, got {c:?}");
    }

    #[test]
    fn test_unrebased_indices_draw_nothing() {
        let session = Session::load(
            br#"{"positions": [0,0,0, 1,0,0, 0,1,0], "indices": [1,2,3]}"#,
            None,
            40,
            40,
        )
        .unwrap();
        let mut renderer = AsciiRenderer::new(40, 20);
        renderer.render(session.geometry(), session.view());
        assert_eq!(covered(&renderer), 0);
    }
}
