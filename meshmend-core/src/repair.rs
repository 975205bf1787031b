/// Operator-triggered repairs on a loaded mesh
///
/// Each repair mutates the geometry or view in place, refreshes whatever it
/// invalidated, and reports back what it did. Nothing here re-runs ingestion.
use std::fmt;
use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::geometry::Geometry;
use crate::index::Rebase;
use crate::projection::View;

/// The five repairs the control surface exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairOp {
    RecomputeNormals,
    RebaseIndices,
    SwapYZ,
    FlipX,
    CenterAndZoom,
}

impl RepairOp {
    pub const ALL: [RepairOp; 5] = [
        RepairOp::RecomputeNormals,
        RepairOp::RebaseIndices,
        RepairOp::SwapYZ,
        RepairOp::FlipX,
        RepairOp::CenterAndZoom,
    ];

    /// Stable trigger name, used for button ids and CLI input.
    pub fn name(self) -> &'static str {
        match self {
            RepairOp::RecomputeNormals => "recompute-normals",
            RepairOp::RebaseIndices => "rebase-indices",
            RepairOp::SwapYZ => "swap-yz",
            RepairOp::FlipX => "flip-x",
            RepairOp::CenterAndZoom => "center-zoom",
        }
    }

    /// Button caption.
    pub fn label(self) -> &'static str {
        match self {
            RepairOp::RecomputeNormals => "Recompute normals",
            RepairOp::RebaseIndices => "Fix 1-based indices",
            RepairOp::SwapYZ => "Swap Y/Z",
            RepairOp::FlipX => "Flip X",
            RepairOp::CenterAndZoom => "Center & zoom",
        }
    }
}

impl fmt::Display for RepairOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown repair '{0}'")]
pub struct UnknownRepair(pub String);

impl FromStr for RepairOp {
    type Err = UnknownRepair;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepairOp::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| UnknownRepair(s.to_string()))
    }
}

/// What a repair did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The mesh or view changed and needs redrawing.
    Applied(String),
    /// The repair ran but had nothing to change.
    Unchanged(String),
    /// The repair could not run on this mesh; nothing was touched.
    Skipped(String),
}

impl RepairOutcome {
    pub fn message(&self) -> &str {
        match self {
            RepairOutcome::Applied(m) | RepairOutcome::Unchanged(m) | RepairOutcome::Skipped(m) => m,
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self, RepairOutcome::Applied(_))
    }
}

/// Applies repairs to one mesh and the view that displays it.
pub struct RepairController<'a> {
    geometry: &'a mut Geometry,
    view: &'a mut View,
}

impl<'a> RepairController<'a> {
    pub fn new(geometry: &'a mut Geometry, view: &'a mut View) -> Self {
        Self { geometry, view }
    }

    pub fn apply(&mut self, op: RepairOp) -> RepairOutcome {
        debug!("applying repair {op}");
        match op {
            RepairOp::RecomputeNormals => self.recompute_normals(),
            RepairOp::RebaseIndices => self.rebase_indices_to_zero(),
            RepairOp::SwapYZ => self.swap_yz(),
            RepairOp::FlipX => self.flip_x(),
            RepairOp::CenterAndZoom => self.center_and_zoom(),
        }
    }

    /// Replace the normals with area-weighted ones from the current faces.
    pub fn recompute_normals(&mut self) -> RepairOutcome {
        self.geometry.recompute_normals();
        RepairOutcome::Applied("recomputed normals".to_string())
    }

    /// Shift every index down by one if the smallest index is not zero.
    pub fn rebase_indices_to_zero(&mut self) -> RepairOutcome {
        if self.geometry.indices().is_empty() {
            return RepairOutcome::Skipped("no index to fix".to_string());
        }

        match self.geometry.indices_mut().rebase_to_zero() {
            Ok(Rebase::AlreadyZeroBased) => {
                RepairOutcome::Unchanged("indices already 0-based (min is 0)".to_string())
            }
            Ok(Rebase::Rebased { previous_min }) => {
                // New faces, so the derived normals are stale.
                self.geometry.recompute_normals();
                RepairOutcome::Applied(format!(
                    "subtracted 1 from all indices (min was {previous_min})"
                ))
            }
            Err(e) => RepairOutcome::Skipped(e.to_string()),
        }
    }

    /// Exchange the Y and Z component of every position.
    pub fn swap_yz(&mut self) -> RepairOutcome {
        self.geometry.map_positions(|[x, y, z]| [x, z, y]);
        self.refresh_derived();
        RepairOutcome::Applied("swapped Y and Z".to_string())
    }

    /// Negate the X component of every position.
    pub fn flip_x(&mut self) -> RepairOutcome {
        self.geometry.map_positions(|[x, y, z]| [-x, y, z]);
        self.refresh_derived();
        RepairOutcome::Applied("flipped X".to_string())
    }

    /// Re-center the mesh and reset the viewpoint distance from fresh bounds.
    pub fn center_and_zoom(&mut self) -> RepairOutcome {
        match self.geometry.compute_bounding_box() {
            Some(bounds) => {
                let distance = self.view.frame(&bounds);
                RepairOutcome::Applied(format!("centered and zoomed (distance {distance:.2})"))
            }
            None => RepairOutcome::Skipped("no vertices to frame".to_string()),
        }
    }

    fn refresh_derived(&mut self) {
        self.geometry.compute_bounding_box();
        self.geometry.recompute_normals();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuffer;
    use crate::projection::FramingMode;

    fn triangle(indices: Vec<u32>) -> Geometry {
        Geometry::build(
            Some(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            IndexBuffer::from_values(indices),
            None,
            None,
        )
        .unwrap()
    }

    fn view() -> View {
        View::new(800, 500, FramingMode::Fit)
    }

    #[test]
    fn test_parse_names() {
        for op in RepairOp::ALL {
            assert_eq!(op.name().parse::<RepairOp>(), Ok(op));
        }
        assert_eq!(
            "explode".parse::<RepairOp>(),
            Err(UnknownRepair("explode".to_string()))
        );
    }

    #[test]
    fn test_rebase_one_based() {
        let mut geometry = triangle(vec![1, 2, 3]);
        let mut view = view();
        let outcome = RepairController::new(&mut geometry, &mut view).apply(RepairOp::RebaseIndices);
        assert!(outcome.changed());
        assert_eq!(geometry.indices().to_vec(), vec![0, 1, 2]);
        assert_eq!(geometry.triangles().count(), 1);

        // A second rebase has nothing to do.
        let outcome = RepairController::new(&mut geometry, &mut view).apply(RepairOp::RebaseIndices);
        assert!(matches!(outcome, RepairOutcome::Unchanged(_)));
        assert_eq!(geometry.indices().to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rebase_without_indices_is_skipped() {
        let mut geometry = triangle(Vec::new());
        let mut view = view();
        let outcome = RepairController::new(&mut geometry, &mut view).rebase_indices_to_zero();
        assert_eq!(outcome, RepairOutcome::Skipped("no index to fix".to_string()));
    }

    #[test]
    fn test_swap_yz_refreshes_bounds_and_normals() {
        let mut geometry = triangle(vec![0, 1, 2]);
        geometry.recompute_normals();
        let mut view = view();
        RepairController::new(&mut geometry, &mut view).swap_yz();

        let bounds = geometry.bounding_box().unwrap();
        assert_eq!(bounds.max.y, 0.0);
        assert_eq!(bounds.max.z, 1.0);
        // Triangle now lies in the XZ plane, wound towards -Y.
        let normals = geometry.normals().unwrap();
        assert!((normals[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flip_x_twice_restores_positions() {
        let mut geometry = triangle(vec![0, 1, 2]);
        let before = geometry.positions().to_vec();
        let mut view = view();
        let mut controller = RepairController::new(&mut geometry, &mut view);
        controller.flip_x();
        controller.flip_x();
        assert_eq!(geometry.positions(), before.as_slice());
    }

    #[test]
    fn test_center_and_zoom_sets_view() {
        let mut geometry = triangle(vec![0, 1, 2]);
        let mut view = view();
        let outcome = RepairController::new(&mut geometry, &mut view).center_and_zoom();
        assert!(outcome.changed());
        assert!((view.framing.offset.x + 0.5).abs() < 1e-6);
        assert!((view.framing.offset.y + 0.5).abs() < 1e-6);
        assert!((view.camera.distance() - 2f32.sqrt() * 1.2).abs() < 1e-5);
    }
}
