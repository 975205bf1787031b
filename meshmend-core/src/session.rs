/// One loaded mesh and everything needed to show and repair it
use log::info;
use thiserror::Error;

use crate::diagnostics::{Report, Stage};
use crate::error::IngestError;
use crate::geometry::Geometry;
use crate::index::IndexBasis;
use crate::pipeline::{self, Ingested};
use crate::projection::View;
use crate::repair::{RepairController, RepairOp, RepairOutcome};
use crate::scene::Format;

/// Closest the camera may dolly towards the mesh.
pub const MIN_ZOOM_DISTANCE: f32 = 0.05;

/// A failed load, with the diagnostics gathered up to the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct LoadFailure {
    #[source]
    pub error: IngestError,
    pub report: Report,
}

impl LoadFailure {
    /// A failure before any bytes arrived.
    pub fn transport(message: impl Into<String>) -> Self {
        let error = IngestError::Transport(message.into());
        let mut report = Report::new();
        report.error(Stage::Fetch, error.to_string());
        Self { error, report }
    }
}

/// Mesh, view state and diagnostics for one mounted viewer.
#[derive(Debug, Clone)]
pub struct Session {
    geometry: Geometry,
    view: View,
    report: Report,
    basis: Option<IndexBasis>,
    format: Format,
    dirty: bool,
}

impl Session {
    /// Run the pipeline over `bytes` and frame the result.
    pub fn load(
        bytes: &[u8],
        format: Option<Format>,
        width: u32,
        height: u32,
    ) -> Result<Self, LoadFailure> {
        let mut report = Report::new();
        match pipeline::ingest_bytes(bytes, format, &mut report) {
            Ok(ingested) => Ok(Self::new(ingested, report, width, height)),
            Err(error) => Err(LoadFailure { error, report }),
        }
    }

    pub fn new(ingested: Ingested, mut report: Report, width: u32, height: u32) -> Self {
        let Ingested {
            mut geometry,
            basis,
            framing,
            format,
        } = ingested;

        let mut view = View::new(width, height, framing);
        let bounds = geometry.compute_bounding_box();
        if let Some(bounds) = &bounds {
            let distance = view.frame(bounds);
            report.info(
                Stage::Framing,
                format!(
                    "bounds {:?} .. {:?}, camera at {distance:.2}",
                    bounds.min.coords.as_slice(),
                    bounds.max.coords.as_slice()
                ),
            );
        }

        info!(
            "initial geometry: {} verts, {} indices ({}), normals {}, uvs {}, bounds {:?}",
            geometry.vertex_count(),
            geometry.index_count(),
            basis.map_or("scene", IndexBasis::as_str),
            if geometry.normals().is_some() { "yes" } else { "no" },
            if geometry.uvs().is_some() { "yes" } else { "no" },
            bounds.map(|b| (b.min, b.max)),
        );

        Self {
            geometry,
            view,
            report,
            basis,
            format,
            dirty: true,
        }
    }

    /// Run a repair and record what it did.
    pub fn apply(&mut self, op: RepairOp) -> RepairOutcome {
        let outcome = RepairController::new(&mut self.geometry, &mut self.view).apply(op);
        match &outcome {
            RepairOutcome::Applied(message) => {
                self.report.info(Stage::Repair, format!("{}: {message}", op.label()));
                if op == RepairOp::RebaseIndices {
                    self.basis = Some(IndexBasis::Zero);
                }
                self.dirty = true;
            }
            RepairOutcome::Unchanged(message) => {
                self.report.info(Stage::Repair, format!("{}: {message}", op.label()));
            }
            RepairOutcome::Skipped(message) => {
                self.report.warning(Stage::Repair, format!("{}: {message}", op.label()));
            }
        }
        outcome
    }

    /// Rotate the displayed mesh; radians.
    pub fn orbit(&mut self, dyaw: f32, dpitch: f32) {
        self.view.orbit.rotate(dyaw, dpitch);
        self.dirty = true;
    }

    /// Scale the viewpoint distance, `factor < 1` moves closer.
    pub fn zoom(&mut self, factor: f32) {
        self.view.camera.dolly(factor, MIN_ZOOM_DISTANCE);
        self.dirty = true;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.view.camera.set_viewport(width, height);
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return whether a redraw is due and clear the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn basis(&self) -> Option<IndexBasis> {
        self.basis
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Status overlay text: counts, index basis, then recent entries.
    pub fn status_lines(&self, limit: usize) -> Vec<String> {
        let mut lines = self.report.status_lines(limit);
        let basis = self.basis.map_or("n/a (scene)", IndexBasis::as_str);
        let at = self.report.counts().map_or(0, |c| c.lines().len());
        lines.insert(at, format!("index basis: {basis}"));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    const ONE_BASED: &[u8] = br#"{"positions": [0,0,0, 1,0,0, 0,1,0], "indices": [1,2,3]}"#;

    #[test]
    fn test_load_frames_and_marks_dirty() {
        let mut session = Session::load(ONE_BASED, None, 800, 500).unwrap();
        assert_eq!(session.basis(), Some(IndexBasis::One));
        assert_eq!(session.format(), Format::Json);
        assert!(session.take_dirty());
        assert!(!session.take_dirty());
        assert!((session.view().framing.offset.x + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_apply_rebase_updates_basis() {
        let mut session = Session::load(ONE_BASED, None, 800, 500).unwrap();
        session.take_dirty();

        assert!(session.apply(RepairOp::RebaseIndices).changed());
        assert_eq!(session.basis(), Some(IndexBasis::Zero));
        assert_eq!(session.geometry().indices().to_vec(), vec![0, 1, 2]);
        assert!(session.take_dirty());

        // Nothing left to rebase, nothing to redraw.
        assert!(!session.apply(RepairOp::RebaseIndices).changed());
        assert!(!session.is_dirty());
        let last = session.report().entries().last().unwrap();
        assert_eq!(last.stage, Stage::Repair);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut session = Session::load(ONE_BASED, None, 800, 500).unwrap();
        for _ in 0..100 {
            session.zoom(0.5);
        }
        assert!((session.view().camera.distance() - MIN_ZOOM_DISTANCE).abs() < 1e-6);
    }

    #[test]
    fn test_load_failure_keeps_report() {
        let failure = Session::load(br#"{"normals": [0, 0, 1]}"#, None, 800, 500).unwrap_err();
        assert_eq!(failure.error.category(), ErrorCategory::MissingData);
        assert!(failure.report.last_error().is_some());

        let failure = LoadFailure::transport("HTTP 404");
        assert_eq!(failure.error.category(), ErrorCategory::Transport);
        assert_eq!(failure.to_string(), "error loading: HTTP 404");
    }

    #[test]
    fn test_status_lines_show_basis() {
        let session = Session::load(ONE_BASED, None, 800, 500).unwrap();
        let lines = session.status_lines(3);
        assert_eq!(lines[0], "positions: 9 (3 verts)");
        assert_eq!(lines[4], "index basis: one");
    }
}
