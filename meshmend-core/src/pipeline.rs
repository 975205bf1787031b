/// Ingestion pipeline: raw bytes or payload in, validated geometry out
///
/// Every stage runs synchronously and either hands a complete geometry back or
/// fails without exposing anything partial.
use crate::diagnostics::{AttributeCounts, Report, Stage};
use crate::error::IngestError;
use crate::geometry::Geometry;
use crate::index::{self, IndexBasis};
use crate::normals::{self, NormalDecision};
use crate::payload::{Attribute, MeshPayload};
use crate::projection::{FramingMode, DEFAULT_TARGET_SIZE};
use crate::scene::{self, Format};

/// A successfully ingested mesh, ready to hand to a session.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub geometry: Geometry,
    /// Index basis classification; `None` for packaged scenes.
    pub basis: Option<IndexBasis>,
    pub framing: FramingMode,
    pub format: Format,
}

/// Ingest bytes of a known or sniffed format.
pub fn ingest_bytes(
    bytes: &[u8],
    format: Option<Format>,
    report: &mut Report,
) -> Result<Ingested, IngestError> {
    let format = match format.or_else(|| Format::sniff(bytes)) {
        Some(format) => format,
        None => return Err(fail(report, Stage::Access, IngestError::UnsupportedFormat)),
    };

    match format {
        Format::Json => {
            let payload = MeshPayload::from_slice(bytes).map_err(|e| fail(report, Stage::Access, e))?;
            ingest_payload(&payload, report)
        }
        Format::Gltf | Format::Stl => ingest_scene(bytes, format, report),
    }
}

/// Run the loose-payload pipeline: access, normalize indices, validate normals, build.
pub fn ingest_payload(payload: &MeshPayload, report: &mut Report) -> Result<Ingested, IngestError> {
    report.observe_counts(Stage::Access, AttributeCounts::from_payload(payload));

    let positions = read_f32(payload, Attribute::Position).map_err(|e| fail(report, Stage::Access, e))?;
    let vertex_count = match &positions {
        Some(p) if p.len() >= 3 => p.len() / 3,
        other => {
            let found = other.as_ref().map(Vec::len);
            return Err(fail(report, Stage::Build, IngestError::MissingPositions { found }));
        }
    };

    let raw_indices = payload
        .resolve(Attribute::Index)
        .map(|raw| raw.to_f64(Attribute::Index))
        .transpose()
        .map_err(|e| fail(report, Stage::Access, e))?;
    let normalized = index::normalize(raw_indices.as_deref(), vertex_count)
        .map_err(|e| fail(report, Stage::Indices, e))?;
    report_indices(report, &normalized.buffer, normalized.basis, vertex_count);

    let raw_normals = read_normals(payload).map_err(|e| fail(report, Stage::Access, e))?;
    let (normals, recompute) = match normals::validate(raw_normals, vertex_count) {
        NormalDecision::Accepted(n) => {
            report.info(
                Stage::Normals,
                format!("avg normal length {:.3}", normals::mean_length(&n)),
            );
            (Some(n), false)
        }
        NormalDecision::NeedsRecompute(reason) => {
            report.decision(Stage::Normals, format!("{reason} -> computing normals"));
            (None, true)
        }
    };

    let uvs = read_f32(payload, Attribute::Uv).map_err(|e| fail(report, Stage::Access, e))?;
    // An empty stream is treated as absent; an odd one fails in the builder.
    let uvs = uvs.filter(|uv| !uv.is_empty());

    let mut geometry = Geometry::build(positions, normalized.buffer, normals, uvs)
        .map_err(|e| fail(report, Stage::Build, e))?;
    if recompute {
        geometry.recompute_normals();
    }
    report.observe_counts(Stage::Build, AttributeCounts::from_geometry(&geometry));

    Ok(Ingested {
        geometry,
        basis: Some(normalized.basis),
        framing: FramingMode::Fit,
        format: Format::Json,
    })
}

/// Packaged scenes bypass index and normal validation.
pub fn ingest_scene(bytes: &[u8], format: Format, report: &mut Report) -> Result<Ingested, IngestError> {
    let mesh = match format {
        Format::Gltf => scene::load_gltf(bytes),
        Format::Stl => scene::load_stl(bytes),
        Format::Json => Err(IngestError::UnsupportedFormat),
    }
    .map_err(|e| fail(report, Stage::Scene, e))?;

    let supplied_normals = mesh.normals.is_some();
    let geometry = mesh.into_geometry().map_err(|e| fail(report, Stage::Build, e))?;
    report.observe_counts(Stage::Scene, AttributeCounts::from_geometry(&geometry));
    report.decision(
        Stage::Scene,
        format!("packaged {format:?} scene: index and normal checks skipped"),
    );
    if !supplied_normals {
        report.decision(Stage::Normals, "scene has no normals -> computing normals");
    }

    Ok(Ingested {
        geometry,
        basis: None,
        framing: FramingMode::TargetSize(DEFAULT_TARGET_SIZE),
        format,
    })
}

fn read_f32(payload: &MeshPayload, attribute: Attribute) -> Result<Option<Vec<f32>>, IngestError> {
    payload
        .resolve(attribute)
        .map(|raw| raw.to_f32(attribute))
        .transpose()
}

/// Normals that overflow `f32` are kept as infinities; the validator then
/// rejects them and they get recomputed instead of failing the load.
fn read_normals(payload: &MeshPayload) -> Result<Option<Vec<f32>>, IngestError> {
    let raw = payload
        .resolve(Attribute::Normal)
        .map(|raw| raw.to_f64(Attribute::Normal))
        .transpose()?;
    Ok(raw.map(|values| values.into_iter().map(|v| v as f32).collect()))
}

fn report_indices(
    report: &mut Report,
    buffer: &index::IndexBuffer,
    basis: IndexBasis,
    vertex_count: usize,
) {
    match basis {
        IndexBasis::Synthesized => report.decision(
            Stage::Indices,
            format!("created sequential index buffer length {}", buffer.len()),
        ),
        IndexBasis::Zero | IndexBasis::One => {
            if let Some((min, max)) = buffer.min_max() {
                report.info(
                    Stage::Indices,
                    format!("index min/max {min}/{max} ({:?})", buffer.width()),
                );
            }
            if basis == IndexBasis::One {
                report.decision(
                    Stage::Indices,
                    "indices look 1-based; use rebase to shift them to 0",
                );
            }
        }
    }

    let outside = buffer.out_of_range(vertex_count);
    if outside > 0 {
        report.warning(
            Stage::Indices,
            format!("{outside} indices point past the last vertex ({vertex_count} verts)"),
        );
    }
}

fn fail(report: &mut Report, stage: Stage, error: IngestError) -> IngestError {
    report.error(stage, error.to_string());
    error
}
