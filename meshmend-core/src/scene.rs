/// Packaged scene ingestion (glTF / GLB and STL)
///
/// Scenes carry their own positions, normals and indices, so they skip index
/// classification and normal validation and go straight to the builder.
use log::{debug, warn};

use crate::error::IngestError;
use crate::geometry::Geometry;
use crate::index::IndexBuffer;
use crate::stl::{self, Facet};

/// Model formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Loose JSON vertex payload.
    Json,
    /// glTF, binary or JSON with embedded buffers.
    Gltf,
    Stl,
}

impl Format {
    /// Guess the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"glTF") {
            return Some(Format::Gltf);
        }
        if stl::looks_ascii(bytes) {
            return Some(Format::Stl);
        }
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            return Some(if is_gltf_json(bytes) {
                Format::Gltf
            } else {
                Format::Json
            });
        }
        // Binary STL has no magic; accept anything whose size adds up.
        if bytes.len() >= 84 {
            let declared = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
            if declared.checked_mul(50).and_then(|n| n.checked_add(84)) == Some(bytes.len()) {
                return Some(Format::Stl);
            }
        }
        None
    }
}

fn is_gltf_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|v| v.get("asset").is_some() && v.get("meshes").is_some())
        .unwrap_or(false)
}

/// Flattened triangle data read from a scene file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMesh {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub uvs: Option<Vec<f32>>,
    pub indices: Vec<u32>,
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Build geometry, deriving normals when the scene has none.
    pub fn into_geometry(self) -> Result<Geometry, IngestError> {
        let derive_normals = self.normals.is_none();
        let positions = (!self.positions.is_empty()).then_some(self.positions);
        let mut geometry = Geometry::build(
            positions,
            IndexBuffer::from_values(self.indices),
            self.normals,
            self.uvs,
        )?;
        if derive_normals {
            geometry.recompute_normals();
        }
        Ok(geometry)
    }
}

/// Read every triangle primitive of a glTF document into one mesh.
///
/// Node transforms are not applied; primitives are merged in mesh space.
pub fn load_gltf(bytes: &[u8]) -> Result<SceneMesh, IngestError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, None, blob)?;

    let mut mesh = SceneMesh::default();
    let mut normals = Some(Vec::new());
    let mut uvs = Some(Vec::new());

    for gltf_mesh in document.meshes() {
        for (p, primitive) in gltf_mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                warn!(
                    "skipping mesh {} primitive {p}: {:?} topology",
                    gltf_mesh.index(),
                    primitive.mode()
                );
                continue;
            }

            let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(it) => it.collect(),
                None => {
                    warn!("skipping mesh {} primitive {p}: no positions", gltf_mesh.index());
                    continue;
                }
            };

            let base = u32::try_from(mesh.vertex_count())
                .map_err(|_| IngestError::TooManyVertices(mesh.vertex_count()))?;
            let count = positions.len();
            mesh.positions.extend(positions.iter().flatten());
            if u32::try_from(mesh.vertex_count()).is_err() {
                return Err(IngestError::TooManyVertices(mesh.vertex_count()));
            }

            let read_normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
            normals = match (normals.take(), read_normals) {
                (Some(mut all), Some(read)) if read.len() == count => {
                    all.extend(read.iter().flatten());
                    Some(all)
                }
                _ => None,
            };

            let read_uvs: Option<Vec<[f32; 2]>> =
                reader.read_tex_coords(0).map(|it| it.into_f32().collect());
            uvs = match (uvs.take(), read_uvs) {
                (Some(mut all), Some(read)) if read.len() == count => {
                    all.extend(read.iter().flatten());
                    Some(all)
                }
                _ => None,
            };

            match reader.read_indices() {
                Some(it) => {
                    for i in it.into_u32() {
                        let shifted = i.checked_add(base).ok_or(IngestError::InvalidIndex {
                            position: mesh.indices.len(),
                            value: f64::from(i),
                        })?;
                        mesh.indices.push(shifted);
                    }
                }
                None => {
                    // base + count fits: the vertex total was checked above.
                    let len = (count / 3 * 3) as u32;
                    mesh.indices.extend((0..len).map(|i| i + base));
                }
            }
        }
    }

    if mesh.positions.is_empty() {
        return Err(IngestError::MissingPositions { found: None });
    }
    debug!(
        "glTF scene: {} vertices, {} indices",
        mesh.vertex_count(),
        mesh.indices.len()
    );

    mesh.normals = normals;
    mesh.uvs = uvs.filter(|uv| !uv.is_empty());
    Ok(mesh)
}

/// Unroll STL facets into an indexed mesh, three vertices per facet.
///
/// Facet normals are used when every facet has one; otherwise the normals are
/// left for the builder to derive.
pub fn load_stl(bytes: &[u8]) -> Result<SceneMesh, IngestError> {
    let facets = stl::parse_stl(bytes)?;
    Ok(facets_to_mesh(&facets))
}

fn facets_to_mesh(facets: &[Facet]) -> SceneMesh {
    let has_normals = facets.iter().all(|f| f.normal.iter().any(|&c| c != 0.0));
    let positions = facets
        .iter()
        .flat_map(|f| f.corners.iter().flatten().copied())
        .collect();
    let normals = has_normals.then(|| {
        facets
            .iter()
            .flat_map(|f| std::iter::repeat(f.normal).take(3).flatten())
            .collect()
    });
    let indices = (0..facets.len() as u32 * 3).collect();

    SceneMesh {
        positions,
        normals,
        uvs: None,
        indices,
    }
}
