/// meshmend core library - mesh ingestion, validation and repair
///
/// Turns loosely structured vertex payloads and packaged scenes into
/// validated geometry, records every decision it makes on the way, and offers
/// in-place repairs for common authoring mistakes. Rendering front ends build
/// on `Session`.

pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod index;
pub mod normals;
pub mod payload;
pub mod pipeline;
pub mod projection;
pub mod registry;
pub mod repair;
pub mod scene;
pub mod session;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use diagnostics::{AttributeCounts, Level, Report, Stage};
pub use error::{ErrorCategory, IndexError, IngestError};
pub use geometry::{BoundingBox, Geometry, Triangle, Vertex};
pub use index::{IndexBasis, IndexBuffer, IndexWidth};
pub use payload::{Attribute, MeshPayload};
pub use pipeline::{ingest_bytes, ingest_payload, Ingested};
pub use projection::{Camera, Framing, FramingMode, ProjectionMode, View};
pub use registry::{InitStatus, Registry};
pub use repair::{RepairController, RepairOp, RepairOutcome};
pub use scene::Format;
pub use session::{LoadFailure, Session};
pub use transform::Orbit;
