/// Operator-facing diagnostics: attribute counts and pipeline decisions
use std::fmt;

use log::{debug, error, info, warn};

use crate::geometry::Geometry;
use crate::payload::{Attribute, MeshPayload};

/// Pipeline stage an entry was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Access,
    Indices,
    Normals,
    Build,
    Scene,
    Framing,
    Repair,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Access => "access",
            Stage::Indices => "indices",
            Stage::Normals => "normals",
            Stage::Build => "build",
            Stage::Scene => "scene",
            Stage::Framing => "framing",
            Stage::Repair => "repair",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    /// A validator chose a path on the operator's behalf.
    Decision,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub stage: Stage,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Info | Level::Decision => write!(f, "[{}] {}", self.stage, self.message),
            Level::Warning => write!(f, "[{}] warning: {}", self.stage, self.message),
            Level::Error => write!(f, "[{}] error: {}", self.stage, self.message),
        }
    }
}

/// Raw value counts per attribute; `None` when the attribute is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeCounts {
    pub positions: Option<usize>,
    pub normals: Option<usize>,
    pub uvs: Option<usize>,
    pub indices: Option<usize>,
}

impl AttributeCounts {
    pub fn from_payload(payload: &MeshPayload) -> Self {
        let len = |attribute| payload.resolve(attribute).map(|raw| raw.len());
        Self {
            positions: len(Attribute::Position),
            normals: len(Attribute::Normal),
            uvs: len(Attribute::Uv),
            indices: len(Attribute::Index),
        }
    }

    pub fn from_geometry(geometry: &Geometry) -> Self {
        Self {
            positions: Some(geometry.positions().len()),
            normals: geometry.normals().map(<[f32]>::len),
            uvs: geometry.uvs().map(<[f32]>::len),
            indices: Some(geometry.index_count()),
        }
    }

    pub fn vertex_count(&self) -> Option<usize> {
        self.positions.map(|p| p / 3)
    }

    /// One line per attribute, `n/a` for absent ones.
    pub fn lines(&self) -> Vec<String> {
        let show = |v: Option<usize>| v.map_or_else(|| "n/a".to_string(), |v| v.to_string());
        let positions = match self.positions {
            Some(p) => format!("positions: {} ({} verts)", p, p / 3),
            None => "positions: n/a".to_string(),
        };
        vec![
            positions,
            format!("normals: {}", show(self.normals)),
            format!("uvs: {}", show(self.uvs)),
            format!("indices: {}", show(self.indices)),
        ]
    }
}

/// Accumulated diagnostics for one load.
///
/// Recording only appends to the report; it never touches pipeline data.
#[derive(Debug, Clone, Default)]
pub struct Report {
    counts: Option<AttributeCounts>,
    entries: Vec<Entry>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_counts(&mut self, stage: Stage, counts: AttributeCounts) {
        debug!("[{stage}] {}", counts.lines().join(", "));
        self.counts = Some(counts);
    }

    pub fn record(&mut self, stage: Stage, level: Level, message: impl Into<String>) {
        let entry = Entry {
            stage,
            level,
            message: message.into(),
        };
        match level {
            Level::Info => debug!("{entry}"),
            Level::Decision => info!("{entry}"),
            Level::Warning => warn!("{entry}"),
            Level::Error => error!("{entry}"),
        }
        self.entries.push(entry);
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(stage, Level::Info, message);
    }

    pub fn decision(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(stage, Level::Decision, message);
    }

    pub fn warning(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(stage, Level::Warning, message);
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(stage, Level::Error, message);
    }

    pub fn counts(&self) -> Option<&AttributeCounts> {
        self.counts.as_ref()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn last_error(&self) -> Option<&Entry> {
        self.entries.iter().rev().find(|e| e.level == Level::Error)
    }

    /// Text for the status surface: counts first, then the newest `limit` entries.
    pub fn status_lines(&self, limit: usize) -> Vec<String> {
        let mut lines = self.counts.map(|c| c.lines()).unwrap_or_default();
        let skip = self.entries.len().saturating_sub(limit);
        lines.extend(self.entries.iter().skip(skip).map(Entry::to_string));
        lines
    }
}
