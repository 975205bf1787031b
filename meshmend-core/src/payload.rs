/// Raw mesh payloads and alias-based attribute lookup
use std::fmt;

use serde_json::{Map, Value};

use crate::error::IngestError;

/// Canonical mesh attributes a payload may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    Normal,
    Uv,
    Index,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Position,
        Attribute::Normal,
        Attribute::Uv,
        Attribute::Index,
    ];

    /// Accepted payload keys, highest priority first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Attribute::Position => &["positions", "vertices", "pos", "v"],
            Attribute::Normal => &["normals", "n"],
            Attribute::Uv => &["uvs", "uv", "t"],
            Attribute::Index => &["indices", "triangles", "faces"],
        }
    }

    /// Number of values per element.
    pub fn stride(self) -> usize {
        match self {
            Attribute::Position | Attribute::Normal | Attribute::Index => 3,
            Attribute::Uv => 2,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Position => "position",
            Attribute::Normal => "normal",
            Attribute::Uv => "uv",
            Attribute::Index => "index",
        };
        f.write_str(name)
    }
}

/// An untrusted mesh description: a JSON object with optional attribute arrays.
#[derive(Debug, Clone)]
pub struct MeshPayload {
    fields: Map<String, Value>,
}

impl MeshPayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(IngestError::NotAnObject),
        }
    }

    /// Look up an attribute under its aliases.
    ///
    /// Returns the first alias holding an array-like value. `None` means the
    /// field was not supplied, which is different from an empty array.
    pub fn resolve(&self, attribute: Attribute) -> Option<RawArray<'_>> {
        attribute
            .aliases()
            .iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(RawArray::from_value)
    }

    /// The alias key that `resolve` would pick.
    pub fn resolved_key(&self, attribute: Attribute) -> Option<&'static str> {
        attribute.aliases().iter().copied().find(|key| {
            self.fields
                .get(*key)
                .and_then(RawArray::from_value)
                .is_some()
        })
    }
}

/// A borrowed array-like JSON value.
///
/// Besides plain arrays this accepts objects keyed `"0"`, `"1"`, ... which is
/// how typed arrays come out of `JSON.stringify`.
#[derive(Debug, Clone, Copy)]
pub enum RawArray<'a> {
    List(&'a [Value]),
    Keyed(&'a Map<String, Value>),
}

impl<'a> RawArray<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(RawArray::List(items)),
            Value::Object(map) if map.keys().all(|k| k.parse::<usize>().is_ok()) => {
                Some(RawArray::Keyed(map))
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawArray::List(items) => items.len(),
            RawArray::Keyed(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, position: usize) -> Option<&'a Value> {
        match self {
            RawArray::List(items) => items.get(position),
            RawArray::Keyed(map) => map.get(&position.to_string()),
        }
    }

    /// Read every entry as `f64`, failing on the first non-number.
    pub fn to_f64(&self, attribute: Attribute) -> Result<Vec<f64>, IngestError> {
        (0..self.len())
            .map(|position| {
                self.get(position)
                    .and_then(Value::as_f64)
                    .ok_or(IngestError::NonNumeric {
                        attribute,
                        position,
                    })
            })
            .collect()
    }

    /// Read every entry as `f32`, failing on values that do not fit.
    pub fn to_f32(&self, attribute: Attribute) -> Result<Vec<f32>, IngestError> {
        self.to_f64(attribute)?
            .into_iter()
            .enumerate()
            .map(|(position, value)| {
                let narrow = value as f32;
                if narrow.is_finite() {
                    Ok(narrow)
                } else {
                    Err(IngestError::NonFinite {
                        attribute,
                        position,
                        value,
                    })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> MeshPayload {
        MeshPayload::from_value(value).unwrap()
    }

    #[test]
    fn test_alias_priority() {
        let p = payload(json!({ "v": [1.0, 2.0, 3.0], "vertices": [4.0, 5.0, 6.0] }));
        assert_eq!(p.resolved_key(Attribute::Position), Some("vertices"));
        let raw = p.resolve(Attribute::Position).unwrap();
        assert_eq!(raw.to_f64(Attribute::Position).unwrap(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_absent_is_not_empty() {
        let p = payload(json!({ "positions": [], "faces": null }));
        let positions = p.resolve(Attribute::Position).unwrap();
        assert!(positions.is_empty());
        assert!(p.resolve(Attribute::Index).is_none());
        assert!(p.resolve(Attribute::Normal).is_none());
    }

    #[test]
    fn test_skips_non_array_values() {
        let p = payload(json!({ "uvs": "oops", "t": [0.0, 1.0] }));
        assert_eq!(p.resolved_key(Attribute::Uv), Some("t"));
        assert_eq!(p.resolve(Attribute::Uv).unwrap().len(), 2);
    }

    #[test]
    fn test_typed_array_dump() {
        let p = payload(json!({ "indices": { "0": 2, "1": 0, "2": 1 } }));
        let raw = p.resolve(Attribute::Index).unwrap();
        assert_eq!(raw.to_f64(Attribute::Index).unwrap(), vec![2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_non_numeric_entry() {
        let p = payload(json!({ "normals": [0.0, "1", 0.0] }));
        let err = p
            .resolve(Attribute::Normal)
            .unwrap()
            .to_f32(Attribute::Normal)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::NonNumeric {
                attribute: Attribute::Normal,
                position: 1
            }
        ));
    }

    #[test]
    fn test_out_of_range_float() {
        let p = payload(json!({ "positions": [0.0, 0.0, 0.0, 1e39, 0.0, 0.0] }));
        let raw = p.resolve(Attribute::Position).unwrap();
        assert_eq!(raw.to_f64(Attribute::Position).unwrap()[3], 1e39);
        assert!(matches!(
            raw.to_f32(Attribute::Position),
            Err(IngestError::NonFinite {
                attribute: Attribute::Position,
                position: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(
            MeshPayload::from_slice(b"[1, 2, 3]"),
            Err(IngestError::NotAnObject)
        ));
        assert!(matches!(
            MeshPayload::from_slice(b"{ nope"),
            Err(IngestError::InvalidJson(_))
        ));
    }
}
