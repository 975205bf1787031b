/// Index stream normalization: basis detection, synthesis and storage width
use log::{debug, info};

use crate::error::{IndexError, IngestError};
use crate::payload::Attribute;

/// How the index stream relates to the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBasis {
    /// Smallest index is 0.
    Zero,
    /// Smallest index is at least 1; the stream is probably 1-based.
    One,
    /// No indices were supplied; a sequential list was generated.
    Synthesized,
}

impl IndexBasis {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexBasis::Zero => "zero",
            IndexBasis::One => "one",
            IndexBasis::Synthesized => "synthesized",
        }
    }
}

/// Storage width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    /// Narrowest width that holds `max`.
    pub fn for_max(max: u32) -> Self {
        if max <= u32::from(u16::MAX) {
            IndexWidth::U16
        } else {
            IndexWidth::U32
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// Triangle list indices, stored at the narrowest width that fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

/// Result of a rebase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebase {
    /// Nothing to do: the buffer is empty or already starts at 0.
    AlreadyZeroBased,
    /// Every entry was shifted down by one.
    Rebased { previous_min: u32 },
}

impl IndexBuffer {
    pub fn from_values(values: Vec<u32>) -> Self {
        let max = values.iter().copied().max().unwrap_or(0);
        match IndexWidth::for_max(max) {
            IndexWidth::U16 => IndexBuffer::U16(values.into_iter().map(|v| v as u16).collect()),
            IndexWidth::U32 => IndexBuffer::U32(values),
        }
    }

    /// Sequential list `[0, 1, 2, ...]` covering `vertex_count / 3` triangles.
    pub fn sequential(vertex_count: usize) -> Result<Self, IngestError> {
        let len = vertex_count / 3 * 3;
        let len = u32::try_from(len).map_err(|_| IngestError::TooManyVertices(vertex_count))?;
        Ok(Self::from_values((0..len).collect()))
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            IndexBuffer::U16(_) => IndexWidth::U16,
            IndexBuffer::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn triangle_count(&self) -> usize {
        self.len() / 3
    }

    pub fn get(&self, position: usize) -> Option<u32> {
        match self {
            IndexBuffer::U16(v) => v.get(position).map(|&i| u32::from(i)),
            IndexBuffer::U32(v) => v.get(position).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Complete triangles, in order.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.triangle_count()).filter_map(move |t| {
            Some([self.get(t * 3)?, self.get(t * 3 + 1)?, self.get(t * 3 + 2)?])
        })
    }

    pub fn min_max(&self) -> Option<(u32, u32)> {
        self.iter().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Number of entries that point past the end of the vertex buffer.
    pub fn out_of_range(&self, vertex_count: usize) -> usize {
        self.iter().filter(|&i| i as usize >= vertex_count).count()
    }

    /// Shift a 1-based stream down to 0-based.
    ///
    /// Idempotent: a buffer whose minimum is already 0 is left untouched.
    pub fn rebase_to_zero(&mut self) -> Result<Rebase, IndexError> {
        let previous_min = match self.min_max() {
            Some((0, _)) | None => return Ok(Rebase::AlreadyZeroBased),
            Some((min, _)) => min,
        };

        match self {
            IndexBuffer::U16(v) => shift_down(v)?,
            IndexBuffer::U32(v) => shift_down(v)?,
        }

        Ok(Rebase::Rebased { previous_min })
    }
}

fn shift_down<T>(values: &mut [T]) -> Result<(), IndexError>
where
    T: Copy + TryFrom<u32> + Into<u64>,
{
    // Validate the whole buffer before touching it so a failure leaves it intact.
    if let Some(position) = values.iter().position(|&v| Into::<u64>::into(v) == 0) {
        return Err(IndexError::Underflow { position });
    }
    for v in values.iter_mut() {
        let wide: u64 = (*v).into();
        if let Ok(narrow) = T::try_from((wide - 1) as u32) {
            *v = narrow;
        }
    }
    Ok(())
}

/// Output of the index normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedIndices {
    pub buffer: IndexBuffer,
    pub basis: IndexBasis,
}

/// Turn a raw (possibly absent) index stream into a triangle index buffer.
///
/// Absent or empty streams are synthesized. Present streams are validated and
/// classified but never rebased automatically.
pub fn normalize(raw: Option<&[f64]>, vertex_count: usize) -> Result<NormalizedIndices, IngestError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            let buffer = IndexBuffer::sequential(vertex_count)?;
            debug!("created sequential index buffer length {}", buffer.len());
            return Ok(NormalizedIndices {
                buffer,
                basis: IndexBasis::Synthesized,
            });
        }
    };

    if raw.len() % 3 != 0 {
        return Err(IngestError::MalformedStream {
            attribute: Attribute::Index,
            len: raw.len(),
            stride: 3,
        });
    }

    let values = raw
        .iter()
        .enumerate()
        .map(|(position, &value)| to_index(position, value))
        .collect::<Result<Vec<u32>, _>>()?;

    let buffer = IndexBuffer::from_values(values);
    let (min, max) = buffer.min_max().unwrap_or((0, 0));
    debug!(
        "index min/max {min}/{max}, stored as {:?}",
        buffer.width()
    );

    let basis = if min >= 1 {
        info!("smallest index is {min}; stream looks 1-based");
        IndexBasis::One
    } else {
        IndexBasis::Zero
    };

    Ok(NormalizedIndices { buffer, basis })
}

fn to_index(position: usize, value: f64) -> Result<u32, IngestError> {
    let valid = value.is_finite()
        && value >= 0.0
        && value.fract() == 0.0
        && value <= f64::from(u32::MAX);
    if valid {
        Ok(value as u32)
    } else {
        Err(IngestError::InvalidIndex { position, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_when_absent() {
        let out = normalize(None, 7).unwrap();
        assert_eq!(out.basis, IndexBasis::Synthesized);
        assert_eq!(out.buffer.to_vec(), vec![0, 1, 2, 3, 4, 5]);

        let out = normalize(Some(&[]), 3).unwrap();
        assert_eq!(out.basis, IndexBasis::Synthesized);
        assert_eq!(out.buffer.to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_classify_basis() {
        let zero = normalize(Some(&[0.0, 1.0, 2.0]), 3).unwrap();
        assert_eq!(zero.basis, IndexBasis::Zero);

        let one = normalize(Some(&[1.0, 2.0, 3.0]), 3).unwrap();
        assert_eq!(one.basis, IndexBasis::One);
        // Not rebased automatically.
        assert_eq!(one.buffer.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_length_not_multiple_of_three() {
        let err = normalize(Some(&[0.0, 1.0, 2.0, 3.0]), 4).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MalformedStream {
                attribute: Attribute::Index,
                len: 4,
                stride: 3
            }
        ));
    }

    #[test]
    fn test_invalid_values() {
        for bad in [-1.0, 0.5, f64::NAN, f64::INFINITY, 5.0e9] {
            let err = normalize(Some(&[0.0, 1.0, bad]), 3).unwrap_err();
            assert!(matches!(err, IngestError::InvalidIndex { position: 2, .. }));
        }
    }

    #[test]
    fn test_width_follows_max() {
        let small = normalize(Some(&[0.0, 1.0, 65535.0]), 65536).unwrap();
        assert_eq!(small.buffer.width(), IndexWidth::U16);

        let wide = normalize(Some(&[0.0, 1.0, 70000.0]), 70001).unwrap();
        assert_eq!(wide.buffer.width(), IndexWidth::U32);
        assert_eq!(wide.buffer.get(2), Some(70000));
        assert_eq!(IndexWidth::U32.bytes(), 4);
    }

    #[test]
    fn test_rebase_is_idempotent() {
        let mut buffer = IndexBuffer::from_values(vec![1, 2, 3]);
        assert_eq!(
            buffer.rebase_to_zero(),
            Ok(Rebase::Rebased { previous_min: 1 })
        );
        assert_eq!(buffer.to_vec(), vec![0, 1, 2]);
        assert_eq!(buffer.rebase_to_zero(), Ok(Rebase::AlreadyZeroBased));
        assert_eq!(buffer.to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rebase_empty_is_noop() {
        let mut buffer = IndexBuffer::from_values(Vec::new());
        assert_eq!(buffer.rebase_to_zero(), Ok(Rebase::AlreadyZeroBased));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_out_of_range_and_triangles() {
        let buffer = IndexBuffer::from_values(vec![1, 2, 3, 0, 1, 2]);
        assert_eq!(buffer.out_of_range(3), 1);
        let tris: Vec<_> = buffer.triangles().collect();
        assert_eq!(tris, vec![[1, 2, 3], [0, 1, 2]]);
    }

    #[test]
    fn test_shift_down_refuses_zero() {
        let mut values: Vec<u16> = vec![3, 0, 2];
        assert_eq!(
            shift_down(&mut values),
            Err(IndexError::Underflow { position: 1 })
        );
        assert_eq!(values, vec![3, 0, 2]);
    }
}
