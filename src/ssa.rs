// Sampled suffix array.
//
// Samples are kept for every suffix whose text offset is a multiple of the
// sample rate, keyed by BWT row. Offset 0 of every text is always sampled,
// so an LF walk from any row reaches a sample in fewer than `sample_rate`
// steps without ever crossing a terminator. The walk itself lives on
// `FmdIndex::locate`.

use crate::error::FmdError;
use crate::text_position::TextPosition;
use crate::utils::{BinaryRead, BinaryWrite};
use std::io::{Read, Write};

#[derive(Debug, Clone)]
pub struct SampledSuffixArray {
    sample_rate: u64,
    /// Sampled BWT rows in increasing order, parallel to `positions`.
    rows: Vec<u64>,
    positions: Vec<TextPosition>,
}

impl SampledSuffixArray {
    pub fn new(sample_rate: u64, mut samples: Vec<(u64, TextPosition)>) -> Self {
        samples.sort_by_key(|&(row, _)| row);
        let rows = samples.iter().map(|&(row, _)| row).collect();
        let positions = samples.into_iter().map(|(_, pos)| pos).collect();
        SampledSuffixArray {
            sample_rate,
            rows,
            positions,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The stored position for a BWT row, if that row was sampled.
    pub fn get(&self, row: u64) -> Option<TextPosition> {
        self.rows
            .binary_search(&row)
            .ok()
            .map(|at| self.positions[at])
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), FmdError> {
        writer.write_u64_le(self.sample_rate)?;
        writer.write_u64_le(self.rows.len() as u64)?;
        for (row, pos) in self.rows.iter().zip(&self.positions) {
            writer.write_u64_le(*row)?;
            writer.write_u64_le(pos.text() as u64)?;
            writer.write_u64_le(pos.offset() as u64)?;
        }
        Ok(())
    }

    pub fn load<R: Read>(reader: &mut R) -> Result<Self, FmdError> {
        let sample_rate = reader.read_u64_le()?;
        if sample_rate == 0 {
            return Err(FmdError::InconsistentIndex(
                "suffix array sample rate is zero".to_string(),
            ));
        }
        let count = reader.read_u64_le()?;
        let mut samples = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let row = reader.read_u64_le()?;
            let text = reader.read_u64_le()? as usize;
            let offset = reader.read_u64_le()? as usize;
            samples.push((row, TextPosition::new(text, offset)));
        }
        Ok(Self::new(sample_rate, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn lookup_and_round_trip() {
        let samples = vec![
            (7, TextPosition::new(0, 0)),
            (2, TextPosition::new(1, 4)),
            (11, TextPosition::new(0, 8)),
        ];
        let ssa = SampledSuffixArray::new(4, samples);

        assert_eq!(ssa.sample_rate(), 4);
        assert_eq!(ssa.get(2), Some(TextPosition::new(1, 4)));
        assert_eq!(ssa.get(7), Some(TextPosition::new(0, 0)));
        assert_eq!(ssa.get(3), None);

        let mut bytes = Vec::new();
        ssa.save(&mut bytes).unwrap();
        let restored = SampledSuffixArray::load(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(restored.sample_rate(), 4);
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.get(11), Some(TextPosition::new(0, 8)));
    }

    #[test]
    fn zero_rate_is_rejected() {
        let mut bytes = Vec::new();
        bytes.write_u64_le(0).unwrap();
        bytes.write_u64_le(0).unwrap();
        assert!(matches!(
            SampledSuffixArray::load(&mut Cursor::new(bytes)),
            Err(FmdError::InconsistentIndex(_))
        ));
    }
}
