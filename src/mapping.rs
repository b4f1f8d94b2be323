// Per-position mapping results.
//
// A mapping either places a query base at a (text, offset) position or marks
// it unmapped. Context lengths count the mapped base itself and may be
// nonzero even on unmapped entries, which credit propagation relies on.

use crate::text_position::TextPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    location: TextPosition,
    is_mapped: bool,
    left_max_context: usize,
    right_max_context: usize,
}

impl Mapping {
    /// An unmapped marker.
    pub fn unmapped() -> Self {
        Mapping {
            location: TextPosition::new(0, 0),
            is_mapped: false,
            left_max_context: 0,
            right_max_context: 0,
        }
    }

    /// A mapping with no recorded context.
    pub fn to(location: TextPosition) -> Self {
        Mapping {
            location,
            is_mapped: true,
            left_max_context: 0,
            right_max_context: 0,
        }
    }

    /// A mapping with known left and right context lengths.
    pub fn with_context(location: TextPosition, left: usize, right: usize) -> Self {
        Mapping {
            location,
            is_mapped: true,
            left_max_context: left,
            right_max_context: right,
        }
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.is_mapped
    }

    #[inline]
    pub fn location(&self) -> TextPosition {
        self.location
    }

    #[inline]
    pub fn left_max_context(&self) -> usize {
        self.left_max_context
    }

    #[inline]
    pub fn right_max_context(&self) -> usize {
        self.right_max_context
    }

    pub fn set_max_context(&mut self, left: usize, right: usize) {
        self.left_max_context = left;
        self.right_max_context = right;
    }

    /// Do two mappings agree? Unmapped entries agree only with unmapped
    /// entries; contexts are not compared.
    pub fn same_place(&self, other: &Mapping) -> bool {
        match (self.is_mapped, other.is_mapped) {
            (false, false) => true,
            (true, true) => self.location == other.location,
            _ => false,
        }
    }

    /// The same mapping seen from the other strand of its contig, with the
    /// context sides exchanged. Unmapped entries are unchanged.
    pub fn flip(&self, contig_length: usize) -> Self {
        if !self.is_mapped {
            return *self;
        }
        Mapping {
            location: self.location.flip(contig_length),
            is_mapped: true,
            left_max_context: self.right_max_context,
            right_max_context: self.left_max_context,
        }
    }
}

/// Result of a range-targeted mapping: the merged-range index a base landed
/// in (or -1), with the minimum and maximum context that supported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMapping {
    range: i64,
    context: usize,
    max_context: usize,
}

impl RangeMapping {
    pub fn unmapped() -> Self {
        RangeMapping {
            range: -1,
            context: 0,
            max_context: 0,
        }
    }

    pub fn to(range: i64, context: usize, max_context: usize) -> Self {
        RangeMapping {
            range,
            context,
            max_context,
        }
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.range >= 0
    }

    #[inline]
    pub fn range(&self) -> i64 {
        self.range
    }

    #[inline]
    pub fn context(&self) -> usize {
        self.context
    }

    #[inline]
    pub fn max_context(&self) -> usize {
        self.max_context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_place_ignores_context() {
        let a = Mapping::with_context(TextPosition::new(0, 5), 3, 7);
        let b = Mapping::with_context(TextPosition::new(0, 5), 1, 1);
        let c = Mapping::with_context(TextPosition::new(2, 5), 3, 7);
        assert!(a.same_place(&b));
        assert!(!a.same_place(&c));
        assert!(!a.same_place(&Mapping::unmapped()));
        assert!(Mapping::unmapped().same_place(&Mapping::unmapped()));
    }

    #[test]
    fn flip_swaps_contexts() {
        let mapping = Mapping::with_context(TextPosition::new(0, 2), 3, 8);
        let flipped = mapping.flip(10);
        assert_eq!(flipped.location(), TextPosition::new(1, 7));
        assert_eq!(flipped.left_max_context(), 8);
        assert_eq!(flipped.right_max_context(), 3);
        assert_eq!(flipped.flip(10), mapping);
        assert_eq!(Mapping::unmapped().flip(10), Mapping::unmapped());
    }
}
