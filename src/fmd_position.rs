// Bi-directional BWT interval.
//
// An FmdPosition tracks two equal-length BWT ranges at once: the interval of
// rows whose suffixes start with the search pattern, and the interval of rows
// whose suffixes start with the pattern's reverse complement. Searching one
// pattern therefore searches both strands. The `end_offset` is one less than
// the interval length, so an empty interval has `end_offset < 0`.

use crate::bitvec::BitVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmdPosition {
    pub forward_start: i64,
    pub reverse_start: i64,
    pub end_offset: i64,
}

/// The canonical empty bi-interval used as a restart sentinel.
pub const EMPTY_FMD_POSITION: FmdPosition = FmdPosition {
    forward_start: 0,
    reverse_start: 0,
    end_offset: -1,
};

impl FmdPosition {
    pub fn new(forward_start: i64, reverse_start: i64, end_offset: i64) -> Self {
        FmdPosition {
            forward_start,
            reverse_start,
            end_offset,
        }
    }

    /// Swap the roles of the two strands: the result matches the reverse
    /// complement of whatever this interval matched.
    #[inline]
    pub fn flip(&self) -> Self {
        FmdPosition {
            forward_start: self.reverse_start,
            reverse_start: self.forward_start,
            end_offset: self.end_offset,
        }
    }

    /// Interval length ignoring any mask.
    #[inline]
    pub fn length(&self) -> i64 {
        self.end_offset + 1
    }

    /// Is the interval empty, ignoring any mask?
    #[inline]
    pub fn is_empty_raw(&self) -> bool {
        self.end_offset < 0
    }

    /// Number of forward-interval rows visible through `mask`.
    pub fn masked_length(&self, mask: Option<&BitVector>) -> i64 {
        if self.end_offset < 0 {
            return 0;
        }
        match mask {
            None => self.end_offset + 1,
            Some(mask) => {
                let first = self.forward_start as u64;
                let last = (self.forward_start + self.end_offset) as u64;
                (mask.rank(last) - mask.rank_below(first)) as i64
            }
        }
    }

    /// Is the interval empty as seen through `mask`?
    #[inline]
    pub fn is_empty(&self, mask: Option<&BitVector>) -> bool {
        self.masked_length(mask) == 0
    }

    /// First and last forward-interval rows visible through `mask`, or
    /// `None` when nothing is visible.
    fn masked_bounds(&self, mask: Option<&BitVector>) -> Option<(u64, u64)> {
        if self.end_offset < 0 {
            return None;
        }
        let first = self.forward_start as u64;
        let last = (self.forward_start + self.end_offset) as u64;
        match mask {
            None => Some((first, last)),
            Some(mask) => {
                let below = mask.rank_below(first);
                let through = mask.rank(last);
                if through == below {
                    return None;
                }
                Some((mask.select(below), mask.select(through - 1)))
            }
        }
    }

    /// Index of the merged range that subsumes every visible row, where a
    /// set bit in `ranges` marks the first row of a range. Returns -1 when
    /// the interval is empty under the mask or spans more than one range.
    pub fn range(&self, ranges: &BitVector, mask: Option<&BitVector>) -> i64 {
        let Some((first, last)) = self.masked_bounds(mask) else {
            return -1;
        };
        let first_range = ranges.rank(first) as i64 - 1;
        let last_range = ranges.rank(last) as i64 - 1;
        if first_range < 0 || first_range != last_range {
            return -1;
        }
        first_range
    }

    /// Number of distinct merged ranges the visible rows touch. Diagnostic
    /// counterpart of [`range`](Self::range).
    pub fn range_count(&self, ranges: &BitVector, mask: Option<&BitVector>) -> i64 {
        match self.masked_bounds(mask) {
            None => 0,
            Some((first, last)) => {
                (ranges.rank(last) as i64 - 1) - (ranges.rank(first) as i64 - 1) + 1
            }
        }
    }
}

impl std::fmt::Display for FmdPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}] (reverse [{}, {}])",
            self.forward_start,
            self.forward_start + self.end_offset,
            self.reverse_start,
            self.reverse_start + self.end_offset
        )
    }
}
