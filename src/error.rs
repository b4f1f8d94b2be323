// Error taxonomy for index loading and search primitives.
//
// Every primitive is total over well-formed inputs; errors flag programmer
// mistakes (bad symbols, out-of-range rows, extending an empty interval) or
// broken index files. Mapping schemes report "no results" as unmapped
// entries, never as errors.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FmdError {
    /// A query or extension character is not one of `ACGT`.
    #[error("character {:?} is not a DNA base", *.0 as char)]
    InvalidSymbol(u8),

    /// An index past the end of the BWT, LCP array, or contig table.
    #[error("index {index} out of range ({what} has {len} entries)")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Loaded index files disagree with each other.
    #[error("inconsistent index: {0}")]
    InconsistentIndex(String),

    /// Attempt to extend a bi-interval that is already empty.
    #[error("cannot extend an empty bi-interval")]
    EmptyInterval,

    /// File read/write failure during load or save.
    #[error("index I/O: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_symbol() {
        let message = FmdError::InvalidSymbol(b'N').to_string();
        assert!(message.contains('N'), "got: {message}");
    }
}
