// BWT storage and the backward-search counting primitives.
//
// The transform is held as one indicator bit vector per symbol, so an
// occurrence count is a single rank query and the full five-symbol count is
// five of them. On disk the transform is a run-length byte stream: each byte
// carries a 3-bit symbol code and a 5-bit count chunk, with consecutive
// same-symbol bytes extending the run by successive powers of 32.

use crate::bitvec::{BitVector, BitVectorBuilder};
use crate::dna::{self, NUM_SYMBOLS};
use crate::error::FmdError;
use std::io::{Read, Write};

const LETTER_BITS: usize = 3;
const NUMBER_BITS: usize = 5;
const NUM_POWER: u64 = 32;
const LETTER_MASK: u8 = 0x07;
const COUNT_MASK: u8 = 0x1f;

/// Per-symbol occurrence counts at some BWT prefix, `$` first.
pub type AlphaCount = [i64; NUM_SYMBOLS];

#[derive(Debug, Clone)]
pub struct Bwt {
    len: u64,
    totals: [u64; NUM_SYMBOLS],
    /// pc[c] = number of symbols strictly smaller than c in the whole BWT.
    pc: [u64; NUM_SYMBOLS],
    symbols: Vec<BitVector>,
}

impl Bwt {
    /// Build from a plain symbol-code sequence (codes 0..5, `$`=0).
    pub fn from_codes(codes: &[u8]) -> Result<Self, FmdError> {
        let len = codes.len() as u64;
        let mut builders: Vec<BitVectorBuilder> =
            (0..NUM_SYMBOLS).map(|_| BitVectorBuilder::new()).collect();
        let mut totals = [0u64; NUM_SYMBOLS];
        for (row, &code) in codes.iter().enumerate() {
            if code as usize >= NUM_SYMBOLS {
                return Err(FmdError::InvalidSymbol(code));
            }
            builders[code as usize].add_bit(row as u64);
            totals[code as usize] += 1;
        }
        let mut symbols = Vec::with_capacity(NUM_SYMBOLS);
        for builder in builders {
            symbols.push(builder.finish(len)?);
        }
        let mut pc = [0u64; NUM_SYMBOLS];
        let mut running = 0u64;
        for (c, total) in totals.iter().enumerate() {
            pc[c] = running;
            running += total;
        }
        Ok(Bwt {
            len,
            totals,
            pc,
            symbols,
        })
    }

    /// Total number of BWT rows, terminators included.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total occurrences of one symbol.
    #[inline]
    pub fn total(&self, code: u8) -> u64 {
        self.totals[code as usize]
    }

    /// C table: the number of symbols strictly smaller than `code`.
    #[inline]
    pub fn pc(&self, code: u8) -> i64 {
        self.pc[code as usize] as i64
    }

    /// Occurrences of `code` in rows `0..=row`. A negative row counts zero.
    #[inline]
    pub fn occ(&self, code: u8, row: i64) -> i64 {
        if row < 0 {
            return 0;
        }
        self.symbols[code as usize].rank(row as u64) as i64
    }

    /// Occurrences of every symbol in rows `0..=row` at once.
    pub fn full_occ(&self, row: i64) -> AlphaCount {
        let mut counts = [0i64; NUM_SYMBOLS];
        if row < 0 {
            return counts;
        }
        for (c, vector) in self.symbols.iter().enumerate() {
            counts[c] = vector.rank(row as u64) as i64;
        }
        counts
    }

    /// Symbol code stored at a BWT row (the L column).
    pub fn symbol_at(&self, row: u64) -> Result<u8, FmdError> {
        if row >= self.len {
            return Err(FmdError::OutOfRange {
                what: "BWT",
                index: row as usize,
                len: self.len as usize,
            });
        }
        for (c, vector) in self.symbols.iter().enumerate() {
            if vector.is_set(row) {
                return Ok(c as u8);
            }
        }
        unreachable!("every BWT row holds exactly one symbol");
    }

    /// Symbol code in the first (F) column at a BWT row.
    pub fn first_symbol_at(&self, row: u64) -> Result<u8, FmdError> {
        if row >= self.len {
            return Err(FmdError::OutOfRange {
                what: "BWT",
                index: row as usize,
                len: self.len as usize,
            });
        }
        for c in (0..NUM_SYMBOLS).rev() {
            if self.pc[c] <= row {
                return Ok(c as u8);
            }
        }
        unreachable!("pc[0] is always zero");
    }

    /// Write the run-length encoding.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), FmdError> {
        let mut out = Vec::new();
        let mut row = 0u64;
        while row < self.len {
            let code = self.symbol_at(row)?;
            let mut run = 1u64;
            while row + run < self.len && self.symbol_at(row + run)? == code {
                run += 1;
            }
            row += run;
            while run > 0 {
                out.push(code | (((run & COUNT_MASK as u64) as u8) << LETTER_BITS));
                run >>= NUMBER_BITS;
            }
        }
        writer.write_all(&out)?;
        Ok(())
    }

    /// Decode a run-length stream produced by [`save`](Self::save).
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, FmdError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut codes = Vec::new();
        let mut prev: Option<u8> = None;
        let mut power = 1u64;
        for byte in bytes {
            let code = byte & LETTER_MASK;
            if code as usize >= NUM_SYMBOLS {
                return Err(FmdError::InconsistentIndex(format!(
                    "BWT run symbol code {code} out of range"
                )));
            }
            if prev == Some(code) {
                power *= NUM_POWER;
            } else {
                power = 1;
            }
            prev = Some(code);
            let run = (byte >> LETTER_BITS) as u64 * power;
            for _ in 0..run {
                codes.push(code);
            }
        }
        log::info!(
            "decoded run-length BWT: {} symbols, {} terminators",
            codes.len(),
            codes.iter().filter(|&&c| c == dna::SENTINEL).count()
        );
        Self::from_codes(&codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // BWT of "ACGT$" style toy data; the exact string does not matter for
    // these counting checks.
    fn toy() -> Bwt {
        // codes: T G $ C A A $  ->  4 3 0 2 1 1 0
        Bwt::from_codes(&[4, 3, 0, 2, 1, 1, 0]).unwrap()
    }

    #[test]
    fn totals_and_pc() {
        let bwt = toy();
        assert_eq!(bwt.len(), 7);
        assert_eq!(bwt.total(0), 2);
        assert_eq!(bwt.total(1), 2);
        assert_eq!(bwt.pc(0), 0);
        assert_eq!(bwt.pc(1), 2);
        assert_eq!(bwt.pc(2), 4);
        assert_eq!(bwt.pc(3), 5);
        assert_eq!(bwt.pc(4), 6);
    }

    #[test]
    fn occ_is_inclusive_prefix_count() {
        let bwt = toy();
        assert_eq!(bwt.occ(1, -1), 0);
        assert_eq!(bwt.occ(1, 3), 0);
        assert_eq!(bwt.occ(1, 4), 1);
        assert_eq!(bwt.occ(1, 6), 2);
        assert_eq!(bwt.occ(0, 2), 1);
        assert_eq!(bwt.occ(0, 6), 2);
        let full = bwt.full_occ(4);
        assert_eq!(full, [1, 1, 1, 1, 1]);
    }

    #[test]
    fn symbol_access_both_columns() {
        let bwt = toy();
        let l: Vec<u8> = (0..7).map(|row| bwt.symbol_at(row).unwrap()).collect();
        assert_eq!(l, vec![4, 3, 0, 2, 1, 1, 0]);
        // F column is the sorted symbol sequence: $ $ A A C G T.
        let f: Vec<u8> = (0..7).map(|row| bwt.first_symbol_at(row).unwrap()).collect();
        assert_eq!(f, vec![0, 0, 1, 1, 2, 3, 4]);
        assert!(bwt.symbol_at(7).is_err());
    }

    #[test]
    fn run_length_round_trip() {
        // Long runs exercise the multi-byte count chunks.
        let mut codes = vec![1u8; 100];
        codes.extend(vec![3u8; 40]);
        codes.push(0);
        codes.extend(vec![4u8; 7]);
        let bwt = Bwt::from_codes(&codes).unwrap();

        let mut bytes = Vec::new();
        bwt.save(&mut bytes).unwrap();
        let restored = Bwt::load(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(restored.len(), bwt.len());
        for row in 0..bwt.len() {
            assert_eq!(
                restored.symbol_at(row).unwrap(),
                bwt.symbol_at(row).unwrap()
            );
        }
    }
}
