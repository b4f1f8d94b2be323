// FMD-index: a bidirectional FM-index over every contig and its reverse
// complement.
//
// The index is assembled from five on-disk pieces sharing a basename: the
// run-length BWT (.bwt), the sampled suffix array (.ssa), the LCP/PSV/NSV
// arrays (.lcp), the contig table (.contigs), and the per-genome masks
// (.msk). All pieces are immutable after load, so an index can be shared by
// reference across threads.

use crate::bitvec::BitVector;
use crate::bwt::{AlphaCount, Bwt};
use crate::contigs::ContigMetadata;
use crate::dna::{self, BASES};
use crate::error::FmdError;
use crate::fmd_position::FmdPosition;
use crate::lcp::LcpArray;
use crate::ssa::SampledSuffixArray;
use crate::text_position::TextPosition;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub struct FmdIndex {
    bwt: Bwt,
    ssa: SampledSuffixArray,
    lcp: LcpArray,
    contigs: ContigMetadata,
    masks: Vec<BitVector>,
    /// BWT row holding the last forward-strand character of each contig.
    end_indices: Vec<u64>,
}

impl FmdIndex {
    /// Assemble an index from already-loaded parts, checking that they
    /// describe the same reference.
    pub fn from_parts(
        bwt: Bwt,
        ssa: SampledSuffixArray,
        lcp: LcpArray,
        mut contigs: ContigMetadata,
        masks: Vec<BitVector>,
    ) -> Result<Self, FmdError> {
        let n_contigs = contigs.count();
        let bwt_len = bwt.len();

        if bwt.total(dna::SENTINEL) != 2 * n_contigs as u64 {
            return Err(FmdError::InconsistentIndex(format!(
                "BWT holds {} terminators but the contig table describes {} contigs",
                bwt.total(dna::SENTINEL),
                n_contigs
            )));
        }
        let expected_len = 2 * (contigs.total_length() + n_contigs) as u64;
        if bwt_len != expected_len {
            return Err(FmdError::InconsistentIndex(format!(
                "BWT length {bwt_len} disagrees with contig lengths (expected {expected_len})"
            )));
        }
        if lcp.len() as u64 != bwt_len {
            return Err(FmdError::InconsistentIndex(format!(
                "LCP length {} disagrees with BWT length {bwt_len}",
                lcp.len()
            )));
        }
        for (genome, mask) in masks.iter().enumerate() {
            if mask.len() != bwt_len {
                return Err(FmdError::InconsistentIndex(format!(
                    "mask for genome {genome} covers {} rows, BWT has {bwt_len}",
                    mask.len()
                )));
            }
        }
        if masks.iter().map(|m| m.count()).sum::<u64>() != bwt_len {
            return Err(FmdError::InconsistentIndex(
                "genome masks do not partition the BWT".to_string(),
            ));
        }
        contigs.compute_genome_ranges(masks.len())?;

        let mut index = FmdIndex {
            bwt,
            ssa,
            lcp,
            contigs,
            masks,
            end_indices: vec![0; n_contigs],
        };

        // The first 2n rows have a terminator in the F column, so their L
        // column holds the last character of some text. Locate each to find
        // the end row of every forward strand.
        for row in 0..2 * n_contigs as u64 {
            let position = index.locate(row)?;
            if !position.is_reverse() {
                index.end_indices[position.contig()] = row;
            }
        }

        log::info!(
            "loaded FMD-index: {} contigs in {} genomes, {} BWT rows",
            n_contigs,
            index.masks.len(),
            bwt_len
        );
        Ok(index)
    }

    /// Load every index piece sharing `basename`.
    pub fn load(basename: &Path) -> Result<Self, FmdError> {
        let piece = |ext: &str| {
            let mut name = basename.as_os_str().to_os_string();
            name.push(ext);
            std::path::PathBuf::from(name)
        };

        let bwt = Bwt::load(&mut BufReader::new(File::open(piece(".bwt"))?))?;
        let ssa = SampledSuffixArray::load(&mut BufReader::new(File::open(piece(".ssa"))?))?;
        let lcp = LcpArray::load(&piece(".lcp"))?;
        let contigs = ContigMetadata::load(&piece(".contigs"))?;

        let mut masks = Vec::new();
        let mut mask_reader = BufReader::new(File::open(piece(".msk"))?);
        while let Some(mask) = BitVector::read_from(&mut mask_reader)? {
            masks.push(mask);
        }

        Self::from_parts(bwt, ssa, lcp, contigs, masks)
    }

    /// Write every index piece sharing `basename`, plus `.chrom.sizes`.
    pub fn save(&self, basename: &Path) -> Result<(), FmdError> {
        let piece = |ext: &str| {
            let mut name = basename.as_os_str().to_os_string();
            name.push(ext);
            std::path::PathBuf::from(name)
        };

        self.bwt
            .save(&mut BufWriter::new(File::create(piece(".bwt"))?))?;
        self.ssa
            .save(&mut BufWriter::new(File::create(piece(".ssa"))?))?;
        self.lcp.save(&piece(".lcp"))?;
        self.contigs.save(&piece(".contigs"))?;
        self.contigs.save_chrom_sizes(&piece(".chrom.sizes"))?;

        let mut mask_writer = BufWriter::new(File::create(piece(".msk"))?);
        for mask in &self.masks {
            mask.write_to(&mut mask_writer)?;
        }
        Ok(())
    }

    // ----- metadata -----

    #[inline]
    pub fn bwt_length(&self) -> u64 {
        self.bwt.len()
    }

    /// Indexed bases across both strands (terminators excluded).
    pub fn total_length(&self) -> u64 {
        2 * self.contigs.total_length() as u64
    }

    #[inline]
    pub fn num_contigs(&self) -> usize {
        self.contigs.count()
    }

    #[inline]
    pub fn num_genomes(&self) -> usize {
        self.masks.len()
    }

    pub fn contig_name(&self, contig: usize) -> Result<&str, FmdError> {
        self.contigs.name(contig)
    }

    pub fn contig_start(&self, contig: usize) -> Result<usize, FmdError> {
        self.contigs.start(contig)
    }

    pub fn contig_length(&self, contig: usize) -> Result<usize, FmdError> {
        self.contigs.length(contig)
    }

    pub fn contig_genome(&self, contig: usize) -> Result<usize, FmdError> {
        self.contigs.genome(contig)
    }

    /// Contig-id range `[first, past_last)` belonging to a genome.
    pub fn genome_contigs(&self, genome: usize) -> Result<(usize, usize), FmdError> {
        self.contigs.genome_contigs(genome)
    }

    /// BWT row holding the last forward-strand character of a contig.
    pub fn contig_end_index(&self, contig: usize) -> Result<u64, FmdError> {
        self.end_indices.get(contig).copied().ok_or(FmdError::OutOfRange {
            what: "contig table",
            index: contig,
            len: self.end_indices.len(),
        })
    }

    pub fn genome_mask(&self, genome: usize) -> Result<&BitVector, FmdError> {
        self.masks.get(genome).ok_or(FmdError::OutOfRange {
            what: "genome table",
            index: genome,
            len: self.masks.len(),
        })
    }

    /// Mask for an optional genome restriction; `None` searches everything.
    pub fn mask_for(&self, genome: Option<usize>) -> Result<Option<&BitVector>, FmdError> {
        genome.map(|g| self.genome_mask(g)).transpose()
    }

    pub fn is_in_genome(&self, row: u64, genome: usize) -> Result<bool, FmdError> {
        Ok(self.genome_mask(genome)?.is_set(row))
    }

    // ----- search primitives -----

    /// The bi-interval covering the whole BWT (the empty pattern).
    pub fn covering_position(&self) -> FmdPosition {
        FmdPosition::new(0, 0, self.bwt.len() as i64 - 1)
    }

    /// Bi-interval of a single base.
    pub fn char_position(&self, c: u8) -> Result<FmdPosition, FmdError> {
        let code = dna::base_code(c)?;
        let forward_start = self.bwt.pc(code);
        let reverse_start = self.bwt.pc(dna::complement_code(code));
        let end_offset = self.bwt.occ(code, self.bwt.len() as i64 - 1) - 1;
        Ok(FmdPosition::new(forward_start, reverse_start, end_offset))
    }

    /// One step of bidirectional search: the result matches `cP` when
    /// `backward`, `Pc` otherwise. Validates its arguments; the fast
    /// variants below do not.
    pub fn extend(
        &self,
        range: FmdPosition,
        c: u8,
        backward: bool,
    ) -> Result<FmdPosition, FmdError> {
        let code = dna::base_code(c)?;
        if range.is_empty_raw() {
            return Err(FmdError::EmptyInterval);
        }
        Ok(self.extend_code(range, code, backward))
    }

    /// Unvalidated extension by symbol code.
    pub(crate) fn extend_code(&self, range: FmdPosition, code: u8, backward: bool) -> FmdPosition {
        if !backward {
            // Backward search on the flipped interval with the complement is
            // forward search on the original.
            return self
                .extend_code(range.flip(), dna::complement_code(code), true)
                .flip();
        }

        let start_ranks = self.bwt.full_occ(range.forward_start - 1);
        let end_ranks = self.bwt.full_occ(range.forward_start + range.end_offset);
        self.backward_child(&range, code, &start_ranks, &end_ranks)
    }

    /// Pick the backward-extension child for `code` given the occurrence
    /// counts at both interval ends. The reverse interval is carved up in
    /// alphabetical order by reverse complement, after the terminator slice.
    fn backward_child(
        &self,
        range: &FmdPosition,
        code: u8,
        start_ranks: &AlphaCount,
        end_ranks: &AlphaCount,
    ) -> FmdPosition {
        let mut reverse_start =
            range.reverse_start + (end_ranks[dna::SENTINEL as usize] - start_ranks[dna::SENTINEL as usize]);
        for base in BASES {
            let base_code = match dna::base_code(base) {
                Ok(code) => code,
                Err(_) => unreachable!("BASES holds only real bases"),
            };
            let interval_length =
                end_ranks[base_code as usize] - start_ranks[base_code as usize];
            if base_code == code {
                return FmdPosition::new(
                    self.bwt.pc(code) + start_ranks[code as usize],
                    reverse_start,
                    interval_length - 1,
                );
            }
            reverse_start += interval_length;
        }
        unreachable!("extension symbol is validated by the callers");
    }

    /// In-place extension without argument validation, for tight loops that
    /// have already validated their pattern.
    pub fn extend_fast(&self, range: &mut FmdPosition, c: u8, backward: bool) {
        let Ok(code) = dna::base_code(c) else {
            *range = crate::fmd_position::EMPTY_FMD_POSITION;
            return;
        };
        *range = self.extend_code(*range, code, backward);
    }

    /// Backward extension tracking only the forward interval. After calling
    /// this the reverse interval is stale: only further left extensions and
    /// right retractions are meaningful.
    pub fn extend_left_only(&self, range: &mut FmdPosition, c: u8) -> Result<(), FmdError> {
        let code = dna::base_code(c)?;
        self.extend_left_only_code(range, code);
        Ok(())
    }

    #[inline]
    pub(crate) fn extend_left_only_code(&self, range: &mut FmdPosition, code: u8) {
        let start_rank = self.bwt.occ(code, range.forward_start - 1);
        let end_rank = self.bwt.occ(code, range.forward_start + range.end_offset);
        range.forward_start = self.bwt.pc(code) + start_rank;
        range.end_offset = end_rank - start_rank - 1;
    }

    /// Climb to the lowest suffix-tree ancestor whose string depth is at
    /// most `new_pattern_length`, keeping the same left end of the pattern.
    /// Leaves the range alone when it is already that shallow. Only the
    /// forward interval is maintained.
    pub fn retract_right_only(&self, range: &mut FmdPosition, new_pattern_length: usize) {
        loop {
            let (depth, psv, nsv) = self.parent_interval(range);
            if depth < new_pattern_length as u64 {
                // Already short enough.
                return;
            }
            range.forward_start = psv as i64;
            range.end_offset = nsv as i64 - psv as i64 - 1;
            if depth <= new_pattern_length as u64 {
                return;
            }
        }
    }

    /// Go up exactly one suffix-tree node and return the parent's string
    /// depth, which is the retracted pattern length.
    pub fn retract_right_only_step(&self, range: &mut FmdPosition) -> usize {
        let (depth, psv, nsv) = self.parent_interval(range);
        range.forward_start = psv as i64;
        range.end_offset = nsv as i64 - psv as i64 - 1;
        depth as usize
    }

    /// Parent node of the forward interval: its string depth and the
    /// `[PSV, NSV)` row bounds that delimit it.
    fn parent_interval(&self, range: &FmdPosition) -> (u64, u64, u64) {
        let range_start = range.forward_start as usize;
        let range_end = (range.forward_start + range.end_offset + 1) as usize;

        let start_lcp = self.lcp_value_unchecked(range_start);
        // One past the interval can be one past the LCP array; the root is
        // bounded by an imaginary zero there.
        let end_lcp = if range_end < self.bwt.len() as usize {
            self.lcp_value_unchecked(range_end)
        } else {
            0
        };

        // The larger LCP value is the parent's string depth. Ties prefer the
        // start, which is always a real array position.
        let (depth, pivot) = if start_lcp >= end_lcp {
            (start_lcp, range_start)
        } else {
            (end_lcp, range_end)
        };
        log::trace!(
            "retract [{range_start}, {range_end}): parent depth {depth} at {pivot}"
        );
        (
            depth,
            self.lcp_psv_unchecked(pivot),
            self.lcp_nsv_unchecked(pivot),
        )
    }

    /// Exact occurrence search: repeated backward extension from the last
    /// character. An empty pattern matches the whole BWT.
    pub fn count(&self, pattern: &[u8]) -> Result<FmdPosition, FmdError> {
        if pattern.is_empty() {
            return Ok(self.covering_position());
        }
        for &c in pattern {
            dna::base_code(c)?;
        }
        let mut position = self.char_position(pattern[pattern.len() - 1])?;
        for &c in pattern[..pattern.len() - 1].iter().rev() {
            if position.is_empty_raw() {
                break;
            }
            self.extend_fast(&mut position, c, true);
        }
        Ok(position)
    }

    // ----- locate / display -----

    /// LF mapping: the BWT row of the suffix one character to the left.
    pub fn lf(&self, row: u64) -> Result<u64, FmdError> {
        let code = self.bwt.symbol_at(row)?;
        Ok((self.bwt.pc(code) + self.bwt.occ(code, row as i64) - 1) as u64)
    }

    /// Resolve a BWT row to its text position via the sampled suffix array.
    pub fn locate(&self, row: u64) -> Result<TextPosition, FmdError> {
        if row >= self.bwt.len() {
            return Err(FmdError::OutOfRange {
                what: "BWT",
                index: row as usize,
                len: self.bwt.len() as usize,
            });
        }
        let mut current = row;
        let mut steps = 0u64;
        loop {
            if let Some(sample) = self.ssa.get(current) {
                return Ok(sample.offset_by(steps as i64));
            }
            if steps >= self.ssa.sample_rate() {
                return Err(FmdError::InconsistentIndex(format!(
                    "no suffix array sample within {} LF steps of row {row}",
                    self.ssa.sample_rate()
                )));
            }
            current = self.lf(current)?;
            steps += 1;
        }
    }

    /// Character in the L column (the BWT itself) at a row.
    pub fn display_row(&self, row: u64) -> Result<u8, FmdError> {
        Ok(dna::code_char(self.bwt.symbol_at(row)?))
    }

    /// Character in the F column at a row.
    pub fn display_first(&self, row: u64) -> Result<u8, FmdError> {
        Ok(dna::code_char(self.bwt.first_symbol_at(row)?))
    }

    /// Base at a 0-based offset of a contig's forward strand, recovered by
    /// LF-walking back from the contig's end row.
    pub fn display(&self, contig: usize, offset: usize) -> Result<u8, FmdError> {
        let length = self.contigs.length(contig)?;
        if offset >= length {
            return Err(FmdError::OutOfRange {
                what: "contig offset",
                index: offset,
                len: length,
            });
        }
        let mut row = self.end_indices[contig];
        for _ in 0..length - 1 - offset {
            row = self.lf(row)?;
        }
        self.display_row(row)
    }

    /// Reconstruct a whole contig's forward strand.
    pub fn display_contig(&self, contig: usize) -> Result<Vec<u8>, FmdError> {
        let length = self.contigs.length(contig)?;
        let mut bases = Vec::with_capacity(length);
        let mut row = self.end_indices[contig];
        for _ in 0..length {
            bases.push(self.display_row(row)?);
            row = self.lf(row)?;
        }
        bases.reverse();
        Ok(bases)
    }

    // ----- unchecked internals -----
    // Rows handed to these come from intervals the index itself produced.

    #[inline]
    pub(crate) fn lcp_value_unchecked(&self, index: usize) -> u64 {
        match self.lcp.value(index) {
            Ok(value) => value,
            Err(_) => unreachable!("LCP access is bounds-checked by construction"),
        }
    }

    #[inline]
    fn lcp_psv_unchecked(&self, index: usize) -> u64 {
        match self.lcp.psv(index) {
            Ok(value) => value,
            Err(_) => unreachable!("LCP access is bounds-checked by construction"),
        }
    }

    #[inline]
    fn lcp_nsv_unchecked(&self, index: usize) -> u64 {
        match self.lcp.nsv(index) {
            Ok(value) => value,
            Err(_) => unreachable!("LCP access is bounds-checked by construction"),
        }
    }
}
