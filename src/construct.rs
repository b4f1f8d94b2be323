// Reference in-memory index construction.
//
// Builds every index component from contig sequences by direct suffix
// sorting: each contig contributes its forward strand and reverse complement
// as separate texts, each closed by its own terminator. Terminators sort
// below all bases and tie-break by text number, so the construction is
// deterministic and the first 2n BWT rows are the terminator rows in text
// order. This is quadratic-ish in reference size and meant for programmatic
// use and tests; production-scale indexes come from an external suffix
// sorter through the on-disk contract.

use crate::bitvec::BitVectorBuilder;
use crate::bwt::Bwt;
use crate::contigs::ContigMetadata;
use crate::dna;
use crate::error::FmdError;
use crate::index::FmdIndex;
use crate::lcp::LcpArray;
use crate::ssa::SampledSuffixArray;
use crate::text_position::TextPosition;
use std::cmp::Ordering;

pub struct IndexBuilder {
    names: Vec<String>,
    starts: Vec<usize>,
    genomes: Vec<usize>,
    sequences: Vec<Vec<u8>>,
    sample_rate: u64,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        IndexBuilder {
            names: Vec::new(),
            starts: Vec::new(),
            genomes: Vec::new(),
            sequences: Vec::new(),
            sample_rate: 4,
        }
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, sample_rate: u64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Add a contig at scaffold position `start`. The sequence must be
    /// non-empty `ACGT` (either case).
    pub fn add_contig(
        &mut self,
        name: &str,
        start: usize,
        genome: usize,
        sequence: &[u8],
    ) -> Result<&mut Self, FmdError> {
        if sequence.is_empty() {
            return Err(FmdError::InconsistentIndex(format!(
                "contig {name} is empty"
            )));
        }
        let mut codes = Vec::with_capacity(sequence.len());
        for &c in sequence {
            codes.push(dna::base_code(c)?);
        }
        self.names.push(name.to_string());
        self.starts.push(start);
        self.genomes.push(genome);
        self.sequences.push(codes);
        Ok(self)
    }

    pub fn build(&self) -> Result<FmdIndex, FmdError> {
        if self.sequences.is_empty() {
            return Err(FmdError::InconsistentIndex(
                "cannot build an index with no contigs".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(FmdError::InconsistentIndex(
                "suffix array sample rate must be positive".to_string(),
            ));
        }

        // Two texts per contig: forward, then reverse complement.
        let mut texts: Vec<Vec<u8>> = Vec::with_capacity(2 * self.sequences.len());
        for codes in &self.sequences {
            texts.push(codes.clone());
            texts.push(
                codes
                    .iter()
                    .rev()
                    .map(|&code| dna::complement_code(code))
                    .collect(),
            );
        }

        // Every suffix including the terminator-only one at offset len.
        let mut suffixes: Vec<(usize, usize)> = Vec::new();
        for (text, codes) in texts.iter().enumerate() {
            for offset in 0..=codes.len() {
                suffixes.push((text, offset));
            }
        }
        suffixes.sort_unstable_by(|&a, &b| compare_suffixes(&texts, a, b));

        // BWT: the character before each suffix; offset 0 is preceded by
        // the text's own terminator.
        let bwt_codes: Vec<u8> = suffixes
            .iter()
            .map(|&(text, offset)| {
                if offset == 0 {
                    dna::SENTINEL
                } else {
                    texts[text][offset - 1]
                }
            })
            .collect();
        let bwt = Bwt::from_codes(&bwt_codes)?;

        // LCP over neighbouring sorted suffixes. Terminators are distinct
        // per text and never contribute to a shared prefix.
        let mut lcp_values = Vec::with_capacity(suffixes.len());
        lcp_values.push(0u64);
        for pair in suffixes.windows(2) {
            lcp_values.push(common_prefix(&texts, pair[0], pair[1]));
        }
        let lcp = LcpArray::from_values(lcp_values);

        // Suffix array samples at every offset divisible by the rate, which
        // always covers offset 0 of each text.
        let mut samples = Vec::new();
        for (row, &(text, offset)) in suffixes.iter().enumerate() {
            if offset as u64 % self.sample_rate == 0 {
                samples.push((row as u64, TextPosition::new(text, offset)));
            }
        }
        let ssa = SampledSuffixArray::new(self.sample_rate, samples);

        let mut contigs = ContigMetadata::new();
        for i in 0..self.names.len() {
            contigs.push(
                self.names[i].clone(),
                self.starts[i],
                self.sequences[i].len(),
                self.genomes[i],
            );
        }

        // One mask per genome over every BWT row, terminator rows included.
        let num_genomes = self.genomes.iter().max().map_or(0, |&g| g + 1);
        let mut builders: Vec<BitVectorBuilder> =
            (0..num_genomes).map(|_| BitVectorBuilder::new()).collect();
        for (row, &(text, _)) in suffixes.iter().enumerate() {
            builders[self.genomes[text / 2]].add_bit(row as u64);
        }
        let mut masks = Vec::with_capacity(num_genomes);
        for builder in builders {
            masks.push(builder.finish(bwt.len())?);
        }

        FmdIndex::from_parts(bwt, ssa, lcp, contigs, masks)
    }
}

/// Compare two suffixes. Bases compare by code; running out of characters
/// means hitting the text's terminator, which sorts below every base, and
/// two terminators order by text number.
fn compare_suffixes(texts: &[Vec<u8>], a: (usize, usize), b: (usize, usize)) -> Ordering {
    let sa = &texts[a.0][a.1..];
    let sb = &texts[b.0][b.1..];
    sa.cmp(sb).then(a.0.cmp(&b.0))
}

/// Length of the shared prefix of two suffixes, counting bases only.
fn common_prefix(texts: &[Vec<u8>], a: (usize, usize), b: (usize, usize)) -> u64 {
    let sa = &texts[a.0][a.1..];
    let sb = &texts[b.0][b.1..];
    sa.iter().zip(sb).take_while(|(x, y)| x == y).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_junk() {
        let mut builder = IndexBuilder::new();
        assert!(builder.add_contig("bad", 0, 0, b"ACGN").is_err());
        assert!(builder.add_contig("empty", 0, 0, b"").is_err());
        assert!(IndexBuilder::new().build().is_err());
    }

    #[test]
    fn terminator_rows_lead_the_bwt() {
        let mut builder = IndexBuilder::new();
        builder.add_contig("c0", 0, 0, b"ACGT").unwrap();
        builder.add_contig("c1", 0, 0, b"TTT").unwrap();
        let index = builder.build().unwrap();

        // Two contigs make four texts, so rows 0..4 are terminator rows in
        // text order: their F column is `$` and their L column is the last
        // character of each text.
        assert_eq!(index.num_contigs(), 2);
        for row in 0..4 {
            assert_eq!(index.display_first(row).unwrap(), b'$');
        }
        assert_eq!(index.display_row(0).unwrap(), b'T'); // ACGT
        assert_eq!(index.display_row(1).unwrap(), b'T'); // rc(ACGT) = ACGT
        assert_eq!(index.display_row(2).unwrap(), b'T'); // TTT
        assert_eq!(index.display_row(3).unwrap(), b'A'); // rc(TTT) = AAA
    }

    #[test]
    fn bwt_length_counts_both_strands_and_terminators() {
        let mut builder = IndexBuilder::new();
        builder.add_contig("c0", 0, 0, b"AATCTACTGC").unwrap();
        let index = builder.build().unwrap();
        // 2 * (10 bases + 1 terminator).
        assert_eq!(index.bwt_length(), 22);
        assert_eq!(index.total_length(), 20);
    }
}
