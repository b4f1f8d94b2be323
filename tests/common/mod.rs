// Shared fixtures and a naive string-scanning model of the index.
//
// The naive model works directly on the text set (forward and reverse
// complement of every contig) and implements the mapping semantics by brute
// force, so the succinct structures can be checked against it on arbitrary
// inputs.

#![allow(dead_code)]

use fmdmap::{FmdIndex, IndexBuilder};

pub fn complement(c: u8) -> u8 {
    match c {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        other => other,
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&c| complement(c)).collect()
}

/// The text set of a reference: two texts per contig, with each text's
/// genome id alongside.
pub struct NaiveReference {
    pub texts: Vec<Vec<u8>>,
    pub genomes: Vec<usize>,
}

impl NaiveReference {
    pub fn new(contigs: &[(&str, usize, &[u8])]) -> Self {
        let mut texts = Vec::new();
        let mut genomes = Vec::new();
        for &(_, genome, seq) in contigs {
            texts.push(seq.to_vec());
            texts.push(reverse_complement(seq));
            genomes.push(genome);
            genomes.push(genome);
        }
        NaiveReference { texts, genomes }
    }

    /// All (text, offset) occurrences of a pattern, every text.
    pub fn occurrences(&self, pattern: &[u8]) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        if pattern.is_empty() {
            return found;
        }
        for (text, codes) in self.texts.iter().enumerate() {
            for offset in 0..codes.len().saturating_sub(pattern.len() - 1) {
                if &codes[offset..offset + pattern.len()] == pattern {
                    found.push((text, offset));
                }
            }
        }
        found
    }

    /// Occurrences visible through a genome restriction.
    pub fn visible(&self, pattern: &[u8], genome: Option<usize>) -> Vec<(usize, usize)> {
        self.occurrences(pattern)
            .into_iter()
            .filter(|&(text, _)| genome.map_or(true, |g| self.genomes[text] == g))
            .collect()
    }

    /// The inchworm right-context sweep, by brute force. Entry `i` is the
    /// mapped (text, offset) of query position `i`, if it mapped.
    pub fn map_right(
        &self,
        query: &[u8],
        genome: Option<usize>,
        min_context: usize,
    ) -> Vec<Option<(usize, usize)>> {
        let mut out = vec![None; query.len()];
        let mut pattern: Vec<u8> = Vec::new();

        for i in (0..query.len()).rev() {
            if !matches!(query[i], b'A' | b'C' | b'G' | b'T') {
                pattern.clear();
                continue;
            }
            loop {
                let mut candidate = vec![query[i]];
                candidate.extend_from_slice(&pattern);
                if !self.visible(&candidate, genome).is_empty() {
                    pattern = candidate;
                    break;
                }
                if pattern.is_empty() {
                    break;
                }
                // Retract to the parent suffix-tree node: the longest
                // prefix whose raw occurrence set is strictly larger.
                let raw = self.occurrences(&pattern).len();
                let mut depth = pattern.len() - 1;
                while depth > 0 && self.occurrences(&pattern[..depth]).len() == raw {
                    depth -= 1;
                }
                pattern.truncate(depth);
            }
            if pattern.is_empty() || self.visible(&pattern, genome).is_empty() {
                // The character itself has no visible occurrence.
                pattern.clear();
                continue;
            }
            let hits = self.visible(&pattern, genome);
            if hits.len() == 1 && pattern.len() >= min_context {
                out[i] = Some(hits[0]);
            }
        }
        out
    }

    /// Left-context mapping: the right sweep of the reverse complement,
    /// flipped back.
    pub fn map_left(
        &self,
        query: &[u8],
        genome: Option<usize>,
        min_context: usize,
    ) -> Vec<Option<(usize, usize)>> {
        let rc = reverse_complement(query);
        let mut mapped = self.map_right(&rc, genome, min_context);
        mapped.reverse();
        mapped
            .into_iter()
            .map(|entry| {
                entry.map(|(text, offset)| {
                    let length = self.texts[text].len();
                    (text ^ 1, length - offset - 1)
                })
            })
            .collect()
    }
}

/// Build a real index over the same contig table the naive model uses.
pub fn build_index(contigs: &[(&str, usize, &[u8])], sample_rate: u64) -> FmdIndex {
    let mut builder = IndexBuilder::new().sample_rate(sample_rate);
    for &(name, genome, seq) in contigs {
        builder.add_contig(name, 0, genome, seq).unwrap();
    }
    builder.build().unwrap()
}

/// The single-contig fixture used throughout: "AATCTACTGC".
pub const REF: &[u8] = b"AATCTACTGC";

pub fn ref_contigs() -> Vec<(&'static str, usize, &'static [u8])> {
    vec![("contig0", 0, REF)]
}
