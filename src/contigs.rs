// Contig metadata: names, scaffold starts, lengths, genome assignments.
//
// The `.contigs` file is plain text, one tab-separated line per contig in
// canonical id order: name, scaffold start, length, genome id. A cumulative
// length prefix sum and the contiguous contig-id range of each genome are
// derived at load time. `.chrom.sizes` (name and length) is emitted for
// external tooling and never read back.

use crate::error::FmdError;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ContigMetadata {
    names: Vec<String>,
    starts: Vec<usize>,
    lengths: Vec<usize>,
    cumulative_lengths: Vec<usize>,
    genome_assignments: Vec<usize>,
    /// Contig-id range per genome, filled by `compute_genome_ranges`.
    genome_ranges: Vec<(usize, usize)>,
}

impl ContigMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: String, start: usize, length: usize, genome: usize) {
        let total: usize = self.cumulative_lengths.last().copied().unwrap_or(0)
            + self.lengths.last().copied().unwrap_or(0);
        self.names.push(name);
        self.starts.push(start);
        self.lengths.push(length);
        self.cumulative_lengths.push(total);
        self.genome_assignments.push(genome);
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.names.len()
    }

    fn check(&self, index: usize) -> Result<(), FmdError> {
        if index >= self.names.len() {
            return Err(FmdError::OutOfRange {
                what: "contig table",
                index,
                len: self.names.len(),
            });
        }
        Ok(())
    }

    pub fn name(&self, index: usize) -> Result<&str, FmdError> {
        self.check(index)?;
        Ok(&self.names[index])
    }

    pub fn start(&self, index: usize) -> Result<usize, FmdError> {
        self.check(index)?;
        Ok(self.starts[index])
    }

    pub fn length(&self, index: usize) -> Result<usize, FmdError> {
        self.check(index)?;
        Ok(self.lengths[index])
    }

    /// Total bases in contigs before this one, in id order.
    pub fn cumulative_length(&self, index: usize) -> Result<usize, FmdError> {
        self.check(index)?;
        Ok(self.cumulative_lengths[index])
    }

    pub fn genome(&self, index: usize) -> Result<usize, FmdError> {
        self.check(index)?;
        Ok(self.genome_assignments[index])
    }

    /// Sum of all contig lengths (one strand).
    pub fn total_length(&self) -> usize {
        self.cumulative_lengths.last().copied().unwrap_or(0)
            + self.lengths.last().copied().unwrap_or(0)
    }

    /// Contig-id range `[first, past_last)` of a genome.
    pub fn genome_contigs(&self, genome: usize) -> Result<(usize, usize), FmdError> {
        if genome >= self.genome_ranges.len() {
            return Err(FmdError::OutOfRange {
                what: "genome table",
                index: genome,
                len: self.genome_ranges.len(),
            });
        }
        Ok(self.genome_ranges[genome])
    }

    /// Invert the contig-to-genome assignment into per-genome contig ranges.
    /// Contigs of one genome must be contiguous in id order, and every
    /// referenced genome must have a mask.
    pub fn compute_genome_ranges(&mut self, num_genomes: usize) -> Result<(), FmdError> {
        self.genome_ranges = vec![(0, 0); num_genomes];
        let mut current_range = (0usize, 0usize);
        let mut current_genome = None;
        for (contig, &genome) in self.genome_assignments.iter().enumerate() {
            if genome >= num_genomes {
                return Err(FmdError::InconsistentIndex(format!(
                    "contig {contig} belongs to genome {genome} but only {num_genomes} masks were loaded"
                )));
            }
            match current_genome {
                None => {
                    current_genome = Some(genome);
                    current_range = (contig, contig + 1);
                }
                Some(g) if g == genome => current_range.1 += 1,
                Some(g) => {
                    self.genome_ranges[g] = current_range;
                    current_genome = Some(genome);
                    current_range = (contig, contig + 1);
                }
            }
        }
        if let Some(g) = current_genome {
            self.genome_ranges[g] = current_range;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, FmdError> {
        let mut contigs = ContigMetadata::new();
        let reader = BufReader::new(File::open(path)?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let parse = |field: Option<&str>, what: &str| -> Result<usize, FmdError> {
                field
                    .and_then(|f| f.parse().ok())
                    .ok_or_else(|| {
                        FmdError::InconsistentIndex(format!(
                            "contig file line {}: bad or missing {what}",
                            line_no + 1
                        ))
                    })
            };
            let name = fields
                .next()
                .ok_or_else(|| {
                    FmdError::InconsistentIndex(format!(
                        "contig file line {}: missing name",
                        line_no + 1
                    ))
                })?
                .to_string();
            let start = parse(fields.next(), "start")?;
            let length = parse(fields.next(), "length")?;
            let genome = parse(fields.next(), "genome id")?;
            contigs.push(name, start, length, genome);
        }
        Ok(contigs)
    }

    pub fn save(&self, path: &Path) -> Result<(), FmdError> {
        let mut file = BufWriter::new(File::create(path)?);
        for i in 0..self.count() {
            writeln!(
                file,
                "{}\t{}\t{}\t{}",
                self.names[i], self.starts[i], self.lengths[i], self.genome_assignments[i]
            )?;
        }
        Ok(())
    }

    pub fn save_chrom_sizes(&self, path: &Path) -> Result<(), FmdError> {
        let mut file = BufWriter::new(File::create(path)?);
        for (name, length) in self.names.iter().zip(&self.lengths) {
            writeln!(file, "{name}\t{length}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContigMetadata {
        let mut contigs = ContigMetadata::new();
        contigs.push("chr1".to_string(), 0, 10, 0);
        contigs.push("chr2".to_string(), 10, 6, 0);
        contigs.push("alt1".to_string(), 0, 8, 1);
        contigs
    }

    #[test]
    fn cumulative_lengths_accumulate() {
        let contigs = sample();
        assert_eq!(contigs.cumulative_length(0).unwrap(), 0);
        assert_eq!(contigs.cumulative_length(1).unwrap(), 10);
        assert_eq!(contigs.cumulative_length(2).unwrap(), 16);
        assert_eq!(contigs.total_length(), 24);
    }

    #[test]
    fn genome_ranges_are_contiguous() {
        let mut contigs = sample();
        contigs.compute_genome_ranges(2).unwrap();
        assert_eq!(contigs.genome_contigs(0).unwrap(), (0, 2));
        assert_eq!(contigs.genome_contigs(1).unwrap(), (2, 3));
    }

    #[test]
    fn missing_mask_is_inconsistent() {
        let mut contigs = sample();
        assert!(matches!(
            contigs.compute_genome_ranges(1),
            Err(FmdError::InconsistentIndex(_))
        ));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toy.contigs");
        let mut contigs = sample();
        contigs.compute_genome_ranges(2).unwrap();
        contigs.save(&path).unwrap();

        let mut restored = ContigMetadata::load(&path).unwrap();
        restored.compute_genome_ranges(2).unwrap();
        assert_eq!(restored.count(), 3);
        assert_eq!(restored.name(2).unwrap(), "alt1");
        assert_eq!(restored.length(1).unwrap(), 6);
        assert_eq!(restored.genome(2).unwrap(), 1);
        assert_eq!(restored.genome_contigs(0).unwrap(), (0, 2));
    }

    #[test]
    fn bad_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.contigs");
        std::fs::write(&path, "chr1\t0\tnot-a-number\t0\n").unwrap();
        assert!(matches!(
            ContigMetadata::load(&path),
            Err(FmdError::InconsistentIndex(_))
        ));
    }
}
