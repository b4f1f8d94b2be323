// Mapping schemes as interchangeable implementations of one capability:
// query in, one Mapping per position out. Scheme-specific knobs live on the
// scheme values themselves; the index is only ever borrowed, so any scheme
// can be driven from many threads at once.

use crate::credit::CreditFilter;
use crate::error::FmdError;
use crate::index::FmdIndex;
use crate::mapping::Mapping;
use rayon::prelude::*;

pub trait MappingScheme: Sync {
    /// Map a query, producing one entry per query position in order.
    fn map(&self, query: &[u8]) -> Result<Vec<Mapping>, FmdError>;
}

/// The natural scheme: left- and right-context inchworm sweeps reconciled
/// position by position, optionally followed by a credit pass that fills
/// conflict-free gaps between the sentinels.
pub struct NaturalMappingScheme<'a> {
    index: &'a FmdIndex,
    genome: Option<usize>,
    pub min_context: usize,
    /// Substitution budget for credit sentinel words; `None` disables the
    /// credit pass.
    pub credit_z_max: Option<usize>,
}

impl<'a> NaturalMappingScheme<'a> {
    pub fn new(index: &'a FmdIndex, genome: Option<usize>, min_context: usize) -> Self {
        NaturalMappingScheme {
            index,
            genome,
            min_context,
            credit_z_max: None,
        }
    }

    pub fn with_credit(mut self, z_max: usize) -> Self {
        self.credit_z_max = Some(z_max);
        self
    }
}

impl MappingScheme for NaturalMappingScheme<'_> {
    fn map(&self, query: &[u8]) -> Result<Vec<Mapping>, FmdError> {
        match self.credit_z_max {
            None => self.index.map_both(query, self.genome, self.min_context),
            Some(z_max) => {
                let mask = self.index.mask_for(self.genome)?;
                let left = self.index.map_left(query, mask, self.min_context)?;
                let right = self.index.map_right(query, mask, self.min_context)?;
                CreditFilter::new(self.index, mask, z_max).apply(&left, &right, query)
            }
        }
    }
}

/// Map a batch of queries in parallel. The index is read-only, so the only
/// coordination needed is joining the results back in input order.
pub fn map_batch<S: MappingScheme>(
    scheme: &S,
    queries: &[Vec<u8>],
) -> Result<Vec<Vec<Mapping>>, FmdError> {
    queries
        .par_iter()
        .map(|query| scheme.map(query))
        .collect()
}
