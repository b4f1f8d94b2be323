//! Bidirectional FMD-index over DNA and the context mapping schemes built
//! on top of it.
//!
//! The index holds the BWT of every contig concatenated with its reverse
//! complement, so one backward-search step maintains matched ranges on both
//! strands at once. On top of the search primitives sit the mapping schemes:
//! inchworm left/right context mapping, range-targeted mapping, inexact
//! (substitution-tolerant) mapping, zip mapping, and credit propagation.

pub mod bitvec; // rank/select bit vectors (genome masks, merged ranges)
pub mod bwt; // BWT storage, occurrence counting, run-length codec
pub mod construct; // in-memory reference construction
pub mod contigs; // contig names, lengths, genome assignments
pub mod credit; // credit propagation between sentinels
pub mod dna; // alphabet codes, complements
pub mod error;
pub mod fmd_position; // bi-intervals
pub mod index; // the FMD-index itself
pub mod lcp; // LCP array with PSV/NSV
pub mod map; // natural and range-targeted mapping
pub mod mapping; // per-position mapping results
pub mod mismatch; // inexact search bags, zip mapping
pub mod scheme; // the MappingScheme trait and batch driver
pub mod ssa; // sampled suffix array
pub mod text_position;
pub mod utils;
pub mod zip; // the two-sided zip mapping scheme

pub use bitvec::{BitVector, BitVectorBuilder};
pub use construct::IndexBuilder;
pub use credit::{CreditFilter, DisambiguateFilter};
pub use error::FmdError;
pub use fmd_position::{FmdPosition, EMPTY_FMD_POSITION};
pub use index::FmdIndex;
pub use mapping::{Mapping, RangeMapping};
pub use scheme::{map_batch, MappingScheme, NaturalMappingScheme};
pub use text_position::TextPosition;
pub use zip::ZipMappingScheme;
