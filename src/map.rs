// Natural context mapping.
//
// map_right is the inchworm: sweep the query right to left, growing the
// matched pattern by left extension and shrinking it by right retraction
// whenever an extension would run out of results. A base maps when the
// interval holds exactly one visible row with enough context. map_left is
// the same sweep over the reverse complement; map_both reconciles the two.
// The range-targeted variant decides uniqueness against pre-merged BWT
// ranges instead of single rows.

use crate::bitvec::BitVector;
use crate::dna;
use crate::error::FmdError;
use crate::fmd_position::EMPTY_FMD_POSITION;
use crate::index::FmdIndex;
use crate::mapping::{Mapping, RangeMapping};

impl FmdIndex {
    /// Map each query base using its right context, restricted to rows
    /// visible through `mask`. Entry `i` of the result corresponds to query
    /// position `i`.
    pub fn map_right(
        &self,
        query: &[u8],
        mask: Option<&BitVector>,
        min_context: usize,
    ) -> Result<Vec<Mapping>, FmdError> {
        log::debug!(
            "mapping {} bases on the right with min context {min_context}",
            query.len()
        );

        let mut mappings = Vec::with_capacity(query.len());
        let mut search = self.covering_position();
        let mut pattern_length = 0usize;

        for i in (0..query.len()).rev() {
            let Ok(code) = dna::base_code(query[i]) else {
                // An unknown base matches nothing: this position is
                // unmapped and everything to its left starts fresh.
                mappings.push(Mapping::unmapped());
                search = self.covering_position();
                pattern_length = 0;
                continue;
            };

            let mut extended = search;
            self.extend_left_only_code(&mut extended, code);
            while extended.is_empty(mask) && pattern_length > 0 {
                // No results if we extend right now. Retract on the right
                // until there are some.
                pattern_length = self.retract_right_only_step(&mut search);
                log::trace!("retracted to length {pattern_length}");
                extended = search;
                self.extend_left_only_code(&mut extended, code);
            }

            if extended.is_empty(mask) {
                // Even a length-1 pattern has no visible occurrence.
                mappings.push(Mapping::unmapped());
                search = self.covering_position();
                pattern_length = 0;
                continue;
            }

            search = extended;
            pattern_length += 1;

            if search.masked_length(mask) == 1 && pattern_length >= min_context {
                let mut row = search.forward_start as u64;
                if let Some(mask) = mask {
                    // The interval start itself may be masked out; take the
                    // first visible row instead.
                    row = mask.value_after(row).0;
                }
                let position = self.locate(row)?;
                log::debug!(
                    "mapped {pattern_length}/{min_context} context to text {} offset {}",
                    position.text(),
                    position.offset()
                );
                mappings.push(Mapping::with_context(position, 1, pattern_length));
            } else {
                log::debug!(
                    "failed: {} results for {pattern_length}/{min_context} context",
                    search.masked_length(mask)
                );
                mappings.push(Mapping::unmapped());
            }
        }

        // Emitted right to left; hand back in query order.
        mappings.reverse();
        Ok(mappings)
    }

    /// [`map_right`](Self::map_right) restricted to one genome, or to
    /// everything when `genome` is `None`.
    pub fn map_right_genome(
        &self,
        query: &[u8],
        genome: Option<usize>,
        min_context: usize,
    ) -> Result<Vec<Mapping>, FmdError> {
        self.map_right(query, self.mask_for(genome)?, min_context)
    }

    /// Map each query base using its left context: the right-context sweep
    /// of the reverse complement, flipped back onto the forward strand.
    pub fn map_left(
        &self,
        query: &[u8],
        mask: Option<&BitVector>,
        min_context: usize,
    ) -> Result<Vec<Mapping>, FmdError> {
        let rc = dna::reverse_complement(query);
        let mut mappings = self.map_right(&rc, mask, min_context)?;
        mappings.reverse();
        for mapping in mappings.iter_mut() {
            if mapping.is_mapped() {
                let contig_length = self.contig_length(mapping.location().contig())?;
                *mapping = mapping.flip(contig_length);
            }
        }
        Ok(mappings)
    }

    pub fn map_left_genome(
        &self,
        query: &[u8],
        genome: Option<usize>,
        min_context: usize,
    ) -> Result<Vec<Mapping>, FmdError> {
        self.map_left(query, self.mask_for(genome)?, min_context)
    }

    /// Map with both contexts and reconcile position-by-position.
    pub fn map_both(
        &self,
        query: &[u8],
        genome: Option<usize>,
        min_context: usize,
    ) -> Result<Vec<Mapping>, FmdError> {
        let mask = self.mask_for(genome)?;
        let left = self.map_left(query, mask, min_context)?;
        let right = self.map_right(query, mask, min_context)?;
        Ok(left
            .into_iter()
            .zip(right)
            .map(|(l, r)| disambiguate(&l, &r))
            .collect())
    }

    /// Right-map against merged ranges: a base maps when its interval is
    /// subsumed by one range under the mask, it has at least `min_context`
    /// characters, and `add_context` further characters arrived after the
    /// interval first became unique. Restarts re-map the current position
    /// from scratch when an extension empties the interval.
    pub fn map_ranges(
        &self,
        ranges: &BitVector,
        query: &[u8],
        mask: Option<&BitVector>,
        min_context: usize,
        add_context: usize,
    ) -> Result<Vec<RangeMapping>, FmdError> {
        log::debug!(
            "range-mapping {} bases with min context {min_context} + {add_context}",
            query.len()
        );

        let mut mappings = Vec::with_capacity(query.len());

        // Working state: the interval, how many characters it spans, and
        // whether the current iteration is an extension or a restart.
        let mut position = EMPTY_FMD_POSITION;
        let mut characters = 0usize;
        let mut is_mapped = false;
        // Characters of context seen after first becoming unique; -1 until
        // then so the uniqueness-making character brings it to 0.
        let mut extra_context: i64 = -1;

        let mut i = query.len() as i64 - 1;
        while i >= 0 {
            let at = i as usize;
            let code = dna::base_code(query[at])?;

            if position.is_empty(mask) {
                log::debug!("starting over by mapping position {at}");
                let attempt = self.map_position_ranges(ranges, query, at, mask)?;
                position = attempt.position;
                characters = attempt.characters;
                is_mapped = attempt.is_mapped;
                extra_context = -1;
            } else {
                position = self.extend_code(position, code, true);
                characters += 1;
            }

            let range = position.range(ranges, mask);

            if is_mapped && !position.is_empty(mask) && range != -1 {
                extra_context += 1;
            }

            if is_mapped
                && !position.is_empty(mask)
                && range != -1
                && characters >= min_context
                && extra_context >= add_context as i64
            {
                log::debug!("mapped {characters} context to range {range}");
                mappings.push(RangeMapping::to(range, characters - 1, characters - 1));
            } else if is_mapped && position.is_empty(mask) {
                // Extended into nothing; retry this base with a fresh start
                // in case the left context was too long.
                log::debug!("restarting at {at}");
                continue;
            } else {
                mappings.push(RangeMapping::unmapped());
                is_mapped = true;
            }
            i -= 1;
        }

        mappings.reverse();
        Ok(mappings)
    }

    /// Restart step of [`map_ranges`](Self::map_ranges): map one position by
    /// itself, extending right until the interval is subsumed by a single
    /// range. Keeps the interval from the moment uniqueness was reached.
    fn map_position_ranges(
        &self,
        ranges: &BitVector,
        pattern: &[u8],
        index: usize,
        mask: Option<&BitVector>,
    ) -> Result<MapAttempt, FmdError> {
        let mut result = MapAttempt {
            position: self.char_position(pattern[index])?,
            characters: 1,
            is_mapped: false,
        };
        if result.position.is_empty(mask) {
            if result.position.is_empty(None) {
                // An in-alphabet character with no occurrence at all means
                // the index cannot represent this reference.
                return Err(FmdError::InconsistentIndex(format!(
                    "character {:?} does not occur in the index",
                    pattern[index] as char
                )));
            }
            return Ok(result);
        }
        if result.position.range(ranges, mask) != -1 {
            result.is_mapped = true;
            return Ok(result);
        }

        let mut found_position = result.position;
        for &c in &pattern[index + 1..] {
            let code = dna::base_code(c)?;
            let next = self.extend_code(result.position, code, false);
            if next.is_empty(mask) {
                break;
            }
            result.position = next;
            result.characters += 1;
            if next.range(ranges, mask) != -1 {
                // Subsumed by one range; keep extending to use up the whole
                // right context, but remember the last subsumed interval.
                result.is_mapped = true;
                found_position = next;
            }
        }
        if result.is_mapped {
            result.position = found_position;
        }
        Ok(result)
    }
}

/// Reconcile a left-context and a right-context mapping for one position.
/// Agreement or a single opinion wins; a conflict is unmapped. Contexts from
/// both sides are merged so credit can reach as far as either sweep did.
pub fn disambiguate(left: &Mapping, right: &Mapping) -> Mapping {
    if left.same_place(right) {
        if !right.is_mapped() {
            return Mapping::unmapped();
        }
        let mut merged = *right;
        merged.set_max_context(
            left.left_max_context().max(right.left_max_context()),
            left.right_max_context().max(right.right_max_context()),
        );
        merged
    } else if !left.is_mapped() {
        *right
    } else if !right.is_mapped() {
        *left
    } else {
        Mapping::unmapped()
    }
}

struct MapAttempt {
    position: crate::fmd_position::FmdPosition,
    characters: usize,
    is_mapped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_position::TextPosition;

    #[test]
    fn disambiguate_prefers_agreement() {
        let here = Mapping::with_context(TextPosition::new(0, 3), 4, 1);
        let there = Mapping::with_context(TextPosition::new(0, 3), 1, 6);
        let merged = disambiguate(&here, &there);
        assert!(merged.is_mapped());
        assert_eq!(merged.location(), TextPosition::new(0, 3));
        assert_eq!(merged.left_max_context(), 4);
        assert_eq!(merged.right_max_context(), 6);
    }

    #[test]
    fn disambiguate_takes_the_single_opinion() {
        let mapped = Mapping::to(TextPosition::new(2, 1));
        assert_eq!(disambiguate(&mapped, &Mapping::unmapped()), mapped);
        assert_eq!(disambiguate(&Mapping::unmapped(), &mapped), mapped);
        assert!(!disambiguate(&Mapping::unmapped(), &Mapping::unmapped()).is_mapped());
    }

    #[test]
    fn disambiguate_rejects_conflict() {
        let here = Mapping::to(TextPosition::new(0, 3));
        let there = Mapping::to(TextPosition::new(0, 4));
        assert!(!disambiguate(&here, &there).is_mapped());
    }
}
