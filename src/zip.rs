// Zip mapping: reconcile one-sided contexts discovered independently.
//
// For every query position the inchworm sweeps supply the longest right
// context and the longest left context present in the reference. A position
// maps only when the two sides, after exploring their retractions, agree on
// exactly one text position. This maps a subset of what the natural scheme
// maps, but never calls a position that the two contexts disagree on.

use crate::bitvec::BitVector;
use crate::dna;
use crate::error::FmdError;
use crate::fmd_position::{FmdPosition, EMPTY_FMD_POSITION};
use crate::index::FmdIndex;
use crate::mapping::Mapping;
use crate::scheme::MappingScheme;
use crate::text_position::TextPosition;
use std::collections::BTreeSet;

pub struct ZipMappingScheme<'a> {
    index: &'a FmdIndex,
    mask: Option<&'a BitVector>,
    /// Minimum total context (left + right, base counted once) to accept.
    pub min_context_length: usize,
    /// Largest interval worth enumerating when looking for agreement.
    pub max_range_count: usize,
    /// How far a one-sided context may be extended through the other side's
    /// characters to confirm it.
    pub max_extend_through: usize,
    /// Explore retractions of both sides, not just the full-depth contexts.
    pub use_retraction: bool,
}

impl<'a> ZipMappingScheme<'a> {
    pub fn new(index: &'a FmdIndex, mask: Option<&'a BitVector>) -> Self {
        ZipMappingScheme {
            index,
            mask,
            min_context_length: 20,
            max_range_count: 10,
            max_extend_through: 20,
            use_retraction: true,
        }
    }

    /// Longest right context of every position: entry `i` holds the
    /// bi-interval and length of the longest suffix of the reference match
    /// beginning at `i`. Unknown bases yield an empty entry.
    fn find_right_contexts(&self, query: &[u8]) -> Vec<(FmdPosition, usize)> {
        let mut contexts = vec![(EMPTY_FMD_POSITION, 0usize); query.len()];
        let mut search = self.index.covering_position();
        let mut pattern_length = 0usize;

        for i in (0..query.len()).rev() {
            let Ok(code) = dna::base_code(query[i]) else {
                search = self.index.covering_position();
                pattern_length = 0;
                continue;
            };
            let mut extended = search;
            self.index.extend_left_only_code(&mut extended, code);
            while extended.is_empty(self.mask) && pattern_length > 0 {
                pattern_length = self.index.retract_right_only_step(&mut search);
                extended = search;
                self.index.extend_left_only_code(&mut extended, code);
            }
            if extended.is_empty(self.mask) {
                search = self.index.covering_position();
                pattern_length = 0;
                continue;
            }
            search = extended;
            pattern_length += 1;
            contexts[i] = (search, pattern_length);
        }
        contexts
    }

    /// Longest left contexts, as bi-intervals over the reverse complement
    /// of each context pattern.
    fn find_left_contexts(&self, query: &[u8]) -> Vec<(FmdPosition, usize)> {
        let rc = dna::reverse_complement(query);
        let mut contexts = self.find_right_contexts(&rc);
        contexts.reverse();
        contexts
    }

    /// Rows of the forward interval visible through the mask, provided there
    /// are few enough of them to enumerate.
    fn visible_rows(&self, position: &FmdPosition) -> Option<Vec<u64>> {
        let count = position.masked_length(self.mask);
        if count == 0 || count > self.max_range_count as i64 {
            return None;
        }
        let first = position.forward_start as u64;
        let last = (position.forward_start + position.end_offset) as u64;
        let mut rows = Vec::with_capacity(count as usize);
        match self.mask {
            None => rows.extend(first..=last),
            Some(mask) => {
                let (mut row, _) = mask.value_after(first);
                while row <= last {
                    rows.push(row);
                    if row == mask.len() {
                        break;
                    }
                    let (next, _) = mask.value_after(row + 1);
                    row = next;
                }
            }
        }
        Some(rows)
    }

    /// Places the mapped base could sit according to a right context of the
    /// given length: locate each visible row of the matched interval.
    fn right_implied_positions(
        &self,
        position: &FmdPosition,
    ) -> Result<Option<BTreeSet<TextPosition>>, FmdError> {
        let Some(rows) = self.visible_rows(position) else {
            return Ok(None);
        };
        let mut placed = BTreeSet::new();
        for row in rows {
            placed.insert(self.index.locate(row)?);
        }
        Ok(Some(placed))
    }

    /// Places according to a left context: the interval matches the reverse
    /// complement of the context, so each located row names the base on the
    /// opposite strand and gets flipped back.
    fn left_implied_positions(
        &self,
        position: &FmdPosition,
    ) -> Result<Option<BTreeSet<TextPosition>>, FmdError> {
        let Some(rows) = self.visible_rows(position) else {
            return Ok(None);
        };
        let mut placed = BTreeSet::new();
        for row in rows {
            let located = self.index.locate(row)?;
            let contig_length = self.index.contig_length(located.contig())?;
            placed.insert(located.flip(contig_length));
        }
        Ok(Some(placed))
    }

    /// All retraction states of a one-sided context that are still small
    /// enough to enumerate, deepest first. Retraction only grows intervals,
    /// so the walk stops at the first state past the cap.
    fn retraction_states(
        &self,
        position: FmdPosition,
        length: usize,
    ) -> Vec<(FmdPosition, usize)> {
        let mut states = vec![(position, length)];
        if !self.use_retraction {
            return states;
        }
        let mut current = position;
        let mut depth = length;
        while depth > 1 {
            let mut retracted = current;
            let parent_depth = self.index.retract_right_only_step(&mut retracted);
            if parent_depth == 0
                || retracted.masked_length(self.mask) > self.max_range_count as i64
            {
                break;
            }
            current = retracted;
            depth = parent_depth;
            states.push((current, depth));
        }
        states
    }

    /// Walk the pairwise retractions of the two contexts and collect every
    /// text position both sides agree on with enough total context.
    fn explore_retractions(
        &self,
        left: (FmdPosition, usize),
        right: (FmdPosition, usize),
    ) -> Result<BTreeSet<TextPosition>, FmdError> {
        let mut agreed = BTreeSet::new();
        let left_states = self.retraction_states(left.0, left.1);
        let right_states = self.retraction_states(right.0, right.1);

        for &(left_position, left_length) in &left_states {
            let Some(left_set) = self.left_implied_positions(&left_position)? else {
                continue;
            };
            for &(right_position, right_length) in &right_states {
                if left_length + right_length - 1 < self.min_context_length {
                    continue;
                }
                let Some(right_set) = self.right_implied_positions(&right_position)? else {
                    continue;
                };
                for position in left_set.intersection(&right_set) {
                    agreed.insert(*position);
                }
            }
        }
        Ok(agreed)
    }

    /// Confirm a small right context against an unenumerable left side by
    /// extending it leftward through the query itself. Succeeds only when
    /// the whole left context fits within the extend-through budget and the
    /// extended match survives.
    fn extend_right_through_left(
        &self,
        query: &[u8],
        at: usize,
        right: (FmdPosition, usize),
        left_length: usize,
    ) -> Result<Option<BTreeSet<TextPosition>>, FmdError> {
        let through = left_length - 1;
        if through > self.max_extend_through || through > at {
            return Ok(None);
        }
        let mut extended = right.0;
        for k in 1..=through {
            let Ok(code) = dna::base_code(query[at - k]) else {
                return Ok(None);
            };
            self.index.extend_left_only_code(&mut extended, code);
            if extended.is_empty(self.mask) {
                return Ok(None);
            }
        }
        let Some(rows) = self.visible_rows(&extended) else {
            return Ok(None);
        };
        let mut placed = BTreeSet::new();
        for row in rows {
            placed.insert(self.index.locate(row)?.offset_by(through as i64));
        }
        Ok(Some(placed))
    }

    /// Mirror image: confirm a small left context by extending its reverse
    /// complement through the right side's characters.
    fn extend_left_through_right(
        &self,
        query: &[u8],
        at: usize,
        left: (FmdPosition, usize),
        right_length: usize,
    ) -> Result<Option<BTreeSet<TextPosition>>, FmdError> {
        let through = right_length - 1;
        if through > self.max_extend_through || at + through >= query.len() {
            return Ok(None);
        }
        let mut extended = left.0;
        for k in 1..=through {
            let Ok(code) = dna::base_code(dna::complement(query[at + k])) else {
                return Ok(None);
            };
            self.index.extend_left_only_code(&mut extended, code);
            if extended.is_empty(self.mask) {
                return Ok(None);
            }
        }
        let Some(rows) = self.visible_rows(&extended) else {
            return Ok(None);
        };
        let mut placed = BTreeSet::new();
        for row in rows {
            let located = self.index.locate(row)?;
            let contig_length = self.index.contig_length(located.contig())?;
            placed.insert(located.flip(contig_length).offset_by(-(through as i64)));
        }
        Ok(Some(placed))
    }

    fn map_position(
        &self,
        query: &[u8],
        at: usize,
        left: (FmdPosition, usize),
        right: (FmdPosition, usize),
    ) -> Result<Option<TextPosition>, FmdError> {
        if left.1 == 0 || right.1 == 0 {
            return Ok(None);
        }

        let mut agreed = self.explore_retractions(left, right)?;

        if agreed.is_empty() && left.1 + right.1 - 1 >= self.min_context_length {
            // One side may be unenumerable; try to push the other side's
            // match through it instead.
            if self.visible_rows(&left.0).is_none() {
                if let Some(confirmed) =
                    self.extend_right_through_left(query, at, right, left.1)?
                {
                    agreed = confirmed;
                }
            } else if self.visible_rows(&right.0).is_none() {
                if let Some(confirmed) =
                    self.extend_left_through_right(query, at, left, right.1)?
                {
                    agreed = confirmed;
                }
            }
        }

        if agreed.len() == 1 {
            Ok(agreed.into_iter().next())
        } else {
            Ok(None)
        }
    }
}

impl MappingScheme for ZipMappingScheme<'_> {
    fn map(&self, query: &[u8]) -> Result<Vec<Mapping>, FmdError> {
        let rights = self.find_right_contexts(query);
        let lefts = self.find_left_contexts(query);

        let mut mappings = Vec::with_capacity(query.len());
        for at in 0..query.len() {
            match self.map_position(query, at, lefts[at], rights[at])? {
                Some(position) => {
                    log::debug!(
                        "zip-mapped position {at} to text {} offset {}",
                        position.text(),
                        position.offset()
                    );
                    mappings.push(Mapping::with_context(position, lefts[at].1, rights[at].1));
                }
                None => mappings.push(Mapping::unmapped()),
            }
        }
        Ok(mappings)
    }
}
