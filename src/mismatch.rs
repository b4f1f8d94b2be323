// Inexact search: bags of bi-intervals tagged with substitution counts.
//
// An extension step always produces the exact child, and for every interval
// that still has mismatch budget it also produces the children of the other
// three bases with the count bumped. Empty children are dropped; a bag that
// loses every interval collapses to a single empty sentinel.
//
// Two guards keep inexact mapping honest. Before a backward extension the
// mapper probes with mismatch-only children: if any such nearby path would
// match, the position restarts, because an apparently unique exact path is
// not trustworthy when a one-substitution neighbour also survives. And a
// position only maps while its bag holds exactly one interval.

use crate::bitvec::BitVector;
use crate::dna::{self, BASES};
use crate::error::FmdError;
use crate::fmd_position::{FmdPosition, EMPTY_FMD_POSITION};
use crate::index::FmdIndex;
use crate::mapping::{Mapping, RangeMapping};

/// Search state for inexact mapping: every surviving interval with the
/// number of substitutions spent reaching it, plus the context bookkeeping
/// of the position being mapped.
#[derive(Debug, Clone)]
pub struct MismatchBag {
    pub positions: Vec<(FmdPosition, usize)>,
    /// Context length when the bag first became unique.
    pub characters: usize,
    /// Total context length consumed.
    pub max_characters: usize,
    pub is_mapped: bool,
}

impl MismatchBag {
    /// The restart sentinel: one empty interval.
    pub fn sentinel() -> Self {
        MismatchBag {
            positions: vec![(EMPTY_FMD_POSITION, 0)],
            characters: 0,
            max_characters: 0,
            is_mapped: false,
        }
    }

    #[inline]
    pub fn front(&self) -> (FmdPosition, usize) {
        self.positions[0]
    }

    /// True when the bag is the empty sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.positions.len() == 1 && self.positions[0].0.is_empty_raw()
    }

    /// Does this bag pin down exactly one visible location?
    pub fn is_unique_hit(&self, mask: Option<&BitVector>) -> bool {
        self.positions.len() == 1 && self.positions[0].0.masked_length(mask) == 1
    }
}

/// Which children an inexact extension step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchExtendMode {
    /// Exact child plus mismatch children (the normal step).
    Full,
    /// Exact child only; used when a probe has shown all mismatch children
    /// are empty anyway.
    ExactOnly,
    /// Mismatch children only; the probe itself.
    MismatchOnly,
}

/// What "unique" means for a mismatch mapper.
#[derive(Clone, Copy)]
enum Uniqueness<'a> {
    /// Subsumed by a single merged range.
    Ranges(&'a BitVector),
    /// Exactly one visible row.
    Locations,
}

impl Uniqueness<'_> {
    fn reached(&self, position: &FmdPosition, mask: Option<&BitVector>) -> bool {
        match self {
            Uniqueness::Ranges(ranges) => position.range(ranges, mask) != -1,
            Uniqueness::Locations => position.masked_length(mask) == 1,
        }
    }
}

/// One per-position outcome of the shared inexact driver.
struct MismatchHit {
    position: Option<FmdPosition>,
    characters: usize,
    max_characters: usize,
}

impl FmdIndex {
    /// Extend every interval in a bag by one character. `z_max` caps the
    /// substitutions along any path.
    pub fn mismatch_extend(
        &self,
        prev: &MismatchBag,
        c: u8,
        backward: bool,
        z_max: usize,
        mask: Option<&BitVector>,
        mode: MismatchExtendMode,
    ) -> Result<MismatchBag, FmdError> {
        let code = dna::base_code(c)?;
        if prev.front().0.is_empty(mask) {
            return Err(FmdError::EmptyInterval);
        }
        Ok(self.mismatch_extend_code(prev, code, backward, z_max, mask, mode))
    }

    fn mismatch_extend_code(
        &self,
        prev: &MismatchBag,
        code: u8,
        backward: bool,
        z_max: usize,
        mask: Option<&BitVector>,
        mode: MismatchExtendMode,
    ) -> MismatchBag {
        let mut next = MismatchBag {
            positions: Vec::new(),
            characters: prev.characters,
            max_characters: prev.max_characters,
            is_mapped: prev.is_mapped,
        };

        for &(position, z) in &prev.positions {
            if mode != MismatchExtendMode::MismatchOnly {
                let child = self.extend_code(position, code, backward);
                if child.masked_length(mask) > 0 {
                    next.positions.push((child, z));
                }
            }
            if mode != MismatchExtendMode::ExactOnly && z < z_max {
                for base in BASES {
                    let other = match dna::base_code(base) {
                        Ok(other) => other,
                        Err(_) => unreachable!("BASES holds only real bases"),
                    };
                    if other == code {
                        continue;
                    }
                    let child = self.extend_code(position, other, backward);
                    if child.masked_length(mask) > 0 {
                        next.positions.push((child, z + 1));
                    }
                }
            }
        }

        if next.positions.is_empty() {
            next.positions.push((EMPTY_FMD_POSITION, 0));
        }
        next
    }

    /// Inexact right-map against merged ranges; entry `i` tells which range
    /// query position `i` landed in, if any.
    pub fn mismatch_map(
        &self,
        ranges: &BitVector,
        query: &[u8],
        mask: Option<&BitVector>,
        min_context: usize,
        add_context: usize,
        z_max: usize,
    ) -> Result<Vec<RangeMapping>, FmdError> {
        let hits = self.mismatch_map_impl(
            Uniqueness::Ranges(ranges),
            query,
            mask,
            min_context,
            add_context,
            z_max,
        )?;
        Ok(hits
            .into_iter()
            .map(|hit| match hit.position {
                Some(position) => RangeMapping::to(
                    position.range(ranges, mask),
                    hit.characters.saturating_sub(1),
                    hit.max_characters.saturating_sub(1),
                ),
                None => RangeMapping::unmapped(),
            })
            .collect())
    }

    pub fn mismatch_map_genome(
        &self,
        ranges: &BitVector,
        query: &[u8],
        genome: Option<usize>,
        min_context: usize,
        add_context: usize,
        z_max: usize,
    ) -> Result<Vec<RangeMapping>, FmdError> {
        self.mismatch_map(
            ranges,
            query,
            self.mask_for(genome)?,
            min_context,
            add_context,
            z_max,
        )
    }

    /// Inexact right-map to single locations: like
    /// [`map_right`](Self::map_right) but tolerating up to `z_max`
    /// substitutions in the context.
    pub fn mismatch_map_locations(
        &self,
        query: &[u8],
        mask: Option<&BitVector>,
        min_context: usize,
        add_context: usize,
        z_max: usize,
    ) -> Result<Vec<Mapping>, FmdError> {
        let hits = self.mismatch_map_impl(
            Uniqueness::Locations,
            query,
            mask,
            min_context,
            add_context,
            z_max,
        )?;
        let mut mappings = Vec::with_capacity(hits.len());
        for hit in hits {
            match hit.position {
                Some(position) => {
                    let mut row = position.forward_start as u64;
                    if let Some(mask) = mask {
                        row = mask.value_after(row).0;
                    }
                    mappings.push(Mapping::with_context(
                        self.locate(row)?,
                        1,
                        hit.characters,
                    ));
                }
                None => mappings.push(Mapping::unmapped()),
            }
        }
        Ok(mappings)
    }

    /// Shared driver: right-to-left sweep with mismatch-probe restarts.
    fn mismatch_map_impl(
        &self,
        target: Uniqueness,
        query: &[u8],
        mask: Option<&BitVector>,
        min_context: usize,
        add_context: usize,
        z_max: usize,
    ) -> Result<Vec<MismatchHit>, FmdError> {
        log::debug!(
            "inexact mapping {} bases, z_max {z_max}, min context {min_context} + {add_context}",
            query.len()
        );

        let mut hits = Vec::with_capacity(query.len());
        let mut search = MismatchBag::sentinel();
        let mut extra_context: i64 = -1;

        let mut i = query.len() as i64 - 1;
        while i >= 0 {
            let at = i as usize;
            let Ok(code) = dna::base_code(query[at]) else {
                hits.push(MismatchHit {
                    position: None,
                    characters: 0,
                    max_characters: 0,
                });
                search = MismatchBag::sentinel();
                i -= 1;
                continue;
            };

            if search.is_sentinel() {
                log::debug!("starting over by mapping position {at}");
                let (bag, extra) =
                    self.mismatch_map_position(target, query, at, min_context, z_max, mask)?;
                search = bag;
                extra_context = extra;

                let front = search.front().0;
                if search.is_mapped
                    && search.characters >= min_context
                    && extra_context >= add_context as i64
                    && search.positions.len() == 1
                    && target.reached(&front, mask)
                {
                    hits.push(MismatchHit {
                        position: Some(front),
                        characters: search.characters,
                        max_characters: search.max_characters,
                    });
                } else {
                    hits.push(MismatchHit {
                        position: None,
                        characters: 0,
                        max_characters: 0,
                    });
                    search.is_mapped = true;
                }
                i -= 1;
                continue;
            }

            // Probe with mismatch-only children first. Any survivor means a
            // nearby substitution path would also match, so uniqueness here
            // cannot be trusted; restart this position from scratch.
            let probe =
                self.mismatch_extend_code(&search, code, true, z_max, mask, MismatchExtendMode::MismatchOnly);
            if !probe.is_sentinel() {
                log::debug!("mismatch paths survive at {at}; restarting");
                search = MismatchBag::sentinel();
                continue;
            }

            // All mismatch children are empty, so the exact children alone
            // form the complete extension.
            search =
                self.mismatch_extend_code(&search, code, true, z_max, mask, MismatchExtendMode::ExactOnly);
            if search.is_sentinel() {
                // Ran out of results; retry this base with a fresh start.
                log::debug!("restarting at {at}");
                continue;
            }
            search.characters += 1;
            search.max_characters += 1;

            let front = search.front().0;
            let unique = search.positions.len() == 1 && target.reached(&front, mask);
            if search.is_mapped && unique {
                extra_context += 1;
            }

            if search.is_mapped
                && unique
                && search.characters >= min_context
                && extra_context >= add_context as i64
            {
                log::debug!("mapped {} context at {at}", search.characters);
                hits.push(MismatchHit {
                    position: Some(front),
                    characters: search.characters,
                    max_characters: search.max_characters,
                });
            } else {
                hits.push(MismatchHit {
                    position: None,
                    characters: 0,
                    max_characters: 0,
                });
                search.is_mapped = true;
            }
            i -= 1;
        }

        hits.reverse();
        Ok(hits)
    }

    /// Restart step: seed at `index` and explore rightward context with the
    /// full mismatch fan-out until the bag pins down a unique target.
    /// Returns the bag and the extra context accumulated past uniqueness.
    fn mismatch_map_position(
        &self,
        target: Uniqueness,
        pattern: &[u8],
        index: usize,
        min_context: usize,
        z_max: usize,
        mask: Option<&BitVector>,
    ) -> Result<(MismatchBag, i64), FmdError> {
        let mut extra_context: i64 = -1;
        let mut result = MismatchBag {
            positions: vec![(self.char_position(pattern[index])?, 0)],
            characters: 1,
            max_characters: 1,
            is_mapped: false,
        };
        if result.front().0.is_empty(mask) {
            return Ok((MismatchBag::sentinel(), extra_context));
        }
        if target.reached(&result.front().0, mask) && result.positions.len() == 1 {
            extra_context = 0;
            result.is_mapped = true;
            return Ok((result, extra_context));
        }

        let mut found_positions = result.positions.clone();
        for &c in &pattern[index + 1..] {
            let Ok(code) = dna::base_code(c) else {
                break;
            };
            let new_result =
                self.mismatch_extend_code(&result, code, false, z_max, mask, MismatchExtendMode::Full);
            if new_result.front().0.is_empty(mask) {
                // Maximal context reached.
                if result.positions.len() == 1
                    && result.characters >= min_context
                    && result.is_mapped
                {
                    result.characters = result.max_characters;
                    return Ok((result, extra_context));
                }
                return Ok((MismatchBag::sentinel(), -1));
            }

            let unique = new_result.positions.len() == 1
                && target.reached(&new_result.front().0, mask);
            if !result.is_mapped && unique && result.characters + 1 >= min_context {
                // First time the bag collapses onto the target.
                extra_context = 0;
                result.positions = new_result.positions;
                result.characters += 1;
                result.max_characters += 1;
                result.is_mapped = true;
                found_positions = result.positions.clone();
            } else if result.is_mapped && unique {
                extra_context += 1;
                result.positions = new_result.positions;
                result.max_characters += 1;
            } else {
                result.positions = new_result.positions;
                result.characters += 1;
                result.max_characters += 1;
            }
        }

        if result.is_mapped {
            result.positions = found_positions;
            Ok((result, extra_context))
        } else {
            Ok((MismatchBag::sentinel(), -1))
        }
    }

    /// Zip-map against merged ranges: every position extends outward in both
    /// directions at once, with the mismatch fan-out, and maps at the first
    /// window width where the bag is subsumed by one range.
    pub fn zip_map(
        &self,
        ranges: &BitVector,
        query: &[u8],
        mask: Option<&BitVector>,
        min_context: usize,
        z_max: usize,
    ) -> Result<Vec<RangeMapping>, FmdError> {
        log::debug!(
            "zip-mapping {} bases with two-sided min context {min_context}",
            query.len()
        );
        let mut mappings = Vec::with_capacity(query.len());
        for index in (0..query.len()).rev() {
            let bag = self.zip_map_position(ranges, query, index, min_context, z_max, mask);
            if bag.is_mapped {
                let range = bag.front().0.range(ranges, mask);
                mappings.push(RangeMapping::to(range, bag.characters, bag.max_characters));
            } else {
                mappings.push(RangeMapping::unmapped());
            }
        }
        mappings.reverse();
        Ok(mappings)
    }

    pub fn zip_map_genome(
        &self,
        ranges: &BitVector,
        query: &[u8],
        genome: Option<usize>,
        min_context: usize,
        z_max: usize,
    ) -> Result<Vec<RangeMapping>, FmdError> {
        self.zip_map(ranges, query, self.mask_for(genome)?, min_context, z_max)
    }

    /// Two-sided exploration of one position: alternate a forward and a
    /// backward extension, widening the window one base per side per step
    /// until it runs off an end or the bag empties.
    fn zip_map_position(
        &self,
        ranges: &BitVector,
        pattern: &[u8],
        index: usize,
        min_context: usize,
        z_max: usize,
        mask: Option<&BitVector>,
    ) -> MismatchBag {
        let Ok(seed) = self.char_position(pattern[index]) else {
            return MismatchBag::sentinel();
        };
        let mut result = MismatchBag {
            positions: vec![(seed, 0)],
            characters: 1,
            max_characters: 1,
            is_mapped: false,
        };
        if result.front().0.is_empty(mask) {
            return MismatchBag::sentinel();
        }
        if result.front().0.range(ranges, mask) != -1 {
            result.is_mapped = true;
        }

        let mut found_positions = result.positions.clone();
        let mut k = 1;
        while index + k < pattern.len() && index >= k {
            let (Ok(ahead), Ok(behind)) = (
                dna::base_code(pattern[index + k]),
                dna::base_code(pattern[index - k]),
            ) else {
                break;
            };

            let widened =
                self.mismatch_extend_code(&result, ahead, false, z_max, mask, MismatchExtendMode::Full);
            if widened.front().0.is_empty(mask) {
                return self.zip_finalize(result, found_positions, min_context);
            }
            let widened =
                self.mismatch_extend_code(&widened, behind, true, z_max, mask, MismatchExtendMode::Full);
            if widened.front().0.is_empty(mask) {
                return self.zip_finalize(result, found_positions, min_context);
            }

            let unique = widened.positions.len() == 1
                && widened.front().0.range(ranges, mask) != -1;
            if !result.is_mapped && unique && result.max_characters >= min_context {
                result.positions = widened.positions;
                result.max_characters += 2;
                result.characters = result.max_characters;
                result.is_mapped = true;
                found_positions = result.positions.clone();
            } else if result.is_mapped && unique {
                result.positions = widened.positions;
                result.max_characters += 2;
            } else {
                result.positions = widened.positions;
                result.max_characters += 2;
                result.characters = result.max_characters;
            }
            k += 1;
        }

        if result.is_mapped {
            result.positions = found_positions;
            result
        } else {
            MismatchBag::sentinel()
        }
    }

    fn zip_finalize(
        &self,
        mut result: MismatchBag,
        found_positions: Vec<(FmdPosition, usize)>,
        min_context: usize,
    ) -> MismatchBag {
        if result.is_mapped {
            result.positions = found_positions;
            result
        } else if result.positions.len() == 1 && result.max_characters >= min_context {
            // The window died but what remains is a single interval wide
            // enough to trust.
            result.characters = result.max_characters;
            result.is_mapped = true;
            result
        } else {
            MismatchBag::sentinel()
        }
    }

    /// How a whole word occurs within `z_max` substitutions: the final bag
    /// after seeding on the last character (exact and substituted) and
    /// backward-extending through the rest. The credit filter uses
    /// [`MismatchBag::is_unique_hit`] on this to test sentinel words.
    pub fn mismatch_count(
        &self,
        word: &[u8],
        z_max: usize,
        mask: Option<&BitVector>,
    ) -> Result<MismatchBag, FmdError> {
        if word.is_empty() {
            return Ok(MismatchBag::sentinel());
        }
        let last = word[word.len() - 1];
        let last_code = dna::base_code(last)?;
        let mut bag = MismatchBag {
            positions: Vec::new(),
            characters: 1,
            max_characters: 1,
            is_mapped: false,
        };
        for base in BASES {
            let code = dna::base_code(base)?;
            let z = if code == last_code { 0 } else { 1 };
            if z > z_max {
                continue;
            }
            let position = self.char_position(base)?;
            if position.masked_length(mask) > 0 {
                bag.positions.push((position, z));
            }
        }
        if bag.positions.is_empty() {
            return Ok(MismatchBag::sentinel());
        }

        for &c in word[..word.len() - 1].iter().rev() {
            let code = dna::base_code(c)?;
            bag = self.mismatch_extend_code(&bag, code, true, z_max, mask, MismatchExtendMode::Full);
            if bag.is_sentinel() {
                return Ok(bag);
            }
            bag.characters += 1;
            bag.max_characters += 1;
        }
        Ok(bag)
    }
}
