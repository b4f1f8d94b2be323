// Credit propagation.
//
// Bases that failed to map on their own can borrow a position from a nearby
// mapped neighbour whose context window covers them: a neighbour mapped at
// position p with a right context reaching this base implies this base sits
// at p plus the distance. Credit is only extended between two sentinels,
// bases whose mapping words occur uniquely in the reference even allowing
// z_max substitutions, so that a spurious edge mapping cannot leak credit
// across the whole query.

use crate::bitvec::BitVector;
use crate::error::FmdError;
use crate::index::FmdIndex;
use crate::map::disambiguate;
use crate::mapping::Mapping;
use crate::text_position::TextPosition;

/// Position-wise reconciliation of a left-mapping and a right-mapping
/// vector; the first stage of the credit filter, usable on its own.
pub struct DisambiguateFilter;

impl DisambiguateFilter {
    pub fn apply(left: &[Mapping], right: &[Mapping]) -> Vec<Mapping> {
        left.iter()
            .zip(right)
            .map(|(l, r)| disambiguate(l, r))
            .collect()
    }
}

pub struct CreditFilter<'a> {
    index: &'a FmdIndex,
    mask: Option<&'a BitVector>,
    z_max: usize,
}

impl<'a> CreditFilter<'a> {
    pub fn new(index: &'a FmdIndex, mask: Option<&'a BitVector>, z_max: usize) -> Self {
        CreditFilter {
            index,
            mask,
            z_max,
        }
    }

    /// Combine directional mapping vectors, then fill unmapped positions
    /// between the sentinels with agreed implied positions.
    pub fn apply(
        &self,
        left_mappings: &[Mapping],
        right_mappings: &[Mapping],
        query: &[u8],
    ) -> Result<Vec<Mapping>, FmdError> {
        let disambiguated = DisambiguateFilter::apply(left_mappings, right_mappings);

        let left_sentinel = self.find_left_sentinel(left_mappings, &disambiguated, query)?;
        let right_sentinel = self.find_right_sentinel(right_mappings, &disambiguated, query)?;

        let (Some(left_sentinel), Some(right_sentinel)) = (left_sentinel, right_sentinel) else {
            log::info!("no sentinel pair; credit not applied");
            return Ok(disambiguated);
        };
        if right_sentinel <= left_sentinel {
            log::info!("no sequence between sentinels; credit not applied");
            return Ok(disambiguated);
        }

        // The widest windows any mapped base carries bound how far credit
        // can reach.
        let max_left_context = disambiguated
            .iter()
            .map(|m| m.left_max_context())
            .max()
            .unwrap_or(0);
        let max_right_context = disambiguated
            .iter()
            .map(|m| m.right_max_context())
            .max()
            .unwrap_or(0);

        let mut result = Vec::with_capacity(disambiguated.len());
        result.extend_from_slice(&disambiguated[..=left_sentinel]);

        for i in left_sentinel + 1..right_sentinel {
            if disambiguated[i].is_mapped() {
                result.push(disambiguated[i]);
                continue;
            }
            log::trace!("trying to credit map base {i}");

            let from_right = self.implied_from_side(
                &disambiguated,
                right_mappings,
                i,
                Side::Right,
                max_right_context,
            )?;
            let from_left = self.implied_from_side(
                &disambiguated,
                left_mappings,
                i,
                Side::Left,
                max_left_context,
            )?;

            result.push(match (from_left, from_right) {
                (Implied::At(l), Implied::At(r)) if l == r => Mapping::to(l),
                (Implied::At(_), Implied::At(_)) => Mapping::unmapped(),
                (Implied::At(l), _) => Mapping::to(l),
                (_, Implied::At(r)) => Mapping::to(r),
                _ => Mapping::unmapped(),
            });
        }

        result.extend_from_slice(&disambiguated[right_sentinel..]);
        Ok(result)
    }

    /// Leftmost base that left-mapped and whose mapping word occurs exactly
    /// once within the substitution budget.
    fn find_left_sentinel(
        &self,
        left_mappings: &[Mapping],
        disambiguated: &[Mapping],
        query: &[u8],
    ) -> Result<Option<usize>, FmdError> {
        for i in 0..disambiguated.len() {
            if !left_mappings[i].is_mapped() || !disambiguated[i].is_mapped() {
                continue;
            }
            // The word this base mapped on has its right end at i.
            let word_length = disambiguated[i].left_max_context().min(i + 1);
            if word_length == 0 {
                continue;
            }
            let word = &query[i + 1 - word_length..=i];
            if self
                .index
                .mismatch_count(word, self.z_max, self.mask)?
                .is_unique_hit(self.mask)
            {
                log::info!("left sentinel found at {i}");
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Rightmost base that right-mapped on a word unique within the budget.
    fn find_right_sentinel(
        &self,
        right_mappings: &[Mapping],
        disambiguated: &[Mapping],
        query: &[u8],
    ) -> Result<Option<usize>, FmdError> {
        for i in (0..disambiguated.len()).rev() {
            if !right_mappings[i].is_mapped() || !disambiguated[i].is_mapped() {
                continue;
            }
            // The word this base mapped on has its left end at i.
            let word_length = disambiguated[i]
                .right_max_context()
                .min(disambiguated.len() - i);
            if word_length == 0 {
                continue;
            }
            let word = &query[i..i + word_length];
            if self
                .index
                .mismatch_count(word, self.z_max, self.mask)?
                .is_unique_hit(self.mask)
            {
                log::info!("right sentinel found at {i}");
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Collect the position implied for base `i` by neighbours on one side.
    /// Consistent agreement yields a position; disagreement poisons the
    /// side; no reaching neighbour yields nothing.
    fn implied_from_side(
        &self,
        disambiguated: &[Mapping],
        directional: &[Mapping],
        i: usize,
        side: Side,
        max_context: usize,
    ) -> Result<Implied, FmdError> {
        let mut found: Option<TextPosition> = None;

        let neighbours: Box<dyn Iterator<Item = usize>> = match side {
            // Right contexts reach rightward from earlier bases.
            Side::Right => Box::new((i.saturating_sub(max_context)..i).rev()),
            // Left contexts reach leftward from later bases.
            Side::Left => Box::new(i + 1..disambiguated.len().min(i + max_context)),
        };

        for j in neighbours {
            if !directional[j].is_mapped() || !disambiguated[j].is_mapped() {
                continue;
            }
            let distance = i.abs_diff(j);
            let reach = match side {
                Side::Right => disambiguated[j].right_max_context(),
                Side::Left => disambiguated[j].left_max_context(),
            };
            if reach == 0 || reach - 1 < distance {
                // The window includes the base itself, so a reach of r
                // covers bases up to r - 1 away. This also keeps credit
                // from walking off the end of a contig.
                continue;
            }

            let location = disambiguated[j].location();
            let delta = i as i64 - j as i64;
            let implied_offset = location.offset() as i64 + delta;
            let contig_length = self.index.contig_length(location.contig())? as i64;
            if implied_offset < 0 || implied_offset >= contig_length {
                continue;
            }
            let implied = location.offset_by(delta);
            log::trace!("base {j} places base {i} at text {} offset {}", implied.text(), implied.offset());

            match found {
                None => found = Some(implied),
                Some(seen) if seen == implied => {}
                Some(_) => return Ok(Implied::Conflicting),
            }
        }

        Ok(match found {
            Some(position) => Implied::At(position),
            None => Implied::Nothing,
        })
    }
}

enum Side {
    Left,
    Right,
}

enum Implied {
    At(TextPosition),
    Conflicting,
    Nothing,
}
