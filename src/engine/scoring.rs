//! Payout formulas for a composed word.

use crate::engine::models::LetterTile;
use crate::engine::rules::ScoringRule;

/// Sum of tile costs. Wild tiles already carry their fixed cost.
pub fn cost_sum<'a, I>(tiles: I) -> u64
where
    I: IntoIterator<Item = &'a LetterTile>,
{
    tiles.into_iter().map(|t| t.cost as u64).sum()
}

/// Potential payout for the given tiles. Advisory until the word is validated.
pub fn score(tiles: &[LetterTile], rule: &ScoringRule) -> u64 {
    payout(cost_sum(tiles), tiles.len(), rule)
}

/// Payout for a word of `len` letters whose costs add up to `sum`.
pub fn payout(sum: u64, len: usize, rule: &ScoringRule) -> u64 {
    match rule {
        ScoringRule::Squared => sum * sum,
        ScoringRule::LengthBonus { per_letter, base_length } => {
            let extra = len as f64 - *base_length as f64;
            let payout = (sum as f64 * (1.0 + per_letter * extra)).round();
            if payout > 0.0 {
                payout as u64
            } else {
                0
            }
        }
    }
}
