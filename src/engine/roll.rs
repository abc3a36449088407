//! Roll generation: uniform letters or die-selected letter tiers.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::rules::RollMode;
use crate::engine::tiles::{LetterGroup, ALPHABET};

/// Draw `count` letters independently and uniformly from A-Z.
pub fn roll_letters<R: Rng>(rng: &mut R, count: usize) -> Vec<char> {
    (0..count)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

/// A single six-sided die.
pub fn roll_die<R: Rng>(rng: &mut R) -> u8 {
    rng.gen_range(1..=6)
}

/// Generate the letters for one turn.
///
/// `supply` holds the remaining copies per letter for dice rolls; it is read
/// here and only decremented when a roll is bought.
pub fn generate_roll<R: Rng>(
    rng: &mut R,
    mode: &RollMode,
    supply: &BTreeMap<char, u32>,
) -> Vec<char> {
    match mode {
        RollMode::Uniform { min_count, max_count } => {
            let count = rng.gen_range(*min_count..=*max_count);
            roll_letters(rng, count)
        }
        RollMode::Dice { groups } => {
            let count = roll_die(rng) as usize;
            roll_from_groups(rng, groups, supply, count)
        }
    }
}

fn roll_from_groups<R: Rng>(
    rng: &mut R,
    groups: &[LetterGroup],
    supply: &BTreeMap<char, u32>,
    count: usize,
) -> Vec<char> {
    // Copies already offered in this roll count against the supply too.
    let mut remaining = supply.clone();
    let mut letters = Vec::with_capacity(count);

    for _ in 0..count {
        let live: Vec<&LetterGroup> = groups
            .iter()
            .filter(|g| {
                g.faces.iter().any(|f| (1..=6).contains(f))
                    && available(g, &remaining).next().is_some()
            })
            .collect();
        if live.is_empty() {
            break;
        }

        // Re-roll faces that land on an exhausted group.
        let group = loop {
            let face = roll_die(rng);
            if let Some(g) = live.iter().find(|g| g.faces.contains(&face)) {
                break *g;
            }
        };

        let choices: Vec<char> = available(group, &remaining).collect();
        if let Some(&letter) = choices.choose(rng) {
            if let Some(n) = remaining.get_mut(&letter) {
                *n -= 1;
            }
            letters.push(letter);
        }
    }

    letters
}

fn available<'a>(
    group: &'a LetterGroup,
    remaining: &'a BTreeMap<char, u32>,
) -> impl Iterator<Item = char> + 'a {
    group
        .letters
        .iter()
        .map(|l| l.to_ascii_uppercase())
        .filter(move |l| remaining.get(l).copied().unwrap_or(0) > 0)
}
