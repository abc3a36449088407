//! Letter cost table and the tiered letter groups used by dice rolls.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub const ALPHABET: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
    'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Cost of a wild tile, whatever letter it is assigned.
pub const WILD_COST: u32 = 1;

/// Per-letter purchase cost, roughly inverse to letter frequency.
pub const LETTER_COSTS: [(char, u32); 26] = [
    ('A', 1), ('B', 3), ('C', 3), ('D', 2), ('E', 1), ('F', 4), ('G', 2),
    ('H', 4), ('I', 1), ('J', 8), ('K', 5), ('L', 1), ('M', 3), ('N', 1),
    ('O', 1), ('P', 3), ('Q', 10), ('R', 1), ('S', 1), ('T', 1), ('U', 1),
    ('V', 4), ('W', 4), ('X', 8), ('Y', 4), ('Z', 10),
];

pub static COST_LOOKUP: Lazy<HashMap<char, u32>> =
    Lazy::new(|| LETTER_COSTS.iter().copied().collect());

/// Cost of an uppercase letter, `None` for anything outside A-Z.
pub fn letter_cost(letter: char) -> Option<u32> {
    COST_LOOKUP.get(&letter.to_ascii_uppercase()).copied()
}

/// Sum of table costs over a word; characters outside A-Z count 0.
pub fn word_cost(word: &str) -> u32 {
    word.chars().map(|c| letter_cost(c).unwrap_or(0)).sum()
}

/// A tier of letters selected by one or more die faces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LetterGroup {
    pub name: String,
    pub faces: Vec<u8>,
    pub letters: Vec<char>,
    /// Copies of each letter in this group available for the whole session.
    pub supply: u32,
}

/// Default dice tiers: common letters on most faces, rare high-value letters
/// only on a six.
pub fn default_letter_groups() -> Vec<LetterGroup> {
    let group = |name: &str, faces: &[u8], letters: &str, supply: u32| LetterGroup {
        name: name.to_string(),
        faces: faces.to_vec(),
        letters: letters.chars().collect(),
        supply,
    };
    vec![
        group("vowels", &[1, 2], "AEIOU", 12),
        group("common", &[3, 4], "DGLNRST", 8),
        group("uncommon", &[5], "BCFHMPVWY", 4),
        group("rare", &[6], "JKQXZ", 2),
    ]
}

/// Remaining copies per letter, built from a group table.
pub fn initial_supply(groups: &[LetterGroup]) -> BTreeMap<char, u32> {
    let mut supply = BTreeMap::new();
    for g in groups {
        for &l in &g.letters {
            *supply.entry(l.to_ascii_uppercase()).or_insert(0) += g.supply;
        }
    }
    supply
}
