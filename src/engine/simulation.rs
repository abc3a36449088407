//! Self-play simulator: a greedy bot plays many independent sessions to
//! compare rule presets.

use std::collections::HashMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::dictionary::WordList;
use crate::engine::rules::{RuleSet, ScoringRule};
use crate::engine::scoring::payout;
use crate::engine::session::{GameSession, SubmissionOutcome};
use crate::engine::tiles::word_cost;

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub games: usize,
    pub turns: usize,
    pub base_seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            games: 100,
            turns: 30,
            base_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub seed: u64,
    pub final_coins: u64,
    pub spent: u64,
    pub earned: u64,
    pub words_sold: Vec<String>,
    pub events: usize,
    pub duration_ms: f64,
}

/// Aggregated results from a simulation run.
pub struct SimulationResult {
    pub initial_coins: u64,
    pub outcomes: Vec<GameOutcome>,
}

impl SimulationResult {
    pub fn num_games(&self) -> usize {
        self.outcomes.len()
    }

    pub fn avg_final_coins(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().map(|o| o.final_coins as f64).sum::<f64>() / self.outcomes.len() as f64
    }

    pub fn final_coins_stddev(&self) -> f64 {
        if self.outcomes.len() < 2 {
            return 0.0;
        }
        let avg = self.avg_final_coins();
        let variance = self
            .outcomes
            .iter()
            .map(|o| (o.final_coins as f64 - avg).powi(2))
            .sum::<f64>()
            / (self.outcomes.len() - 1) as f64;
        variance.sqrt()
    }

    pub fn avg_words_sold(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().map(|o| o.words_sold.len() as f64).sum::<f64>()
            / self.outcomes.len() as f64
    }

    /// Fraction of games that finished above the starting balance.
    pub fn profit_rate(&self) -> f64 {
        let profitable = self
            .outcomes
            .iter()
            .filter(|o| o.final_coins > self.initial_coins)
            .count();
        profitable as f64 / self.outcomes.len().max(1) as f64
    }

    pub fn most_sold_words(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in self.outcomes.iter().flat_map(|o| o.words_sold.iter()) {
            *counts.entry(word.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(String, usize)> =
            counts.into_iter().map(|(w, c)| (w.to_string(), c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Simulation Results ({} games, start {} coins)",
            self.num_games(),
            self.initial_coins
        )];
        lines.push("=".repeat(60));
        lines.push(format!(
            "  Final coins: {:7.1} +/- {:6.1}",
            self.avg_final_coins(),
            self.final_coins_stddev()
        ));
        lines.push(format!("  Words sold:  {:7.1} per game", self.avg_words_sold()));
        lines.push(format!("  Profitable:  {:5.1}%", self.profit_rate() * 100.0));
        let top = self.most_sold_words(5);
        if !top.is_empty() {
            let shown: Vec<String> = top.iter().map(|(w, c)| format!("{} x{}", w, c)).collect();
            lines.push(format!("  Top words:   {}", shown.join(", ")));
        }
        if !self.outcomes.is_empty() {
            let total_ms: f64 = self.outcomes.iter().map(|o| o.duration_ms).sum();
            lines.push(format!(
                "  Avg game: {:.1}ms  |  Total: {:.2}s",
                total_ms / self.outcomes.len() as f64,
                total_ms / 1000.0
            ));
        }
        lines.join("\n")
    }
}

fn letter_counts(letters: impl IntoIterator<Item = char>) -> [u32; 26] {
    let mut counts = [0u32; 26];
    for c in letters {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() {
            counts[(c as u8 - b'A') as usize] += 1;
        }
    }
    counts
}

/// Highest-paying dictionary word that can be spelled from `letters`.
/// Ties go to the alphabetically first word.
pub fn best_word(words: &WordList, letters: &[char], rule: &ScoringRule) -> Option<(String, u64)> {
    let available = letter_counts(letters.iter().copied());
    let mut best: Option<(String, u64)> = None;
    for word in words.iter() {
        if word.len() > letters.len() {
            continue;
        }
        let needed = letter_counts(word.chars());
        if needed.iter().zip(available.iter()).any(|(n, a)| n > a) {
            continue;
        }
        let upper = word.to_ascii_uppercase();
        let value = payout(word_cost(&upper) as u64, upper.len(), rule);
        let better = match &best {
            None => true,
            Some((w, v)) => value > *v || (value == *v && upper < *w),
        };
        if better {
            best = Some((upper, value));
        }
    }
    best
}

/// Place `word` tile by tile from the inventory, sell it, and resolve it
/// against the word list.
fn sell(session: &mut GameSession, words: &WordList, word: &str) -> Option<u64> {
    for letter in word.chars() {
        let index = session.inventory().iter().position(|t| t.letter == letter)?;
        session.place_tile(index).ok()?;
    }
    let pending = session.begin_submission().ok()?;
    let valid = words.contains(&pending.word);
    match session.resolve_submission(pending.ticket, valid).ok()? {
        SubmissionOutcome::Accepted { payout, .. } => Some(payout),
        SubmissionOutcome::Rejected { .. } => None,
    }
}

/// One bot session: each turn it rolls, buys only when the roll improves
/// its best sellable word by more than the price, then sells that word.
pub fn play_one_game(rules: &RuleSet, words: &WordList, seed: u64, turns: usize) -> GameOutcome {
    let t0 = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = GameSession::new(rules.clone());
    let mut spent = 0u64;
    let mut earned = 0u64;
    let mut words_sold = Vec::new();

    if session.start("bot", &format!("seed{}", seed)).is_err() {
        return GameOutcome {
            seed,
            final_coins: session.coins(),
            spent,
            earned,
            words_sold,
            events: 0,
            duration_ms: 0.0,
        };
    }

    for _ in 0..turns {
        let rolled: Vec<char> = session.roll_letters(&mut rng).iter().map(|t| t.letter).collect();
        if rolled.is_empty() {
            break;
        }
        let held: Vec<char> = session.inventory().iter().map(|t| t.letter).collect();
        let mut combined = held.clone();
        combined.extend(&rolled);

        let value_now = best_word(words, &held, &rules.scoring).map_or(0, |(_, v)| v);
        let value_after = best_word(words, &combined, &rules.scoring).map_or(0, |(_, v)| v);
        let price = session.roll_price();

        if value_after > value_now + price && price <= session.coins() {
            if let Ok(cost) = session.buy_roll() {
                spent += cost;
            }
        } else {
            session.discard_roll();
        }

        let held: Vec<char> = session.inventory().iter().map(|t| t.letter).collect();
        if let Some((word, _)) = best_word(words, &held, &rules.scoring) {
            if let Some(payout) = sell(&mut session, words, &word) {
                earned += payout;
                words_sold.push(word);
            }
        }
    }

    GameOutcome {
        seed,
        final_coins: session.coins(),
        spent,
        earned,
        words_sold,
        events: session.events().len(),
        duration_ms: t0.elapsed().as_secs_f64() * 1000.0,
    }
}

/// Run `params.games` independent sessions in parallel, one seed each.
pub fn run_simulation(rules: &RuleSet, words: &WordList, params: &SimulationParams) -> SimulationResult {
    let outcomes: Vec<GameOutcome> = (0..params.games)
        .into_par_iter()
        .map(|i| play_one_game(rules, words, params.base_seed + i as u64, params.turns))
        .collect();
    tracing::info!(games = outcomes.len(), turns = params.turns, "simulation finished");
    SimulationResult {
        initial_coins: rules.initial_coins,
        outcomes,
    }
}
