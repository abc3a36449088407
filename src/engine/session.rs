//! Game session state: coins, roll, inventory, word builder and the event log.

use std::collections::BTreeMap;

use rand::Rng;
use thiserror::Error;

use crate::engine::log::SessionLog;
use crate::engine::models::*;
use crate::engine::roll::generate_roll;
use crate::engine::rules::{RollMode, RuleSet};
use crate::engine::scoring;
use crate::engine::tiles::{initial_supply, letter_cost, WILD_COST};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("enter name & class")]
    MissingPlayerInfo,
    #[error("not enough coins: need {cost}, have {coins}")]
    InsufficientFunds { cost: u64, coins: u64 },
    #[error("build a word first")]
    EmptyWord,
    #[error("no wild tiles left")]
    NoWildTiles,
    #[error("'{0}' is not a letter A-Z")]
    InvalidLetter(char),
    #[error("no tile at inventory position {0}")]
    NoSuchTile(usize),
    #[error("no tile at word position {0}")]
    NoSuchSlot(usize),
    #[error("a word is already being checked")]
    SubmissionPending,
    #[error("no word is being checked")]
    NoPendingSubmission,
    #[error("validation result for ticket {0} is stale")]
    StaleValidation(u64),
    #[error("no data to export")]
    NoData,
}

/// A word locked in the builder while the dictionary is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWord {
    pub ticket: u64,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { word: String, payout: u64 },
    Rejected { word: String },
}

pub struct GameSession {
    rules: RuleSet,
    player_id: String,
    coins: u64,
    start_time_ms: Option<u64>,
    log: SessionLog,
    roll: Vec<LetterTile>,
    inventory: Vec<LetterTile>,
    wild_tiles: u32,
    builder: Vec<LetterTile>,
    supply: BTreeMap<char, u32>,
    pending: Option<PendingWord>,
    next_tile_id: TileId,
    next_ticket: u64,
}

impl GameSession {
    /// A session that has not been started yet. Actions work but are not logged.
    pub fn new(rules: RuleSet) -> Self {
        let supply = match &rules.roll {
            RollMode::Dice { groups } => initial_supply(groups),
            RollMode::Uniform { .. } => BTreeMap::new(),
        };
        Self {
            player_id: String::new(),
            coins: rules.initial_coins,
            start_time_ms: None,
            log: SessionLog::new(),
            roll: Vec::new(),
            inventory: Vec::new(),
            wild_tiles: rules.wild_tiles,
            builder: Vec::new(),
            supply,
            pending: None,
            next_tile_id: 0,
            next_ticket: 0,
            rules,
        }
    }

    /// Start a fresh game for `name`/`class`, replacing any previous state.
    pub fn start(&mut self, name: &str, class: &str) -> Result<(), GameError> {
        let (name, class) = (name.trim(), class.trim());
        if name.is_empty() || class.is_empty() {
            return Err(GameError::MissingPlayerInfo);
        }
        // Tickets keep counting so checks issued before the restart stay stale.
        let next_ticket = self.next_ticket;
        *self = GameSession::new(self.rules.clone());
        self.next_ticket = next_ticket;
        self.player_id = format!("{}-{}", name, class);
        self.start_time_ms = Some(now_ms());
        self.log.start();
        self.log(ActionKind::GameStart, serde_json::json!({}));
        Ok(())
    }

    // --- Accessors ---

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn coins(&self) -> u64 {
        self.coins
    }

    pub fn is_started(&self) -> bool {
        self.log.is_started()
    }

    pub fn start_time_ms(&self) -> Option<u64> {
        self.start_time_ms
    }

    /// Whole seconds since the game started.
    pub fn elapsed_secs(&self, now_ms: u64) -> u64 {
        self.start_time_ms
            .map(|t| now_ms.saturating_sub(t) / 1000)
            .unwrap_or(0)
    }

    pub fn events(&self) -> &[LogEvent] {
        self.log.events()
    }

    pub fn roll(&self) -> &[LetterTile] {
        &self.roll
    }

    pub fn inventory(&self) -> &[LetterTile] {
        &self.inventory
    }

    pub fn wild_tiles(&self) -> u32 {
        self.wild_tiles
    }

    pub fn builder(&self) -> &[LetterTile] {
        &self.builder
    }

    pub fn supply(&self) -> &BTreeMap<char, u32> {
        &self.supply
    }

    pub fn pending(&self) -> Option<&PendingWord> {
        self.pending.as_ref()
    }

    // --- Session logger ---

    /// Append an event if the session has started; otherwise a silent no-op.
    pub fn log(&mut self, action: ActionKind, details: serde_json::Value) {
        let details = match details {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        let event = LogEvent {
            player_id: self.player_id.clone(),
            game: GAME_NAME.to_string(),
            action,
            details,
            coins: self.coins,
            score: self.potential_score(),
            timestamp_ms: now_ms(),
        };
        self.log.append(event);
    }

    // --- Tile economy ---

    fn make_tile(&mut self, letter: char, cost: u32, is_wild: bool) -> LetterTile {
        let id = self.next_tile_id;
        self.next_tile_id += 1;
        LetterTile { id, letter, cost, is_wild }
    }

    /// Roll a new batch of letters, replacing (discarding) the current roll.
    pub fn roll_letters<R: Rng>(&mut self, rng: &mut R) -> &[LetterTile] {
        let letters = generate_roll(rng, &self.rules.roll, &self.supply);
        self.offer_roll(&letters)
    }

    /// Offer the given letters as the current roll. Characters outside A-Z
    /// are skipped, and under dice rules so are letters whose supply is
    /// used up (copies earlier in the same roll count against it).
    pub fn offer_roll(&mut self, letters: &[char]) -> &[LetterTile] {
        let dice = matches!(self.rules.roll, RollMode::Dice { .. });
        let mut remaining = self.supply.clone();
        let mut roll = Vec::with_capacity(letters.len());
        for &c in letters {
            let letter = c.to_ascii_uppercase();
            let cost = match letter_cost(letter) {
                Some(cost) => cost,
                None => continue,
            };
            if dice {
                match remaining.get_mut(&letter) {
                    Some(n) if *n > 0 => *n -= 1,
                    _ => continue,
                }
            }
            roll.push(self.make_tile(letter, cost, false));
        }
        self.roll = roll;
        let shown: Vec<String> = self.roll.iter().map(|t| t.letter.to_string()).collect();
        self.log(ActionKind::Roll, serde_json::json!({ "roll": shown }));
        &self.roll
    }

    /// Price of the current roll under the active pricing rule.
    pub fn roll_price(&self) -> u64 {
        self.rules.pricing.price(scoring::cost_sum(&self.roll))
    }

    /// Buy every tile in the current roll. Returns the amount debited.
    /// An empty roll is a no-op costing nothing.
    pub fn buy_roll(&mut self) -> Result<u64, GameError> {
        if self.roll.is_empty() {
            return Ok(0);
        }
        let cost = self.roll_price();
        if self.coins < cost {
            return Err(GameError::InsufficientFunds {
                cost,
                coins: self.coins,
            });
        }
        self.coins -= cost;

        let bought: Vec<String> = self.roll.iter().map(|t| t.letter.to_string()).collect();
        for tile in self.roll.drain(..) {
            if let Some(n) = self.supply.get_mut(&tile.letter) {
                *n = n.saturating_sub(1);
            }
            self.inventory.push(tile);
        }
        self.log(ActionKind::Buy, serde_json::json!({ "cost": cost, "letters": bought }));
        Ok(cost)
    }

    /// Drop the current roll at no cost. Returns how many tiles were discarded.
    pub fn discard_roll(&mut self) -> usize {
        if self.roll.is_empty() {
            return 0;
        }
        let letters: Vec<String> = self.roll.iter().map(|t| t.letter.to_string()).collect();
        self.roll.clear();
        self.log(ActionKind::Discard, serde_json::json!({ "letters": letters }));
        letters.len()
    }

    /// Assign a letter to one wild placeholder, adding it to the inventory.
    pub fn use_wild(&mut self, letter: char) -> Result<TileId, GameError> {
        let letter = letter.to_ascii_uppercase();
        if letter_cost(letter).is_none() {
            return Err(GameError::InvalidLetter(letter));
        }
        if self.wild_tiles == 0 {
            return Err(GameError::NoWildTiles);
        }
        self.wild_tiles -= 1;
        let tile = self.make_tile(letter, WILD_COST, true);
        let id = tile.id;
        self.inventory.push(tile);
        self.log(ActionKind::WildUsed, serde_json::json!({ "letter": letter.to_string() }));
        Ok(id)
    }

    // --- Word builder ---

    /// Move the inventory tile at `index` to the end of the word.
    pub fn place_tile(&mut self, index: usize) -> Result<(), GameError> {
        if self.pending.is_some() {
            return Err(GameError::SubmissionPending);
        }
        if index >= self.inventory.len() {
            return Err(GameError::NoSuchTile(index));
        }
        let tile = self.inventory.remove(index);
        let letter = tile.letter;
        self.builder.push(tile);
        let word = self.current_word();
        self.log(
            ActionKind::AddTile,
            serde_json::json!({ "letter": letter.to_string(), "word": word }),
        );
        Ok(())
    }

    /// Move the word tile at `slot` back to the inventory.
    pub fn return_tile(&mut self, slot: usize) -> Result<(), GameError> {
        if self.pending.is_some() {
            return Err(GameError::SubmissionPending);
        }
        if slot >= self.builder.len() {
            return Err(GameError::NoSuchSlot(slot));
        }
        let tile = self.builder.remove(slot);
        let letter = tile.letter;
        self.inventory.push(tile);
        let word = self.current_word();
        self.log(
            ActionKind::RemoveTile,
            serde_json::json!({ "letter": letter.to_string(), "word": word }),
        );
        Ok(())
    }

    pub fn current_word(&self) -> String {
        self.builder.iter().map(|t| t.letter).collect()
    }

    pub fn potential_score(&self) -> u64 {
        scoring::score(&self.builder, &self.rules.scoring)
    }

    // --- Submission ---

    /// Lock the current word for validation and hand out a ticket for it.
    pub fn begin_submission(&mut self) -> Result<PendingWord, GameError> {
        if self.pending.is_some() {
            return Err(GameError::SubmissionPending);
        }
        if self.builder.is_empty() {
            return Err(GameError::EmptyWord);
        }
        self.next_ticket += 1;
        let pending = PendingWord {
            ticket: self.next_ticket,
            word: self.current_word(),
        };
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    /// Apply a dictionary verdict for `ticket`.
    ///
    /// Valid words credit the potential payout and clear the builder; invalid
    /// ones unlock the builder with its tiles intact.
    pub fn resolve_submission(
        &mut self,
        ticket: u64,
        valid: bool,
    ) -> Result<SubmissionOutcome, GameError> {
        let pending = match &self.pending {
            Some(p) if p.ticket == ticket => p.clone(),
            Some(_) => return Err(GameError::StaleValidation(ticket)),
            None if ticket <= self.next_ticket => return Err(GameError::StaleValidation(ticket)),
            None => return Err(GameError::NoPendingSubmission),
        };
        self.pending = None;

        if !valid {
            self.log(ActionKind::InvalidWord, serde_json::json!({ "word": pending.word }));
            return Ok(SubmissionOutcome::Rejected { word: pending.word });
        }

        let payout = self.potential_score();
        self.coins = self.coins.saturating_add(payout);
        self.builder.clear();
        self.log(
            ActionKind::SubmitWord,
            serde_json::json!({ "word": pending.word, "payout": payout }),
        );
        Ok(SubmissionOutcome::Accepted {
            word: pending.word,
            payout,
        })
    }

    /// Abandon the in-flight check; any late verdict for it becomes stale.
    pub fn cancel_submission(&mut self) -> Result<PendingWord, GameError> {
        self.pending.take().ok_or(GameError::NoPendingSubmission)
    }

    pub fn record_export(&mut self, file_name: &str, events: usize) {
        self.log(
            ActionKind::Export,
            serde_json::json!({ "file": file_name, "events": events }),
        );
    }
}

/// `m:ss` rendering of an elapsed duration.
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::{classic, dice, BuyPricing};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn started() -> GameSession {
        let mut s = GameSession::new(classic());
        s.start("Ada", "CS").unwrap();
        s
    }

    fn letters(tiles: &[LetterTile]) -> Vec<char> {
        let mut v: Vec<char> = tiles.iter().map(|t| t.letter).collect();
        v.sort();
        v
    }

    #[test]
    fn test_start_requires_name_and_class() {
        let mut s = GameSession::new(classic());
        assert_eq!(s.start("Ada", "  "), Err(GameError::MissingPlayerInfo));
        assert_eq!(s.start("", "CS"), Err(GameError::MissingPlayerInfo));
        assert!(!s.is_started());
        assert!(s.events().is_empty());

        s.start("Ada", "CS").unwrap();
        assert_eq!(s.player_id(), "Ada-CS");
        assert_eq!(s.coins(), 200);
        assert_eq!(s.events().len(), 1);
        assert_eq!(s.events()[0].action, ActionKind::GameStart);
    }

    #[test]
    fn test_log_before_start_is_noop() {
        let mut s = GameSession::new(classic());
        s.offer_roll(&['A', 'B']);
        s.log(ActionKind::Roll, serde_json::json!({}));
        assert!(s.events().is_empty());
        assert_eq!(s.roll().len(), 2);
    }

    #[test]
    fn test_buy_debits_and_moves_tiles() {
        let mut s = started();
        s.offer_roll(&['C', 'A', 'T']);
        assert_eq!(s.roll_price(), 5);
        assert_eq!(s.buy_roll(), Ok(5));
        assert_eq!(s.coins(), 195);
        assert!(s.roll().is_empty());
        assert_eq!(letters(s.inventory()), vec!['A', 'C', 'T']);

        let last = s.events().last().unwrap();
        assert_eq!(last.action, ActionKind::Buy);
        assert_eq!(last.details["cost"], serde_json::json!(5));
        assert_eq!(last.coins, 195);
    }

    #[test]
    fn test_buy_insufficient_funds_leaves_state_unchanged() {
        let mut rules = classic();
        rules.initial_coins = 10;
        let mut s = GameSession::new(rules);
        s.start("Ada", "CS").unwrap();
        s.offer_roll(&['Q', 'Z']);
        let events_before = s.events().len();

        assert_eq!(
            s.buy_roll(),
            Err(GameError::InsufficientFunds { cost: 20, coins: 10 })
        );
        assert_eq!(s.coins(), 10);
        assert!(s.inventory().is_empty());
        assert_eq!(s.roll().len(), 2);
        assert_eq!(s.events().len(), events_before);
    }

    #[test]
    fn test_buy_empty_roll_is_noop() {
        let mut s = started();
        assert_eq!(s.buy_roll(), Ok(0));
        assert_eq!(s.coins(), 200);
        assert_eq!(s.events().len(), 1);
    }

    #[test]
    fn test_squared_pricing() {
        let mut rules = classic();
        rules.pricing = BuyPricing::SumSquared;
        let mut s = GameSession::new(rules);
        s.offer_roll(&['C', 'A', 'T']);
        assert_eq!(s.buy_roll(), Ok(25));
        assert_eq!(s.coins(), 175);
    }

    #[test]
    fn test_discard_roll() {
        let mut s = started();
        s.offer_roll(&['X', 'Y']);
        assert_eq!(s.discard_roll(), 2);
        assert!(s.roll().is_empty());
        assert_eq!(s.coins(), 200);
        assert_eq!(s.events().last().unwrap().action, ActionKind::Discard);
        assert_eq!(s.discard_roll(), 0);
    }

    #[test]
    fn test_place_and_return_round_trip() {
        let mut s = started();
        s.offer_roll(&['D', 'O', 'G']);
        s.buy_roll().unwrap();
        let before = letters(s.inventory());

        s.place_tile(2).unwrap();
        s.place_tile(0).unwrap();
        assert_eq!(s.current_word(), "GD");
        assert_eq!(s.inventory().len(), 1);

        s.return_tile(0).unwrap();
        s.return_tile(0).unwrap();
        assert!(s.builder().is_empty());
        assert_eq!(letters(s.inventory()), before);
    }

    #[test]
    fn test_return_preserves_remaining_order() {
        let mut s = started();
        s.offer_roll(&['C', 'A', 'R', 'T']);
        s.buy_roll().unwrap();
        for _ in 0..4 {
            s.place_tile(0).unwrap();
        }
        assert_eq!(s.current_word(), "CART");
        s.return_tile(2).unwrap();
        assert_eq!(s.current_word(), "CAT");
        assert_eq!(s.potential_score(), 25);
    }

    #[test]
    fn test_place_out_of_range() {
        let mut s = started();
        assert_eq!(s.place_tile(0), Err(GameError::NoSuchTile(0)));
        assert_eq!(s.return_tile(3), Err(GameError::NoSuchSlot(3)));
    }

    #[test]
    fn test_wild_tiles() {
        let mut s = started();
        assert_eq!(s.wild_tiles(), 7);
        assert_eq!(s.use_wild('1'), Err(GameError::InvalidLetter('1')));
        s.use_wild('q').unwrap();
        assert_eq!(s.wild_tiles(), 6);
        assert_eq!(s.coins(), 200);

        let tile = &s.inventory()[0];
        assert_eq!(tile.letter, 'Q');
        assert_eq!(tile.cost, WILD_COST);
        assert!(tile.is_wild);

        s.place_tile(0).unwrap();
        assert_eq!(s.potential_score(), 1);
        assert_eq!(s.events().last().unwrap().action, ActionKind::AddTile);
    }

    #[test]
    fn test_wild_tiles_run_out() {
        let mut rules = classic();
        rules.wild_tiles = 1;
        let mut s = GameSession::new(rules);
        s.use_wild('A').unwrap();
        assert_eq!(s.use_wild('B'), Err(GameError::NoWildTiles));
    }

    #[test]
    fn test_submission_accepted() {
        let mut s = started();
        s.offer_roll(&['C', 'A', 'T']);
        s.buy_roll().unwrap();
        for _ in 0..3 {
            s.place_tile(0).unwrap();
        }
        let pending = s.begin_submission().unwrap();
        assert_eq!(pending.word, "CAT");
        assert_eq!(s.place_tile(0), Err(GameError::SubmissionPending));

        let outcome = s.resolve_submission(pending.ticket, true).unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Accepted { word: "CAT".into(), payout: 25 }
        );
        assert_eq!(s.coins(), 220);
        assert!(s.builder().is_empty());
        assert!(s.pending().is_none());
    }

    #[test]
    fn test_submission_rejected_unlocks_tiles() {
        let mut s = started();
        for _ in 0..4 {
            s.use_wild('Z').unwrap();
        }
        for _ in 0..4 {
            s.place_tile(0).unwrap();
        }
        let pending = s.begin_submission().unwrap();
        let outcome = s.resolve_submission(pending.ticket, false).unwrap();
        assert_eq!(outcome, SubmissionOutcome::Rejected { word: "ZZZZ".into() });
        assert_eq!(s.coins(), 200);
        assert_eq!(s.current_word(), "ZZZZ");
        assert!(s.return_tile(0).is_ok());
    }

    #[test]
    fn test_empty_word_submission_not_logged() {
        let mut s = started();
        assert_eq!(s.begin_submission(), Err(GameError::EmptyWord));
        assert_eq!(s.events().len(), 1);
    }

    #[test]
    fn test_cancelled_submission_makes_result_stale() {
        let mut s = started();
        s.use_wild('A').unwrap();
        s.place_tile(0).unwrap();
        let first = s.begin_submission().unwrap();
        s.cancel_submission().unwrap();
        assert_eq!(
            s.resolve_submission(first.ticket, true),
            Err(GameError::StaleValidation(first.ticket))
        );

        let second = s.begin_submission().unwrap();
        assert_eq!(
            s.resolve_submission(first.ticket, true),
            Err(GameError::StaleValidation(first.ticket))
        );
        assert!(s.resolve_submission(second.ticket, true).is_ok());
        assert_eq!(s.coins(), 201);
        assert_eq!(s.cancel_submission(), Err(GameError::NoPendingSubmission));
    }

    #[test]
    fn test_start_resets_previous_game() {
        let mut s = started();
        s.offer_roll(&['A']);
        s.buy_roll().unwrap();
        s.start("Grace", "Math").unwrap();
        assert_eq!(s.player_id(), "Grace-Math");
        assert_eq!(s.coins(), 200);
        assert!(s.inventory().is_empty());
        assert_eq!(s.events().len(), 1);
    }

    #[test]
    fn test_dice_supply_decrements_on_buy() {
        let mut s = GameSession::new(dice());
        let before = s.supply()[&'E'];
        s.offer_roll(&['E', 'E']);
        s.buy_roll().unwrap();
        assert_eq!(s.supply()[&'E'], before - 2);
    }

    #[test]
    fn test_restart_keeps_old_tickets_stale() {
        let mut s = started();
        s.use_wild('Z').unwrap();
        s.place_tile(0).unwrap();
        let old = s.begin_submission().unwrap();

        s.start("Grace", "Math").unwrap();
        s.offer_roll(&['Q', 'Z', 'X']);
        s.buy_roll().unwrap();
        for _ in 0..3 {
            s.place_tile(0).unwrap();
        }
        let coins = s.coins();
        let new = s.begin_submission().unwrap();
        assert_ne!(new.ticket, old.ticket);

        assert_eq!(
            s.resolve_submission(old.ticket, true),
            Err(GameError::StaleValidation(old.ticket))
        );
        assert_eq!(s.coins(), coins);
        assert_eq!(s.current_word(), "QZX");
        assert!(s.pending().is_some());
    }

    #[test]
    fn test_dice_offer_respects_supply() {
        let mut s = GameSession::new(dice());
        let copies = s.supply()[&'A'] as usize;
        let offered = vec!['A'; copies + 2];
        assert_eq!(s.offer_roll(&offered).len(), copies);
        s.buy_roll().unwrap();
        assert_eq!(s.supply()[&'A'], 0);

        assert!(s.offer_roll(&['A', 'E']).iter().all(|t| t.letter == 'E'));
        assert_eq!(s.roll().len(), 1);
    }

    #[test]
    fn test_uniform_offer_ignores_supply() {
        let mut s = started();
        assert!(s.supply().is_empty());
        assert_eq!(s.offer_roll(&['J', 'J', 'J']).len(), 3);
    }

    #[test]
    fn test_random_roll_uses_rules() {
        let mut s = started();
        let mut rng = StdRng::seed_from_u64(5);
        let n = s.roll_letters(&mut rng).len();
        assert!((2..=6).contains(&n));
        assert_eq!(s.events().last().unwrap().action, ActionKind::Roll);
    }

    #[test]
    fn test_elapsed() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(75), "1:15");

        let mut s = GameSession::new(classic());
        assert_eq!(s.elapsed_secs(now_ms()), 0);
        s.start("Ada", "CS").unwrap();
        let t0 = s.start_time_ms().unwrap();
        assert_eq!(s.elapsed_secs(t0 + 61_500), 61);
    }
}
