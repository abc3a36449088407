//! Core engine data types: tiles, log events and wire payloads.

use serde::{Deserialize, Serialize};

pub type TileId = u32;

/// Name recorded in the `game` column of every log event.
pub const GAME_NAME: &str = "BuyWord";

/// A single letter tile.
///
/// Tiles are not `Clone`: a tile lives in exactly one of the
/// roll, the inventory or the word builder, and moving it between them moves
/// the value.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LetterTile {
    pub id: TileId,
    pub letter: char,
    pub cost: u32,
    pub is_wild: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    GameStart,
    Roll,
    Buy,
    Discard,
    WildUsed,
    AddTile,
    RemoveTile,
    SubmitWord,
    InvalidWord,
    Export,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::GameStart => "GAME_START",
            ActionKind::Roll => "ROLL",
            ActionKind::Buy => "BUY",
            ActionKind::Discard => "DISCARD",
            ActionKind::WildUsed => "WILD_USED",
            ActionKind::AddTile => "ADD_TILE",
            ActionKind::RemoveTile => "REMOVE_TILE",
            ActionKind::SubmitWord => "SUBMIT_WORD",
            ActionKind::InvalidWord => "INVALID_WORD",
            ActionKind::Export => "EXPORT",
        }
    }
}

/// One entry of the session audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEvent {
    pub player_id: String,
    #[serde(default = "default_game")]
    pub game: String,
    pub action: ActionKind,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    /// Coin balance after the action was applied.
    pub coins: u64,
    /// Potential payout of the word builder at the time of the action.
    pub score: u64,
    pub timestamp_ms: u64,
}

fn default_game() -> String {
    GAME_NAME.to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
