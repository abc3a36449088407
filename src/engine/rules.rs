//! Rule presets: starting coins, roll generation, pricing and payout formula.
//! Loaded from TOML at runtime for the server, the shell and the simulator.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::tiles::{default_letter_groups, LetterGroup};

pub const DEFAULT_PRESET: &str = "classic";

/// Payout formula applied to the tiles in the word builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringRule {
    /// `(sum of costs)^2`
    #[default]
    Squared,
    /// `round(sum * (1 + per_letter * (len - base_length)))`
    LengthBonus {
        #[serde(default = "default_per_letter")]
        per_letter: f64,
        #[serde(default = "default_base_length")]
        base_length: usize,
    },
}

fn default_per_letter() -> f64 {
    0.2
}

fn default_base_length() -> usize {
    3
}

/// How the price of a roll is derived from its letter costs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuyPricing {
    #[default]
    Sum,
    SumSquared,
}

impl BuyPricing {
    pub fn price(&self, cost_sum: u64) -> u64 {
        match self {
            BuyPricing::Sum => cost_sum,
            BuyPricing::SumSquared => cost_sum * cost_sum,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RollMode {
    /// Count drawn from `min_count..=max_count`, letters uniform over A-Z.
    Uniform { min_count: usize, max_count: usize },
    /// Count from one die; each tile's die face selects a letter group.
    Dice {
        #[serde(default = "default_letter_groups")]
        groups: Vec<LetterGroup>,
    },
}

impl Default for RollMode {
    fn default() -> Self {
        RollMode::Uniform {
            min_count: 2,
            max_count: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSet {
    pub description: Option<String>,
    #[serde(default = "default_initial_coins")]
    pub initial_coins: u64,
    #[serde(default)]
    pub scoring: ScoringRule,
    #[serde(default)]
    pub pricing: BuyPricing,
    #[serde(default)]
    pub roll: RollMode,
    /// Unassigned wild placeholders granted at game start.
    #[serde(default = "default_wild_tiles")]
    pub wild_tiles: u32,
}

fn default_initial_coins() -> u64 {
    200
}

fn default_wild_tiles() -> u32 {
    7
}

impl Default for RuleSet {
    fn default() -> Self {
        classic()
    }
}

impl RuleSet {
    pub fn validate(&self) -> Result<(), String> {
        match &self.roll {
            RollMode::Uniform { min_count, max_count } => {
                if *max_count == 0 || min_count > max_count {
                    return Err(format!(
                        "invalid roll count range {}..={}",
                        min_count, max_count
                    ));
                }
            }
            RollMode::Dice { groups } => {
                for face in 1..=6u8 {
                    let n = groups.iter().filter(|g| g.faces.contains(&face)).count();
                    if n != 1 {
                        return Err(format!("die face {} maps to {} letter groups", face, n));
                    }
                }
                if let Some(g) = groups
                    .iter()
                    .find(|g| g.letters.iter().any(|l| !l.is_ascii_alphabetic()))
                {
                    return Err(format!("letter group '{}' contains a non-letter", g.name));
                }
            }
        }
        if let ScoringRule::LengthBonus { per_letter, .. } = self.scoring {
            if !per_letter.is_finite() {
                return Err("length bonus must be finite".into());
            }
        }
        Ok(())
    }
}

pub fn classic() -> RuleSet {
    RuleSet {
        description: Some("Uniform rolls of 2-6 letters, payout (sum of costs)^2".into()),
        initial_coins: 200,
        scoring: ScoringRule::Squared,
        pricing: BuyPricing::Sum,
        roll: RollMode::default(),
        wild_tiles: 7,
    }
}

pub fn length_bonus() -> RuleSet {
    RuleSet {
        description: Some("Linear payout with a 20% bonus per letter beyond three".into()),
        initial_coins: 180,
        scoring: ScoringRule::LengthBonus {
            per_letter: default_per_letter(),
            base_length: default_base_length(),
        },
        ..classic()
    }
}

pub fn dice() -> RuleSet {
    RuleSet {
        description: Some("Die-selected letter tiers with finite supply, squared prices".into()),
        pricing: BuyPricing::SumSquared,
        roll: RollMode::Dice {
            groups: default_letter_groups(),
        },
        ..classic()
    }
}

pub fn builtin_presets() -> HashMap<String, RuleSet> {
    [
        ("classic".to_string(), classic()),
        ("length_bonus".to_string(), length_bonus()),
        ("dice".to_string(), dice()),
    ]
    .into_iter()
    .collect()
}

/// Top-level TOML file structure.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RulesFile {
    #[serde(default)]
    pub presets: HashMap<String, RuleSet>,
    pub default: Option<String>,
}

impl RulesFile {
    /// Resolve a preset by name; file presets shadow the built-in ones.
    /// `None` selects the file's `default`, then `classic`.
    pub fn resolve(&self, name: Option<&str>) -> Result<RuleSet, String> {
        let name = name
            .or(self.default.as_deref())
            .unwrap_or(DEFAULT_PRESET);
        let rules = match self.presets.get(name) {
            Some(r) => r.clone(),
            None => builtin_presets().remove(name).ok_or_else(|| {
                let mut known: Vec<String> = self.preset_names();
                known.sort();
                format!("unknown rule preset '{}' (known: {})", name, known.join(", "))
            })?,
        };
        rules.validate().map_err(|e| format!("preset '{}': {}", name, e))?;
        Ok(rules)
    }

    pub fn preset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = builtin_presets().into_keys().collect();
        for name in self.presets.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Load presets from a TOML file at the given path.
pub fn load_rules(path: &Path) -> Result<RulesFile, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Try to load presets from well-known paths, falling back to the built-ins.
pub fn load_default_rules() -> RulesFile {
    let candidates = [
        "buyword_rules.toml",
        "../buyword_rules.toml",
        "/etc/buyword/buyword_rules.toml",
    ];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_rules(p) {
                Ok(rules) => {
                    tracing::info!(path = %p.display(), count = rules.presets.len(), "loaded rule presets");
                    return rules;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load rule presets");
                }
            }
        }
    }
    tracing::info!("no buyword_rules.toml found, using built-in presets");
    RulesFile::default()
}
