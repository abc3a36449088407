//! Self-play simulator CLI: compare rule presets with a greedy bot.
//!
//! Usage:
//!   cargo run --release --bin buyword-simulate -- --word-list words.txt --games 500
//!   cargo run --release --bin buyword-simulate -- --word-list words.txt --preset dice --turns 50

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use buyword_engine::dictionary::WordList;
use buyword_engine::engine::rules::{load_default_rules, load_rules};
use buyword_engine::engine::simulation::{run_simulation, SimulationParams};

#[derive(Parser)]
#[command(name = "buyword-simulate", about = "Run BuyWord self-play simulations")]
struct Cli {
    /// Word list the bot spells from and validates against
    #[arg(long, env = "BUYWORD_WORD_LIST")]
    word_list: PathBuf,

    /// Path to buyword_rules.toml (default: auto-discover)
    #[arg(long, env = "BUYWORD_RULES")]
    rules: Option<PathBuf>,

    /// Rule presets to compare (default: the file's default preset)
    #[arg(long)]
    preset: Vec<String>,

    /// Number of games per preset
    #[arg(long, default_value = "100")]
    games: usize,

    /// Turns (rolls) per game
    #[arg(long, default_value = "30")]
    turns: usize,

    /// Base random seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let rules_file = match &cli.rules {
        Some(path) => load_rules(path).map_err(|e| format!("Failed to load rules: {}", e))?,
        None => load_default_rules(),
    };
    let words = WordList::load(&cli.word_list)?;
    if words.is_empty() {
        return Err(format!("{} contains no usable words", cli.word_list.display()).into());
    }

    let presets: Vec<Option<&str>> = if cli.preset.is_empty() {
        vec![None]
    } else {
        cli.preset.iter().map(|p| Some(p.as_str())).collect()
    };

    let params = SimulationParams {
        games: cli.games,
        turns: cli.turns,
        base_seed: cli.seed,
    };

    for preset in presets {
        let rules = rules_file.resolve(preset)?;
        eprintln!(
            "Preset {}: {} games x {} turns, seed={}",
            preset.unwrap_or("(default)"),
            params.games,
            params.turns,
            params.base_seed
        );
        let result = run_simulation(&rules, &words, &params);
        println!("{}\n", result.summary());
    }

    Ok(())
}
