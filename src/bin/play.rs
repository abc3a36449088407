//! Terminal BuyWord client.
//!
//! Usage:
//!   cargo run --bin buyword-play -- --preset classic
//!   cargo run --bin buyword-play -- --backend dropbox --client-id <app key>
//!   cargo run --bin buyword-play -- --backend relay --relay-url http://localhost:3000/api/upload

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use buyword_engine::dictionary::{Dictionary, DictionaryApi, WordList, DICTIONARY_API_BASE};
use buyword_engine::engine::command::{dispatch, Command, Effect};
use buyword_engine::engine::models::{now_ms, ExportFormat, LetterTile};
use buyword_engine::engine::rules::{load_default_rules, load_rules};
use buyword_engine::engine::session::{format_elapsed, GameError, GameSession};
use buyword_engine::export::backend::{DriveUpload, DropboxUpload, RelayUpload, UploadBackend};
use buyword_engine::export::link::ExportLink;
use buyword_engine::export::oauth::ImplicitGrant;

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Relay,
    Dropbox,
    Drive,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Parser)]
#[command(name = "buyword-play", about = "Play BuyWord in the terminal")]
struct Cli {
    /// Path to buyword_rules.toml (default: auto-discover)
    #[arg(long, env = "BUYWORD_RULES")]
    rules: Option<PathBuf>,

    /// Rule preset name
    #[arg(long)]
    preset: Option<String>,

    /// Random seed (default: from entropy)
    #[arg(long)]
    seed: Option<u64>,

    /// Validate words against a local word list instead of the API
    #[arg(long, env = "BUYWORD_WORD_LIST")]
    word_list: Option<PathBuf>,

    /// Dictionary API base URL
    #[arg(long, default_value = DICTIONARY_API_BASE, env = "BUYWORD_DICTIONARY_URL")]
    dictionary_url: String,

    /// Where exported logs go
    #[arg(long, value_enum, default_value = "relay")]
    backend: Backend,

    /// Export file format
    #[arg(long, value_enum, default_value = "csv")]
    format: Format,

    /// Relay endpoint for the relay backend
    #[arg(long, default_value = "http://localhost:3000/api/upload")]
    relay_url: String,

    /// Long-lived access token (skips the connect step)
    #[arg(long, env = "DROPBOX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// OAuth client id for the connect step
    #[arg(long)]
    client_id: Option<String>,

    /// OAuth redirect URI registered for the client id
    #[arg(long, default_value = "http://localhost:3000/")]
    redirect_uri: String,

    /// Dropbox folder for exports
    #[arg(long, default_value = "BuyWord")]
    dropbox_folder: String,

    /// Google Drive folder id for exports
    #[arg(long)]
    drive_folder: Option<String>,
}

const HELP: &str = "\
commands:
  start <name> <class>   begin a new game
  roll                   roll new letters (replaces the current roll)
  buy | discard          buy or drop the current roll
  wild <letter>          spend a wild tile as <letter>
  place <n> | return <n> move a tile into or out of the word
  sell                   check and sell the current word (ctrl-c cancels the check)
  export                 upload the session log
  connect                print the authorize URL for the export backend
  redirect <url>         finish connecting with the redirect URL
  disconnect             forget the export token
  status | help | quit   (ctrl-c at the prompt also quits)";

fn build_link(cli: &Cli) -> ExportLink {
    let format = match cli.format {
        Format::Csv => ExportFormat::Csv,
        Format::Json => ExportFormat::Json,
    };
    let (backend, grant): (Box<dyn UploadBackend>, Option<ImplicitGrant>) = match cli.backend {
        Backend::Relay => (Box::new(RelayUpload::new(cli.relay_url.clone())), None),
        Backend::Dropbox => (
            Box::new(DropboxUpload::new(cli.dropbox_folder.clone())),
            cli.client_id
                .as_ref()
                .map(|id| ImplicitGrant::dropbox(id.clone(), cli.redirect_uri.clone())),
        ),
        Backend::Drive => (
            Box::new(DriveUpload::new(cli.drive_folder.clone())),
            cli.client_id
                .as_ref()
                .map(|id| ImplicitGrant::google_drive(id.clone(), cli.redirect_uri.clone())),
        ),
    };

    let mut link = ExportLink::new(backend, format);
    if let Some(grant) = grant {
        link = link.with_oauth(grant);
    }
    if let Some(token) = &cli.token {
        link = link.with_static_token(token.clone());
    }
    link
}

fn tiles_line(tiles: &[LetterTile]) -> String {
    tiles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let wild = if t.is_wild { "*" } else { "" };
            format!("{}:{}{}({})", i, t.letter, wild, t.cost)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_status(session: &GameSession) {
    let elapsed = session.elapsed_secs(now_ms());
    println!(
        "{}  coins={}  time={}  wilds={}",
        if session.is_started() { session.player_id() } else { "(not started)" },
        session.coins(),
        format_elapsed(elapsed),
        session.wild_tiles(),
    );
    println!("  roll:      {}  (price {})", tiles_line(session.roll()), session.roll_price());
    println!("  inventory: {}", tiles_line(session.inventory()));
    println!(
        "  word:      {}  -> {} coins",
        session.current_word(),
        session.potential_score()
    );
    if let Some(p) = session.pending() {
        println!("  checking:  {}", p.word);
    }
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let index = |i: usize| -> Result<usize, String> {
        parts
            .get(i)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| format!("usage: {} <number>", parts[0]))
    };
    let command = match parts.first().copied() {
        Some("start") => match (parts.get(1), parts.get(2)) {
            (Some(name), Some(class)) => Command::Start {
                name: name.to_string(),
                class: class.to_string(),
            },
            _ => return Err(GameError::MissingPlayerInfo.to_string()),
        },
        Some("roll") => Command::Roll,
        Some("buy") => Command::Buy,
        Some("discard") => Command::Discard,
        Some("wild") => match parts.get(1).and_then(|s| s.chars().next()) {
            Some(c) => Command::UseWild(c),
            None => return Err("usage: wild <letter>".into()),
        },
        Some("place") => Command::Place(index(1)?),
        Some("return") => Command::Return(index(1)?),
        Some("sell") => Command::SellWord,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

struct Shell {
    session: GameSession,
    rng: StdRng,
    dictionary: Box<dyn Dictionary>,
    link: ExportLink,
}

impl Shell {
    /// Dispatch a command and carry out its effects, feeding results back in.
    async fn run(&mut self, command: Command) {
        let mut queue = vec![command];
        while let Some(command) = queue.pop() {
            let effects = match dispatch(&mut self.session, command, &mut self.rng) {
                Ok(effects) => effects,
                Err(GameError::NoData) => {
                    println!("No data to export");
                    continue;
                }
                Err(e) => {
                    println!("! {}", e);
                    continue;
                }
            };
            for effect in effects {
                match effect {
                    Effect::Notify(msg) => println!("{}", msg),
                    Effect::ValidateWord { ticket, word } => {
                        println!("checking {}...", word);
                        tokio::select! {
                            valid = self.dictionary.validate(&word) => {
                                queue.push(Command::WordChecked { ticket, valid });
                            }
                            _ = tokio::signal::ctrl_c() => {
                                queue.push(Command::CancelSubmission);
                            }
                        }
                    }
                    Effect::Upload { file, events } => {
                        let ok = match self.link.upload(&file).await {
                            Ok(()) => true,
                            Err(e) => {
                                tracing::debug!(error = %e, "export failed");
                                false
                            }
                        };
                        if !ok && !self.link.is_connected() {
                            println!("export link disconnected, run `connect` again");
                        }
                        queue.push(Command::ExportFinished {
                            file_name: file.name,
                            events,
                            ok,
                        });
                    }
                }
            }
        }
    }

    async fn handle(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        match parts.next() {
            None => {}
            Some("quit") | Some("exit") => return false,
            Some("help") => println!("{}", HELP),
            Some("status") => print_status(&self.session),
            Some("export") => {
                let format = self.link.format();
                self.run(Command::Export { format }).await;
            }
            Some("connect") => match self.link.begin_connect(&mut self.rng) {
                Ok(url) => println!("open this URL, then paste the redirect with `redirect <url>`:\n{}", url),
                Err(e) => println!("! {}", e),
            },
            Some("redirect") => match parts.next() {
                Some(url) => match self.link.complete_connect(url) {
                    Ok(()) => println!("connected to {}", self.link.backend_name()),
                    Err(e) => println!("! {}", e),
                },
                None => println!("usage: redirect <url>"),
            },
            Some("disconnect") => {
                self.link.disconnect();
                println!("disconnected");
            }
            Some(_) => match parse_command(line) {
                Ok(Some(command)) => {
                    self.run(command).await;
                    if self.session.is_started() {
                        print_status(&self.session);
                    }
                }
                Ok(None) => println!("unknown command, try `help`"),
                Err(e) => println!("! {}", e),
            },
        }
        true
    }
}

/// Feed input lines to the shell until `quit`, end of input, or `interrupt`
/// fires while waiting at the prompt.
async fn prompt_loop<R, F, Fut>(shell: &mut Shell, input: R, mut interrupt: F) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !shell.handle(line.trim()).await {
                        break;
                    }
                }
                None => break,
            },
            _ = interrupt() => {
                println!();
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let cli = Cli::parse();

    let rules_file = match &cli.rules {
        Some(path) => load_rules(path).map_err(|e| format!("Failed to load rules: {}", e))?,
        None => load_default_rules(),
    };
    let rules = rules_file.resolve(cli.preset.as_deref())?;

    let dictionary: Box<dyn Dictionary> = match &cli.word_list {
        Some(path) => Box::new(WordList::load(path)?),
        None => Box::new(DictionaryApi::new(
            cli.dictionary_url.clone(),
            Duration::from_secs(10),
        )),
    };

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut shell = Shell {
        session: GameSession::new(rules),
        rng,
        dictionary,
        link: build_link(&cli),
    };

    println!("BuyWord  ({} export, `help` for commands)", shell.link.backend_name());
    prompt_loop(&mut shell, BufReader::new(tokio::io::stdin()), tokio::signal::ctrl_c).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use buyword_engine::engine::rules::classic;

    fn shell() -> Shell {
        Shell {
            session: GameSession::new(classic()),
            rng: StdRng::seed_from_u64(1),
            dictionary: Box::new(WordList::parse("cat")),
            link: ExportLink::new(
                Box::new(RelayUpload::new("http://127.0.0.1:9/api/upload")),
                ExportFormat::Csv,
            ),
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("place 2"), Ok(Some(Command::Place(2))));
        assert_eq!(parse_command("wild q"), Ok(Some(Command::UseWild('q'))));
        assert!(parse_command("place x").is_err());
        assert!(parse_command("start Ada").is_err());
        assert_eq!(parse_command("dance"), Ok(None));
    }

    #[tokio::test]
    async fn test_prompt_runs_lines_until_quit() {
        let mut shell = shell();
        let input: &[u8] = b"start Ada CS\nwild c\nquit\nwild a\n";
        prompt_loop(&mut shell, input, std::future::pending::<std::io::Result<()>>)
            .await
            .unwrap();
        assert_eq!(shell.session.player_id(), "Ada-CS");
        assert_eq!(shell.session.inventory().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_at_prompt_quits() {
        let mut shell = shell();
        // Open stream with nothing written: the prompt waits forever.
        let (_writer, reader) = tokio::io::duplex(64);
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            prompt_loop(&mut shell, BufReader::new(reader), || async { Ok(()) }),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
        assert!(!shell.session.is_started());
    }
}
