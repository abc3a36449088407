//! Player commands and the side effects the shell must carry out.
//!
//! The session itself never touches the network. `dispatch` mutates the
//! session and returns effects; the shell performs them and feeds the
//! results back as further commands (`WordChecked`, `ExportFinished`).

use rand::Rng;

use crate::engine::models::ExportFormat;
use crate::engine::session::{GameError, GameSession, SubmissionOutcome};
use crate::export::backend::UploadFile;
use crate::export::format::prepare_upload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { name: String, class: String },
    Roll,
    Buy,
    Discard,
    UseWild(char),
    Place(usize),
    Return(usize),
    SellWord,
    WordChecked { ticket: u64, valid: bool },
    CancelSubmission,
    Export { format: ExportFormat },
    ExportFinished { file_name: String, events: usize, ok: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the dictionary about `word`, then dispatch `WordChecked`.
    ValidateWord { ticket: u64, word: String },
    /// Upload once, then dispatch `ExportFinished`.
    Upload { file: UploadFile, events: usize },
    Notify(String),
}

pub const UPLOAD_FAILED: &str = "Upload failed";

/// Apply one command. On `Err` the session is unchanged.
pub fn dispatch<R: Rng>(
    session: &mut GameSession,
    command: Command,
    rng: &mut R,
) -> Result<Vec<Effect>, GameError> {
    let effects = match command {
        Command::Start { name, class } => {
            session.start(&name, &class)?;
            vec![Effect::Notify(format!(
                "Game started for {}, {} coins",
                session.player_id(),
                session.coins()
            ))]
        }
        Command::Roll => {
            let letters: String = session.roll_letters(rng).iter().map(|t| t.letter).collect();
            if letters.is_empty() {
                vec![Effect::Notify("No letters left to roll".into())]
            } else {
                vec![]
            }
        }
        Command::Buy => {
            let cost = session.buy_roll()?;
            if cost > 0 {
                vec![Effect::Notify(format!("Bought letters for {} coins", cost))]
            } else {
                vec![]
            }
        }
        Command::Discard => {
            session.discard_roll();
            vec![]
        }
        Command::UseWild(letter) => {
            session.use_wild(letter)?;
            vec![]
        }
        Command::Place(index) => {
            session.place_tile(index)?;
            vec![]
        }
        Command::Return(slot) => {
            session.return_tile(slot)?;
            vec![]
        }
        Command::SellWord => {
            let pending = session.begin_submission()?;
            vec![Effect::ValidateWord {
                ticket: pending.ticket,
                word: pending.word,
            }]
        }
        Command::WordChecked { ticket, valid } => {
            match session.resolve_submission(ticket, valid)? {
                SubmissionOutcome::Accepted { word, payout } => vec![Effect::Notify(format!(
                    "{} sold for {} coins",
                    word, payout
                ))],
                SubmissionOutcome::Rejected { word } => {
                    vec![Effect::Notify(format!("{} is not a valid word", word))]
                }
            }
        }
        Command::CancelSubmission => {
            let pending = session.cancel_submission()?;
            vec![Effect::Notify(format!("Stopped checking {}", pending.word))]
        }
        Command::Export { format } => {
            let events = session.events();
            let file = prepare_upload(
                events,
                session.player_id(),
                session.start_time_ms().unwrap_or_default(),
                format,
            )
            .ok_or(GameError::NoData)?;
            vec![Effect::Upload {
                file,
                events: events.len(),
            }]
        }
        Command::ExportFinished { file_name, events, ok } => {
            if ok {
                session.record_export(&file_name, events);
                vec![Effect::Notify(format!("Exported {}", file_name))]
            } else {
                vec![Effect::Notify(UPLOAD_FAILED.into())]
            }
        }
    };
    Ok(effects)
}
