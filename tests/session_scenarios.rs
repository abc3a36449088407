//! End-to-end play scenarios against in-process fake services.
//!
//! Run with:
//!     cargo test --test session_scenarios

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;

use buyword_engine::dictionary::{Dictionary, DictionaryApi, WordList};
use buyword_engine::engine::command::{dispatch, Command, Effect};
use buyword_engine::engine::models::{ActionKind, ExportFormat};
use buyword_engine::engine::rules::{classic, load_rules};
use buyword_engine::engine::session::{GameError, GameSession};
use buyword_engine::export::backend::{DropboxUpload, RelayUpload};
use buyword_engine::export::link::ExportLink;
use buyword_engine::server::{router, AppState};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn entries(Path(word): Path<String>) -> Result<Json<serde_json::Value>, StatusCode> {
    match word.as_str() {
        "cat" | "act" => Ok(Json(serde_json::json!([{ "word": word }]))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn fake_dictionary() -> DictionaryApi {
    let base = serve(Router::new().route("/entries/en/:word", get(entries))).await;
    DictionaryApi::new(format!("{}/entries/en", base), Duration::from_secs(5))
}

#[derive(Default)]
struct Received {
    count: AtomicUsize,
    last: Mutex<Option<(HeaderMap, Vec<u8>)>>,
}

async fn record(State(rx): State<Arc<Received>>, headers: HeaderMap, body: Bytes) -> StatusCode {
    rx.count.fetch_add(1, Ordering::SeqCst);
    *rx.last.lock().unwrap() = Some((headers, body.to_vec()));
    StatusCode::OK
}

async fn fake_storage() -> (String, Arc<Received>) {
    let rx = Arc::new(Received::default());
    let base = serve(
        Router::new()
            .route("/upload", post(record))
            .with_state(rx.clone()),
    )
    .await;
    (format!("{}/upload", base), rx)
}

/// Dispatch `command` and resolve any dictionary effects with `dictionary`.
async fn play(
    session: &mut GameSession,
    rng: &mut StdRng,
    dictionary: &dyn Dictionary,
    command: Command,
) -> Result<Vec<Effect>, GameError> {
    let effects = dispatch(session, command, rng)?;
    let mut out = Vec::new();
    for effect in effects {
        match effect {
            Effect::ValidateWord { ticket, word } => {
                let valid = dictionary.validate(&word).await;
                out.extend(dispatch(session, Command::WordChecked { ticket, valid }, rng)?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn start(name: &str, class: &str) -> Command {
    Command::Start {
        name: name.into(),
        class: class.into(),
    }
}

#[tokio::test]
async fn test_cat_is_sold() {
    let dictionary = fake_dictionary().await;
    let mut rng = StdRng::seed_from_u64(1);
    let mut session = GameSession::new(classic());

    play(&mut session, &mut rng, &dictionary, start("Ada", "CS")).await.unwrap();
    assert_eq!(session.player_id(), "Ada-CS");

    session.offer_roll(&['C', 'A', 'T']);
    play(&mut session, &mut rng, &dictionary, Command::Buy).await.unwrap();
    assert_eq!(session.coins(), 195);

    for _ in 0..3 {
        play(&mut session, &mut rng, &dictionary, Command::Place(0)).await.unwrap();
    }
    assert_eq!(session.current_word(), "CAT");
    assert_eq!(session.potential_score(), 25);

    let effects = play(&mut session, &mut rng, &dictionary, Command::SellWord).await.unwrap();
    assert_eq!(effects, vec![Effect::Notify("CAT sold for 25 coins".into())]);
    assert_eq!(session.coins(), 220);
    assert!(session.builder().is_empty());

    let sold: Vec<_> = session
        .events()
        .iter()
        .filter(|e| e.action == ActionKind::SubmitWord)
        .collect();
    assert_eq!(sold.len(), 1);
    assert_eq!(sold[0].details["word"], "CAT");
    assert_eq!(sold[0].details["payout"], 25);
}

#[tokio::test]
async fn test_unknown_word_keeps_tiles() {
    let dictionary = fake_dictionary().await;
    let mut rng = StdRng::seed_from_u64(2);
    let mut session = GameSession::new(classic());
    play(&mut session, &mut rng, &dictionary, start("Ada", "CS")).await.unwrap();

    for _ in 0..4 {
        play(&mut session, &mut rng, &dictionary, Command::UseWild('z')).await.unwrap();
    }
    for _ in 0..4 {
        play(&mut session, &mut rng, &dictionary, Command::Place(0)).await.unwrap();
    }
    let coins = session.coins();

    let effects = play(&mut session, &mut rng, &dictionary, Command::SellWord).await.unwrap();
    assert_eq!(effects, vec![Effect::Notify("ZZZZ is not a valid word".into())]);
    assert_eq!(session.coins(), coins);
    assert_eq!(session.current_word(), "ZZZZ");
    assert_eq!(
        session.events().last().map(|e| e.action),
        Some(ActionKind::InvalidWord)
    );

    // Tiles stay usable after the rejection.
    play(&mut session, &mut rng, &dictionary, Command::Return(3)).await.unwrap();
    assert_eq!(session.current_word(), "ZZZ");
    assert_eq!(session.inventory().len(), 1);
}

#[tokio::test]
async fn test_inventory_round_trip_restores_letters() {
    let words = WordList::parse("cat");
    let mut rng = StdRng::seed_from_u64(3);
    let mut session = GameSession::new(classic());
    play(&mut session, &mut rng, &words, start("Ada", "CS")).await.unwrap();
    session.offer_roll(&['Q', 'U', 'I', 'Z']);
    play(&mut session, &mut rng, &words, Command::Buy).await.unwrap();

    let mut before: Vec<char> = session.inventory().iter().map(|t| t.letter).collect();
    play(&mut session, &mut rng, &words, Command::Place(2)).await.unwrap();
    play(&mut session, &mut rng, &words, Command::Place(0)).await.unwrap();
    play(&mut session, &mut rng, &words, Command::Return(1)).await.unwrap();
    play(&mut session, &mut rng, &words, Command::Return(0)).await.unwrap();

    let mut after: Vec<char> = session.inventory().iter().map(|t| t.letter).collect();
    before.sort_unstable();
    after.sort_unstable();
    assert_eq!(before, after);
    assert!(session.builder().is_empty());
}

#[tokio::test]
async fn test_export_without_game_makes_no_request() {
    let (url, rx) = fake_storage().await;
    let mut link = ExportLink::new(Box::new(RelayUpload::new(url)), ExportFormat::Csv);
    let mut rng = StdRng::seed_from_u64(4);
    let mut session = GameSession::new(classic());

    let result = dispatch(
        &mut session,
        Command::Export {
            format: link.format(),
        },
        &mut rng,
    );
    assert_eq!(result, Err(GameError::NoData));
    assert!(link.export(session.events(), session.player_id(), 0).await.is_err());
    assert_eq!(rx.count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_export_through_server_relay() {
    // Player -> relay endpoint on the game server -> fake Dropbox.
    let (dropbox_url, dropbox) = fake_storage().await;
    let state = Arc::new(AppState {
        dictionary: Box::new(WordList::default()),
        uploader: Box::new(DropboxUpload::with_endpoint(dropbox_url, "BuyWord")),
        upload_token: Some("server-token".into()),
    });
    let server = serve(router(state)).await;

    let mut link = ExportLink::new(
        Box::new(RelayUpload::new(format!("{}/api/upload", server))),
        ExportFormat::Csv,
    );
    let words = WordList::parse("cat");
    let mut rng = StdRng::seed_from_u64(5);
    let mut session = GameSession::new(classic());
    play(&mut session, &mut rng, &words, start("Ada", "CS")).await.unwrap();
    play(&mut session, &mut rng, &words, Command::Roll).await.unwrap();

    let effects = dispatch(
        &mut session,
        Command::Export {
            format: link.format(),
        },
        &mut rng,
    )
    .unwrap();
    let (file, events) = match effects.into_iter().next() {
        Some(Effect::Upload { file, events }) => (file, events),
        other => panic!("expected upload effect, got {:?}", other),
    };
    assert_eq!(events, 2);

    link.upload(&file).await.unwrap();
    dispatch(
        &mut session,
        Command::ExportFinished {
            file_name: file.name.clone(),
            events,
            ok: true,
        },
        &mut rng,
    )
    .unwrap();
    assert_eq!(session.events().last().unwrap().action, ActionKind::Export);

    assert_eq!(dropbox.count.load(Ordering::SeqCst), 1);
    let last = dropbox.last.lock().unwrap();
    let (headers, body) = last.as_ref().unwrap();
    assert_eq!(headers["authorization"], "Bearer server-token");
    let arg: serde_json::Value =
        serde_json::from_str(headers["dropbox-api-arg"].to_str().unwrap()).unwrap();
    assert_eq!(arg["path"], format!("/BuyWord/{}", file.name));
    assert_eq!(arg["mode"], "overwrite");
    let csv = String::from_utf8(body.clone()).unwrap();
    assert!(csv.starts_with("PlayerID,Game,Action,Coins,Score,Timestamp"));
    assert!(csv.contains("\"GAME_START\""));
    assert!(csv.contains("\"ROLL\""));
}

#[test]
fn test_shipped_rules_file() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("buyword_rules.toml");
    let rules = load_rules(&path).unwrap();
    assert_eq!(rules.default.as_deref(), Some("classic"));
    for name in rules.preset_names() {
        rules
            .resolve(Some(&name))
            .unwrap_or_else(|e| panic!("preset {} invalid: {}", name, e));
    }
    let short = rules.resolve(Some("short_game")).unwrap();
    assert_eq!(short.initial_coins, 60);
    assert_eq!(short.wild_tiles, 0);
}
