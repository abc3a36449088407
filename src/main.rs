use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use buyword_engine::dictionary::{Dictionary, DictionaryApi, WordList, DICTIONARY_API_BASE};
use buyword_engine::export::backend::DropboxUpload;
use buyword_engine::server::{router, AppState};

#[derive(Parser)]
#[command(name = "buyword-server", about = "BuyWord HTTP server")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "BUYWORD_PORT")]
    port: u16,

    /// Dictionary API base URL
    #[arg(long, default_value = DICTIONARY_API_BASE, env = "BUYWORD_DICTIONARY_URL")]
    dictionary_url: String,

    /// Dictionary request timeout in seconds
    #[arg(long, default_value = "10")]
    dictionary_timeout: u64,

    /// Validate words against a local word list instead of the API
    #[arg(long, env = "BUYWORD_WORD_LIST")]
    word_list: Option<PathBuf>,

    /// Dropbox token used by /api/upload
    #[arg(long, env = "DROPBOX_TOKEN", hide_env_values = true)]
    dropbox_token: Option<String>,

    /// Dropbox folder uploads are written to
    #[arg(long, default_value = "BuyWord", env = "BUYWORD_DROPBOX_FOLDER")]
    dropbox_folder: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let dictionary: Box<dyn Dictionary> = match &cli.word_list {
        Some(path) => Box::new(
            WordList::load(path).map_err(|e| format!("Failed to load word list: {}", e))?,
        ),
        None => Box::new(DictionaryApi::new(
            cli.dictionary_url.clone(),
            Duration::from_secs(cli.dictionary_timeout),
        )),
    };

    if cli.dropbox_token.is_none() {
        tracing::warn!("DROPBOX_TOKEN not set, /api/upload will fail");
    }

    let state = Arc::new(AppState {
        dictionary,
        uploader: Box::new(DropboxUpload::new(cli.dropbox_folder.clone())),
        upload_token: cli.dropbox_token.clone(),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], cli.port).into();
    tracing::info!(%addr, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
