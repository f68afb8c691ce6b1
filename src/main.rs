mod auth;
mod config;
mod connection;
mod controller;
mod error;
mod logging;
mod model;
mod view;

use std::io::Write;
use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use auth::AuthGate;
use config::ClientConfig;
use connection::{ConnectionManager, WsConnector};
use controller::{AppController, PromptObserver};
use model::{
    FileStore, JukeboxClient, KeyValueStore, LocalPreferenceStore, MediaResolver, MemoryStore,
    StateStore,
};

type Prompt = Lines<BufReader<Stdin>>;

/// `JUKEBOX_STORAGE_PATH` value that keeps token and volume in memory only
const IN_MEMORY_STORAGE: &str = ":memory:";

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== Jukebox-RS Client Starting ===");

    let config = ClientConfig::from_env().context("invalid configuration")?;
    tracing::debug!(server = %config.server_url, push = %config.ws_url, "Configuration loaded");

    let storage: Arc<dyn KeyValueStore> = if config.storage_path.as_os_str() == IN_MEMORY_STORAGE {
        tracing::info!("Using in-memory storage, nothing will be saved");
        Arc::new(MemoryStore::new())
    } else {
        match FileStore::open(&config.storage_path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!(
                    path = %config.storage_path.display(),
                    error = %e,
                    "Cannot open local storage, settings will not be saved"
                );
                println!("! cannot open {}: {}", config.storage_path.display(), e);
                Arc::new(MemoryStore::new())
            }
        }
    };

    let api = Arc::new(JukeboxClient::new(&config.api_url, config.http_timeout)?);
    let store = Arc::new(
        StateStore::new(
            api.clone(),
            MediaResolver::new(config.media_base(), &config.media_extension),
        )
        .with_retry(config.command_retry)
        .with_observer(Arc::new(PromptObserver)),
    );
    let connection = ConnectionManager::new(
        WsConnector,
        config.ws_url.as_str(),
        config.reconnect.clone(),
        store.clone(),
    );
    let auth = AuthGate::new(api, storage.clone(), connection.clone(), store.clone());

    let mut prompt = BufReader::new(tokio::io::stdin()).lines();

    if !login(&auth, &config, &mut prompt).await? {
        tracing::info!("No valid token, exiting");
        return Ok(());
    }
    if let Some(validated_at) = auth.session().validated_at {
        tracing::info!(%validated_at, "Session authenticated");
    }

    let controller = AppController::new(store, connection, LocalPreferenceStore::load(storage));
    let printer = controller::spawn_state_printer(&controller);

    println!("connected to {}. type `help` for commands.", config.server_url);
    let res = run_prompt(&controller, &mut prompt).await;

    printer.abort();
    if let Err(err) = &res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("Jukebox-RS Client shutting down");
    res
}

/// Try the configured or saved token first, then ask for one until the
/// server accepts it or input ends.
async fn login<A, C>(
    auth: &AuthGate<A, C>,
    config: &ClientConfig,
    prompt: &mut Prompt,
) -> Result<bool>
where
    A: model::PlayerApi,
    C: connection::Connector,
{
    let candidate = config.token.clone().or_else(|| auth.persisted_token());
    if let Some(token) = candidate {
        if auth.validate_token_and_connect(&token).await {
            return Ok(true);
        }
        tracing::warn!("Stored token rejected, asking for a new one");
        auth.clear_persisted_token();
        println!("saved token was rejected.");
    }

    loop {
        print!("token: ");
        std::io::stdout().flush()?;
        let Some(line) = prompt.next_line().await? else {
            return Ok(false);
        };
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        if auth.validate_token_and_connect(token).await {
            return Ok(true);
        }
        println!("token rejected, try again.");
    }
}

async fn run_prompt<A, C>(controller: &AppController<A, C>, prompt: &mut Prompt) -> Result<()>
where
    A: model::PlayerApi,
    C: connection::Connector,
{
    while let Some(line) = prompt.next_line().await? {
        match controller::parse_line(&line) {
            Ok(Some(action)) => {
                if let ControlFlow::Break(()) = controller.handle_action(action).await {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => println!("! {}", e),
        }
    }

    // stdin closed
    let _ = controller.handle_action(controller::Action::Quit).await;
    Ok(())
}
