use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio::{signal, sync::broadcast::error::RecvError};
use tracing::warn;

use board_core::{
    BoardEvent, Dispatcher, DocumentPath, EntrySession, Feedback, FormState, LocalGateway,
    RemoteGateway, SectorInput, StatusGateway,
};
use shared::domain::{sector_registry, sector_slug, OperatorId};
use storage::LocalStore;

mod config;
mod view;

use config::load_settings;

/// Stable operator identity for local-only mode, so drafts survive runs.
const LOCAL_OPERATOR: &str = "local";

#[derive(Parser, Debug)]
#[command(name = "board", about = "Painel de status operacional por setor")]
struct Cli {
    /// Hosted store endpoint; local-only mode when omitted.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Live dashboard in the terminal.
    Watch,
    /// Render the current public board once and exit.
    Show,
    /// Validate and transmit a filled form file.
    Transmit { form: PathBuf },
    /// Save a form file as the operator's private draft.
    Draft { form: PathBuf },
    /// Reset the private draft to a cleared form.
    Clear,
}

#[derive(Debug, Deserialize)]
struct FormFile {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    turno: Option<String>,
    #[serde(default)]
    setores: HashMap<String, FormFileSector>,
}

#[derive(Debug, Deserialize)]
struct FormFileSector {
    #[serde(default)]
    status: String,
    #[serde(default)]
    prioridade: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if cli.server_url.is_some() {
        settings.server_url = cli.server_url;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    let store = LocalStore::new(&settings.database_url)
        .await
        .context("failed to open local store")?;
    let local = Arc::new(LocalGateway::new(store));

    match cli.command {
        Command::Watch => watch(settings.server_url.as_deref(), local).await,
        Command::Show => show(settings.server_url.as_deref(), local).await,
        Command::Transmit { form } => submit(settings.server_url.as_deref(), local, &form, true).await,
        Command::Draft { form } => submit(settings.server_url.as_deref(), local, &form, false).await,
        Command::Clear => clear(settings.server_url.as_deref(), local).await,
    }
}

/// Preferred gateway plus the operator identity it carries. Falls back to
/// the local store (with its stable local identity) when the hosted store
/// cannot be reached.
async fn entry_gateway(
    server_url: Option<&str>,
    local: Arc<LocalGateway>,
) -> (Arc<dyn StatusGateway>, OperatorId) {
    match server_url {
        Some(url) => {
            println!("{}", Feedback::Connecting.message());
            match RemoteGateway::connect(url).await {
                Ok(remote) => {
                    println!("{}", Feedback::Connected.message());
                    let operator = remote.operator().clone();
                    (Arc::new(remote), operator)
                }
                Err(err) => {
                    warn!(error = %err, "hosted store unreachable, using local mode");
                    println!("{}", Feedback::ConnectionError.message());
                    (local, OperatorId(LOCAL_OPERATOR.into()))
                }
            }
        }
        None => (local, OperatorId(LOCAL_OPERATOR.into())),
    }
}

async fn watch(server_url: Option<&str>, local: Arc<LocalGateway>) -> Result<()> {
    let (live, _) = entry_gateway(server_url, Arc::clone(&local)).await;
    let dispatcher = Dispatcher::new(live, local, DocumentPath::Public);
    let mut events = dispatcher.subscribe_events();
    dispatcher.start().await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(BoardEvent::Connectivity(status)) => {
                    println!("{}", view::connectivity_line(&status));
                }
                Ok(BoardEvent::ViewReplaced(model)) => {
                    print!("{}", view::render_text(&model));
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = signal::ctrl_c() => break,
        }
    }

    dispatcher.shutdown().await;
    Ok(())
}

async fn show(server_url: Option<&str>, local: Arc<LocalGateway>) -> Result<()> {
    let (gateway, _) = entry_gateway(server_url, local).await;
    let model = match gateway.read_once(&DocumentPath::Public).await? {
        Some(document) => board_core::render(&document),
        None => board_core::render_absent(),
    };
    print!("{}", view::render_text(&model));
    Ok(())
}

async fn submit(
    server_url: Option<&str>,
    local: Arc<LocalGateway>,
    form_path: &Path,
    transmit: bool,
) -> Result<()> {
    let form = load_form(form_path)?;
    let (gateway, operator) = entry_gateway(server_url, local).await;
    let entry = EntrySession::new(gateway, operator);

    let feedback = if transmit {
        entry.transmit(&form).await
    } else {
        entry.save_draft(&form).await
    };
    println!("{}", feedback.message());
    Ok(())
}

async fn clear(server_url: Option<&str>, local: Arc<LocalGateway>) -> Result<()> {
    let (gateway, operator) = entry_gateway(server_url, local).await;
    let entry = EntrySession::new(gateway, operator);

    let feedback = entry
        .save_draft(&FormState::cleared(Utc::now().date_naive()))
        .await;
    if feedback.is_error() {
        println!("{}", feedback.message());
    } else {
        println!("Formulário limpo e pronto para um novo preenchimento.");
    }
    Ok(())
}

fn load_form(path: &Path) -> Result<FormState> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read form file '{}'", path.display()))?;
    let file: FormFile = toml::from_str(&raw)
        .with_context(|| format!("invalid form file '{}'", path.display()))?;

    let mut form = FormState::cleared(Utc::now().date_naive());
    if let Some(data) = file.data {
        form.reference_date = data;
    }
    if let Some(turno) = file.turno {
        form.shift = turno;
    }
    for (key, sector) in file.setores {
        // Sections may be keyed by sector id or by display name.
        let id = if sector_registry().iter().any(|def| def.id == key) {
            key
        } else {
            sector_slug(&key)
        };
        form.set_sector(
            id,
            SectorInput {
                status: sector.status,
                priority: sector.prioridade.unwrap_or_default(),
            },
        );
    }
    Ok(form)
}
