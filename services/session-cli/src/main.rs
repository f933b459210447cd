//! Session CLI
//!
//! Command-line client for the session API:
//! 1. Loads config and the on-disk credential pair
//! 2. Runs one command through the authenticated pipeline
//! 3. Prints the result as JSON on stdout, user notices on stderr
//! 4. On session expiry, tells the user to log in again

mod cli;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use session_auth::{FileStore, UserCreate, UserLogin};
use session_client::{
    ApiRequest, ChannelSink, ClientError, HttpTransport, Notice, SessionClient, UploadFile,
    UploadOptions,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // JSON logs on stderr so stdout stays clean for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        prefix = %config.api.prefix,
        credentials = %config.session.credentials_path.display(),
        "configuration loaded"
    );

    let store = FileStore::load(config.session.credentials_path.clone()).with_context(|| {
        format!(
            "failed to load credentials from {}",
            config.session.credentials_path.display()
        )
    })?;
    let transport = HttpTransport::new(
        &config.api.base_url,
        &config.api.prefix,
        config.request_timeout(),
    )
    .context("failed to build HTTP transport")?;

    let (sink, mut notices) = ChannelSink::channel();
    let client = SessionClient::builder(Arc::new(transport), Arc::new(store))
        .notifier(Arc::new(sink))
        .paths(config.auth_paths())
        .refresh_wait_timeout(config.refresh_wait_timeout())
        .build();

    let outcome = run(&client, cli.command).await;
    print_notices(&mut notices);

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!(error = %format!("{e:#}"), "command failed");
            let expired = e
                .downcast_ref::<ClientError>()
                .is_some_and(ClientError::is_session_expired);
            if expired {
                eprintln!("Run `session-cli login <email> <password>` to start a new session.");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(client: &SessionClient, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let response = client.login(&UserLogin { email, password }).await?;
            print_json(&response.user)
        }
        Command::Register {
            email,
            password,
            display_name,
        } => {
            let response = client
                .register(&UserCreate {
                    email,
                    password,
                    display_name,
                })
                .await?;
            print_json(&response.user)
        }
        Command::Logout => print_json(&client.logout().await?),
        Command::Me => print_json(&client.current_user().await?),
        Command::Refresh => {
            client.refresh().await?;
            println!("session refreshed");
            Ok(())
        }
        Command::Get { path } => {
            let response = client.execute(ApiRequest::get(path)).await?;
            println!("{}", response.text());
            Ok(())
        }
        Command::Documents => print_json(&client.list_documents().await?),
        Command::Document { id } => print_json(&client.document(&id).await?),
        Command::Chunks { id } => print_json(&client.document_chunks(&id).await?),
        Command::Delete { id } => {
            client.delete_document(&id).await?;
            println!("deleted {id}");
            Ok(())
        }
        Command::Health => print_json(&client.documents_health().await?),
        Command::Upload {
            files,
            chunk_size,
            chunk_overlap,
        } => {
            let options = UploadOptions {
                chunk_size,
                chunk_overlap,
            };
            let mut uploads = read_uploads(&files).await?;
            if uploads.len() == 1 {
                let file = uploads.remove(0);
                print_json(&client.upload_document(&file, options).await?)
            } else {
                print_json(&client.upload_documents(&uploads, options).await?)
            }
        }
        Command::Dashboard { role } => print_json(&client.dashboard(role).await?),
    }
}

async fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        uploads.push(UploadFile::new(filename, content));
    }
    Ok(uploads)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to render response")?;
    println!("{json}");
    Ok(())
}

fn print_notices(rx: &mut UnboundedReceiver<Notice>) {
    while let Ok(Notice { message, .. }) = rx.try_recv() {
        eprintln!("{message}");
    }
}
