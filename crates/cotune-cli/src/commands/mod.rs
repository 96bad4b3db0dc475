//! CLI command definitions and dispatch.

pub mod host;
pub mod listen;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use cotune_core::config::AppConfig;
use cotune_core::types::Identity;
use cotune_player::{ClientCommand, ClientOptions, ClockEngine, CotuneClient, Notice};

use crate::output;

/// Cotune: listen along with friends
#[derive(Debug, Parser)]
#[command(name = "cotune-client", version, about, long_about = None)]
pub struct Cli {
    /// Server base URL
    #[arg(short, long, env = "COTUNE_SERVER_URL", default_value = "ws://127.0.0.1:8080")]
    pub server: String,

    /// Identity to connect as
    #[arg(short, long, env = "COTUNE_USER_ID")]
    pub user: String,

    /// Directory holding `default.toml` (sync tuning is read from it)
    #[arg(long, env = "COTUNE_CONFIG_DIR", default_value = "config")]
    pub config_dir: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Play a queue and let others listen along
    Host(host::HostArgs),
    /// Mirror another user's playback
    Listen(listen::ListenArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> anyhow::Result<()> {
        let options = self.client_options()?;
        match &self.command {
            Commands::Host(args) => host::execute(args, options).await,
            Commands::Listen(args) => listen::execute(args, options).await,
        }
    }

    fn client_options(&self) -> anyhow::Result<ClientOptions> {
        let env = std::env::var("COTUNE_ENV").unwrap_or_else(|_| "development".to_string());
        let config = AppConfig::load(&self.config_dir, &env).context("Failed to load config")?;

        let mut options = ClientOptions::new(&self.server, Identity::new(self.user.as_str()));
        options.sync = config.sync;
        Ok(options)
    }
}

/// Runs a client until Ctrl+C, the server closing, or `stop_on` matching a
/// notice. `first` is sent as soon as the client is running.
pub async fn run_client(
    options: ClientOptions,
    first: ClientCommand,
    stop_on: fn(&Notice) -> bool,
) -> anyhow::Result<()> {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (notice_tx, mut notice_rx) = mpsc::channel(64);

    let client = CotuneClient::new(options, ClockEngine::new(), notice_tx);
    let mut task = tokio::spawn(client.run(command_rx));
    command_tx.send(first).await.context("Client stopped before start")?;

    loop {
        tokio::select! {
            finished = &mut task => {
                finished.context("Client task panicked")??;
                return Ok(());
            }
            Some(notice) = notice_rx.recv() => {
                output::print_notice(&notice);
                if stop_on(&notice) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = command_tx.send(ClientCommand::Quit).await;
    task.await.context("Client task panicked")??;
    Ok(())
}
