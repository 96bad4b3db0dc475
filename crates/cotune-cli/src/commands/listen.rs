//! `listen`: mirror a host until they leave.

use clap::Args;

use cotune_core::types::Identity;
use cotune_player::{ClientCommand, ClientOptions, Notice};

use crate::output;

#[derive(Debug, Args)]
pub struct ListenArgs {
    /// Identity of the user to listen along with
    pub host: String,
}

pub async fn execute(args: &ListenArgs, options: ClientOptions) -> anyhow::Result<()> {
    let host = Identity::new(args.host.as_str());
    output::print_success(&format!("Listening along with {host}"));

    super::run_client(options, ClientCommand::ListenAlong(host), |notice| {
        matches!(
            notice,
            Notice::HostDisconnected(_) | Notice::ListenAlongRejected { .. }
        )
    })
    .await
}
