use argh::FromArgs;
use ceremony_rpc_api::CeremonyApiClient;
use colored::Colorize;
use dialoguer::Confirm;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{internal_error, DisplayableError, DisplayedError};

/// Coordinator-only. Flips a ceremony to FINALIZED once every circuit has a valid final contribution.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "finalize-ceremony")]
pub struct FinalizeCeremonyArgs {
    /// ceremony id
    #[argh(positional)]
    ceremony_id: String,

    /// skip the confirmation prompt
    #[argh(switch, short = 'y')]
    assume_yes: bool,
}

pub async fn run(args: FinalizeCeremonyArgs, client: &HttpClient, token: &str) -> Result<(), DisplayedError> {
    let confirm = args.assume_yes
        || Confirm::new()
            .with_prompt("Finalize this ceremony? This is irreversible.")
            .interact()
            .map_err(internal_error("failed to read confirmation"))?;

    if !confirm {
        println!("{}", "aborted".yellow());
        return Ok(());
    }

    client.finalize_ceremony(token.to_string(), args.ceremony_id.into()).await.internal_error("finalizeCeremony call failed")?;
    println!("{}", "ceremony finalized".green());
    Ok(())
}
