use argh::FromArgs;
use ceremony_rpc_api::CeremonyApiClient;
use colored::Colorize;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{DisplayableError, DisplayedError};

/// Joins (or re-joins, after a cleared timeout) the ceremony's queue.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "join")]
pub struct JoinArgs {
    /// ceremony id
    #[argh(positional)]
    ceremony_id: String,
}

pub async fn run(args: JoinArgs, client: &HttpClient, token: &str) -> Result<(), DisplayedError> {
    let response = client
        .check_participant_for_ceremony(token.to_string(), args.ceremony_id.into())
        .await
        .internal_error("checkParticipantForCeremony call failed")?;

    if response.eligible {
        println!("{}", "admitted to the queue".green());
    } else {
        println!("{}", "not eligible to join right now (already contributing, timed out, or finished)".yellow());
    }
    Ok(())
}
