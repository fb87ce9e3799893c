use argh::FromArgs;
use ceremony_rpc_api::CeremonyApiClient;
use colored::Colorize;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{DisplayableError, DisplayedError};

/// Advances the caller's contribution step, or moves on to the next circuit.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "progress")]
pub struct ProgressArgs {
    /// ceremony id
    #[argh(positional)]
    ceremony_id: String,
}

pub async fn run(args: ProgressArgs, client: &HttpClient, token: &str) -> Result<(), DisplayedError> {
    client
        .progress_to_next_contribution_step(token.to_string(), args.ceremony_id.into())
        .await
        .internal_error("progressToNextContributionStep call failed")?;
    println!("{}", "advanced".green());
    Ok(())
}
