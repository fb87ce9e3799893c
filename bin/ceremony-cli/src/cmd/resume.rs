use argh::FromArgs;
use ceremony_rpc_api::CeremonyApiClient;
use colored::Colorize;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{DisplayableError, DisplayedError};

/// Moves the caller out of a cleared `TIMEDOUT` state and back into the queue.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "resume")]
pub struct ResumeArgs {
    /// ceremony id
    #[argh(positional)]
    ceremony_id: String,
}

pub async fn run(args: ResumeArgs, client: &HttpClient, token: &str) -> Result<(), DisplayedError> {
    client
        .resume_contribution_after_timeout_expiration(token.to_string(), args.ceremony_id.into())
        .await
        .internal_error("resumeContributionAfterTimeoutExpiration call failed")?;
    println!("{}", "re-enqueued".green());
    Ok(())
}
