use argh::FromArgs;
use ceremony_rpc_api::{CeremonyApiClient, SetupCeremonyRequest};
use colored::Colorize;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{DisplayableError, DisplayedError};

/// Coordinator-only. Creates a ceremony and its circuits from a JSON setup file.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "setup")]
pub struct SetupArgs {
    /// path to a JSON-encoded `SetupCeremonyRequest`
    #[argh(positional)]
    config_path: String,
}

pub async fn run(args: SetupArgs, client: &HttpClient, token: &str) -> Result<(), DisplayedError> {
    let raw = std::fs::read_to_string(&args.config_path).user_error("could not read ceremony setup file")?;
    let request: SetupCeremonyRequest = serde_json::from_str(&raw).user_error("ceremony setup file is not valid JSON")?;

    let response = client.setup_ceremony(token.to_string(), request).await.internal_error("setupCeremony call failed")?;
    println!("{} {}", "ceremony created:".green(), response.ceremony_id);
    Ok(())
}
