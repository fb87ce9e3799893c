use argh::FromArgs;
use ceremony_rpc_api::{CeremonyApiClient, FinalizeCircuitRequest};
use colored::Colorize;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{DisplayableError, DisplayedError};

/// Coordinator-only. Runs the beacon contribution for one circuit of a closed ceremony.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "finalize-circuit")]
pub struct FinalizeCircuitArgs {
    /// ceremony id
    #[argh(positional)]
    ceremony_id: String,

    /// circuit id
    #[argh(positional)]
    circuit_id: String,

    /// hex-encoded public beacon value
    #[argh(positional)]
    beacon: String,
}

pub async fn run(args: FinalizeCircuitArgs, client: &HttpClient, token: &str) -> Result<(), DisplayedError> {
    hex::decode(&args.beacon).user_error("beacon must be hex-encoded")?;
    let request = FinalizeCircuitRequest { circuit_id: args.circuit_id, beacon: args.beacon };
    client
        .finalize_circuit(token.to_string(), args.ceremony_id.into(), request)
        .await
        .internal_error("finalizeCircuit call failed")?;
    println!("{}", "circuit finalized".green());
    Ok(())
}
