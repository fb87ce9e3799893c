use argh::FromArgs;
use ceremony_rpc_api::CeremonyApiClient;
use colored::Colorize;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{DisplayableError, DisplayedError};

/// Coordinator-only. Provisions the ceremony's backing bucket.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "create-bucket")]
pub struct CreateBucketArgs {
    /// ceremony id returned by `setup`
    #[argh(positional)]
    ceremony_id: String,
}

pub async fn run(args: CreateBucketArgs, client: &HttpClient, token: &str) -> Result<(), DisplayedError> {
    let response =
        client.create_bucket(token.to_string(), args.ceremony_id.into()).await.internal_error("createBucket call failed")?;
    println!("{} {}", "bucket provisioned:".green(), response.bucket_name);
    Ok(())
}
