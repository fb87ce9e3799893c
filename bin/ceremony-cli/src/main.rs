pub mod args;
pub mod cmd;
pub mod errors;
pub mod presigned;
pub mod rpc_client;

use args::{Commands, TopLevel};
use colored::Colorize;
use errors::{DisplayableError, DisplayedError};

#[tokio::main]
async fn main() {
    let top: TopLevel = argh::from_env();
    if let Err(e) = run(top).await {
        eprintln!("{}", e.to_string().red());
        std::process::exit(1);
    }
}

async fn run(top: TopLevel) -> Result<(), DisplayedError> {
    let client = rpc_client::connect(&top.rpc_url).internal_error("failed to build coordinator rpc client")?;
    let token = top.token;
    let artifact_dir = top.artifact_dir;

    match top.cmd {
        Commands::Setup(args) => cmd::setup::run(args, &client, &token).await,
        Commands::CreateBucket(args) => cmd::create_bucket::run(args, &client, &token).await,
        Commands::Join(args) => cmd::join::run(args, &client, &token).await,
        Commands::Progress(args) => cmd::progress::run(args, &client, &token).await,
        Commands::Resume(args) => cmd::resume::run(args, &client, &token).await,
        Commands::Contribute(args) => cmd::contribute::run(args, &client, &token, &artifact_dir).await,
        Commands::FinalizeCircuit(args) => cmd::finalize_circuit::run(args, &client, &token).await,
        Commands::FinalizeCeremony(args) => cmd::finalize_ceremony::run(args, &client, &token).await,
    }
}
