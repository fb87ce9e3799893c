use argh::FromArgs;

use crate::cmd::{
    ContributeArgs, CreateBucketArgs, FinalizeCeremonyArgs, FinalizeCircuitArgs, JoinArgs, ProgressArgs, ResumeArgs, SetupArgs,
};

pub(super) const RPC_URL: &str = "http://127.0.0.1:7040";

/// Reference client for the ceremony coordination engine
#[derive(Debug, FromArgs)]
pub struct TopLevel {
    /// base URL of the coordination server
    #[argh(option, description = "coordinator RPC URL", default = "RPC_URL.to_string()")]
    pub rpc_url: String,

    /// directory backing the reference Artifact Store, shared with the
    /// coordinator process (local filesystem stand-in for a real object
    /// store network hop)
    #[argh(option, description = "artifact store base directory", default = "String::from(\"./ceremony-data\")")]
    pub artifact_dir: String,

    /// caller's bearer token
    #[argh(option, description = "bearer token")]
    pub token: String,

    #[argh(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
pub enum Commands {
    Setup(SetupArgs),
    CreateBucket(CreateBucketArgs),
    Join(JoinArgs),
    Progress(ProgressArgs),
    Resume(ResumeArgs),
    Contribute(ContributeArgs),
    FinalizeCircuit(FinalizeCircuitArgs),
    FinalizeCeremony(FinalizeCeremonyArgs),
}
