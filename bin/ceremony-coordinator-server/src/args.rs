use argh::FromArgs;

pub(super) const RPC_PORT: usize = 7040;

/// Ceremony coordination engine RPC server
#[derive(Debug, FromArgs)]
pub struct Args {
    /// the RPC port to listen on
    #[argh(option, description = "JSON-RPC port", default = "RPC_PORT")]
    pub rpc_port: usize,

    /// path to a TOML config file; defaults are used for any key it omits
    #[argh(option, description = "config file path")]
    pub config_file: Option<String>,

    /// directory backing the reference Artifact Store (local filesystem
    /// stand-in for an S3-compatible bucket)
    #[argh(option, description = "artifact store base directory", default = "String::from(\"./ceremony-data\")")]
    pub artifact_dir: String,

    /// append-only file attestation records are published to; omit to
    /// discard attestations
    #[argh(option, description = "attestation output file")]
    pub attestation_file: Option<String>,
}

impl Args {
    pub fn rpc_url(&self) -> String {
        format!("127.0.0.1:{}", self.rpc_port)
    }
}
