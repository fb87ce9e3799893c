use anyhow::Context;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};

pub fn connect(rpc_url: &str) -> anyhow::Result<HttpClient> {
    HttpClientBuilder::default().build(rpc_url).context("build coordinator rpc client")
}
