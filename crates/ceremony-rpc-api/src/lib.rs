//! RPC trait and wire DTOs for the ceremony coordination engine, consumed by
//! both the server binary and the reference CLI client.

pub mod api;
pub mod types;

pub use api::{CeremonyApiClient, CeremonyApiServer};
pub use types::*;
