pub mod contribute;
pub mod create_bucket;
pub mod finalize_ceremony;
pub mod finalize_circuit;
pub mod join;
pub mod progress;
pub mod resume;
pub mod setup;

pub use contribute::ContributeArgs;
pub use create_bucket::CreateBucketArgs;
pub use finalize_ceremony::FinalizeCeremonyArgs;
pub use finalize_circuit::FinalizeCircuitArgs;
pub use join::JoinArgs;
pub use progress::ProgressArgs;
pub use resume::ResumeArgs;
pub use setup::SetupArgs;
