//! Cryptographic core boundary.
//!
//! Treats Groth16 Phase-2 `zkey` contribution, verification, and export as a
//! pure function supplied by an external library. [`mock::MockZkeyCryptoCore`]
//! is a deterministic reference implementation used everywhere a real
//! SNARK toolchain would otherwise be linked in.

pub mod errors;
pub mod mock;
pub mod traits;

pub use errors::{CryptoError, CryptoResult};
pub use mock::MockZkeyCryptoCore;
pub use traits::{ContributionOutput, ZkeyCryptoCore};
