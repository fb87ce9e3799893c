//! Opaque string identifiers for the entities in the ceremony data model.
//!
//! All ids are plain wrapped strings: the engine never interprets their
//! contents, it only compares and hashes them. Keeping them as distinct types
//! (rather than passing `String` everywhere) stops a `ParticipantId` from
//! being handed to a function expecting a `CircuitId` by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(CeremonyId);
opaque_id!(CircuitId);
opaque_id!(ParticipantId);
opaque_id!(ContributionId);
opaque_id!(TimeoutId);
