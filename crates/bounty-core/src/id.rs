//! Identifier newtypes.
//!
//! Each identifier wraps a v4 UUID. The engine treats user identifiers as
//! opaque: no lookups are performed against an identity service here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// An opaque user identifier issued by the platform's identity service.
    UserId,
    "user"
);

uuid_id!(
    /// A unique identifier for a wager.
    WagerId,
    "wager"
);

uuid_id!(
    /// A unique identifier for a result proof submission.
    ProofId,
    "proof"
);

uuid_id!(
    /// A unique identifier for a dispute.
    DisputeId,
    "dispute"
);
