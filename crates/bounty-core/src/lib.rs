//! # bounty-core — Foundational Types
//!
//! Domain primitives shared by every crate in the Bounty Stack:
//!
//! - **Identifiers** ([`id`]): UUID-backed newtypes for users, wagers,
//!   proofs, and disputes. Callers never handle raw UUIDs.
//!
//! - **Money** ([`money`]): integer minor-unit amounts with checked
//!   arithmetic and basis-point fee splitting. Monetary values are never
//!   represented as floating-point numbers.
//!
//! - **Error** ([`error`]): the shared validation error hierarchy for
//!   pre-side-effect input rejection.

pub mod error;
pub mod id;
pub mod money;

pub use error::ValidationError;
pub use id::{DisputeId, ProofId, UserId, WagerId};
pub use money::Amount;
