//! Anonymous group credentials ("creds").
//!
//! Members of a cred are leaves of an incremental Merkle tree. A prover shows membership with a
//! zero-knowledge proof against a recent root, and a per-cred nullifier set stops the same proof
//! context from being used twice.
//!
//! - [`merkle`]: the accumulator (append, update, remove, sibling paths).
//! - [`history`]: root creation times backing the validity window.
//! - [`nullifiers`]: consumed nullifier hashes.
//! - [`registry`]: cred metadata, admin checks and membership mutations.
//! - [`verify`]: the proof verification orchestrator.
//! - [`replay`]: rebuilding state from emitted events.

pub mod clock;
pub mod error;
pub mod events;
pub mod history;
pub mod merkle;
pub mod nullifiers;
pub mod registry;
pub mod replay;
pub mod types;
pub mod verify;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CredError;
pub use events::CredEvent;
pub use merkle::{IncrementalMerkleTree, MerkleProof, TreeError};
pub use registry::{CredParams, CredRegistry};
pub use types::{CredId, Identity};
