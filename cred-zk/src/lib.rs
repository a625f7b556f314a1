//! ZK layer for anonymous group credentials.
//!
//! This crate contains:
//! - The Poseidon hash shared by the membership accumulator and the circuit.
//! - A SNARK circuit proving membership in a group without revealing the leaf.
//! - Groth16 setup, prover and verifier orchestration, plus the `ProofVerifier` capability.
//! - Serialization helpers for transporting proofs, keys and field elements.

pub mod circuit;
pub mod constants;
pub mod groth16;
pub mod hash;
pub mod types;

pub use ark_bn254::Fr;
pub use groth16::{Groth16Verifier, ProofVerifier, ZkError};
pub use types::PublicSignals;
