//! Groth16 prover/verifier orchestration for the membership circuit.
//!
//! SECURITY NOTE (prototype): Groth16 requires a trusted setup that produces a proving key (PK)
//! and verifying key (VK) per tree depth. `setup_keys` generates them locally. In production the
//! keys should come out of an MPC ceremony.

use crate::circuit::{MembershipCircuit, MembershipWitness};
use crate::constants::{MAX_TREE_DEPTH, MIN_TREE_DEPTH};
use crate::hash::{hash_pair, identity_commitment, nullifier_hash};
use crate::types::PublicSignals;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZkError {
    #[error("unsupported tree depth: {0}")]
    UnsupportedDepth(usize),

    #[error("witness path length mismatch: expected {expected}, got {got}")]
    PathLength { expected: usize, got: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("proof verification failed")]
    VerificationFailed,

    #[error("arkworks error: {0}")]
    Ark(String),
}

/// Root implied by a witness, computed natively.
///
/// This MUST match the circuit's path hashing.
pub fn witness_root(witness: &MembershipWitness) -> Fr {
    let mut node = identity_commitment(witness.identity_nullifier, witness.identity_trapdoor);
    for (sibling, index) in witness.siblings.iter().zip(&witness.path_indices) {
        node = if *index == 0 {
            hash_pair(node, *sibling)
        } else {
            hash_pair(*sibling, node)
        };
    }
    node
}

/// Public inputs implied by a witness.
pub fn witness_public_signals(witness: &MembershipWitness) -> PublicSignals {
    PublicSignals {
        root: witness_root(witness),
        nullifier_hash: nullifier_hash(witness.external_nullifier, witness.identity_nullifier),
        signal: witness.signal_hash,
        external_nullifier: witness.external_nullifier,
    }
}

/// Generate a Groth16 keypair for the membership circuit of one depth.
pub fn setup_keys(
    depth: usize,
    rng: &mut impl RngCore,
) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ZkError> {
    if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
        return Err(ZkError::UnsupportedDepth(depth));
    }

    let circuit = MembershipCircuit::blank(depth);
    let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    let vk = pk.vk.clone();
    Ok((pk, vk))
}

/// Prove membership; returns the proof together with its public signals.
pub fn prove_membership(
    rng: &mut impl RngCore,
    pk: &ProvingKey<Bn254>,
    depth: usize,
    witness: &MembershipWitness,
) -> Result<(Proof<Bn254>, PublicSignals), ZkError> {
    if witness.siblings.len() != depth || witness.path_indices.len() != depth {
        return Err(ZkError::PathLength {
            expected: depth,
            got: witness.siblings.len().min(witness.path_indices.len()),
        });
    }

    let signals = witness_public_signals(witness);
    let circuit = MembershipCircuit::assigned(witness, signals.root, signals.nullifier_hash);

    let proof = Groth16::<Bn254>::create_random_proof_with_reduction(circuit, pk, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    Ok((proof, signals))
}

/// Verify a membership proof against an already prepared key.
pub fn verify_membership(
    pvk: &PreparedVerifyingKey<Bn254>,
    proof: &Proof<Bn254>,
    signals: &PublicSignals,
) -> Result<(), ZkError> {
    let public_inputs = signals.to_field_elems();
    let ok = Groth16::<Bn254>::verify_proof(pvk, proof, &public_inputs)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;
    if !ok {
        return Err(ZkError::VerificationFailed);
    }
    Ok(())
}

/// The external verification capability bound to one tree depth.
///
/// Implementations must be pure functions of their inputs.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &Proof<Bn254>, signals: &PublicSignals) -> Result<(), ZkError>;
}

/// Groth16 verifier for the membership circuit of a single depth.
pub struct Groth16Verifier {
    depth: usize,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Verifier {
    pub fn new(depth: usize, vk: &VerifyingKey<Bn254>) -> Self {
        Self {
            depth,
            pvk: prepare_verifying_key(vk),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &Proof<Bn254>, signals: &PublicSignals) -> Result<(), ZkError> {
        verify_membership(&self.pvk, proof, signals)
    }
}

/// Serialize a proving key to bytes.
pub fn serialize_pk(pk: &ProvingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    pk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, ZkError> {
    ProvingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

pub fn serialize_vk(vk: &VerifyingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    vk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, ZkError> {
    VerifyingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

/// Compressed proof encoding: A (G1), B (G2), C (G1).
pub fn serialize_proof(proof: &Proof<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    proof
        .serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

/// Decodes and validates (on-curve, subgroup) a compressed proof.
pub fn deserialize_proof(bytes: &[u8]) -> Result<Proof<Bn254>, ZkError> {
    Proof::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

pub fn proof_to_b64(proof: &Proof<Bn254>) -> Result<String, ZkError> {
    Ok(base64::engine::general_purpose::STANDARD.encode(serialize_proof(proof)?))
}

pub fn proof_from_b64(s: &str) -> Result<Proof<Bn254>, ZkError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| ZkError::Serialization(format!("invalid base64: {e}")))?;
    deserialize_proof(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const DEPTH: usize = 3;

    fn witness() -> MembershipWitness {
        MembershipWitness {
            identity_nullifier: Fr::from(1234u64),
            identity_trapdoor: Fr::from(5678u64),
            siblings: vec![Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)],
            path_indices: vec![0, 1, 1],
            external_nullifier: Fr::from(77u64),
            signal_hash: Fr::from(88u64),
        }
    }

    #[test]
    fn groth16_roundtrip_and_tamper_checks() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let (pk, vk) = setup_keys(DEPTH, &mut rng).unwrap();
        let (proof, signals) = prove_membership(&mut rng, &pk, DEPTH, &witness()).unwrap();

        let verifier = Groth16Verifier::new(DEPTH, &vk);
        verifier.verify(&proof, &signals).unwrap();

        let mut other_signal = signals;
        other_signal.signal = Fr::from(89u64);
        assert!(matches!(
            verifier.verify(&proof, &other_signal),
            Err(ZkError::VerificationFailed)
        ));

        let mut other_context = signals;
        other_context.external_nullifier = Fr::from(78u64);
        assert!(verifier.verify(&proof, &other_context).is_err());

        let encoded = proof_to_b64(&proof).unwrap();
        let decoded = proof_from_b64(&encoded).unwrap();
        verifier.verify(&decoded, &signals).unwrap();

        let vk_back = deserialize_vk(&serialize_vk(&vk).unwrap()).unwrap();
        Groth16Verifier::new(DEPTH, &vk_back).verify(&proof, &signals).unwrap();
    }

    #[test]
    fn setup_rejects_out_of_range_depth() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(matches!(setup_keys(0, &mut rng), Err(ZkError::UnsupportedDepth(0))));
        assert!(matches!(
            setup_keys(MAX_TREE_DEPTH + 1, &mut rng),
            Err(ZkError::UnsupportedDepth(_))
        ));
    }

    #[test]
    fn prove_rejects_short_path() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let (pk, _) = setup_keys(DEPTH, &mut rng).unwrap();
        let mut w = witness();
        w.siblings.pop();
        assert!(matches!(
            prove_membership(&mut rng, &pk, DEPTH, &w),
            Err(ZkError::PathLength { expected: DEPTH, got: 2 })
        ));
    }

    #[test]
    fn garbage_proof_bytes_are_rejected() {
        assert!(deserialize_proof(&[0u8; 5]).is_err());
        assert!(proof_from_b64("not base64!").is_err());
    }
}
