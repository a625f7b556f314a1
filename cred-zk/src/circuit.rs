//! R1CS circuit for anonymous group membership.
//!
//! What this circuit proves:
//! 1) The prover knows an identity `(nullifier, trapdoor)` whose commitment is a leaf of the tree
//!    with public root `root`.
//! 2) The public `nullifier_hash` equals `hash(external_nullifier, identity_nullifier)`.
//! 3) The proof is bound to `signal_hash` (it cannot be replayed with a different signal).
//!
//! Privacy: the identity, the sibling path and the leaf position are witnesses.

use crate::constants::poseidon_config;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// In-circuit twin of [`crate::hash::hash`].
fn hash_var(
    cs: ConstraintSystemRef<Fr>,
    params: &PoseidonConfig<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, params);
    sponge.absorb(&inputs)?;
    let mut out = sponge.squeeze_field_elements(1)?;
    Ok(out.remove(0))
}

/// Everything the prover knows about one membership statement.
#[derive(Clone, Debug)]
pub struct MembershipWitness {
    pub identity_nullifier: Fr,
    pub identity_trapdoor: Fr,
    /// Sibling hashes from the leaf level upwards.
    pub siblings: Vec<Fr>,
    /// `0` when the path node is a left child, `1` when it is a right child.
    pub path_indices: Vec<u8>,
    pub external_nullifier: Fr,
    pub signal_hash: Fr,
}

/// Membership circuit for a tree of a fixed `depth`.
///
/// Public values are `Option` so the same struct drives both key generation and proving.
#[derive(Clone, Debug)]
pub struct MembershipCircuit {
    pub depth: usize,

    // Public inputs.
    pub root: Option<Fr>,
    pub nullifier_hash: Option<Fr>,
    pub signal_hash: Option<Fr>,
    pub external_nullifier: Option<Fr>,

    // Witnesses.
    pub identity_nullifier: Option<Fr>,
    pub identity_trapdoor: Option<Fr>,
    pub siblings: Vec<Option<Fr>>,
    pub path_indices: Vec<Option<bool>>,
}

impl MembershipCircuit {
    /// Circuit shape with no assignment; enough for key generation.
    pub fn blank(depth: usize) -> Self {
        Self {
            depth,
            root: None,
            nullifier_hash: None,
            signal_hash: None,
            external_nullifier: None,
            identity_nullifier: None,
            identity_trapdoor: None,
            siblings: vec![None; depth],
            path_indices: vec![None; depth],
        }
    }

    /// Fully assigned circuit for a witness and the public values it implies.
    pub fn assigned(witness: &MembershipWitness, root: Fr, nullifier_hash: Fr) -> Self {
        Self {
            depth: witness.siblings.len(),
            root: Some(root),
            nullifier_hash: Some(nullifier_hash),
            signal_hash: Some(witness.signal_hash),
            external_nullifier: Some(witness.external_nullifier),
            identity_nullifier: Some(witness.identity_nullifier),
            identity_trapdoor: Some(witness.identity_trapdoor),
            siblings: witness.siblings.iter().copied().map(Some).collect(),
            path_indices: witness.path_indices.iter().map(|i| Some(*i == 1)).collect(),
        }
    }
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        if self.depth == 0 || self.siblings.len() != self.depth || self.path_indices.len() != self.depth {
            return Err(SynthesisError::Unsatisfiable);
        }

        let params = poseidon_config();

        // --- Public inputs ---
        // IMPORTANT: ordering MUST match `PublicSignals::to_field_elems`.
        let root = FpVar::new_input(cs.clone(), || self.root.ok_or(SynthesisError::AssignmentMissing))?;
        let nullifier_hash = FpVar::new_input(cs.clone(), || {
            self.nullifier_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let signal_hash = FpVar::new_input(cs.clone(), || {
            self.signal_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let external_nullifier = FpVar::new_input(cs.clone(), || {
            self.external_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // --- Witnesses ---
        let identity_nullifier = FpVar::new_witness(cs.clone(), || {
            self.identity_nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let identity_trapdoor = FpVar::new_witness(cs.clone(), || {
            self.identity_trapdoor.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let secret = hash_var(
            cs.clone(),
            &params,
            &[identity_nullifier.clone(), identity_trapdoor],
        )?;
        let mut current = hash_var(cs.clone(), &params, &[secret])?;

        for (sibling_value, index_value) in self.siblings.into_iter().zip(self.path_indices) {
            let sibling = FpVar::new_witness(cs.clone(), || {
                sibling_value.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let is_right = Boolean::new_witness(cs.clone(), || {
                index_value.ok_or(SynthesisError::AssignmentMissing)
            })?;

            let left = is_right.select(&sibling, &current)?;
            let right = is_right.select(&current, &sibling)?;
            current = hash_var(cs.clone(), &params, &[left, right])?;
        }
        current.enforce_equal(&root)?;

        let computed_nullifier = hash_var(cs.clone(), &params, &[external_nullifier, identity_nullifier])?;
        computed_nullifier.enforce_equal(&nullifier_hash)?;

        // Ties the signal into the constraint system so it cannot be swapped after proving.
        let _signal_squared = signal_hash.square()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{hash_pair, identity_commitment, nullifier_hash};
    use ark_relations::r1cs::ConstraintSystem;

    fn depth_two_fixture() -> (MembershipWitness, Fr, Fr) {
        let id_nullifier = Fr::from(5u64);
        let id_trapdoor = Fr::from(6u64);
        let leaf = identity_commitment(id_nullifier, id_trapdoor);
        let sibling0 = Fr::from(100u64);
        let sibling1 = Fr::from(200u64);

        // Leaf sits at index 1: right child at level 0, left child at level 1.
        let level1 = hash_pair(sibling0, leaf);
        let root = hash_pair(level1, sibling1);

        let witness = MembershipWitness {
            identity_nullifier: id_nullifier,
            identity_trapdoor: id_trapdoor,
            siblings: vec![sibling0, sibling1],
            path_indices: vec![1, 0],
            external_nullifier: Fr::from(42u64),
            signal_hash: Fr::from(9u64),
        };
        let nf = nullifier_hash(witness.external_nullifier, id_nullifier);
        (witness, root, nf)
    }

    #[test]
    fn accepts_valid_membership() {
        let (witness, root, nf) = depth_two_fixture();
        let cs = ConstraintSystem::<Fr>::new_ref();
        MembershipCircuit::assigned(&witness, root, nf)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!(cs.num_instance_variables(), 5);
    }

    #[test]
    fn rejects_wrong_root() {
        let (witness, root, nf) = depth_two_fixture();
        let cs = ConstraintSystem::<Fr>::new_ref();
        MembershipCircuit::assigned(&witness, root + Fr::from(1u64), nf)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn rejects_wrong_nullifier() {
        let (witness, root, nf) = depth_two_fixture();
        let cs = ConstraintSystem::<Fr>::new_ref();
        MembershipCircuit::assigned(&witness, root, nf + Fr::from(1u64))
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn rejects_flipped_path() {
        let (mut witness, root, nf) = depth_two_fixture();
        witness.path_indices = vec![0, 0];
        let cs = ConstraintSystem::<Fr>::new_ref();
        MembershipCircuit::assigned(&witness, root, nf)
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn mismatched_depth_is_unsatisfiable() {
        let mut circuit = MembershipCircuit::blank(3);
        circuit.siblings.pop();
        let cs = ConstraintSystem::<Fr>::new_ref();
        assert!(circuit.generate_constraints(cs).is_err());
    }
}
