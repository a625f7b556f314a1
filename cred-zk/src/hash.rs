//! Native Poseidon hashing.
//!
//! Every function here has an in-circuit twin in [`crate::circuit`]; both sides MUST agree or
//! registry roots and circuit roots diverge.

use crate::constants::poseidon_config;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::CryptographicSponge;
use std::sync::OnceLock;

fn config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(poseidon_config)
}

/// Absorb `inputs` into a fresh sponge and squeeze one element.
pub fn hash(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(config());
    sponge.absorb(&inputs);
    let out: Vec<Fr> = sponge.squeeze_field_elements(1);
    out[0]
}

/// 2-to-1 node hash used by the accumulator.
pub fn hash_pair(left: Fr, right: Fr) -> Fr {
    hash(&[left, right])
}

/// Secret half of an identity: `hash(nullifier, trapdoor)`.
pub fn identity_secret(identity_nullifier: Fr, identity_trapdoor: Fr) -> Fr {
    hash(&[identity_nullifier, identity_trapdoor])
}

/// The public leaf value registered for an identity.
pub fn identity_commitment(identity_nullifier: Fr, identity_trapdoor: Fr) -> Fr {
    hash(&[identity_secret(identity_nullifier, identity_trapdoor)])
}

/// Per-context nullifier revealed with a proof.
pub fn nullifier_hash(external_nullifier: Fr, identity_nullifier: Fr) -> Fr {
    hash(&[external_nullifier, identity_nullifier])
}
