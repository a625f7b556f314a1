//! Crate-wide constants shared by the native hasher, the circuit and the registry.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::{BigInteger, PrimeField};

/// Smallest tree depth a group may be created with.
pub const MIN_TREE_DEPTH: usize = 1;

/// Largest tree depth a group may be created with (2^32 leaves).
pub const MAX_TREE_DEPTH: usize = 32;

/// How long (in seconds) a superseded root keeps being accepted when a group does not say otherwise.
pub const DEFAULT_ROOT_VALIDITY_DURATION: u64 = 60 * 60;

/// Number of public inputs the membership circuit exposes.
///
/// Ordering: root, nullifier hash, signal hash, external nullifier.
pub const NUM_PUBLIC_INPUTS: usize = 4;

// Poseidon sponge configuration.
//
// A width-3 sponge (rate=2, capacity=1) absorbs a pair of tree nodes in a single permutation.
// The same parameters are used natively and in-circuit, otherwise roots would diverge.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;

pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Deterministically derive Poseidon parameters for BN254::Fr.
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
}

/// Big-endian bytes of `SNARK_SCALAR_FIELD`, the BN254 scalar field modulus.
///
/// Group ids and field-element encodings must be strictly below this value.
pub fn snark_scalar_field_be() -> [u8; 32] {
    let bytes = Fr::MODULUS.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}
