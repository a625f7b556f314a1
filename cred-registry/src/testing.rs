//! Verifier stand-ins for unit tests.

use ark_bn254::{Bn254, G1Affine, G2Affine};
use ark_groth16::Proof;
use cred_zk::{ProofVerifier, PublicSignals, ZkError};

pub struct AcceptAll;

impl ProofVerifier for AcceptAll {
    fn verify(&self, _proof: &Proof<Bn254>, _signals: &PublicSignals) -> Result<(), ZkError> {
        Ok(())
    }
}

pub struct RejectAll;

impl ProofVerifier for RejectAll {
    fn verify(&self, _proof: &Proof<Bn254>, _signals: &PublicSignals) -> Result<(), ZkError> {
        Err(ZkError::VerificationFailed)
    }
}

pub fn dummy_proof() -> Proof<Bn254> {
    Proof {
        a: G1Affine::default(),
        b: G2Affine::default(),
        c: G1Affine::default(),
    }
}
