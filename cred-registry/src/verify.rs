//! Proof verification orchestrator.
//!
//! A call is terminal: either every check passes and the nullifier is consumed, or nothing
//! changes.

use crate::clock::Clock;
use crate::error::CredError;
use crate::events::CredEvent;
use crate::history::RootHistory;
use crate::registry::CredRegistry;
use crate::types::CredId;
use ark_bn254::{Bn254, Fr};
use ark_groth16::Proof;
use cred_zk::PublicSignals;
use tracing::{debug, info};

impl<C: Clock> CredRegistry<C> {
    /// Verify a membership proof for cred `id` and consume its nullifier.
    ///
    /// `root` may be the current root or any earlier root still inside the cred's validity window.
    pub fn verify_proof(
        &mut self,
        id: CredId,
        root: Fr,
        signal: Fr,
        nullifier_hash: Fr,
        external_nullifier: Fr,
        proof: &Proof<Bn254>,
    ) -> Result<(), CredError> {
        let now = self.clock.now();
        let cred = self.cred_mut(id)?;

        if root != cred.tree.root() {
            let created_at = cred
                .history
                .created_at(&root)
                .ok_or(CredError::RootNotPartOfCred)?;
            if !RootHistory::is_fresh(created_at, cred.root_validity_duration, now) {
                debug!(%id, created_at, now, "rejected expired root");
                return Err(CredError::RootExpired);
            }
        }

        if cred.nullifiers.is_consumed(&nullifier_hash) {
            debug!(%id, "rejected reused nullifier");
            return Err(CredError::NullifierReused);
        }

        let signals = PublicSignals {
            root,
            nullifier_hash,
            signal,
            external_nullifier,
        };
        cred.verifier.verify(proof, &signals)?;

        // All checks passed; commit.
        cred.nullifiers.consume(nullifier_hash);

        info!(%id, "proof verified");
        self.events.push(CredEvent::ProofVerified {
            id,
            root: root.into(),
            nullifier_hash: nullifier_hash.into(),
            external_nullifier: external_nullifier.into(),
            signal: signal.into(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;
    use crate::error::CredError;
    use crate::registry::{CredParams, CredRegistry};
    use crate::testing::{dummy_proof, AcceptAll, RejectAll};
    use crate::types::{CredId, Identity};
    use ark_bn254::Fr;
    use cred_zk::ProofVerifier;
    use std::sync::Arc;

    const DURATION: u64 = 3_600;

    fn setup(verifier: Arc<dyn ProofVerifier>) -> (CredRegistry<ManualClock>, ManualClock, CredId) {
        let clock = ManualClock::new(10_000);
        let mut registry = CredRegistry::new(clock.clone());
        registry.bind_verifier(2, verifier).unwrap();
        let id = CredId::from(1u64);
        registry
            .create_cred(
                id,
                CredParams {
                    depth: 2,
                    zero_value: Fr::from(0u64),
                    admin: Identity::new("admin"),
                    uri: String::new(),
                    root_validity_duration: Some(DURATION),
                },
            )
            .unwrap();
        (registry, clock, id)
    }

    fn add(registry: &mut CredRegistry<ManualClock>, id: CredId, leaf: u64) -> Fr {
        registry
            .add_member(id, &Identity::new("admin"), Fr::from(leaf))
            .unwrap();
        registry.get_root(id).unwrap()
    }

    #[test]
    fn unknown_cred_fails_first() {
        let (mut registry, _, _) = setup(Arc::new(AcceptAll));
        let err = registry
            .verify_proof(CredId::from(2u64), Fr::from(1u64), Fr::from(0u64), Fr::from(0u64), Fr::from(0u64), &dummy_proof())
            .unwrap_err();
        assert!(matches!(err, CredError::CredDoesNotExist(_)));
    }

    #[test]
    fn current_root_skips_history() {
        let (mut registry, _, id) = setup(Arc::new(AcceptAll));
        // The empty root was never stamped, but it is current.
        let root = registry.get_root(id).unwrap();
        registry
            .verify_proof(id, root, Fr::from(1u64), Fr::from(2u64), Fr::from(3u64), &dummy_proof())
            .unwrap();
        assert!(registry.is_nullifier_consumed(id, &Fr::from(2u64)).unwrap());
    }

    #[test]
    fn unknown_root_is_rejected() {
        let (mut registry, _, id) = setup(Arc::new(AcceptAll));
        let empty_root = registry.get_root(id).unwrap();
        add(&mut registry, id, 1);

        assert!(matches!(
            registry.verify_proof(id, empty_root, Fr::from(1u64), Fr::from(2u64), Fr::from(3u64), &dummy_proof()),
            Err(CredError::RootNotPartOfCred)
        ));
        assert!(matches!(
            registry.verify_proof(id, Fr::from(12345u64), Fr::from(1u64), Fr::from(2u64), Fr::from(3u64), &dummy_proof()),
            Err(CredError::RootNotPartOfCred)
        ));
    }

    #[test]
    fn superseded_root_window() {
        let (mut registry, clock, id) = setup(Arc::new(AcceptAll));
        let old_root = add(&mut registry, id, 1);
        add(&mut registry, id, 2);

        clock.set(10_000 + DURATION - 1);
        registry
            .verify_proof(id, old_root, Fr::from(1u64), Fr::from(100u64), Fr::from(3u64), &dummy_proof())
            .unwrap();

        clock.set(10_000 + DURATION + 1);
        assert!(matches!(
            registry.verify_proof(id, old_root, Fr::from(1u64), Fr::from(101u64), Fr::from(3u64), &dummy_proof()),
            Err(CredError::RootExpired)
        ));
        assert!(!registry.is_nullifier_consumed(id, &Fr::from(101u64)).unwrap());

        // The current root never expires.
        let current = registry.get_root(id).unwrap();
        registry
            .verify_proof(id, current, Fr::from(1u64), Fr::from(101u64), Fr::from(3u64), &dummy_proof())
            .unwrap();
    }

    #[test]
    fn nullifier_replay_is_rejected_regardless_of_root() {
        let (mut registry, clock, id) = setup(Arc::new(AcceptAll));
        let old_root = add(&mut registry, id, 1);
        add(&mut registry, id, 2);
        let current = registry.get_root(id).unwrap();
        let nf = Fr::from(77u64);

        registry
            .verify_proof(id, old_root, Fr::from(1u64), nf, Fr::from(3u64), &dummy_proof())
            .unwrap();
        assert_eq!(registry.drain_events().last().map(|e| e.kind()), Some("proof_verified"));

        clock.advance(DURATION * 2);
        assert!(matches!(
            registry.verify_proof(id, current, Fr::from(9u64), nf, Fr::from(3u64), &dummy_proof()),
            Err(CredError::NullifierReused)
        ));
        assert!(registry.drain_events().is_empty());
    }

    #[test]
    fn rejected_proof_commits_nothing() {
        let (mut registry, _, id) = setup(Arc::new(RejectAll));
        let root = registry.get_root(id).unwrap();
        registry.drain_events();

        assert!(matches!(
            registry.verify_proof(id, root, Fr::from(1u64), Fr::from(2u64), Fr::from(3u64), &dummy_proof()),
            Err(CredError::InvalidProof(_))
        ));
        assert!(!registry.is_nullifier_consumed(id, &Fr::from(2u64)).unwrap());
        assert!(registry.drain_events().is_empty());
    }

    #[test]
    fn verifier_is_frozen_at_creation() {
        let (mut registry, _, id) = setup(Arc::new(AcceptAll));
        registry.bind_verifier(2, Arc::new(RejectAll)).unwrap();
        let root = registry.get_root(id).unwrap();
        registry
            .verify_proof(id, root, Fr::from(1u64), Fr::from(2u64), Fr::from(3u64), &dummy_proof())
            .unwrap();
    }
}
