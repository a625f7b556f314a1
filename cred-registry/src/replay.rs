//! Rebuilding registry state from a recorded event stream.
//!
//! Replay trusts the stream for authorization and proofs, but recomputes every tree change and
//! compares the result with the index and root the event recorded.

use crate::clock::Clock;
use crate::error::CredError;
use crate::events::CredEvent;
use crate::registry::{CredParams, CredRegistry};
use crate::types::CredId;
use ark_bn254::Fr;
use cred_zk::types::FrHex;
use tracing::debug;

fn field(id: CredId, value: &FrHex) -> Result<Fr, CredError> {
    value.to_fr().map_err(|_| CredError::ReplayMismatch(id))
}

fn expect_eq<T: PartialEq>(id: CredId, got: T, recorded: T) -> Result<(), CredError> {
    if got == recorded {
        Ok(())
    } else {
        Err(CredError::ReplayMismatch(id))
    }
}

impl<C: Clock> CredRegistry<C> {
    /// Apply one previously emitted event. Events must arrive in emission order.
    ///
    /// Nothing is pushed to the outbox.
    pub fn replay(&mut self, event: &CredEvent) -> Result<(), CredError> {
        let id = event.cred_id();

        match event {
            CredEvent::CredCreated {
                depth,
                zero_value,
                admin,
                uri,
                root_validity_duration,
                ..
            } => {
                let params = CredParams {
                    depth: *depth,
                    zero_value: field(id, zero_value)?,
                    admin: admin.clone(),
                    uri: uri.clone(),
                    root_validity_duration: Some(*root_validity_duration),
                };
                self.open_cred(id, &params)?;
            }
            CredEvent::AdminChanged { new_admin, .. } => {
                self.cred_mut(id)?.admin = new_admin.clone();
            }
            CredEvent::RootValidityDurationSet { duration, .. } => {
                self.cred_mut(id)?.root_validity_duration = *duration;
            }
            CredEvent::MemberAdded {
                index,
                leaf,
                root,
                timestamp,
                ..
            } => {
                let leaf = field(id, leaf)?;
                let root = field(id, root)?;
                let cred = self.cred_mut(id)?;
                expect_eq(id, cred.tree.insert(leaf)?, *index)?;
                expect_eq(id, cred.tree.root(), root)?;
                cred.history.record(root, *timestamp);
            }
            CredEvent::MembersAdded {
                start_index,
                leaves,
                root,
                timestamp,
                ..
            } => {
                let leaves = leaves.iter().map(|l| field(id, l)).collect::<Result<Vec<_>, _>>()?;
                let root = field(id, root)?;
                let cred = self.cred_mut(id)?;
                expect_eq(id, cred.tree.insert_many(&leaves)?, *start_index)?;
                expect_eq(id, cred.tree.root(), root)?;
                cred.history.record(root, *timestamp);
            }
            CredEvent::MemberUpdated {
                index,
                old_leaf,
                new_leaf,
                root,
                timestamp,
                ..
            } => {
                let old_leaf = field(id, old_leaf)?;
                let new_leaf = field(id, new_leaf)?;
                let root = field(id, root)?;
                let cred = self.cred_mut(id)?;
                let path = cred.tree.proof_for(*index)?;
                cred.tree.update(old_leaf, new_leaf, &path.siblings, &path.path_indices)?;
                expect_eq(id, cred.tree.root(), root)?;
                cred.history.record(root, *timestamp);
            }
            CredEvent::MemberRemoved {
                index,
                leaf,
                root,
                timestamp,
                ..
            } => {
                let leaf = field(id, leaf)?;
                let root = field(id, root)?;
                let cred = self.cred_mut(id)?;
                let path = cred.tree.proof_for(*index)?;
                cred.tree.remove(leaf, &path.siblings, &path.path_indices)?;
                expect_eq(id, cred.tree.root(), root)?;
                cred.history.record(root, *timestamp);
            }
            CredEvent::ProofVerified { nullifier_hash, .. } => {
                let nullifier_hash = field(id, nullifier_hash)?;
                self.cred_mut(id)?.nullifiers.consume(nullifier_hash);
            }
        }

        debug!(%id, kind = event.kind(), "event replayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;
    use crate::error::CredError;
    use crate::events::CredEvent;
    use crate::registry::{CredParams, CredRegistry};
    use crate::testing::{dummy_proof, AcceptAll};
    use crate::types::{CredId, Identity};
    use ark_bn254::Fr;
    use cred_zk::types::FrHex;
    use std::sync::Arc;

    fn registry(clock: &ManualClock) -> CredRegistry<ManualClock> {
        let mut registry = CredRegistry::new(clock.clone());
        registry.bind_verifier(2, Arc::new(AcceptAll)).unwrap();
        registry
    }

    /// Drive a cred through every kind of event and return the emitted stream.
    fn history_of_one_cred(registry: &mut CredRegistry<ManualClock>, clock: &ManualClock, id: CredId) -> Vec<CredEvent> {
        let admin = Identity::new("admin");
        registry
            .create_cred(
                id,
                CredParams {
                    depth: 2,
                    zero_value: Fr::from(0u64),
                    admin: admin.clone(),
                    uri: "ipfs://cred".to_string(),
                    root_validity_duration: Some(120),
                },
            )
            .unwrap();
        registry.add_member(id, &admin, Fr::from(1u64)).unwrap();
        clock.advance(10);
        registry
            .add_members(id, &admin, &[Fr::from(2u64), Fr::from(3u64)])
            .unwrap();
        clock.advance(10);
        let path = registry.merkle_proof(id, 0).unwrap();
        registry
            .update_member(id, &admin, Fr::from(1u64), Fr::from(4u64), &path.siblings, &path.path_indices)
            .unwrap();
        clock.advance(10);
        let path = registry.merkle_proof(id, 2).unwrap();
        registry
            .remove_member(id, &admin, Fr::from(3u64), &path.siblings, &path.path_indices)
            .unwrap();
        let root = registry.get_root(id).unwrap();
        registry
            .verify_proof(id, root, Fr::from(5u64), Fr::from(6u64), Fr::from(7u64), &dummy_proof())
            .unwrap();
        registry.set_root_validity_duration(id, &admin, 300).unwrap();
        registry.set_admin(id, &admin, Identity::new("next")).unwrap();
        registry.drain_events()
    }

    #[test]
    fn replay_restores_tree_history_and_nullifiers() {
        let clock = ManualClock::new(1_000);
        let mut live = registry(&clock);
        let id = CredId::from(1u64);
        let events = history_of_one_cred(&mut live, &clock, id);

        // Restarted later, with a different wall clock.
        let restart_clock = ManualClock::new(50_000);
        let mut restored = registry(&restart_clock);
        for event in &events {
            restored.replay(event).unwrap();
        }
        assert!(restored.drain_events().is_empty());

        assert_eq!(restored.get_root(id).unwrap(), live.get_root(id).unwrap());
        assert_eq!(restored.get_leaf_count(id).unwrap(), 3);
        assert_eq!(restored.get_admin(id).unwrap(), &Identity::new("next"));
        assert_eq!(restored.get_root_validity_duration(id).unwrap(), 300);
        assert!(restored.is_nullifier_consumed(id, &Fr::from(6u64)).unwrap());

        for event in &events {
            if let CredEvent::MemberAdded { root, .. }
            | CredEvent::MembersAdded { root, .. }
            | CredEvent::MemberUpdated { root, .. }
            | CredEvent::MemberRemoved { root, .. } = event
            {
                let root = root.to_fr().unwrap();
                assert_eq!(
                    restored.root_created_at(id, &root).unwrap(),
                    live.root_created_at(id, &root).unwrap()
                );
            }
        }

        // A replayed nullifier stays spent.
        let root = restored.get_root(id).unwrap();
        assert!(matches!(
            restored.verify_proof(id, root, Fr::from(5u64), Fr::from(6u64), Fr::from(7u64), &dummy_proof()),
            Err(CredError::NullifierReused)
        ));
        assert!(matches!(
            restored.create_cred(
                id,
                CredParams {
                    depth: 2,
                    zero_value: Fr::from(0u64),
                    admin: Identity::new("admin"),
                    uri: String::new(),
                    root_validity_duration: None,
                },
            ),
            Err(CredError::CredAlreadyExists(_))
        ));
    }

    #[test]
    fn diverging_root_is_reported() {
        let clock = ManualClock::new(1_000);
        let mut live = registry(&clock);
        let id = CredId::from(1u64);
        let mut events = history_of_one_cred(&mut live, &clock, id);

        if let CredEvent::MemberAdded { root, .. } = &mut events[1] {
            *root = FrHex::from(Fr::from(42u64));
        } else {
            panic!("second event should be member_added");
        }

        let mut restored = registry(&clock);
        restored.replay(&events[0]).unwrap();
        assert!(matches!(
            restored.replay(&events[1]),
            Err(CredError::ReplayMismatch(_))
        ));
    }

    #[test]
    fn events_for_unknown_creds_are_rejected() {
        let clock = ManualClock::new(1_000);
        let mut restored = registry(&clock);
        let event = CredEvent::RootValidityDurationSet {
            id: CredId::from(3u64),
            duration: 5,
        };
        assert!(matches!(
            restored.replay(&event),
            Err(CredError::CredDoesNotExist(_))
        ));
    }
}
