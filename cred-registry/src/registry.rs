//! Group registry: cred metadata, admin checks and membership mutations.
//!
//! The registry is a sequential state machine. Every mutation takes `&mut self`, validates all of
//! its inputs first and only then writes, so a failed call leaves no trace. Callers that share a
//! registry across threads serialize access behind a single lock.

use crate::clock::Clock;
use crate::error::CredError;
use crate::events::CredEvent;
use crate::history::RootHistory;
use crate::merkle::{IncrementalMerkleTree, MerkleProof};
use crate::nullifiers::NullifierSet;
use crate::types::{CredId, Identity};
use ark_bn254::Fr;
use cred_zk::constants::{DEFAULT_ROOT_VALIDITY_DURATION, MAX_TREE_DEPTH, MIN_TREE_DEPTH};
use cred_zk::types::FrHex;
use cred_zk::ProofVerifier;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Parameters for creating a cred.
#[derive(Clone, Debug)]
pub struct CredParams {
    pub depth: usize,
    pub zero_value: Fr,
    pub admin: Identity,
    pub uri: String,
    /// Seconds; defaults to [`DEFAULT_ROOT_VALIDITY_DURATION`].
    pub root_validity_duration: Option<u64>,
}

pub(crate) struct Cred {
    pub(crate) admin: Identity,
    pub(crate) uri: String,
    pub(crate) root_validity_duration: u64,
    pub(crate) tree: IncrementalMerkleTree,
    pub(crate) history: RootHistory,
    pub(crate) nullifiers: NullifierSet,
    /// Frozen at creation; later rebinding of the depth does not affect this cred.
    pub(crate) verifier: Arc<dyn ProofVerifier>,
}

pub struct CredRegistry<C: Clock> {
    pub(crate) creds: HashMap<CredId, Cred>,
    verifiers: BTreeMap<usize, Arc<dyn ProofVerifier>>,
    pub(crate) clock: C,
    pub(crate) events: Vec<CredEvent>,
}

impl<C: Clock> CredRegistry<C> {
    pub fn new(clock: C) -> Self {
        Self {
            creds: HashMap::new(),
            verifiers: BTreeMap::new(),
            clock,
            events: Vec::new(),
        }
    }

    /// Bind the verifier used by creds created later with this depth.
    pub fn bind_verifier(&mut self, depth: usize, verifier: Arc<dyn ProofVerifier>) -> Result<(), CredError> {
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
            return Err(CredError::DepthNotSupported(depth));
        }
        self.verifiers.insert(depth, verifier);
        info!(depth, "verifier bound");
        Ok(())
    }

    /// A registry with no creds that shares this one's clock and verifier bindings.
    pub fn empty_copy(&self) -> Self
    where
        C: Clone,
    {
        Self {
            creds: HashMap::new(),
            verifiers: self.verifiers.clone(),
            clock: self.clock.clone(),
            events: Vec::new(),
        }
    }

    pub fn supported_depths(&self) -> Vec<usize> {
        self.verifiers.keys().copied().collect()
    }

    /// Take every event emitted since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<CredEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn cred(&self, id: CredId) -> Result<&Cred, CredError> {
        self.creds.get(&id).ok_or(CredError::CredDoesNotExist(id))
    }

    fn cred_as_admin(&mut self, id: CredId, caller: &Identity) -> Result<&mut Cred, CredError> {
        let cred = self.cred_mut(id)?;
        if cred.admin != *caller {
            return Err(CredError::NotAdmin);
        }
        Ok(cred)
    }

    pub(crate) fn cred_mut(&mut self, id: CredId) -> Result<&mut Cred, CredError> {
        self.creds.get_mut(&id).ok_or(CredError::CredDoesNotExist(id))
    }

    pub fn create_cred(&mut self, id: CredId, params: CredParams) -> Result<(), CredError> {
        let root_validity_duration = self.open_cred(id, &params)?;

        info!(%id, depth = params.depth, admin = %params.admin, root_validity_duration, "cred created");
        self.events.push(CredEvent::CredCreated {
            id,
            depth: params.depth,
            zero_value: FrHex::from(params.zero_value),
            admin: params.admin,
            uri: params.uri,
            root_validity_duration,
        });
        Ok(())
    }

    /// Validate `params` and insert an empty cred. Returns the effective validity duration.
    pub(crate) fn open_cred(&mut self, id: CredId, params: &CredParams) -> Result<u64, CredError> {
        if !id.is_in_field() {
            return Err(CredError::CredIdTooLarge);
        }
        if self.creds.contains_key(&id) {
            return Err(CredError::CredAlreadyExists(id));
        }
        let verifier = self
            .verifiers
            .get(&params.depth)
            .cloned()
            .ok_or(CredError::DepthNotSupported(params.depth))?;

        let tree = IncrementalMerkleTree::new(params.depth, params.zero_value)?;
        let root_validity_duration = params
            .root_validity_duration
            .unwrap_or(DEFAULT_ROOT_VALIDITY_DURATION);

        self.creds.insert(
            id,
            Cred {
                admin: params.admin.clone(),
                uri: params.uri.clone(),
                root_validity_duration,
                tree,
                history: RootHistory::new(),
                nullifiers: NullifierSet::new(),
                verifier,
            },
        );
        Ok(root_validity_duration)
    }

    pub fn set_admin(&mut self, id: CredId, caller: &Identity, new_admin: Identity) -> Result<(), CredError> {
        let cred = self.cred_as_admin(id, caller)?;
        let old_admin = std::mem::replace(&mut cred.admin, new_admin.clone());

        info!(%id, %old_admin, %new_admin, "cred admin changed");
        self.events.push(CredEvent::AdminChanged {
            id,
            old_admin,
            new_admin,
        });
        Ok(())
    }

    pub fn set_root_validity_duration(&mut self, id: CredId, caller: &Identity, duration: u64) -> Result<(), CredError> {
        let cred = self.cred_as_admin(id, caller)?;
        cred.root_validity_duration = duration;

        info!(%id, duration, "root validity duration set");
        self.events.push(CredEvent::RootValidityDurationSet { id, duration });
        Ok(())
    }

    pub fn add_member(&mut self, id: CredId, caller: &Identity, leaf: Fr) -> Result<u64, CredError> {
        let now = self.clock.now();
        let cred = self.cred_as_admin(id, caller)?;
        let index = cred.tree.insert(leaf)?;
        let root = cred.tree.root();
        cred.history.record(root, now);

        debug!(%id, index, "member added");
        self.events.push(CredEvent::MemberAdded {
            id,
            index,
            leaf: leaf.into(),
            root: root.into(),
            timestamp: now,
        });
        Ok(index)
    }

    /// Append several members; the root history gets one stamp for the final root.
    pub fn add_members(&mut self, id: CredId, caller: &Identity, leaves: &[Fr]) -> Result<u64, CredError> {
        let now = self.clock.now();
        let cred = self.cred_as_admin(id, caller)?;
        let start_index = cred.tree.insert_many(leaves)?;
        let root = cred.tree.root();
        cred.history.record(root, now);

        debug!(%id, start_index, count = leaves.len(), "members added");
        self.events.push(CredEvent::MembersAdded {
            id,
            start_index,
            leaves: leaves.iter().copied().map(FrHex::from).collect(),
            root: root.into(),
            timestamp: now,
        });
        Ok(start_index)
    }

    pub fn update_member(
        &mut self,
        id: CredId,
        caller: &Identity,
        old_leaf: Fr,
        new_leaf: Fr,
        siblings: &[Fr],
        path_indices: &[u8],
    ) -> Result<u64, CredError> {
        let now = self.clock.now();
        let cred = self.cred_as_admin(id, caller)?;
        let index = cred.tree.update(old_leaf, new_leaf, siblings, path_indices)?;
        let root = cred.tree.root();
        cred.history.record(root, now);

        debug!(%id, index, "member updated");
        self.events.push(CredEvent::MemberUpdated {
            id,
            index,
            old_leaf: old_leaf.into(),
            new_leaf: new_leaf.into(),
            root: root.into(),
            timestamp: now,
        });
        Ok(index)
    }

    pub fn remove_member(
        &mut self,
        id: CredId,
        caller: &Identity,
        leaf: Fr,
        siblings: &[Fr],
        path_indices: &[u8],
    ) -> Result<u64, CredError> {
        let now = self.clock.now();
        let cred = self.cred_as_admin(id, caller)?;
        let index = cred.tree.remove(leaf, siblings, path_indices)?;
        let root = cred.tree.root();
        cred.history.record(root, now);

        debug!(%id, index, "member removed");
        self.events.push(CredEvent::MemberRemoved {
            id,
            index,
            leaf: leaf.into(),
            root: root.into(),
            timestamp: now,
        });
        Ok(index)
    }

    pub fn get_root(&self, id: CredId) -> Result<Fr, CredError> {
        Ok(self.cred(id)?.tree.root())
    }

    pub fn get_depth(&self, id: CredId) -> Result<usize, CredError> {
        Ok(self.cred(id)?.tree.depth())
    }

    pub fn get_leaf_count(&self, id: CredId) -> Result<u64, CredError> {
        Ok(self.cred(id)?.tree.number_of_leaves())
    }

    pub fn get_admin(&self, id: CredId) -> Result<&Identity, CredError> {
        Ok(&self.cred(id)?.admin)
    }

    pub fn get_uri(&self, id: CredId) -> Result<&str, CredError> {
        Ok(&self.cred(id)?.uri)
    }

    pub fn get_root_validity_duration(&self, id: CredId) -> Result<u64, CredError> {
        Ok(self.cred(id)?.root_validity_duration)
    }

    pub fn get_zero_value(&self, id: CredId) -> Result<Fr, CredError> {
        Ok(self.cred(id)?.tree.zero_value())
    }

    /// When `root` first became the cred's root, if it ever did.
    pub fn root_created_at(&self, id: CredId, root: &Fr) -> Result<Option<u64>, CredError> {
        Ok(self.cred(id)?.history.created_at(root))
    }

    pub fn is_nullifier_consumed(&self, id: CredId, nullifier_hash: &Fr) -> Result<bool, CredError> {
        Ok(self.cred(id)?.nullifiers.is_consumed(nullifier_hash))
    }

    /// Sibling path for the member at `index` under the current root.
    pub fn merkle_proof(&self, id: CredId, index: u64) -> Result<MerkleProof, CredError> {
        Ok(self.cred(id)?.tree.proof_for(index)?)
    }
}
