//! Observations emitted for external consumers.

use crate::types::{CredId, Identity};
use cred_zk::types::FrHex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredEvent {
    CredCreated {
        id: CredId,
        depth: usize,
        zero_value: FrHex,
        admin: Identity,
        uri: String,
        root_validity_duration: u64,
    },
    AdminChanged {
        id: CredId,
        old_admin: Identity,
        new_admin: Identity,
    },
    RootValidityDurationSet {
        id: CredId,
        duration: u64,
    },
    MemberAdded {
        id: CredId,
        index: u64,
        leaf: FrHex,
        root: FrHex,
        /// Unix seconds the registry stamped `root` with.
        timestamp: u64,
    },
    MembersAdded {
        id: CredId,
        start_index: u64,
        leaves: Vec<FrHex>,
        root: FrHex,
        timestamp: u64,
    },
    MemberUpdated {
        id: CredId,
        index: u64,
        old_leaf: FrHex,
        new_leaf: FrHex,
        root: FrHex,
        timestamp: u64,
    },
    MemberRemoved {
        id: CredId,
        index: u64,
        leaf: FrHex,
        root: FrHex,
        timestamp: u64,
    },
    ProofVerified {
        id: CredId,
        root: FrHex,
        nullifier_hash: FrHex,
        external_nullifier: FrHex,
        signal: FrHex,
    },
}

impl CredEvent {
    pub fn cred_id(&self) -> CredId {
        match self {
            CredEvent::CredCreated { id, .. }
            | CredEvent::AdminChanged { id, .. }
            | CredEvent::RootValidityDurationSet { id, .. }
            | CredEvent::MemberAdded { id, .. }
            | CredEvent::MembersAdded { id, .. }
            | CredEvent::MemberUpdated { id, .. }
            | CredEvent::MemberRemoved { id, .. }
            | CredEvent::ProofVerified { id, .. } => *id,
        }
    }

    /// Stable snake_case name, matching the serde tag.
    pub fn kind(&self) -> &'static str {
        match self {
            CredEvent::CredCreated { .. } => "cred_created",
            CredEvent::AdminChanged { .. } => "admin_changed",
            CredEvent::RootValidityDurationSet { .. } => "root_validity_duration_set",
            CredEvent::MemberAdded { .. } => "member_added",
            CredEvent::MembersAdded { .. } => "members_added",
            CredEvent::MemberUpdated { .. } => "member_updated",
            CredEvent::MemberRemoved { .. } => "member_removed",
            CredEvent::ProofVerified { .. } => "proof_verified",
        }
    }
}
