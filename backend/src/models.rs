use chrono::{DateTime, Utc};
use cred_registry::{CredEvent, CredId, Identity};
use cred_zk::types::FrHex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCredRequest {
    pub id: CredId,
    pub depth: usize,
    pub zero_value: FrHex,
    pub admin: Identity,
    #[serde(default)]
    pub uri: String,
    /// Seconds a superseded root stays usable; defaults to one hour.
    pub root_validity_duration: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredResponse {
    pub id: CredId,
    pub depth: usize,
    pub zero_value: FrHex,
    pub root: FrHex,
    pub leaf_count: u64,
    pub admin: Identity,
    pub uri: String,
    pub root_validity_duration: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetAdminRequest {
    pub new_admin: Identity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetDurationRequest {
    pub root_validity_duration: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub leaf: FrHex,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMembersRequest {
    pub leaves: Vec<FrHex>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
    pub old_leaf: FrHex,
    pub new_leaf: FrHex,
    pub siblings: Vec<FrHex>,
    pub path_indices: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveMemberRequest {
    pub leaf: FrHex,
    pub siblings: Vec<FrHex>,
    pub path_indices: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberResponse {
    /// Index of the (first) affected leaf.
    pub index: u64,
    pub root: FrHex,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MerkleProofResponse {
    pub index: u64,
    pub leaf: FrHex,
    pub siblings: Vec<FrHex>,
    pub path_indices: Vec<u8>,
    pub root: FrHex,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyProofRequest {
    pub root: FrHex,
    pub signal: FrHex,
    pub nullifier_hash: FrHex,
    pub external_nullifier: FrHex,

    /// Compressed Groth16 proof (A, B, C), base64.
    pub proof_b64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyProofResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListEventsParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventItem {
    pub seq: u64,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub event: CredEvent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub id: CredId,
    pub offset: u64,
    pub limit: u64,
    pub events: Vec<EventItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ZkVkResponse {
    pub curve: String,
    pub proof_system: String,
    pub depth: usize,
    pub vk_b64: String,
}
