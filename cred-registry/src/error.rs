use crate::merkle::TreeError;
use crate::types::CredId;
use cred_zk::ZkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredError {
    // Configuration.
    #[error("cred {0} already exists")]
    CredAlreadyExists(CredId),

    #[error("cred id must be smaller than the snark scalar field")]
    CredIdTooLarge,

    #[error("tree depth {0} is not supported")]
    DepthNotSupported(usize),

    #[error("cred {0} does not exist")]
    CredDoesNotExist(CredId),

    // Authorization.
    #[error("caller is not the cred admin")]
    NotAdmin,

    // Membership proofs and tree capacity.
    #[error(transparent)]
    Tree(#[from] TreeError),

    // Freshness.
    #[error("root is not part of the cred")]
    RootNotPartOfCred,

    #[error("root has expired")]
    RootExpired,

    // Replay.
    #[error("nullifier has already been used")]
    NullifierReused,

    #[error("invalid proof: {0}")]
    InvalidProof(#[from] ZkError),

    // Rebuilding from a journal.
    #[error("recorded event does not match the state of cred {0}")]
    ReplayMismatch(CredId),
}
