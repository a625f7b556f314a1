//! Groth16 keys per supported tree depth.

use crate::errors::ApiError;
use ark_bn254::Bn254;
use ark_groth16::VerifyingKey;
use cred_zk::groth16::{deserialize_vk, serialize_pk, serialize_vk, setup_keys};
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ZkKeys {
    pub depth: usize,
    pub vk: Arc<VerifyingKey<Bn254>>,
}

fn key_paths(keys_dir: &Path, depth: usize) -> (PathBuf, PathBuf) {
    (
        keys_dir.join(format!("depth_{depth}_pk.bin")),
        keys_dir.join(format!("depth_{depth}_vk.bin")),
    )
}

/// Load the verifying key for `depth` from disk, or run the (prototype) trusted setup on first
/// use and persist both keys. Provers read the proving key from the same directory.
pub async fn load_or_setup(data_dir: &Path, depth: usize) -> Result<ZkKeys, ApiError> {
    let keys_dir = data_dir.join("keys");

    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&keys_dir).map_err(|_| ApiError::Internal)?;
        let (pk_path, vk_path) = key_paths(&keys_dir, depth);

        if pk_path.exists() && vk_path.exists() {
            let vk_bytes = std::fs::read(&vk_path).map_err(|_| ApiError::Internal)?;
            let vk = deserialize_vk(&vk_bytes).map_err(|_| ApiError::Internal)?;
            info!(depth, path = %vk_path.display(), "loaded verifying key");
            return Ok::<ZkKeys, ApiError>(ZkKeys { depth, vk: Arc::new(vk) });
        }

        // Trusted setup randomness (prototype).
        //
        // IMPORTANT: In production, use keys from an MPC ceremony.
        info!(depth, "running groth16 setup");
        let mut rng = OsRng;
        let (pk, vk) = setup_keys(depth, &mut rng).map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let pk_bytes = serialize_pk(&pk).map_err(|_| ApiError::Internal)?;
        let vk_bytes = serialize_vk(&vk).map_err(|_| ApiError::Internal)?;

        std::fs::write(&pk_path, pk_bytes).map_err(|_| ApiError::Internal)?;
        std::fs::write(&vk_path, vk_bytes).map_err(|_| ApiError::Internal)?;

        Ok::<ZkKeys, ApiError>(ZkKeys { depth, vk: Arc::new(vk) })
    })
    .await
    .map_err(|_| ApiError::Internal)?
}
