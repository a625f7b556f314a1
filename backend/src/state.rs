use crate::db::{self, Db};
use crate::errors::ApiError;
use crate::keys::ZkKeys;
use cred_registry::{CredError, CredRegistry, SystemClock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

pub type Registry = CredRegistry<SystemClock>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub api_key: Arc<str>,
    /// Every registry call goes through this one lock. Mutations keep it until their events are
    /// journaled, so the journal order is the order changes were applied in.
    registry: Arc<Mutex<Registry>>,
    keys: Arc<BTreeMap<usize, ZkKeys>>,
}

/// Replay the whole journal into `registry`.
pub async fn restore(db: &Db, mut registry: Registry) -> Result<Registry, ApiError> {
    let events = db::all_events(db).await?;
    for event in &events {
        registry.replay(event)?;
    }
    info!(events = events.len(), "registry restored from journal");
    Ok(registry)
}

impl AppState {
    pub fn new(db: Db, registry: Registry, keys: BTreeMap<usize, ZkKeys>, api_key: &str) -> Self {
        Self {
            db,
            api_key: Arc::from(api_key),
            registry: Arc::new(Mutex::new(registry)),
            keys: Arc::new(keys),
        }
    }

    pub fn keys(&self, depth: usize) -> Option<&ZkKeys> {
        self.keys.get(&depth)
    }

    /// Run `f` with exclusive access to the registry and journal the events it emitted.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut Registry) -> Result<T, CredError>) -> Result<T, ApiError> {
        let mut registry = self.registry.lock().await;
        let out = f(&mut *registry);
        self.commit(&mut *registry, out).await
    }

    /// [`mutate`](Self::mutate) with `f` on a blocking thread, for pairing checks.
    pub async fn mutate_blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Registry) -> Result<T, CredError> + Send + 'static,
        T: Send + 'static,
    {
        let mut registry = self.registry.clone().lock_owned().await;
        let (mut registry, out) = tokio::task::spawn_blocking(move || {
            let out = f(&mut *registry);
            (registry, out)
        })
        .await
        .map_err(|_| ApiError::Internal)?;
        self.commit(&mut *registry, out).await
    }

    /// Read-only access to the registry.
    pub async fn read_registry<T>(&self, f: impl FnOnce(&Registry) -> Result<T, CredError>) -> Result<T, ApiError> {
        let registry = self.registry.lock().await;
        Ok(f(&*registry)?)
    }

    /// Journal what the call emitted. If the append fails the in-memory change is discarded by
    /// rebuilding the registry from the journal.
    async fn commit<T>(&self, registry: &mut Registry, out: Result<T, CredError>) -> Result<T, ApiError> {
        let events = registry.drain_events();
        let out = out?;

        if let Err(e) = db::append_events(&self.db, &events).await {
            error!(events = events.len(), "journal append failed, rebuilding registry");
            *registry = restore(&self.db, registry.empty_copy()).await?;
            return Err(e);
        }
        Ok(out)
    }
}
