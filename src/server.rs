//! Path-addressed asynchronous asset loading
//!
//! The asset server turns a path into an immediately-usable handle while
//! fetching and decoding happen in the background, with per-path request
//! deduplication and observable load state.

use std::any::Any;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::handle::{AssetId, AssetRef, Handle};
use crate::loader::{AssetLoader, ErasedLoader, extension_of};
use crate::source::{AssetSource, FetchError};
use crate::storage::Assets;

/// Lifecycle stage of a path-based load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The server has never seen this handle or path
    #[default]
    NotLoaded,
    /// A load pipeline is registered and has not reached a terminal state
    Loading,
    /// The decoded value is available
    Loaded,
    /// The load failed; the error stays on the loading record
    Failed,
}

/// Errors that can occur during asset loading and lookup
#[derive(Debug, Clone)]
pub enum AssetError {
    /// The byte fetch failed
    Fetch(FetchError),
    /// No loader is registered for the path's extension, or the path has none
    UnregisteredLoader(String),
    /// The matched loader failed to decode the bytes
    Decode(String),
    /// The handle or path was never registered with this server
    NotFound(String),
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch failed: {e}"),
            Self::UnregisteredLoader(path) => write!(f, "no loader registered for {path:?}"),
            Self::Decode(e) => write!(f, "decode failed: {e}"),
            Self::NotFound(what) => write!(f, "unknown asset {what}"),
        }
    }
}

impl std::error::Error for AssetError {}

/// Asset server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of worker threads executing load pipelines
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
        }
    }
}

impl ServerConfig {
    /// Set the number of load workers
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// The whole fetch+decode pipeline for one path, shared between the worker
/// that drives it and any callers awaiting it.
type PipelineFuture = Shared<BoxFuture<'static, Result<(), AssetError>>>;

/// Per-asset loading record
struct LoadRecord {
    path: String,
    state: LoadState,
    error: Option<AssetError>,
}

#[derive(Default)]
struct ServerState {
    path_to_id: FxHashMap<String, AssetId>,
    id_to_path: FxHashMap<AssetId, String>,
    records: FxHashMap<AssetId, LoadRecord>,
    /// Dedup map: one in-flight pipeline per registered path
    pending: FxHashMap<String, (AssetId, PipelineFuture)>,
    decoded: FxHashMap<AssetId, Arc<dyn Any + Send + Sync>>,
    loaders: FxHashMap<String, Arc<dyn ErasedLoader>>,
}

/// Loads assets from an [`AssetSource`] and tracks their load state.
///
/// `load` registers the path and returns a handle synchronously; a
/// background pipeline fetches the bytes, picks a loader by the path's
/// extension and decodes the value. Failures are captured on the per-asset
/// record and surface through [`get_load_state`](Self::get_load_state) and
/// [`wait_for_load`](Self::wait_for_load), never through `load` itself.
///
/// The server can be cloned; clones share state and can be used from
/// multiple threads.
#[derive(Clone)]
pub struct AssetServer {
    state: Arc<Mutex<ServerState>>,
    source: Arc<dyn AssetSource>,
    jobs: Sender<PipelineFuture>,
}

impl AssetServer {
    /// Create a server reading from the given source, with default config
    #[must_use]
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self::with_config(source, ServerConfig::default())
    }

    /// Create a server with an explicit configuration
    #[must_use]
    pub fn with_config(source: Arc<dyn AssetSource>, config: ServerConfig) -> Self {
        let workers = config.workers.max(1);
        let (send, recv) = crossbeam_channel::unbounded::<PipelineFuture>();

        for _ in 0..workers {
            spawn_worker(recv.clone());
        }
        log::info!("asset server started with {workers} load workers");

        Self {
            state: Arc::new(Mutex::new(ServerState::default())),
            source,
            jobs: send,
        }
    }

    /// Register a loader for each extension it declares.
    ///
    /// A later registration for an already-claimed extension silently
    /// replaces the earlier one; there is no fallback chain.
    pub fn register_loader<L: AssetLoader>(&self, loader: L) {
        let extensions: Vec<String> = loader
            .extensions()
            .iter()
            .map(|ext| ext.to_ascii_lowercase())
            .collect();
        let loader: Arc<dyn ErasedLoader> = Arc::new(loader);

        let mut state = self.state.lock();
        for ext in extensions {
            let replaced = state.loaders.insert(ext.clone(), Arc::clone(&loader));
            if replaced.is_some() {
                log::debug!("replaced existing loader for extension {ext:?}");
            }
        }
    }

    /// Request a load and get a handle immediately.
    ///
    /// Never fails synchronously. If the path is already registered the
    /// existing handle is returned and no new pipeline starts; otherwise the
    /// path↔id mapping is registered before this call returns, which is what
    /// guarantees at most one pipeline per path.
    pub fn load<T: Send + Sync + 'static>(&self, path: impl Into<String>) -> Handle<T> {
        let path = path.into();
        let mut state = self.state.lock();

        if let Some(&id) = state.path_to_id.get(&path) {
            return Handle::new(id);
        }

        let id = AssetId::new();
        state.path_to_id.insert(path.clone(), id);
        state.id_to_path.insert(id, path.clone());
        state.records.insert(
            id,
            LoadRecord {
                path: path.clone(),
                state: LoadState::Loading,
                error: None,
            },
        );

        let pipeline = run_pipeline(
            Arc::clone(&self.state),
            Arc::clone(&self.source),
            id,
            path.clone(),
        )
        .boxed()
        .shared();
        state.pending.insert(path.clone(), (id, pipeline.clone()));
        drop(state);

        log::trace!("queued load of {path:?} as {id}");
        self.jobs.send(pipeline).expect("load queue disconnected");

        Handle::new(id)
    }

    /// Load a path and wait until it reaches a terminal state.
    ///
    /// On success the decoded value is also placed into `assets` under the
    /// same ID with a reference count of 1, unless the store already
    /// contains it.
    ///
    /// # Errors
    ///
    /// Returns the captured pipeline error if the load fails.
    pub async fn load_async<T>(
        &self,
        path: impl Into<String>,
        assets: &mut Assets<T>,
    ) -> Result<Handle<T>, AssetError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let handle = self.load::<T>(path);
        self.wait_for_load(&handle).await?;

        if !assets.contains(&handle) {
            match self.get_asset(&handle) {
                Some(value) => {
                    assets.add_with_id(handle.id(), (*value).clone());
                }
                None => log::warn!(
                    "loaded asset {} does not match the requested type",
                    handle.id()
                ),
            }
        }
        Ok(handle)
    }

    /// Wait until the asset behind a handle reaches a terminal state.
    ///
    /// Completes immediately when already `Loaded`; otherwise awaits the
    /// outstanding pipeline, which spans decode completion, not just the
    /// byte fetch.
    ///
    /// # Errors
    ///
    /// `NotFound` for a handle unknown to this server; otherwise the error
    /// captured by the failed pipeline.
    pub async fn wait_for_load<T>(&self, handle: &impl AssetRef<T>) -> Result<(), AssetError> {
        let id = handle.id();
        let pending = {
            let state = self.state.lock();
            let Some(record) = state.records.get(&id) else {
                return Err(AssetError::NotFound(id.to_string()));
            };
            match record.state {
                LoadState::Loaded => return Ok(()),
                LoadState::Failed => {
                    let error = record
                        .error
                        .clone()
                        .expect("failed load record is missing its error");
                    return Err(error);
                }
                _ => state
                    .pending
                    .get(&record.path)
                    .map(|(_, pipeline)| pipeline.clone()),
            }
        };

        match pending {
            Some(pipeline) => pipeline.await,
            // the registration was torn down while we were looking
            None => Err(AssetError::NotFound(id.to_string())),
        }
    }

    /// Get the load state for a handle; `NotLoaded` for unknown handles
    #[must_use]
    pub fn get_load_state<T>(&self, handle: &impl AssetRef<T>) -> LoadState {
        self.state
            .lock()
            .records
            .get(&handle.id())
            .map_or(LoadState::NotLoaded, |record| record.state)
    }

    /// Get the path a handle was loaded from
    #[must_use]
    pub fn get_path<T>(&self, handle: &impl AssetRef<T>) -> Option<String> {
        self.state.lock().id_to_path.get(&handle.id()).cloned()
    }

    /// Get the handle registered for a path
    #[must_use]
    pub fn get_handle<T>(&self, path: &str) -> Option<Handle<T>> {
        self.state.lock().path_to_id.get(path).map(|&id| Handle::new(id))
    }

    /// Get the decoded value for a handle.
    ///
    /// Populated only once the state is `Loaded`; `None` if the decoded
    /// value is not of type `T`.
    #[must_use]
    pub fn get_asset<T: Send + Sync + 'static>(&self, handle: &impl AssetRef<T>) -> Option<Arc<T>> {
        let state = self.state.lock();
        let record = state.records.get(&handle.id())?;
        if record.state != LoadState::Loaded {
            return None;
        }
        let value = state.decoded.get(&handle.id())?;
        Arc::clone(value).downcast::<T>().ok()
    }

    /// Tear down the registration for a path.
    ///
    /// Removes the path↔id mapping, the loading record and the pending
    /// dedup entry. A pipeline already running is not cancelled; its
    /// terminal transition is discarded. A decoded value already stored is
    /// kept, though it becomes unreachable through `get_asset` once the
    /// record is gone. The path can be requested again afterwards under a
    /// fresh ID.
    pub fn unload(&self, path: &str) {
        let mut state = self.state.lock();
        if let Some(id) = state.path_to_id.remove(path) {
            state.id_to_path.remove(&id);
            state.records.remove(&id);
            log::debug!("unloaded {path:?} ({id})");
        }
        state.pending.remove(path);
    }

    /// Reset all path/id/loading/pending registries.
    ///
    /// Decoded values are kept for the lifetime of the server so `Arc`
    /// clones already handed out stay valid; registered loaders are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.path_to_id.clear();
        state.id_to_path.clear();
        state.records.clear();
        state.pending.clear();
        log::debug!("asset server registries cleared");
    }
}

/// Spawns a detached worker that drives queued pipelines to completion.
fn spawn_worker(jobs: Receiver<PipelineFuture>) {
    thread::spawn(move || {
        while let Ok(pipeline) = jobs.recv() {
            // outcome already recorded on the loading record
            let _ = futures::executor::block_on(pipeline);
        }
    });
}

/// The background pipeline for one registered path: fetch, decode, then a
/// single terminal state transition.
async fn run_pipeline(
    state: Arc<Mutex<ServerState>>,
    source: Arc<dyn AssetSource>,
    id: AssetId,
    path: String,
) -> Result<(), AssetError> {
    log::trace!("loading {path:?}");
    let outcome = fetch_and_decode(&state, &source, &path).await;

    let mut state = state.lock();
    // apply the transition only if the registration is still live; unload
    // may have torn it down while the pipeline was running
    let live = matches!(state.records.get(&id), Some(r) if r.state == LoadState::Loading);
    if live {
        match &outcome {
            Ok(value) => {
                state.decoded.insert(id, Arc::clone(value));
                if let Some(record) = state.records.get_mut(&id) {
                    record.state = LoadState::Loaded;
                }
                log::trace!("loaded {path:?}");
            }
            Err(error) => {
                if let Some(record) = state.records.get_mut(&id) {
                    record.state = LoadState::Failed;
                    record.error = Some(error.clone());
                }
                log::error!("failed to load {path:?}: {error}");
            }
        }
    }
    // drop the dedup entry unless the path was re-registered under a new id
    if state.pending.get(&path).is_some_and(|(owner, _)| *owner == id) {
        state.pending.remove(&path);
    }
    drop(state);

    outcome.map(|_| ())
}

async fn fetch_and_decode(
    state: &Mutex<ServerState>,
    source: &Arc<dyn AssetSource>,
    path: &str,
) -> Result<Arc<dyn Any + Send + Sync>, AssetError> {
    let bytes = source.fetch(path).await.map_err(AssetError::Fetch)?;

    let Some(ext) = extension_of(path) else {
        return Err(AssetError::UnregisteredLoader(path.to_string()));
    };
    let loader = {
        let state = state.lock();
        state.loaders.get(&ext).cloned()
    };
    let Some(loader) = loader else {
        return Err(AssetError::UnregisteredLoader(path.to_string()));
    };

    loader
        .load(bytes, path)
        .await
        .map_err(|e| AssetError::Decode(e.to_string()))
}
