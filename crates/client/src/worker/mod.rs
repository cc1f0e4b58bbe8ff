//! Cache worker: generation lifecycle and fetch interception.
//!
//! The worker moves through `Parsed -> Installing -> Installed -> Activating -> Activated`.
//! Install pre-fetches the manifest into the current generation on a best-effort
//! basis and skips the waiting phase. Activate deletes every other generation
//! and claims all open clients. Only an activated worker intercepts fetches.

mod clients;

pub use clients::ClientRegistry;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use swcache_core::{AppConfig, CacheStorage, Error, Generation, PrecacheManifest};
use tokio::sync::RwLock;
use url::Url;

use crate::background::BackgroundTasks;
use crate::fetch::{Network, resolve};
use crate::request::Request;
use crate::response::Response;
use crate::router::{Route, Router};
use crate::strategy::{self, StrategyContext};

/// Lifecycle position of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        };
        f.write_str(name)
    }
}

/// A manifest entry that was left out of the generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheFailure {
    pub path: String,
    pub error: String,
}

/// Result of the install phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

/// A stale generation that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionFailure {
    pub name: String,
    pub error: String,
}

/// Result of the activate phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    pub cache_name: String,
    pub deleted: Vec<String>,
    pub failed: Vec<DeletionFailure>,
    pub claimed: usize,
}

/// What the host should do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host fetches natively.
    Passthrough,
    Respond(Response),
}

/// Owns the current generation and serves intercepted requests.
pub struct CacheWorker {
    storage: CacheStorage,
    network: Arc<dyn Network>,
    router: Router,
    manifest: PrecacheManifest,
    cache_name: String,
    background: BackgroundTasks,
    clients: ClientRegistry,
    state: RwLock<WorkerState>,
}

impl CacheWorker {
    pub fn new(
        storage: CacheStorage, network: Arc<dyn Network>, router: Router, manifest: PrecacheManifest,
        cache_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            network,
            router,
            manifest,
            cache_name: cache_name.into(),
            background: BackgroundTasks::new(),
            clients: ClientRegistry::new(),
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    /// Build a worker for the configured origin, asset prefixes, and cache name.
    pub fn from_config(
        config: &AppConfig, manifest: PrecacheManifest, storage: CacheStorage, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let router = Router::new(origin, config.asset_prefixes.clone());
        Ok(Self::new(storage, network, router, manifest, config.cache_name()))
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &Url {
        self.router.origin()
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Handle to the current generation.
    pub fn generation(&self) -> Generation {
        self.storage.generation(&self.cache_name)
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Open the current generation and pre-fetch the manifest into it.
    ///
    /// Entries that fail to fetch, or come back uncacheable, are skipped and
    /// reported. Installation completes either way and then skips waiting.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkerState` unless the worker is freshly parsed, and
    /// any store error from opening the generation.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed], WorkerState::Installing).await?;

        let generation = match self.storage.open_generation(&self.cache_name).await {
            Ok(generation) => generation,
            Err(e) => {
                *self.state.write().await = WorkerState::Parsed;
                return Err(e);
            }
        };

        tracing::info!(cache = %self.cache_name, assets = self.manifest.len(), "pre-caching assets");

        let generation = &generation;
        let results = join_all(
            self.manifest
                .assets()
                .iter()
                .map(|path| async move { (path.clone(), self.precache(generation, path).await) }),
        )
        .await;

        let mut report = InstallReport { cache_name: self.cache_name.clone(), cached: Vec::new(), failed: Vec::new() };
        for (path, result) in results {
            match result {
                Ok(()) => report.cached.push(path),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "precache entry skipped");
                    report.failed.push(PrecacheFailure { path, error: e.to_string() });
                }
            }
        }

        tracing::info!(
            cache = %self.cache_name,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "install complete, skipping waiting"
        );

        *self.state.write().await = WorkerState::Installed;
        Ok(report)
    }

    async fn precache(&self, generation: &Generation, path: &str) -> Result<(), Error> {
        let url = resolve(self.router.origin(), path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let request = Request::get(url);
        let response = self.network.fetch(&request).await?;

        if !response.is_cacheable() {
            return Err(Error::Uncacheable(format!("{} returned {} {}", path, response.status, response.response_type)));
        }

        generation.put(&response.to_stored(&request)).await
    }

    /// Delete every generation but the current one, then claim all clients.
    ///
    /// Deletions run in parallel and fail independently.
    ///
    /// # Errors
    ///
    /// Returns `Error::WorkerState` before install has completed, and any
    /// store error from listing generations.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = self.state().await;
        self.transition(&[WorkerState::Installed, WorkerState::Activated], WorkerState::Activating)
            .await?;

        let names = match self.storage.generation_names().await {
            Ok(names) => names,
            Err(e) => {
                *self.state.write().await = previous;
                return Err(e);
            }
        };

        let stale: Vec<String> = names.into_iter().filter(|name| *name != self.cache_name).collect();
        let results = join_all(stale.into_iter().map(|name| async move {
            let result = self.storage.delete_generation(&name).await;
            (name, result)
        }))
        .await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(_) => {
                    tracing::info!(generation = %name, "deleted stale generation");
                    deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(generation = %name, error = %e, "failed to delete stale generation");
                    failed.push(DeletionFailure { name, error: e.to_string() });
                }
            }
        }

        let claimed = self.clients.claim(&self.cache_name).await;
        *self.state.write().await = WorkerState::Activated;

        tracing::info!(cache = %self.cache_name, deleted = deleted.len(), claimed, "activated");
        Ok(ActivateReport { cache_name: self.cache_name.clone(), deleted, failed, claimed })
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::WorkerState(format!("cannot enter {to} from {}", *state)));
        }
        *state = to;
        Ok(())
    }

    /// Record an open page. Pages opened after activation are controlled at once.
    pub async fn register_client(&self, id: &str) {
        self.clients.register(id).await;
        if self.state().await == WorkerState::Activated {
            self.clients.claim(&self.cache_name).await;
        }
    }

    /// Cache name of the generation controlling the page, if any.
    pub async fn controller_of(&self, id: &str) -> Option<String> {
        self.clients.controller_of(id).await
    }

    /// Intercept one request.
    ///
    /// # Errors
    ///
    /// Only `Error::OfflineNavigation`, for a navigation that failed with
    /// neither the page nor the root document stored.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if self.state().await != WorkerState::Activated {
            tracing::debug!(url = %request.url, "worker not active, passing through");
            return Ok(FetchOutcome::Passthrough);
        }

        let tag = match self.router.classify(request) {
            Route::Passthrough => return Ok(FetchOutcome::Passthrough),
            Route::Strategy(tag) => tag,
        };

        let ctx = StrategyContext::new(self.network.clone(), self.generation(), self.background.clone());
        strategy::execute(tag, request, &ctx).await.map(FetchOutcome::Respond)
    }

    /// Wait until every detached store write and revalidation has finished.
    pub async fn settle(&self) -> usize {
        self.background.drain().await
    }
}

#[cfg(test)]
mod tests;
