//! worker_install and worker_activate tool implementations.
//!
//! These are the install-phase and activate-phase hooks of the hosting runtime.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheWorker;
use swcache_client::worker::DeletionFailure;

use super::json_result;

/// A manifest path that was not pre-cached.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkippedAsset {
    pub path: String,
    pub error: String,
}

/// A stale generation that survived activation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UndeletedGeneration {
    pub name: String,
    pub error: String,
}

impl From<DeletionFailure> for UndeletedGeneration {
    fn from(failure: DeletionFailure) -> Self {
        Self { name: failure.name, error: failure.error }
    }
}

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Generation the assets were written to.
    pub cache_name: String,
    /// Manifest paths now stored.
    pub cached: Vec<String>,
    /// Manifest paths that were skipped.
    pub skipped: Vec<SkippedAsset>,
    /// Worker state after install.
    pub state: String,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub cache_name: String,
    /// Stale generations removed.
    pub deleted: Vec<String>,
    /// Stale generations that could not be removed, with the reason.
    pub failed: Vec<UndeletedGeneration>,
    /// Client pages newly controlled by this generation.
    pub claimed: usize,
    pub state: String,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(worker: &CacheWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;

    let output = InstallOutput {
        cache_name: report.cache_name,
        cached: report.cached,
        skipped: report
            .failed
            .into_iter()
            .map(|f| SkippedAsset { path: f.path, error: f.error })
            .collect(),
        state: worker.state().await.to_string(),
    };

    json_result(&output)
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &CacheWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;

    let output = ActivateOutput {
        cache_name: report.cache_name,
        deleted: report.deleted,
        failed: report.failed.into_iter().map(UndeletedGeneration::from).collect(),
        claimed: report.claimed,
        state: worker.state().await.to_string(),
    };

    json_result(&output)
}
