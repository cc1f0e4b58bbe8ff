//! cache_list tool implementation.
//!
//! Lists every generation with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheWorker;

use crate::tools::json_result;

/// One generation in the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSummary {
    pub name: String,
    pub entries: u64,
    /// Whether this is the worker's current generation.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub state: String,
    pub generations: Vec<GenerationSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &CacheWorker) -> Result<CallToolResult, McpError> {
    let storage = worker.storage();
    let mut generations = Vec::new();

    for name in storage.generation_names().await? {
        let entries = storage.generation(&name).len().await?;
        let current = name == worker.cache_name();
        generations.push(GenerationSummary { name, entries, current });
    }

    let output = CacheListOutput { state: worker.state().await.to_string(), generations };
    json_result(&output)
}
