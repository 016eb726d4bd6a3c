//! Shared state handed to every RPC handler (spec §6): the persistence
//! backend, the deployed-graph runtime, and the scheduler backing it.

use agenticlaw_runtime::Runtime;
use agenticlaw_scheduler::Scheduler;
use agenticlaw_storage::StorageBackend;
use std::sync::Arc;

pub struct RpcContext {
    pub storage: Arc<dyn StorageBackend>,
    pub runtime: Arc<Runtime>,
    pub scheduler: Arc<Scheduler>,
}

impl RpcContext {
    pub fn new(storage: Arc<dyn StorageBackend>, runtime: Arc<Runtime>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            storage,
            runtime,
            scheduler,
        }
    }
}
