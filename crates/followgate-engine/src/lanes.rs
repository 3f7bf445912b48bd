//! Per-lead execution lanes — single writer per lead, full parallelism
//! across leads.
//!
//! Two rules racing on the same lead could both read a stale
//! `last_outbound_at`, both pass the cooldown guard, and double-send. Every
//! evaluate/commit cycle therefore runs under the lead's lane lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

pub struct LeadLanes {
    lanes: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LeadLanes {
    pub fn new() -> Self {
        Self {
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// The lane for a lead. Hold the returned mutex for the entire
    /// load → evaluate → execute → commit cycle.
    pub fn lane(&self, lead_id: &str) -> Arc<AsyncMutex<()>> {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        lanes
            .entry(lead_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drop lanes nobody holds, bounding map growth on busy tenants.
    pub fn prune(&self) {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        lanes.retain(|_, lane| Arc::strong_count(lane) > 1);
    }

    pub fn len(&self) -> usize {
        self.lanes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LeadLanes {
    fn default() -> Self {
        Self::new()
    }
}
