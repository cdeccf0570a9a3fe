//! Append-only activity audit trail.
//!
//! Recording is best-effort: a failed write is logged and dropped, never
//! returned to the operation being documented. Reads degrade to an empty
//! history on store failure.

mod model;
mod store;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

pub use model::{ActivityAction, ActivityQuery, ActivityRecord, NewActivity, DEFAULT_LIMIT, MAX_LIMIT};
pub use store::{ActivityStore, JsonlActivityStore, MemoryActivityStore};

use crate::identity::{Filter, Identity};

#[derive(Clone)]
pub struct ActivityRecorder {
    store: Arc<dyn ActivityStore>,
}

impl ActivityRecorder {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self { Self { store } }

    /// Persist one record attributed to `actor`. Always returns normally.
    pub async fn record(&self, actor: &Identity, entry: NewActivity) {
        let rec = entry.into_record(actor, Utc::now());
        match self.store.insert(&rec).await {
            Ok(()) => debug!(target: "audit", id = %rec.id, entity_type = %rec.entity_type, entity_id = %rec.entity_id, "activity recorded"),
            Err(e) => warn!(
                target: "audit",
                entity_type = %rec.entity_type,
                entity_id = %rec.entity_id,
                user_id = %rec.user_id,
                "activity write failed: {:#}", e
            ),
        }
    }

    /// Newest-first history. `scope` is the viewer's visibility predicate and
    /// is AND-combined with the query's own filters.
    pub async fn query(&self, scope: &Filter, query: &ActivityQuery) -> Vec<ActivityRecord> {
        let filter = scope.clone().and(query.filter());
        match self.store.find(&filter, query.effective_limit()).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(target: "audit", "activity read failed: {:#}", e);
                Vec::new()
            }
        }
    }
}
