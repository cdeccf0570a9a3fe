use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::identity::{Filter, Identity};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Assigned,
    StageChanged,
    NoteAdded,
}

/// Immutable audit fact. Field names match the document-store columns the
/// scope filters refer to (`userId`, `entityType`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// What a caller reports; identity and timestamp are filled in by the recorder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: String,
    pub description: String,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
}

impl NewActivity {
    pub fn new(action: ActivityAction, entity_type: impl Into<String>, entity_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self { action, entity_type: entity_type.into(), entity_id: entity_id.into(), description: description.into(), metadata: None }
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn into_record(self, actor: &Identity, at: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord {
            id: uuid::Uuid::new_v4().to_string(),
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            user_id: actor.id.clone(),
            user_name: actor.display_name(),
            description: self.description,
            metadata: self.metadata,
            created_at: at,
        }
    }
}

/// Caller-supplied filters; every supplied field is AND-combined.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ActivityQuery {
    pub fn filter(&self) -> Filter {
        let fields = [("entityType", &self.entity_type), ("entityId", &self.entity_id), ("userId", &self.user_id)];
        fields
            .into_iter()
            .filter_map(|(name, v)| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(|s| Filter::eq(name, s)))
            .fold(Filter::All, Filter::and)
    }

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;

    #[test]
    fn record_serializes_with_store_field_names() {
        let actor = Identity { id: "u1".into(), email: "u1@example.com".into(), role: Role::SalesRep, first_name: "Una".into(), last_name: "One".into() };
        let rec = NewActivity::new(ActivityAction::StageChanged, "case", "k1", "moved to won").into_record(&actor, Utc::now());
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["userId"], "u1");
        assert_eq!(v["userName"], "Una One");
        assert_eq!(v["entityType"], "case");
        assert_eq!(v["action"], "stage_changed");
        assert!(v.get("metadata").is_none());
    }

    #[test]
    fn query_filter_and_combines_supplied_fields() {
        assert_eq!(ActivityQuery::default().filter(), Filter::All);
        let q = ActivityQuery { entity_type: Some("contact".into()), entity_id: Some("c1".into()), user_id: Some(" ".into()), limit: None };
        assert_eq!(q.filter(), Filter::And { all: vec![Filter::eq("entityType", "contact"), Filter::eq("entityId", "c1")] });
    }

    #[test]
    fn limits() {
        assert_eq!(ActivityQuery::default().effective_limit(), DEFAULT_LIMIT);
        let q = ActivityQuery { limit: Some(10_000), ..Default::default() };
        assert_eq!(q.effective_limit(), MAX_LIMIT);
    }
}
