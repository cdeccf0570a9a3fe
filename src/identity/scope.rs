//! Row-visibility scopes.
//!
//! `scope_for` decides, per resource kind, whether a viewer sees every row or
//! only rows they own or are assigned. The result is a predicate
//! *description*; stores translate it (see `Filter::to_document_filter`) and
//! must apply it as a query pre-condition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::authorizer::at_least;
use super::principal::{Identity, Role};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Contact,
    Company,
    Case,
    Task,
    Document,
    Activity,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Contact,
        ResourceKind::Company,
        ResourceKind::Case,
        ResourceKind::Task,
        ResourceKind::Document,
        ResourceKind::Activity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Contact => "contact",
            ResourceKind::Company => "company",
            ResourceKind::Case => "case",
            ResourceKind::Task => "task",
            ResourceKind::Document => "document",
            ResourceKind::Activity => "activity",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::user("invalid_resource".to_string(), format!("unknown resource kind '{}'", s)))
    }
}

/// Visibility policy for one resource kind.
struct Policy {
    /// Minimum role that sees every row. `None` means always unrestricted.
    unrestricted_from: Option<Role>,
    /// Ownership/assignment fields, OR-combined, when restricted.
    owner_fields: &'static [&'static str],
}

fn policy(kind: ResourceKind) -> Policy {
    match kind {
        ResourceKind::Contact => Policy { unrestricted_from: Some(Role::Manager), owner_fields: &["assignedTo", "createdBy"] },
        ResourceKind::Task => Policy { unrestricted_from: Some(Role::Manager), owner_fields: &["assignedTo"] },
        ResourceKind::Activity => Policy { unrestricted_from: Some(Role::Manager), owner_fields: &["userId"] },
        // Shared pipeline data; document visibility is left to the UI.
        ResourceKind::Case | ResourceKind::Company | ResourceKind::Document => Policy { unrestricted_from: None, owner_fields: &[] },
    }
}

/// Predicate description handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    All,
    Eq { field: String, value: String },
    Or { any: Vec<Filter> },
    And { all: Vec<Filter> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq { field: field.into(), value: value.into() }
    }

    /// AND-combine two predicates, dropping `All` operands.
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And { all: mut a }, Filter::And { all: b }) => { a.extend(b); Filter::And { all: a } }
            (Filter::And { all: mut a }, f) | (f, Filter::And { all: mut a }) => { a.push(f); Filter::And { all: a } }
            (a, b) => Filter::And { all: vec![a, b] },
        }
    }

    pub fn is_unrestricted(&self) -> bool { matches!(self, Filter::All) }

    /// Evaluate against a JSON row. Missing or non-string fields never match.
    pub fn matches(&self, row: &JsonValue) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => row.get(field).and_then(|v| v.as_str()) == Some(value.as_str()),
            Filter::Or { any } => any.iter().any(|f| f.matches(row)),
            Filter::And { all } => all.iter().all(|f| f.matches(row)),
        }
    }

    /// Render in document-store query form.
    pub fn to_document_filter(&self) -> JsonValue {
        match self {
            Filter::All => json!({}),
            Filter::Eq { field, value } => {
                let mut m = serde_json::Map::new();
                m.insert(field.clone(), JsonValue::String(value.clone()));
                JsonValue::Object(m)
            }
            Filter::Or { any } => json!({ "$or": any.iter().map(|f| f.to_document_filter()).collect::<Vec<_>>() }),
            Filter::And { all } => json!({ "$and": all.iter().map(|f| f.to_document_filter()).collect::<Vec<_>>() }),
        }
    }
}

/// Scope for `viewer` over `kind`.
pub fn scope_for(viewer: &Identity, kind: ResourceKind) -> Filter {
    let p = policy(kind);
    let Some(min) = p.unrestricted_from else { return Filter::All; };
    if at_least(Some(viewer), min) {
        return Filter::All;
    }
    owned_by(viewer, p.owner_fields)
}

/// Activity scope with the caller's optional `userId` request folded in.
/// Managers and above may ask for anyone's history (or everyone's); below
/// that the scope stays pinned to the viewer whatever was requested.
pub fn activity_scope(viewer: &Identity, requested_user: Option<&str>) -> Filter {
    let base = scope_for(viewer, ResourceKind::Activity);
    match requested_user.map(str::trim).filter(|u| !u.is_empty()) {
        Some(uid) if base.is_unrestricted() => Filter::eq("userId", uid),
        _ => base,
    }
}

fn owned_by(viewer: &Identity, fields: &[&str]) -> Filter {
    let mut preds: Vec<Filter> = fields.iter().map(|f| Filter::eq(*f, viewer.id.clone())).collect();
    if preds.len() == 1 { preds.remove(0) } else { Filter::Or { any: preds } }
}
