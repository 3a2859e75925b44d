use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{OrgId, ProjectId, SourceId, ViewId};

/// Business-level status carried inside an otherwise successful transport
/// response. The transport reports protocol failures; this header reports
/// application rejections (delete conflicts, SQL errors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ResponseHeader {
    pub fn ok() -> Self {
        Self {
            code: 200,
            msg: None,
        }
    }
}

/// Raw server response shape: header plus an optional payload body.
/// A missing payload field marks the envelope as malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub header: ResponseHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    pub fn ok(payload: Value) -> Self {
        Self {
            header: ResponseHeader::ok(),
            payload: Some(payload),
        }
    }
}

/// Body for view create/update calls. Update serializes exactly the subset
/// the server accepts, so the same type covers both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDraft {
    pub id: ViewId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    pub sql: String,
    pub source_id: SourceId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: Value,
}

/// One already-resolved ancestor selection in a cascade chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentSelection {
    pub column: String,
    pub value: Value,
}

/// SQL context a widget carries when it asks for dependent values: ad-hoc
/// statement plus the filter fragments and parameter lists currently applied
/// at the manual, linkage and global levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlContext {
    #[serde(default)]
    pub ad_hoc: String,
    #[serde(default)]
    pub filters: String,
    #[serde(default)]
    pub linkage_filters: String,
    #[serde(default)]
    pub global_filters: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub params: Vec<QueryParam>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub linkage_params: Vec<QueryParam>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub global_params: Vec<QueryParam>,
}

/// Request body for a dependent-value query. `parents` is omitted from the
/// wire entirely when no chain exists, never serialized as null or `[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeRequest {
    pub ad_hoc: String,
    pub manual_filters: String,
    pub params: Vec<QueryParam>,
    pub child_field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<ParentSelection>>,
}

/// Body of an item-originated data fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQuery {
    pub groups: Vec<String>,
    pub aggregators: Vec<Value>,
    pub filters: Vec<Value>,
    pub params: Vec<QueryParam>,
    pub orders: Vec<Value>,
    pub cache: bool,
    pub expired: i64,
}

/// Minimal projection of a project record; the team lookup only needs the
/// owning organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub org_id: OrgId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Accepts either a single element or a sequence; callers upstream send both.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
