//! Builders for dependent-value request bodies.

use serde_json::{Map, Value};
use shared::protocol::{CascadeRequest, ParentSelection, SqlContext};

/// Assembles the body for an item-originated cascade query: filter fragments
/// merged into one `and`-joined expression, parameter lists flattened in
/// manual/linkage/global order, parents attached only when a chain exists.
pub fn from_item(sql: &SqlContext, column: &str, parents: &[ParentSelection]) -> CascadeRequest {
    let mut params = sql.params.clone();
    params.extend(sql.linkage_params.iter().cloned());
    params.extend(sql.global_params.iter().cloned());

    CascadeRequest {
        ad_hoc: sql.ad_hoc.clone(),
        manual_filters: join_filters(&[&sql.filters, &sql.linkage_filters, &sql.global_filters]),
        params,
        child_field_name: column.to_string(),
        parents: parent_chain(parents),
    }
}

/// Dashboard-originated cascades carry no ad-hoc SQL context; only the child
/// field and the optional parent chain vary.
pub fn from_dashboard(column: &str, parents: &[ParentSelection]) -> CascadeRequest {
    CascadeRequest {
        ad_hoc: String::new(),
        manual_filters: String::new(),
        params: Vec::new(),
        child_field_name: column.to_string(),
        parents: parent_chain(parents),
    }
}

/// Converts a `{column: value}` selection map into a parent chain, keeping
/// the map's own order.
pub fn parents_from_filters(filters: &Map<String, Value>) -> Vec<ParentSelection> {
    filters
        .iter()
        .map(|(column, value)| ParentSelection {
            column: column.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Joins the non-empty fragments with `" and "`; empty fragments are dropped
/// before joining so no stray separator appears.
pub fn join_filters(fragments: &[&str]) -> String {
    fragments
        .iter()
        .filter(|fragment| !fragment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" and ")
}

fn parent_chain(parents: &[ParentSelection]) -> Option<Vec<ParentSelection>> {
    if parents.is_empty() {
        None
    } else {
        Some(parents.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/cascade_tests.rs"]
mod tests;
