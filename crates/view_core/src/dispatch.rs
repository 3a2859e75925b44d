//! Dispatch policy machinery: the fixed operation/policy table and the
//! generation counters that make a newer latest-wins invocation supersede a
//! still-running one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// A new invocation supersedes any still-running invocation of the same
    /// operation; the older one's eventual result is discarded silently.
    LatestWins,
    /// Invocations run independently and concurrently, each with its own
    /// completion channel and terminal event.
    RunAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadViews,
    AddView,
    DeleteView,
    EditView,
    CascadeFromItem,
    CascadeFromDashboard,
    DatasetSchema,
    SourceSchema,
    ExecuteSql,
    GetData,
    GetDistinctValue,
    GetDataFromItem,
    GetViewTeam,
}

impl Operation {
    /// Authoritative binding, fixed at compile time.
    pub fn policy(self) -> Policy {
        match self {
            Operation::LoadViews
            | Operation::SourceSchema
            | Operation::ExecuteSql
            | Operation::GetViewTeam => Policy::LatestWins,
            Operation::AddView
            | Operation::DeleteView
            | Operation::EditView
            | Operation::CascadeFromItem
            | Operation::CascadeFromDashboard
            | Operation::DatasetSchema
            | Operation::GetData
            | Operation::GetDistinctValue
            | Operation::GetDataFromItem => Policy::RunAll,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::LoadViews => "load_views",
            Operation::AddView => "add_view",
            Operation::DeleteView => "delete_view",
            Operation::EditView => "edit_view",
            Operation::CascadeFromItem => "cascade_from_item",
            Operation::CascadeFromDashboard => "cascade_from_dashboard",
            Operation::DatasetSchema => "dataset_schema",
            Operation::SourceSchema => "source_schema",
            Operation::ExecuteSql => "execute_sql",
            Operation::GetData => "get_data",
            Operation::GetDistinctValue => "get_distinct_value",
            Operation::GetDataFromItem => "get_data_from_item",
            Operation::GetViewTeam => "get_view_team",
        }
    }
}

/// Per-operation generation counter for latest-wins dispatch. Incrementing at
/// invocation start is the single synchronization point; in-flight transport
/// calls are never cancelled, their results are dropped on arrival.
#[derive(Debug, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    /// Starts a new invocation, superseding every earlier ticket at once.
    pub fn begin(&self) -> Ticket {
        let seq = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            current: Arc::clone(&self.current),
            seq,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    current: Arc<AtomicU64>,
    seq: u64,
}

impl Ticket {
    /// Whether this invocation is still the most recent one. Checked before
    /// every observable effect and after every suspension point.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.seq
    }
}

/// One generation slot per latest-wins operation.
#[derive(Debug, Default)]
pub struct LatestWinsGates {
    pub load_views: Generation,
    pub source_schema: Generation,
    pub execute_sql: Generation,
    pub view_team: Generation,
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
