//! Effect-coordination layer for BI view queries.
//!
//! A [`ViewService`] binds each logical operation to a handler that performs
//! an HTTP call through the injected [`Transport`], normalizes the response,
//! and reports the outcome twice: on the broadcast event stream for any
//! observer, and on the invocation's own completion channel when the caller
//! supplied one. Concurrent invocations of the same operation interact under
//! the fixed policy table in [`dispatch::Operation::policy`].

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use shared::domain::{ControlId, ItemId, ProjectId, SourceId, ViewId};
use shared::protocol::{DataQuery, ParentSelection, Project, ResponseHeader, SqlContext, ViewDraft};

pub mod adapter;
pub mod cascade;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod resultset;
pub mod routes;
pub mod transport;

use adapter::read_list;
use dispatch::{LatestWinsGates, Operation, Policy, Ticket};
use error::CoreError;
use notify::Notifier;
use resultset::Resultset;
use routes::ApiRoutes;
use transport::{RequestDescriptor, Transport};

/// One invocation of an operation: its payload plus, where the operation
/// supports it, a completion channel resolved with the result on success.
/// A superseded latest-wins invocation drops its channel without sending.
#[derive(Debug)]
pub enum ViewCommand {
    LoadViews {
        project_id: ProjectId,
        done: Option<oneshot::Sender<Vec<Value>>>,
    },
    AddView {
        draft: ViewDraft,
        done: Option<oneshot::Sender<()>>,
    },
    DeleteView {
        id: ViewId,
    },
    EditView {
        draft: ViewDraft,
        done: Option<oneshot::Sender<()>>,
    },
    CascadeFromItem {
        item_id: ItemId,
        control_id: ControlId,
        view_id: ViewId,
        sql: SqlContext,
        column: String,
        parents: Vec<ParentSelection>,
    },
    CascadeFromDashboard {
        control_id: ControlId,
        view_id: ViewId,
        column: String,
        parents: Vec<ParentSelection>,
    },
    DatasetSchema {
        view_id: ViewId,
        done: Option<oneshot::Sender<Vec<String>>>,
    },
    SourceSchema {
        source_id: SourceId,
        done: Option<oneshot::Sender<Value>>,
    },
    ExecuteSql {
        sql: String,
        source_id: SourceId,
        done: Option<oneshot::Sender<Value>>,
    },
    GetData {
        view_id: ViewId,
        query: Value,
        done: Option<oneshot::Sender<Value>>,
    },
    GetDistinctValue {
        view_id: ViewId,
        field_name: String,
        filters: Map<String, Value>,
        done: Option<oneshot::Sender<Value>>,
    },
    GetDataFromItem {
        item_id: ItemId,
        view_id: ViewId,
        groups: Vec<String>,
        aggregators: Vec<Value>,
        cache: bool,
        expired: i64,
    },
    GetViewTeam {
        project_id: ProjectId,
    },
}

impl ViewCommand {
    pub fn operation(&self) -> Operation {
        match self {
            ViewCommand::LoadViews { .. } => Operation::LoadViews,
            ViewCommand::AddView { .. } => Operation::AddView,
            ViewCommand::DeleteView { .. } => Operation::DeleteView,
            ViewCommand::EditView { .. } => Operation::EditView,
            ViewCommand::CascadeFromItem { .. } => Operation::CascadeFromItem,
            ViewCommand::CascadeFromDashboard { .. } => Operation::CascadeFromDashboard,
            ViewCommand::DatasetSchema { .. } => Operation::DatasetSchema,
            ViewCommand::SourceSchema { .. } => Operation::SourceSchema,
            ViewCommand::ExecuteSql { .. } => Operation::ExecuteSql,
            ViewCommand::GetData { .. } => Operation::GetData,
            ViewCommand::GetDistinctValue { .. } => Operation::GetDistinctValue,
            ViewCommand::GetDataFromItem { .. } => Operation::GetDataFromItem,
            ViewCommand::GetViewTeam { .. } => Operation::GetViewTeam,
        }
    }
}

/// Terminal events: one success and one failure variant per operation.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    ViewsLoaded(Vec<Value>),
    LoadViewsFailed,
    ViewAdded(Value),
    AddViewFailed,
    ViewDeleted(ViewId),
    DeleteViewFailed,
    ViewEdited(ViewDraft),
    EditViewFailed,
    CascadeSourceFromItemLoaded {
        item_id: ItemId,
        control_id: ControlId,
        column: String,
        values: Vec<Map<String, Value>>,
    },
    LoadCascadeSourceFromItemFailed(String),
    CascadeSourceFromDashboardLoaded {
        control_id: ControlId,
        column: String,
        values: Vec<Map<String, Value>>,
    },
    LoadCascadeSourceFromDashboardFailed(String),
    DatasetSchemaLoaded(Vec<String>),
    LoadDatasetSchemaFailed(String),
    SchemaLoaded(Value),
    LoadSchemaFailed,
    SqlExecuted(ResponseHeader),
    ExecuteSqlFailed,
    DataLoaded,
    LoadDataFailed(String),
    DistinctValueLoaded,
    LoadDistinctValueFailed(String),
    DataFromItemLoaded {
        item_id: ItemId,
        payload: Value,
    },
    LoadDataFromItemFailed(String),
    ViewTeamLoaded(Value),
    LoadViewTeamFailed(String),
}

pub struct ViewService {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    routes: ApiRoutes,
    events: broadcast::Sender<ViewEvent>,
    gates: LatestWinsGates,
}

impl ViewService {
    pub fn new(
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        routes: ApiRoutes,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            transport,
            notifier,
            routes,
            events,
            gates: LatestWinsGates::default(),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Routes one invocation to its handler under the operation's policy.
    /// Latest-wins operations take a fresh ticket here, at dispatch time, so
    /// an older invocation is superseded the moment a newer one begins.
    pub fn dispatch(self: &Arc<Self>, command: ViewCommand) -> JoinHandle<()> {
        let operation = command.operation();
        debug!(
            operation = operation.name(),
            policy = ?operation.policy(),
            "dispatching invocation"
        );
        let service = Arc::clone(self);
        match command {
            ViewCommand::LoadViews { project_id, done } => {
                let ticket = self.gates.load_views.begin();
                tokio::spawn(service.handle_load_views(ticket, project_id, done))
            }
            ViewCommand::AddView { draft, done } => {
                tokio::spawn(service.handle_add_view(draft, done))
            }
            ViewCommand::DeleteView { id } => tokio::spawn(service.handle_delete_view(id)),
            ViewCommand::EditView { draft, done } => {
                tokio::spawn(service.handle_edit_view(draft, done))
            }
            ViewCommand::CascadeFromItem {
                item_id,
                control_id,
                view_id,
                sql,
                column,
                parents,
            } => tokio::spawn(service.handle_cascade_from_item(
                item_id, control_id, view_id, sql, column, parents,
            )),
            ViewCommand::CascadeFromDashboard {
                control_id,
                view_id,
                column,
                parents,
            } => tokio::spawn(
                service.handle_cascade_from_dashboard(control_id, view_id, column, parents),
            ),
            ViewCommand::DatasetSchema { view_id, done } => {
                tokio::spawn(service.handle_dataset_schema(view_id, done))
            }
            ViewCommand::SourceSchema { source_id, done } => {
                let ticket = self.gates.source_schema.begin();
                tokio::spawn(service.handle_source_schema(ticket, source_id, done))
            }
            ViewCommand::ExecuteSql {
                sql,
                source_id,
                done,
            } => {
                let ticket = self.gates.execute_sql.begin();
                tokio::spawn(service.handle_execute_sql(ticket, sql, source_id, done))
            }
            ViewCommand::GetData {
                view_id,
                query,
                done,
            } => tokio::spawn(service.handle_get_data(view_id, query, done)),
            ViewCommand::GetDistinctValue {
                view_id,
                field_name,
                filters,
                done,
            } => tokio::spawn(service.handle_get_distinct_value(view_id, field_name, filters, done)),
            ViewCommand::GetDataFromItem {
                item_id,
                view_id,
                groups,
                aggregators,
                cache,
                expired,
            } => tokio::spawn(service.handle_get_data_from_item(
                item_id,
                view_id,
                groups,
                aggregators,
                cache,
                expired,
            )),
            ViewCommand::GetViewTeam { project_id } => {
                let ticket = self.gates.view_team.begin();
                tokio::spawn(service.handle_get_view_team(ticket, project_id))
            }
        }
    }

    fn emit(&self, event: ViewEvent) {
        let _ = self.events.send(event);
    }

    fn discard_stale(&self, operation: Operation) {
        debug_assert_eq!(operation.policy(), Policy::LatestWins);
        debug!(
            operation = operation.name(),
            "discarding superseded invocation"
        );
    }

    async fn handle_load_views(
        self: Arc<Self>,
        ticket: Ticket,
        project_id: ProjectId,
        done: Option<oneshot::Sender<Vec<Value>>>,
    ) {
        let result: Result<Vec<Value>, CoreError> = async {
            let envelope = self
                .transport
                .perform(RequestDescriptor::get(
                    self.routes.views_for_project(project_id),
                ))
                .await?;
            let list = read_list(&envelope)?;
            Ok(list.as_array().cloned().unwrap_or_default())
        }
        .await;

        if !ticket.is_current() {
            self.discard_stale(Operation::LoadViews);
            return;
        }

        match result {
            Ok(views) => {
                self.emit(ViewEvent::ViewsLoaded(views.clone()));
                if let Some(done) = done {
                    let _ = done.send(views);
                }
            }
            Err(err) => {
                warn!(project_id = project_id.0, "load views failed: {err}");
                self.emit(ViewEvent::LoadViewsFailed);
                self.notifier.error("Failed to load view list", None);
            }
        }
    }

    async fn handle_add_view(
        self: Arc<Self>,
        draft: ViewDraft,
        done: Option<oneshot::Sender<()>>,
    ) {
        let result: Result<Value, CoreError> = async {
            let body = serde_json::to_value(&draft)?;
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(self.routes.views(), body))
                .await?;
            Ok(envelope.payload.unwrap_or(Value::Null))
        }
        .await;

        match result {
            Ok(payload) => {
                self.emit(ViewEvent::ViewAdded(payload));
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Err(err) => {
                warn!(view_id = draft.id.0, "add view failed: {err}");
                self.emit(ViewEvent::AddViewFailed);
                self.notifier.error("Failed to create view", None);
            }
        }
    }

    /// Delete is the one operation where the transport can succeed while the
    /// header carries a business rejection; the code is inspected explicitly.
    /// Any non-200 code counts as failure; 400 surfaces the server's message.
    async fn handle_delete_view(self: Arc<Self>, id: ViewId) {
        match self
            .transport
            .perform(RequestDescriptor::delete(self.routes.view(id)))
            .await
        {
            Ok(envelope) => match envelope.header.code {
                200 => self.emit(ViewEvent::ViewDeleted(id)),
                code => {
                    warn!(view_id = id.0, code, "delete view rejected by server");
                    let msg = envelope
                        .header
                        .msg
                        .unwrap_or_else(|| "Failed to delete view".to_string());
                    self.notifier.error(&msg, Some(3));
                    self.emit(ViewEvent::DeleteViewFailed);
                }
            },
            Err(err) => {
                warn!(view_id = id.0, "delete view failed: {err}");
                self.emit(ViewEvent::DeleteViewFailed);
                self.notifier.error("Failed to delete view", None);
            }
        }
    }

    async fn handle_edit_view(
        self: Arc<Self>,
        draft: ViewDraft,
        done: Option<oneshot::Sender<()>>,
    ) {
        let result: Result<(), CoreError> = async {
            let body = serde_json::to_value(&draft)?;
            self.transport
                .perform(RequestDescriptor::put(self.routes.view(draft.id), body))
                .await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                self.emit(ViewEvent::ViewEdited(draft));
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Err(err) => {
                warn!(view_id = draft.id.0, "edit view failed: {err}");
                self.emit(ViewEvent::EditViewFailed);
                self.notifier.error("Failed to update view", None);
            }
        }
    }

    async fn handle_cascade_from_item(
        self: Arc<Self>,
        item_id: ItemId,
        control_id: ControlId,
        view_id: ViewId,
        sql: SqlContext,
        column: String,
        parents: Vec<ParentSelection>,
    ) {
        let result: Result<Vec<Map<String, Value>>, CoreError> = async {
            let body = serde_json::to_value(cascade::from_item(&sql, &column, &parents))?;
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(
                    self.routes.distinct_value(view_id),
                    body,
                ))
                .await?;
            Ok(Resultset::from_rows(&read_list(&envelope)?).data_source)
        }
        .await;

        match result {
            Ok(values) => self.emit(ViewEvent::CascadeSourceFromItemLoaded {
                item_id,
                control_id,
                column,
                values,
            }),
            Err(err) => {
                warn!(view_id = view_id.0, column = %column, "item cascade failed: {err}");
                self.emit(ViewEvent::LoadCascadeSourceFromItemFailed(err.to_string()));
            }
        }
    }

    async fn handle_cascade_from_dashboard(
        self: Arc<Self>,
        control_id: ControlId,
        view_id: ViewId,
        column: String,
        parents: Vec<ParentSelection>,
    ) {
        let result: Result<Vec<Map<String, Value>>, CoreError> = async {
            let body = serde_json::to_value(cascade::from_dashboard(&column, &parents))?;
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(
                    self.routes.distinct_value(view_id),
                    body,
                ))
                .await?;
            Ok(Resultset::from_rows(&read_list(&envelope)?).data_source)
        }
        .await;

        match result {
            Ok(values) => self.emit(ViewEvent::CascadeSourceFromDashboardLoaded {
                control_id,
                column,
                values,
            }),
            Err(err) => {
                warn!(view_id = view_id.0, column = %column, "dashboard cascade failed: {err}");
                self.emit(ViewEvent::LoadCascadeSourceFromDashboardFailed(
                    err.to_string(),
                ));
            }
        }
    }

    /// Probes a dataset's column set by fetching a single row and reading the
    /// converted resultset's keys.
    async fn handle_dataset_schema(
        self: Arc<Self>,
        view_id: ViewId,
        done: Option<oneshot::Sender<Vec<String>>>,
    ) {
        let result: Result<Vec<String>, CoreError> = async {
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(
                    self.routes.resultset(view_id, 1),
                    json!({}),
                ))
                .await?;
            Ok(Resultset::from_rows(&read_list(&envelope)?).keys)
        }
        .await;

        match result {
            Ok(keys) => {
                self.emit(ViewEvent::DatasetSchemaLoaded(keys.clone()));
                if let Some(done) = done {
                    let _ = done.send(keys);
                }
            }
            Err(err) => {
                warn!(view_id = view_id.0, "dataset schema failed: {err}");
                self.emit(ViewEvent::LoadDatasetSchemaFailed(err.to_string()));
            }
        }
    }

    async fn handle_source_schema(
        self: Arc<Self>,
        ticket: Ticket,
        source_id: SourceId,
        done: Option<oneshot::Sender<Value>>,
    ) {
        let result: Result<Value, CoreError> = async {
            let envelope = self
                .transport
                .perform(RequestDescriptor::get(self.routes.database(source_id)))
                .await?;
            read_list(&envelope)
        }
        .await;

        if !ticket.is_current() {
            self.discard_stale(Operation::SourceSchema);
            return;
        }

        match result {
            Ok(schema) => {
                self.emit(ViewEvent::SchemaLoaded(schema.clone()));
                if let Some(done) = done {
                    let _ = done.send(schema);
                }
            }
            Err(err) => {
                warn!(source_id = source_id.0, "source schema failed: {err}");
                self.emit(ViewEvent::LoadSchemaFailed);
                self.notifier.error("Failed to load schema list", None);
            }
        }
    }

    async fn handle_execute_sql(
        self: Arc<Self>,
        ticket: Ticket,
        sql: String,
        source_id: SourceId,
        done: Option<oneshot::Sender<Value>>,
    ) {
        let result: Result<(ResponseHeader, Value), CoreError> = async {
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(
                    self.routes.execute_sql(),
                    json!({ "sql": sql, "sourceId": source_id.0 }),
                ))
                .await?;
            Ok((envelope.header, envelope.payload.unwrap_or(Value::Null)))
        }
        .await;

        if !ticket.is_current() {
            self.discard_stale(Operation::ExecuteSql);
            return;
        }

        match result {
            Ok((header, payload)) => {
                self.emit(ViewEvent::SqlExecuted(header));
                if let Some(done) = done {
                    let _ = done.send(payload);
                }
            }
            Err(err) => {
                warn!(source_id = source_id.0, "execute sql failed: {err}");
                self.emit(ViewEvent::ExecuteSqlFailed);
                self.notifier.error("Failed to execute SQL", None);
            }
        }
    }

    async fn handle_get_data(
        self: Arc<Self>,
        view_id: ViewId,
        query: Value,
        done: Option<oneshot::Sender<Value>>,
    ) {
        let result: Result<Value, CoreError> = async {
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(self.routes.get_data(view_id), query))
                .await?;
            Ok(envelope.payload.unwrap_or(Value::Null))
        }
        .await;

        match result {
            Ok(payload) => {
                self.emit(ViewEvent::DataLoaded);
                if let Some(done) = done {
                    let _ = done.send(payload);
                }
            }
            Err(err) => {
                warn!(view_id = view_id.0, "get data failed: {err}");
                self.emit(ViewEvent::LoadDataFailed(err.to_string()));
            }
        }
    }

    async fn handle_get_distinct_value(
        self: Arc<Self>,
        view_id: ViewId,
        field_name: String,
        filters: Map<String, Value>,
        done: Option<oneshot::Sender<Value>>,
    ) {
        let result: Result<Value, CoreError> = async {
            let parents = cascade::parents_from_filters(&filters);
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(
                    self.routes.get_distinct_value(view_id),
                    json!({ "column": field_name.as_str(), "parents": parents }),
                ))
                .await?;
            read_list(&envelope)
        }
        .await;

        match result {
            Ok(values) => {
                if let Some(done) = done {
                    let _ = done.send(values);
                }
                self.emit(ViewEvent::DistinctValueLoaded);
            }
            Err(err) => {
                warn!(view_id = view_id.0, field_name = %field_name, "distinct value failed: {err}");
                self.emit(ViewEvent::LoadDistinctValueFailed(err.to_string()));
            }
        }
    }

    async fn handle_get_data_from_item(
        self: Arc<Self>,
        item_id: ItemId,
        view_id: ViewId,
        groups: Vec<String>,
        aggregators: Vec<Value>,
        cache: bool,
        expired: i64,
    ) {
        let result: Result<Value, CoreError> = async {
            let query = DataQuery {
                groups,
                aggregators,
                filters: Vec::new(),
                params: Vec::new(),
                orders: Vec::new(),
                cache,
                expired,
            };
            let envelope = self
                .transport
                .perform(RequestDescriptor::post(
                    self.routes.get_data(view_id),
                    serde_json::to_value(&query)?,
                ))
                .await?;
            Ok(envelope.payload.unwrap_or(Value::Null))
        }
        .await;

        match result {
            Ok(payload) => self.emit(ViewEvent::DataFromItemLoaded { item_id, payload }),
            Err(err) => {
                warn!(view_id = view_id.0, item_id = item_id.0, "item data failed: {err}");
                self.emit(ViewEvent::LoadDataFromItemFailed(err.to_string()));
            }
        }
    }

    /// Two sequential dependent requests: project by id, then the owning
    /// organization's teams. A failure at either step surfaces as one failure
    /// event; a first-step failure means the second request is never issued.
    async fn handle_get_view_team(self: Arc<Self>, ticket: Ticket, project_id: ProjectId) {
        let project = self
            .transport
            .perform(RequestDescriptor::get(self.routes.project(project_id)))
            .await
            .and_then(|envelope| read_list(&envelope))
            .and_then(|payload| serde_json::from_value::<Project>(payload).map_err(CoreError::from));

        let project = match project {
            Ok(project) => project,
            Err(err) => {
                if ticket.is_current() {
                    warn!(project_id = project_id.0, "view team lookup failed: {err}");
                    self.emit(ViewEvent::LoadViewTeamFailed(err.to_string()));
                } else {
                    self.discard_stale(Operation::GetViewTeam);
                }
                return;
            }
        };

        if !ticket.is_current() {
            self.discard_stale(Operation::GetViewTeam);
            return;
        }

        let teams = self
            .transport
            .perform(RequestDescriptor::get(self.routes.org_teams(project.org_id)))
            .await
            .and_then(|envelope| read_list(&envelope));

        if !ticket.is_current() {
            self.discard_stale(Operation::GetViewTeam);
            return;
        }

        match teams {
            Ok(teams) => self.emit(ViewEvent::ViewTeamLoaded(teams)),
            Err(err) => {
                warn!(project_id = project_id.0, "view team lookup failed: {err}");
                self.emit(ViewEvent::LoadViewTeamFailed(err.to_string()));
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
