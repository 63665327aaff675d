/// TablePlugin struct and its OsqueryPlugin implementation
use crate::context::CallContext;
use crate::plugin::table::column_def::ColumnDef;
use crate::plugin::table::query_context::QueryContext;
use crate::plugin::table::traits::{TableResult, WritableTable};
use crate::plugin::table::value_array::ValueArrayJson;
use crate::plugin::{OsqueryPlugin, Registry};
use crate::protocol::{
    ExtensionPluginRequest, ExtensionPluginResponse, ExtensionResponse, ExtensionStatus,
};
use std::fmt;
use std::sync::Arc;

pub(crate) type QueryFn = dyn Fn(&CallContext, QueryContext) -> TableResult + Send + Sync;
pub(crate) type InsertFn = dyn Fn(&CallContext, ValueArrayJson) -> TableResult + Send + Sync;

/// A writable osquery table: a name, its columns and the generate, insert
/// and delete callbacks backing it.
///
/// Everything is fixed at construction and shared behind `Arc`s, so the
/// plugin is cheap to clone and safe to call from many threads at once.
#[derive(Clone)]
pub struct TablePlugin {
    name: String,
    columns: Arc<[ColumnDef]>,
    pub(crate) generate: Arc<QueryFn>,
    pub(crate) insert: Arc<InsertFn>,
    pub(crate) delete: Arc<QueryFn>,
}

impl TablePlugin {
    pub fn new<G, I, D>(
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        generate: G,
        insert: I,
        delete: D,
    ) -> Self
    where
        G: Fn(&CallContext, QueryContext) -> TableResult + Send + Sync + 'static,
        I: Fn(&CallContext, ValueArrayJson) -> TableResult + Send + Sync + 'static,
        D: Fn(&CallContext, QueryContext) -> TableResult + Send + Sync + 'static,
    {
        TablePlugin {
            name: name.into(),
            columns: columns.into(),
            generate: Arc::new(generate),
            insert: Arc::new(insert),
            delete: Arc::new(delete),
        }
    }

    pub fn from_writable_table<T: WritableTable>(table: T) -> Self {
        let table = Arc::new(table);
        let name = table.name();
        let columns = table.columns();

        let for_generate = Arc::clone(&table);
        let for_insert = Arc::clone(&table);
        let for_delete = table;

        Self::new(
            name,
            columns,
            move |ctx: &CallContext, query| for_generate.generate(ctx, query),
            move |ctx: &CallContext, values| for_insert.insert(ctx, values),
            move |ctx: &CallContext, query| for_delete.delete(ctx, query),
        )
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }
}

impl fmt::Debug for TablePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TablePlugin")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl OsqueryPlugin for TablePlugin {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn registry(&self) -> Registry {
        Registry::Table
    }

    fn routes(&self) -> ExtensionPluginResponse {
        log::debug!("Reporting {} columns for table {}", self.columns.len(), self.name);
        self.columns.iter().map(ColumnDef::route).collect()
    }

    fn ping(&self) -> ExtensionStatus {
        ExtensionStatus::ok()
    }

    fn call(&self, ctx: &CallContext, request: &ExtensionPluginRequest) -> ExtensionResponse {
        self.parse_request(ctx, request)
    }

    fn shutdown(&self) {
        log::debug!("Shutting down plugin: {}", self.name);
    }
}
