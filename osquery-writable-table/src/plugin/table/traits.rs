/// Trait form of the three table callbacks
use crate::context::CallContext;
use crate::plugin::table::column_def::ColumnDef;
use crate::plugin::table::error::CallbackError;
use crate::plugin::table::query_context::QueryContext;
use crate::plugin::table::value_array::ValueArrayJson;
use crate::protocol::ExtensionPluginResponse;

/// What a table callback returns: rows on success, or the reason it failed.
pub type TableResult = Result<ExtensionPluginResponse, CallbackError>;

/// A writable table, as an alternative to handing closures to
/// [`TablePlugin::new`](crate::plugin::TablePlugin::new).
///
/// `name` and `columns` are read once, when the table is wrapped with
/// [`TablePlugin::from_writable_table`](crate::plugin::TablePlugin::from_writable_table).
/// The callbacks take `&self` and may run concurrently; any storage behind
/// them needs its own synchronization.
#[cfg_attr(test, mockall::automock)]
pub trait WritableTable: Send + Sync + 'static {
    fn name(&self) -> String;
    fn columns(&self) -> Vec<ColumnDef>;
    fn generate(&self, ctx: &CallContext, query: QueryContext) -> TableResult;
    fn insert(&self, ctx: &CallContext, values: ValueArrayJson) -> TableResult;
    fn delete(&self, ctx: &CallContext, query: QueryContext) -> TableResult;
}
