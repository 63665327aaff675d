#![forbid(unsafe_code)]

//! Writable osquery table plugins.
//!
//! A [`TablePlugin`](plugin::TablePlugin) bundles a table name, its columns
//! and three callbacks (generate, insert, delete). The transport hands every
//! osquery request to [`OsqueryPlugin::call`](plugin::OsqueryPlugin::call),
//! which routes on the request's `action` and answers with a status-coded
//! [`ExtensionResponse`].
//!
//! ```
//! use osquery_writable_table::prelude::*;
//! use std::collections::BTreeMap;
//!
//! let table = TablePlugin::new(
//!     "example_table",
//!     vec![ColumnDef::text("text"), ColumnDef::integer("integer")],
//!     |_ctx: &CallContext, _query| {
//!         Ok(vec![BTreeMap::from([
//!             ("text".to_string(), "hello world".to_string()),
//!             ("integer".to_string(), "123".to_string()),
//!         ])])
//!     },
//!     |_ctx: &CallContext, _values| Err(CallbackError::failed("read-only")),
//!     |_ctx: &CallContext, _query| Err(CallbackError::failed("read-only")),
//! );
//!
//! let request = BTreeMap::from([("action".to_string(), "generate".to_string())]);
//! let response = table.call(&CallContext::new(), &request);
//! assert_eq!(response.code(), Some(0));
//! assert_eq!(response.rows().len(), 1);
//! ```

pub(crate) mod context;
pub mod plugin;
pub(crate) mod protocol;

pub use crate::context::CallContext;

// Re-exports
pub use crate::protocol::{
    ExtensionPluginRequest, ExtensionPluginResponse, ExtensionResponse, ExtensionStatus,
};

///
/// Expose all structures required in virtually any table plugin
///
/// ```
/// use osquery_writable_table::prelude::*;
/// ```
pub mod prelude {
    pub use crate::plugin::{
        CallbackError, ColumnDef, ColumnType, OsqueryPlugin, QueryContext, TablePlugin,
        TableResult, ValueArrayJson, WritableTable,
    };
    pub use crate::CallContext;
    pub use crate::{
        ExtensionPluginRequest, ExtensionPluginResponse, ExtensionResponse, ExtensionStatus,
    };
}
