mod _enums;
mod _traits;
mod table;

// Re-exporting all public structures
pub use _enums::registry::Registry;

pub use _traits::osquery_plugin::OsqueryPlugin;

pub use table::{
    CallbackError, ColumnDef, ColumnType, Constraint, ConstraintList, DispatchError, Operator,
    ParseError, QueryConstraints, QueryContext, TablePlugin, TableResult, ValueArrayJson,
    WritableTable,
};

pub use _enums::response::ExtensionResponseEnum;
